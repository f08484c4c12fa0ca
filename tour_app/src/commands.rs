//! Console command parsing

use std::str::FromStr;

use thiserror::Error;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Jump to a scene by id
    Go(String),
    /// Follow the active scene's link by index
    Link(usize),
    /// Switch to the nearest scene on a floor
    Floor(i32),
    /// Next populated floor above
    Up,
    /// Next populated floor below
    Down,
    /// Let time pass, pumping preload timers
    Wait(u64),
    /// Print residency counts
    Stats,
    /// List the active scene's links
    Links,
    /// Print the command list
    Help,
    /// Leave the tour
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("bad argument for '{command}': {value}")]
    BadArgument { command: &'static str, value: String },
}

pub const HELP: &str = "\
commands:
  go <id>      jump to a scene
  link <n>     follow link n of the active scene
  floor <n>    switch to the nearest scene on floor n
  up | down    step to the next populated floor
  wait <ms>    let time pass
  links        list links of the active scene
  stats        show residency counts
  quit";

fn argument<T: FromStr>(command: &'static str, value: Option<&str>) -> Result<T, CommandError> {
    let value = value.ok_or(CommandError::MissingArgument(command))?;
    value.parse().map_err(|_| CommandError::BadArgument {
        command,
        value: value.to_string(),
    })
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };
        let arg = words.next();
        match verb.to_ascii_lowercase().as_str() {
            "go" => argument("go", arg).map(Self::Go),
            "link" => argument("link", arg).map(Self::Link),
            "floor" => argument("floor", arg).map(Self::Floor),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "wait" => argument("wait", arg).map(Self::Wait),
            "stats" => Ok(Self::Stats),
            "links" => Ok(Self::Links),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
