//! Tour console demo
//!
//! Loads a tour file and walks it from typed or scripted commands, printing
//! the active scene and what the load manager keeps resident. Time is
//! simulated: it only moves on `wait`, so a script replays identically.

mod cli;
mod commands;
mod console_viewport;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use clap::Parser;
use tour_engine::config::{Config, TourConfig};
use tour_engine::foundation::time::{Clock, ManualClock};
use tour_engine::scene::FloorDirection;
use tour_engine::{Tour, TourError};

use cli::Cli;
use commands::{Command, HELP};
use console_viewport::ConsoleViewport;

/// Simulated time between pumps while waiting
const FRAME_MS: u64 = 50;

struct TourConsole {
    tour: Tour<ConsoleViewport>,
    clock: ManualClock,
    interactive: bool,
}

impl TourConsole {
    fn new(cli: &Cli) -> Result<Self, TourError> {
        log::info!("Loading tour from {}", cli.tour.display());
        let mut config = TourConfig::load_from_file(&cli.tour)?;
        if let Some(max) = cli.max_loaded {
            config.loading.max_loaded_scenes = max;
        }
        if let Some(delay) = cli.preload_delay_ms {
            config.loading.preload_delay_ms = delay;
        }

        let mut viewport = ConsoleViewport::new();
        for id in &cli.broken {
            viewport.break_scene(id.as_str());
        }

        let clock = ManualClock::new();
        let tour = Tour::new(config, viewport)?.with_clock(clock.clone());
        println!(
            "Tour loaded: {} scenes on floors {:?}",
            tour.graph().len(),
            tour.graph().floors()
        );
        Ok(Self {
            tour,
            clock,
            interactive: cli.script.is_none(),
        })
    }

    fn start(&mut self, floor: Option<i32>) -> Result<(), TourError> {
        self.tour.start(floor)?;
        self.pump();
        self.print_location();
        Ok(())
    }

    /// Deliver finished viewport requests, then fire due preloads
    fn pump(&mut self) {
        for (ticket, result) in self.tour.viewport_mut().take_completions() {
            if let Err(e) = self.tour.complete_materialization(ticket, result) {
                println!("  ! {e}");
            }
        }

        let report = self.tour.update();
        for id in &report.issued {
            println!("  preloading '{id}'");
        }
        for id in &report.dropped {
            log::debug!("Preload of '{}' dropped", id);
        }
        for e in &report.failures {
            println!("  ! {e}");
        }

        if let Some(active) = self.tour.active_scene().cloned() {
            self.tour.viewport_mut().present(&active);
        }
    }

    /// Advance simulated time, pumping every frame and at each preload due time
    fn wait(&mut self, millis: u64) {
        let mut remaining = millis;
        while remaining > 0 {
            let mut step = remaining.min(FRAME_MS);
            if let Some(due) = self.tour.loader().next_preload_due() {
                let until = due.saturating_duration_since(self.clock.now()).as_millis();
                if until > 0 {
                    step = step.min(u64::try_from(until).unwrap_or(u64::MAX));
                }
            }
            self.clock.advance_ms(step);
            self.pump();
            remaining -= step;
        }
    }

    /// Run one command; returns `false` to leave the tour
    fn execute(&mut self, command: Command) -> Result<bool, TourError> {
        match command {
            Command::Go(id) => {
                self.tour.activate(&id)?;
            }
            Command::Link(index) => {
                self.tour.follow_link_at(index)?;
            }
            Command::Floor(floor) => {
                self.tour.navigate_to_floor(floor)?;
            }
            Command::Up => {
                if self.tour.step_floor(FloorDirection::Up)?.is_none() {
                    println!("  no floor above");
                    return Ok(true);
                }
            }
            Command::Down => {
                if self.tour.step_floor(FloorDirection::Down)?.is_none() {
                    println!("  no floor below");
                    return Ok(true);
                }
            }
            Command::Wait(millis) => {
                self.wait(millis);
                return Ok(true);
            }
            Command::Stats => {
                self.print_stats();
                return Ok(true);
            }
            Command::Links => {
                self.print_links();
                return Ok(true);
            }
            Command::Help => {
                println!("{HELP}");
                return Ok(true);
            }
            Command::Quit => return Ok(false),
        }
        self.pump();
        self.print_location();
        Ok(true)
    }

    fn print_location(&self) {
        if let Some(scene) = self.tour.active_scene() {
            println!("@ {} [{}] floor {}", scene.label(), scene.id, scene.floor);
        } else {
            println!("@ nowhere");
        }
    }

    fn print_links(&self) {
        let Some(scene) = self.tour.active_scene() else {
            println!("  no active scene");
            return;
        };
        for (i, link) in scene.links.iter().enumerate() {
            match link.distance {
                Some(distance) => println!("  {i}: {} at {:.0} deg, {distance:.1} m", link.target, link.bearing),
                None => println!("  {i}: {} at {:.0} deg", link.target, link.bearing),
            }
        }
    }

    fn print_stats(&self) {
        let stats = self.tour.stats();
        println!(
            "  resident {}/{} (active {}, loaded {}, preloading {}), pending {}, in flight {}, evictions {}",
            stats.resident,
            stats.budget,
            stats.active,
            stats.loaded,
            stats.preloading,
            stats.pending_preloads,
            stats.in_flight,
            stats.evictions
        );
        let resident: Vec<String> = self
            .tour
            .loader()
            .resident_scenes()
            .iter()
            .map(|id| format!("{id}:{:?}", self.tour.loader().state(id.as_str()).unwrap_or_default()))
            .collect();
        println!("  {}", resident.join(" "));
        println!("  viewport queue {}", self.tour.viewport().pending_len());
    }

    fn run(&mut self, input: impl BufRead) -> io::Result<()> {
        self.prompt()?;
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                self.prompt()?;
                continue;
            }
            if !self.interactive {
                println!("> {line}");
            }

            match line.parse::<Command>() {
                Ok(command) => match self.execute(command) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) if e.is_recoverable() => println!("  ! {e}"),
                    Err(e) => {
                        log::warn!("Command '{}' failed: {}", line, e);
                        println!("  ! {e}");
                    }
                },
                Err(e) => println!("  ! {e}"),
            }
            self.prompt()?;
        }
        Ok(())
    }

    fn prompt(&self) -> io::Result<()> {
        if self.interactive {
            print!("> ");
            io::stdout().flush()?;
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    log::info!("Starting tour console");

    let mut console = TourConsole::new(&cli).map_err(|e| {
        log::error!("Failed to load tour: {}", e);
        e
    })?;
    console.start(cli.start)?;

    match &cli.script {
        Some(path) => console.run(BufReader::new(File::open(path)?))?,
        None => {
            println!("Type 'help' for commands");
            console.run(io::stdin().lock())?;
        }
    }

    log::info!("Tour console finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tour_engine::scene::LoadState;

    const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/sample_tour.toml");

    fn console(extra: &[&str]) -> TourConsole {
        let mut args = vec!["tour_console", SAMPLE, "--script", "walkthrough.txt"];
        args.extend_from_slice(extra);
        TourConsole::new(&Cli::parse_from(args)).unwrap()
    }

    #[test]
    fn test_sample_tour_loads() {
        let mut console = console(&[]);
        console.start(None).unwrap();

        assert_eq!(console.tour.active_scene().unwrap().id.as_str(), "parking");
        assert_eq!(console.tour.graph().floors(), vec![-1, 0, 1, 3]);
        assert_eq!(console.tour.stats().budget, 4);
    }

    #[test]
    fn test_script_walk_respects_budget() {
        let mut console = console(&["--max-loaded", "2", "--preload-delay", "100"]);
        console.start(Some(0)).unwrap();

        let script = "link 0\nwait 300\nlink 2\nwait 300\nup\nfloor 3\ndown\nwait 300\nquit\nlink 0\n";
        console.run(Cursor::new(script)).unwrap();

        // the floor below the terrace is 1, nearest to the terrace is the open office
        assert_eq!(console.tour.active_scene().unwrap().id.as_str(), "open_office");
        assert!(console.tour.stats().resident <= 2);
    }

    #[test]
    fn test_wait_pumps_at_preload_due_time() {
        let mut console = console(&["--preload-delay", "120"]);
        console.start(Some(0)).unwrap();

        // preloads fire at 120 ms, so the 130 ms pump already completes them
        console.wait(130);

        assert_eq!(console.tour.loader().state("reception").unwrap(), LoadState::Loaded);
        assert_eq!(console.tour.loader().state("parking").unwrap(), LoadState::Loaded);
    }

    #[test]
    fn test_broken_scene_is_reported_and_tour_continues() {
        let mut console = console(&["--broken", "reception", "--preload-delay", "0"]);
        console.start(Some(0)).unwrap();

        // the failed preload leaves reception unloaded, the entrance stays active
        console.run(Cursor::new("wait 100\nfloor 7\n")).unwrap();

        assert_eq!(console.tour.loader().state("reception").unwrap(), LoadState::Unloaded);
        assert_eq!(console.tour.active_scene().unwrap().id.as_str(), "entrance");
    }
}
