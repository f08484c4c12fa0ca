//! Tour-level errors

use thiserror::Error;

use crate::config::ConfigError;
use crate::scene::SceneId;

/// Errors surfaced by graph construction, navigation and loading
#[derive(Error, Debug)]
pub enum TourError {
    /// Malformed or inconsistent scene graph; fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Lookup of an unknown scene id
    #[error("Scene not found: {0}")]
    NotFound(SceneId),

    /// Navigation through a link the current scene does not own
    #[error("Scene {scene} has no link to {target}")]
    InvalidLink {
        /// Scene the navigation started from
        scene: SceneId,
        /// Target the stale link pointed at
        target: SceneId,
    },

    /// Link navigation requested before any scene was activated
    #[error("No scene is active")]
    NoActiveScene,

    /// Floor switch to a floor without scenes
    #[error("Floor {0} has no scenes")]
    EmptyFloor(i32),

    /// The viewport could not materialize a scene
    #[error("Failed to load scene {scene}: {reason}")]
    LoadFailure {
        /// Scene that failed to load
        scene: SceneId,
        /// Reason reported by the viewport
        reason: String,
    },

    /// Tour file could not be read
    #[error("Config file error: {0}")]
    Config(#[from] ConfigError),
}

impl TourError {
    /// Whether the caller can keep navigating after this error
    ///
    /// Structural errors abort the triggering call; load failures and empty
    /// floors leave the tour usable on its current scene.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyFloor(_) | Self::LoadFailure { .. })
    }
}

/// Result alias for tour operations
pub type TourResult<T> = Result<T, TourError>;
