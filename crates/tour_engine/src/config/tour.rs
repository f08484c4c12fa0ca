//! Tour file layout
//!
//! A tour file carries the loading options and the ordered list of scene
//! records. Declaration order matters: it is the tie-breaker for nearest-scene
//! resolution and the default pick on a floor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Config, ConfigError};

/// Options for the load manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Upper bound on resident scenes, the active one included
    pub max_loaded_scenes: usize,
    /// Delay before a neighbour preload is issued, in milliseconds
    pub preload_delay_ms: u64,
}

impl LoadConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resident scene budget
    pub fn with_max_loaded_scenes(mut self, max: usize) -> Self {
        self.max_loaded_scenes = max;
        self
    }

    /// Set the preload delay in milliseconds
    pub fn with_preload_delay_ms(mut self, millis: u64) -> Self {
        self.preload_delay_ms = millis;
        self
    }

    /// Preload delay as a duration
    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_loaded_scenes == 0 {
            return Err(ConfigError::Invalid(
                "max_loaded_scenes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_loaded_scenes: 5,
            preload_delay_ms: 500,
        }
    }
}

/// Initial camera orientation handed to the viewport, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewParams {
    /// Horizontal angle
    pub yaw: f32,
    /// Vertical angle
    pub pitch: f32,
    /// Horizontal field of view
    pub fov: f32,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            fov: 100.0,
        }
    }
}

/// A directed link as declared in the tour file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Id of the scene this link leads to
    pub target: String,
    /// Compass bearing of the hotspot in degrees
    #[serde(default)]
    pub bearing: f32,
    /// Walking distance shown to the user; display metadata only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

/// A scene as declared in the tour file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Unique scene id
    pub id: String,
    /// Floor index, 0 is ground level
    #[serde(default)]
    pub floor: i32,
    /// Position used for nearest-scene resolution
    #[serde(default)]
    pub position: [f32; 3],
    /// Human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Panorama source passed through to the viewport
    #[serde(default)]
    pub panorama: String,
    /// Initial orientation passed through to the viewport
    #[serde(default)]
    pub initial_view: ViewParams,
    /// Outgoing links in display order
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

impl SceneRecord {
    /// Create a record with no links
    pub fn new(id: impl Into<String>, floor: i32, position: [f32; 3]) -> Self {
        Self {
            id: id.into(),
            floor,
            position,
            title: None,
            panorama: String::new(),
            initial_view: ViewParams::default(),
            links: Vec::new(),
        }
    }

    /// Add a link to another scene (builder pattern)
    pub fn with_link(mut self, target: impl Into<String>, bearing: f32) -> Self {
        self.links.push(LinkRecord {
            target: target.into(),
            bearing,
            distance: None,
        });
        self
    }

    /// Set the panorama source (builder pattern)
    pub fn with_panorama(mut self, panorama: impl Into<String>) -> Self {
        self.panorama = panorama.into();
        self
    }
}

/// Complete tour file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    /// Load manager options
    pub loading: LoadConfig,
    /// Scene records in declaration order
    pub scenes: Vec<SceneRecord>,
}

impl TourConfig {
    /// Validate the loading options
    ///
    /// Graph consistency (duplicates, dangling links) is checked when the
    /// scene graph is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.loading.validate()
    }
}

impl Config for TourConfig {}
