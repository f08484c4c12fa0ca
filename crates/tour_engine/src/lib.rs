//! # Tour Engine
//!
//! Navigation and memory management core for multi-floor panoramic tours.
//!
//! ## Features
//!
//! - **Scene Graph**: Immutable scenes and directed links, indexed by floor
//! - **Navigation**: Link following and nearest-scene floor switching
//! - **Bounded Loading**: Delayed neighbour preloading with LRU eviction
//! - **Tour Files**: TOML or RON descriptions of scenes and loading options
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tour_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tour_engine::foundation::logging::init();
//!
//!     let mut tour = Tour::load_from_file("tour.toml", RecordingViewport::new())?;
//!     tour.start(None)?;
//!     tour.follow_link_at(0)?;
//!     tour.navigate_to_floor(1)?;
//!
//!     // pump preload timers once per frame
//!     let report = tour.update();
//!     println!("issued {} preloads", report.issued.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod foundation;
pub mod config;
pub mod scene;

mod error;
mod tour;

pub use error::{TourError, TourResult};
pub use tour::Tour;

/// Common imports for tour users
pub mod prelude {
    pub use crate::{
        Tour, TourError, TourResult,
        config::{Config, LoadConfig, SceneRecord, TourConfig},
        foundation::{
            math::Vec3,
            time::{Clock, ManualClock, SystemClock},
        },
        scene::{
            FloorDirection, Link, LoadManager, LoadState, LoadStats, NavigationResolver,
            PreloadReport, RecordingViewport, RequestTicket, Scene, SceneGraph, SceneId,
            Viewport, ViewportError,
        },
    };
}
