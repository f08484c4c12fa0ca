//! Scene management system
//!
//! Navigation and residency core for panoramic tours. Following the same
//! layering as the rest of the engine: an immutable graph at the bottom, a
//! resolver that reads it, and a manager that owns all mutable load state.
//!
//! ## Architecture
//!
//! ```text
//! User action (link click, floor button)
//!      ↓
//! NavigationResolver (which scene next?)
//!      ↓
//! LoadManager (activate, preload neighbours, evict)
//!      ↓
//! Viewport (materialize / release, reports completion)
//! ```

mod scene_graph;
mod navigation;
mod load_manager;
mod preload;
mod viewport;

#[cfg(test)]
mod tests;

pub use scene_graph::{Link, Scene, SceneGraph, SceneId};
pub use navigation::{FloorDirection, NavigationResolver};
pub use load_manager::{LoadManager, LoadState, LoadStats, PreloadReport};
pub use preload::{PreloadScheduler, PreloadTask};
pub use viewport::{RecordingViewport, RequestTicket, Viewport, ViewportError};
