//! Viewport collaborator interface
//!
//! The viewport owns the actual panorama renderer. The load manager only
//! sends it intents ("materialize scene S", "release scene S") and receives
//! completions back through [`LoadManager::complete_materialization`].
//!
//! [`LoadManager::complete_materialization`]: super::LoadManager::complete_materialization

use std::fmt;

use thiserror::Error;

use super::{Scene, SceneId};

/// Identifies one materialize request
///
/// A completion carrying an outdated ticket (the scene was evicted or
/// requested again in the meantime) is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    /// Ticket with a known number, for viewports replaying recorded sessions
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw ticket number
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failure reported by the viewport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewportError {
    /// The request was refused before any work started
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The panorama could not be fetched or decoded
    #[error("Panorama unavailable: {0}")]
    Unavailable(String),

    /// Any other engine failure
    #[error("Engine error: {0}")]
    Engine(String),
}

/// Rendering collaborator driven by the load manager
pub trait Viewport {
    /// Start materializing `scene`
    ///
    /// Returning `Ok` means the request was accepted; the outcome is reported
    /// later through the load manager with the same `ticket`. Returning `Err`
    /// means nothing was started.
    fn materialize(&mut self, scene: &Scene, ticket: RequestTicket) -> Result<(), ViewportError>;

    /// Release everything held for `scene`
    fn release(&mut self, scene: &SceneId);
}

/// Viewport that records every intent, for tests and headless runs
#[derive(Debug, Default)]
pub struct RecordingViewport {
    /// Accepted materialize requests in issue order
    pub materialized: Vec<(SceneId, RequestTicket)>,
    /// Released scenes in issue order
    pub released: Vec<SceneId>,
    /// Scenes whose requests are rejected outright
    pub reject: Vec<SceneId>,
}

impl RecordingViewport {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject future materialize requests for `scene`
    pub fn reject_scene(&mut self, scene: impl Into<SceneId>) {
        self.reject.push(scene.into());
    }

    /// Most recent ticket issued for `scene`
    pub fn last_ticket(&self, scene: &str) -> Option<RequestTicket> {
        self.materialized
            .iter()
            .rev()
            .find(|(id, _)| id.as_str() == scene)
            .map(|(_, ticket)| *ticket)
    }

    /// How many materialize requests were accepted for `scene`
    pub fn request_count(&self, scene: &str) -> usize {
        self.materialized
            .iter()
            .filter(|(id, _)| id.as_str() == scene)
            .count()
    }

    /// Whether `scene` was ever released
    pub fn was_released(&self, scene: &str) -> bool {
        self.released.iter().any(|id| id.as_str() == scene)
    }
}

impl Viewport for RecordingViewport {
    fn materialize(&mut self, scene: &Scene, ticket: RequestTicket) -> Result<(), ViewportError> {
        if self.reject.contains(&scene.id) {
            return Err(ViewportError::Rejected(format!("{} is blocked", scene.id)));
        }
        self.materialized.push((scene.id.clone(), ticket));
        Ok(())
    }

    fn release(&mut self, scene: &SceneId) {
        self.released.push(scene.clone());
    }
}
