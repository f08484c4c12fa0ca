//! Viewport that narrates engine intents instead of decoding panoramas
//!
//! Requests are queued and reported complete on the next pump, which is
//! enough to exercise the asynchronous path of the load manager.

use std::collections::{HashSet, VecDeque};

use tour_engine::scene::{RequestTicket, Scene, SceneId, Viewport, ViewportError};

/// Console stand-in for a panorama renderer
#[derive(Debug, Default)]
pub struct ConsoleViewport {
    pending: VecDeque<(SceneId, RequestTicket)>,
    /// Scenes whose panoramas "fail to decode"
    broken: HashSet<SceneId>,
    shown: Option<SceneId>,
}

impl ConsoleViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later materialization of `scene` fail on completion
    pub fn break_scene(&mut self, scene: impl Into<SceneId>) {
        self.broken.insert(scene.into());
    }

    /// Record which scene is on screen
    pub fn present(&mut self, scene: &Scene) {
        if self.shown.as_ref() != Some(&scene.id) {
            println!(
                "  [viewport] presenting '{}' (yaw {:.0}, fov {:.0})",
                scene.label(),
                scene.initial_view.yaw,
                scene.initial_view.fov
            );
            self.shown = Some(scene.id.clone());
        }
    }

    /// Requests finished since the last pump, with their outcome
    pub fn take_completions(&mut self) -> Vec<(RequestTicket, Result<(), ViewportError>)> {
        self.pending
            .drain(..)
            .map(|(scene, ticket)| {
                let result = if self.broken.contains(&scene) {
                    Err(ViewportError::Unavailable(format!("cannot decode panorama for '{scene}'")))
                } else {
                    Ok(())
                };
                (ticket, result)
            })
            .collect()
    }

    /// Number of requests awaiting completion
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Viewport for ConsoleViewport {
    fn materialize(&mut self, scene: &Scene, ticket: RequestTicket) -> Result<(), ViewportError> {
        log::debug!("materialize '{}' from {:?} ({})", scene.id, scene.panorama, ticket);
        self.pending.push_back((scene.id.clone(), ticket));
        Ok(())
    }

    fn release(&mut self, scene: &SceneId) {
        log::debug!("release '{}'", scene);
        self.pending.retain(|(id, _)| id != scene);
        if self.shown.as_ref() == Some(scene) {
            self.shown = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tour_engine::config::SceneRecord;

    fn scene(id: &str) -> Scene {
        Scene::from(SceneRecord::new(id, 0, [0.0, 0.0, 0.0]))
    }

    #[test]
    fn test_completions_delivered_once() {
        let mut viewport = ConsoleViewport::new();
        viewport.materialize(&scene("a"), RequestTicket::from_raw(1)).unwrap();
        viewport.materialize(&scene("b"), RequestTicket::from_raw(2)).unwrap();
        viewport.break_scene("b");

        let done = viewport.take_completions();

        assert_eq!(done.len(), 2);
        assert!(done[0].1.is_ok());
        assert!(done[1].1.is_err());
        assert!(viewport.take_completions().is_empty());
    }

    #[test]
    fn test_release_drops_pending_request() {
        let mut viewport = ConsoleViewport::new();
        viewport.materialize(&scene("a"), RequestTicket::from_raw(1)).unwrap();

        viewport.release(&SceneId::from("a"));

        assert_eq!(viewport.pending_len(), 0);
    }
}
