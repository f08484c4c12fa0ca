//! Delayed preload tasks
//!
//! Each pending preload is a task keyed by scene id with a due time. Tasks
//! are only fired when the owner pumps [`PreloadScheduler::take_due`], so
//! cancellation is a plain removal and needs no timer handles.

use std::collections::HashMap;
use std::time::Instant;

use super::SceneId;

/// One scheduled preload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadTask {
    /// Scene to preload
    pub scene: SceneId,
    /// When the preload may be issued
    pub due: Instant,
    /// Scheduling order, breaks ties between equal due times
    seq: u64,
}

/// Cancellable preload tasks keyed by scene id
#[derive(Debug, Default)]
pub struct PreloadScheduler {
    pending: HashMap<SceneId, PreloadTask>,
    next_seq: u64,
}

impl PreloadScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a preload for `scene` at `due`
    ///
    /// Returns `false` when a task for the scene is already pending; the
    /// existing due time is kept.
    pub fn schedule(&mut self, scene: SceneId, due: Instant) -> bool {
        if self.pending.contains_key(&scene) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(scene.clone(), PreloadTask { scene, due, seq });
        true
    }

    /// Cancel the pending task for `scene`
    ///
    /// Cancelling a task that already fired, was already cancelled or never
    /// existed is a no-op. Returns whether a task was removed.
    pub fn cancel(&mut self, scene: &str) -> bool {
        self.pending.remove(scene).is_some()
    }

    /// Cancel every task whose scene fails `keep`, returning the cancelled ids
    pub fn cancel_unless(&mut self, mut keep: impl FnMut(&SceneId) -> bool) -> Vec<SceneId> {
        let mut cancelled: Vec<PreloadTask> = Vec::new();
        self.pending.retain(|scene, task| {
            if keep(scene) {
                true
            } else {
                cancelled.push(task.clone());
                false
            }
        });
        cancelled.sort_by_key(|task| task.seq);
        cancelled.into_iter().map(|task| task.scene).collect()
    }

    /// Whether a task for `scene` is pending
    pub fn is_pending(&self, scene: &str) -> bool {
        self.pending.contains_key(scene)
    }

    /// Remove and return every task due at or before `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<PreloadTask> {
        let mut due: Vec<PreloadTask> = Vec::new();
        self.pending.retain(|_, task| {
            if task.due <= now {
                due.push(task.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|task| (task.due, task.seq));
        due
    }

    /// Earliest due time among pending tasks
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|task| task.due).min()
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
