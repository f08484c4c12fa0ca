//! Load Manager - bounded residency of materialized scenes
//!
//! Decides which scenes are materialized at any time. The viewport does the
//! actual work; this module only tracks per-scene [`LoadState`], issues
//! materialize/release intents and keeps the resident count within budget.
//!
//! ```text
//!              schedule + delay             completion
//! Unloaded ─────────────────────▶ Preloading ─────────▶ Loaded ◀──┐
//!    │  ▲                             │                  │       │ demote
//!    │  └──────── evict / fail ───────┴──────────────────┤       │
//!    └──────────────── activate ───────────────────────▶ Active ─┘
//! ```
//!
//! All mutation goes through `&mut self` on one thread. Time only advances
//! when the owner calls [`LoadManager::update`], which fires due preloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::preload::PreloadScheduler;
use super::viewport::{RequestTicket, Viewport, ViewportError};
use super::{SceneGraph, SceneId};
use crate::config::LoadConfig;
use crate::error::{TourError, TourResult};
use crate::foundation::time::{Clock, SystemClock};

/// Load state of a single scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Nothing held by the viewport
    #[default]
    Unloaded,
    /// Speculative materialization in flight
    Preloading,
    /// Materialized, not presented
    Loaded,
    /// Materialized and presented to the user
    Active,
}

impl LoadState {
    /// Whether the scene counts against the budget
    pub fn is_resident(self) -> bool {
        !matches!(self, Self::Unloaded)
    }
}

/// Snapshot of residency for observability panels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Scenes in Loaded, Active or Preloading
    pub resident: usize,
    /// Active scenes (0 or 1)
    pub active: usize,
    /// Scenes in Loaded
    pub loaded: usize,
    /// Scenes in Preloading
    pub preloading: usize,
    /// Preloads still inside their delay window
    pub pending_preloads: usize,
    /// Materialize requests awaiting completion
    pub in_flight: usize,
    /// Scenes released to stay within budget, lifetime total
    pub evictions: u64,
    /// Configured maximum of resident scenes
    pub budget: usize,
}

/// Outcome of one [`LoadManager::update`] pump
#[derive(Debug, Default)]
pub struct PreloadReport {
    /// Preloads handed to the viewport
    pub issued: Vec<SceneId>,
    /// Due preloads that no longer applied or did not fit in the budget
    pub dropped: Vec<SceneId>,
    /// Preloads the viewport refused
    pub failures: Vec<TourError>,
}

/// Which scenes an eviction pass must leave alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvictionGuard {
    /// Preloads in flight for the active scene's neighbours
    PreloadingNeighbors,
    /// Every resident neighbour of the active scene
    AllNeighbors,
    /// Only the active scene itself
    ActiveOnly,
}

/// Per-scene bookkeeping
#[derive(Debug, Clone, Default)]
struct SceneSlot {
    state: LoadState,
    /// Monotonic time the scene last became active
    last_accessed_at: Option<Instant>,
    /// Activation order; 0 for scenes never activated
    access_seq: u64,
    /// Ticket of the request that materialized this residency
    ticket: Option<RequestTicket>,
}

impl SceneSlot {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Bounded-memory load, preload and eviction manager
pub struct LoadManager<V: Viewport> {
    graph: Arc<SceneGraph>,
    config: LoadConfig,
    viewport: V,
    clock: Box<dyn Clock>,
    slots: HashMap<SceneId, SceneSlot>,
    active: Option<SceneId>,
    previous_active: Option<SceneId>,
    scheduler: PreloadScheduler,
    /// Outstanding materialize requests
    in_flight: HashMap<RequestTicket, SceneId>,
    next_ticket: u64,
    next_access_seq: u64,
    evictions: u64,
}

impl<V: Viewport> LoadManager<V> {
    /// Create a manager with every scene unloaded
    ///
    /// Fails with [`TourError::Configuration`] when `max_loaded_scenes` is 0.
    pub fn new(graph: Arc<SceneGraph>, config: LoadConfig, viewport: V) -> TourResult<Self> {
        config
            .validate()
            .map_err(|e| TourError::Configuration(e.to_string()))?;

        log::info!(
            "Creating LoadManager: budget {} scenes, preload delay {} ms",
            config.max_loaded_scenes,
            config.preload_delay_ms
        );
        let slots = graph
            .iter()
            .map(|scene| (scene.id.clone(), SceneSlot::default()))
            .collect();
        Ok(Self {
            graph,
            config,
            viewport,
            clock: Box::new(SystemClock),
            slots,
            active: None,
            previous_active: None,
            scheduler: PreloadScheduler::new(),
            in_flight: HashMap::new(),
            next_ticket: 1,
            next_access_seq: 1,
            evictions: 0,
        })
    }

    /// Replace the clock (builder pattern)
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Loading options in effect
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// The rendering collaborator
    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// Mutable access to the rendering collaborator
    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    /// Currently active scene, if any
    pub fn active(&self) -> Option<&SceneId> {
        self.active.as_ref()
    }

    /// Load state of a scene
    pub fn state(&self, id: &str) -> TourResult<LoadState> {
        self.slots
            .get(id)
            .map(|slot| slot.state)
            .ok_or_else(|| TourError::NotFound(SceneId::from(id)))
    }

    /// When a scene last became active
    pub fn last_accessed_at(&self, id: &str) -> TourResult<Option<Instant>> {
        self.slots
            .get(id)
            .map(|slot| slot.last_accessed_at)
            .ok_or_else(|| TourError::NotFound(SceneId::from(id)))
    }

    /// Whether a preload for `id` is waiting out its delay
    pub fn is_preload_pending(&self, id: &str) -> bool {
        self.scheduler.is_pending(id)
    }

    /// Due time of the earliest pending preload
    pub fn next_preload_due(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    /// Make `id` the active scene
    ///
    /// The previous active scene is demoted to Loaded. An unloaded target is
    /// materialized immediately and counted as Loaded right away; if the
    /// viewport refuses the request the call fails with
    /// [`TourError::LoadFailure`] and nothing changes. Afterwards preloads
    /// are (re)scheduled for the new scene's links and the budget is enforced.
    pub fn activate(&mut self, id: &str) -> TourResult<()> {
        let graph = Arc::clone(&self.graph);
        let scene = graph.get(id)?;
        let now = self.clock.now();

        if self.active.as_ref() == Some(&scene.id) {
            log::trace!("Scene '{}' is already active", scene.id);
            self.touch(&scene.id, now);
            self.schedule_neighbors(now);
            return Ok(());
        }

        let state = self.state(id)?;
        if state == LoadState::Unloaded {
            let ticket = self.request_materialize(&scene.id).map_err(|e| {
                log::warn!("Activation of '{}' failed: {}", scene.id, e);
                TourError::LoadFailure {
                    scene: scene.id.clone(),
                    reason: e.to_string(),
                }
            })?;
            self.scheduler.cancel(id);
            if let Some(slot) = self.slots.get_mut(id) {
                slot.ticket = Some(ticket);
            }
            log::debug!("Materializing '{}' for activation ({})", scene.id, ticket);
        }

        if let Some(previous) = self.active.take() {
            if let Some(slot) = self.slots.get_mut(&previous) {
                slot.state = LoadState::Loaded;
            }
            self.previous_active = Some(previous);
        }
        if let Some(slot) = self.slots.get_mut(id) {
            slot.state = LoadState::Active;
        }
        self.active = Some(scene.id.clone());
        self.touch(&scene.id, now);
        log::info!("Active scene: '{}' (floor {})", scene.label(), scene.floor);

        self.schedule_neighbors(now);
        self.evict_excess();
        Ok(())
    }

    /// Schedule a delayed preload of `id`
    ///
    /// Only unloaded scenes are scheduled; returns whether a new task was
    /// registered. The task fires from [`update`](Self::update) once the
    /// configured delay has elapsed.
    pub fn schedule_preload(&mut self, id: &str) -> TourResult<bool> {
        let now = self.clock.now();
        self.schedule_preload_at(id, now)
    }

    /// Cancel a pending preload; a no-op when none is pending
    pub fn cancel_preload(&mut self, id: &str) -> bool {
        let cancelled = self.scheduler.cancel(id);
        if cancelled {
            log::debug!("Cancelled pending preload of '{}'", id);
        }
        cancelled
    }

    /// Fire every preload whose delay has elapsed
    pub fn update(&mut self) -> PreloadReport {
        let now = self.clock.now();
        let mut report = PreloadReport::default();
        for task in self.scheduler.take_due(now) {
            match self.fire_preload(&task.scene) {
                Ok(true) => report.issued.push(task.scene),
                Ok(false) => report.dropped.push(task.scene),
                Err(e) => report.failures.push(e),
            }
        }
        report
    }

    /// Viewport completion callback for a materialize request
    ///
    /// Success moves a preloading scene to Loaded. Failure returns the scene
    /// to Unloaded and is reported as [`TourError::LoadFailure`]; when the
    /// failed scene was active, the previously active scene takes over if it
    /// is still resident. Completions for requests that were cancelled by
    /// eviction are ignored.
    pub fn complete_materialization(
        &mut self,
        ticket: RequestTicket,
        result: Result<(), ViewportError>,
    ) -> TourResult<()> {
        let Some(id) = self.in_flight.remove(&ticket) else {
            log::trace!("Ignoring completion for stale request {}", ticket);
            return Ok(());
        };
        let Some(slot) = self.slots.get_mut(&id) else {
            return Ok(());
        };
        if slot.ticket != Some(ticket) {
            log::trace!("Ignoring completion {} for superseded request of '{}'", ticket, id);
            return Ok(());
        }

        match result {
            Ok(()) => {
                if slot.state == LoadState::Preloading {
                    slot.state = LoadState::Loaded;
                }
                log::debug!("Scene '{}' materialized ({})", id, ticket);
                Ok(())
            }
            Err(e) => {
                let was_active = slot.state == LoadState::Active;
                slot.reset();
                self.viewport.release(&id);
                log::warn!("Materialization of '{}' failed: {}", id, e);
                if was_active {
                    self.active = None;
                    self.fall_back_from(&id);
                }
                Err(TourError::LoadFailure {
                    scene: id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Release non-active scenes until the budget holds
    ///
    /// Victims are chosen least recently activated first (never-activated
    /// preloads before anything visited). Preloads in flight for the active
    /// scene's neighbours are spared. Returns the evicted ids in order.
    pub fn evict_excess(&mut self) -> Vec<SceneId> {
        let mut evicted = Vec::new();
        while self.resident_count() > self.config.max_loaded_scenes {
            let victim = self
                .eviction_candidate(EvictionGuard::PreloadingNeighbors)
                .or_else(|| {
                    log::warn!("Budget exceeded with only neighbour preloads left; evicting one");
                    self.eviction_candidate(EvictionGuard::ActiveOnly)
                });
            let Some(victim) = victim else {
                break;
            };
            self.release_scene(&victim);
            evicted.push(victim);
        }
        evicted
    }

    /// Release a single non-active scene
    ///
    /// Returns `Ok(false)` for a scene that is already unloaded or is the
    /// active scene; evicting twice is harmless.
    pub fn evict(&mut self, id: &str) -> TourResult<bool> {
        match self.state(id)? {
            LoadState::Unloaded => Ok(false),
            LoadState::Active => {
                log::warn!("Refusing to evict active scene '{}'", id);
                Ok(false)
            }
            LoadState::Loaded | LoadState::Preloading => {
                let id = SceneId::from(id);
                self.release_scene(&id);
                Ok(true)
            }
        }
    }

    /// Residency counts
    pub fn stats(&self) -> LoadStats {
        let mut stats = LoadStats {
            pending_preloads: self.scheduler.len(),
            in_flight: self.in_flight.len(),
            evictions: self.evictions,
            budget: self.config.max_loaded_scenes,
            ..LoadStats::default()
        };
        for slot in self.slots.values() {
            match slot.state {
                LoadState::Unloaded => continue,
                LoadState::Preloading => stats.preloading += 1,
                LoadState::Loaded => stats.loaded += 1,
                LoadState::Active => stats.active += 1,
            }
            stats.resident += 1;
        }
        stats
    }

    /// Ids of every resident scene, sorted
    pub fn resident_scenes(&self) -> Vec<SceneId> {
        let mut ids: Vec<SceneId> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.state.is_resident())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn resident_count(&self) -> usize {
        self.slots.values().filter(|slot| slot.state.is_resident()).count()
    }

    fn touch(&mut self, id: &SceneId, now: Instant) {
        let seq = self.next_access_seq;
        self.next_access_seq += 1;
        if let Some(slot) = self.slots.get_mut(id) {
            slot.last_accessed_at = Some(now);
            slot.access_seq = seq;
        }
    }

    fn request_materialize(&mut self, id: &SceneId) -> Result<RequestTicket, ViewportError> {
        let scene = self
            .graph
            .get(id.as_str())
            .map_err(|e| ViewportError::Rejected(e.to_string()))?;
        let ticket = RequestTicket::from_raw(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.viewport.materialize(scene, ticket)?;
        self.in_flight.insert(ticket, id.clone());
        Ok(ticket)
    }

    fn schedule_preload_at(&mut self, id: &str, now: Instant) -> TourResult<bool> {
        if self.state(id)? != LoadState::Unloaded {
            return Ok(false);
        }
        let scheduled = self
            .scheduler
            .schedule(SceneId::from(id), now + self.config.preload_delay());
        if scheduled {
            log::trace!("Preload of '{}' scheduled in {} ms", id, self.config.preload_delay_ms);
        }
        Ok(scheduled)
    }

    /// Cancel preloads no longer adjacent to the active scene and schedule
    /// the active scene's neighbours
    fn schedule_neighbors(&mut self, now: Instant) {
        let graph = Arc::clone(&self.graph);
        let Some(active) = self.active.as_ref().and_then(|id| graph.get(id.as_str()).ok()) else {
            return;
        };

        for stale in self.scheduler.cancel_unless(|id| active.links_to(id.as_str())) {
            log::debug!("Cancelled preload of '{}', no longer adjacent to '{}'", stale, active.id);
        }
        for link in &active.links {
            // link targets are validated at graph build
            let _ = self.schedule_preload_at(link.target.as_str(), now);
        }
    }

    /// Issue a due preload; `Ok(false)` when it no longer applies or cannot
    /// fit in the budget
    fn fire_preload(&mut self, id: &SceneId) -> TourResult<bool> {
        let graph = Arc::clone(&self.graph);
        let still_adjacent = self
            .active
            .as_ref()
            .and_then(|active| graph.get(active.as_str()).ok())
            .is_some_and(|active| active.links_to(id.as_str()));
        if self.state(id.as_str())? != LoadState::Unloaded || !still_adjacent {
            log::trace!("Dropping preload of '{}'", id);
            return Ok(false);
        }

        if self.resident_count() >= self.config.max_loaded_scenes {
            match self.eviction_candidate(EvictionGuard::AllNeighbors) {
                Some(victim) => self.release_scene(&victim),
                None => {
                    log::debug!("No room to preload '{}' within budget", id);
                    return Ok(false);
                }
            }
        }

        let ticket = self.request_materialize(id).map_err(|e| {
            log::warn!("Preload of '{}' failed: {}", id, e);
            TourError::LoadFailure {
                scene: id.clone(),
                reason: e.to_string(),
            }
        })?;
        if let Some(slot) = self.slots.get_mut(id) {
            slot.state = LoadState::Preloading;
            slot.ticket = Some(ticket);
        }
        log::debug!("Preloading '{}' ({})", id, ticket);
        Ok(true)
    }

    fn eviction_candidate(&self, guard: EvictionGuard) -> Option<SceneId> {
        let active = self
            .active
            .as_ref()
            .and_then(|id| self.graph.get(id.as_str()).ok());
        let protected = |id: &SceneId, state: LoadState| match (guard, active) {
            (EvictionGuard::PreloadingNeighbors, Some(active)) => {
                state == LoadState::Preloading && active.links_to(id.as_str())
            }
            (EvictionGuard::AllNeighbors, Some(active)) => active.links_to(id.as_str()),
            _ => false,
        };

        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot.state, LoadState::Loaded | LoadState::Preloading))
            .filter(|(id, slot)| !protected(id, slot.state))
            .min_by_key(|(id, slot)| (slot.access_seq, slot.ticket, (*id).clone()))
            .map(|(id, _)| id.clone())
    }

    fn release_scene(&mut self, id: &SceneId) {
        let Some(slot) = self.slots.get_mut(id) else {
            return;
        };
        if !slot.state.is_resident() || slot.state == LoadState::Active {
            return;
        }
        let previous = slot.state;
        if let Some(ticket) = slot.ticket {
            self.in_flight.remove(&ticket);
        }
        slot.reset();
        self.viewport.release(id);
        self.evictions += 1;
        if self.previous_active.as_ref() == Some(id) {
            self.previous_active = None;
        }
        log::debug!("Evicted '{}' (was {:?})", id, previous);
    }

    fn fall_back_from(&mut self, failed: &SceneId) {
        let fallback = self
            .previous_active
            .take()
            .filter(|id| id != failed && self.state(id.as_str()).ok() == Some(LoadState::Loaded));
        let Some(fallback) = fallback else {
            log::warn!("No scene to fall back to after '{}' failed", failed);
            self.scheduler.clear();
            return;
        };

        let now = self.clock.now();
        if let Some(slot) = self.slots.get_mut(&fallback) {
            slot.state = LoadState::Active;
        }
        log::info!("Falling back to '{}' after '{}' failed", fallback, failed);
        self.active = Some(fallback.clone());
        self.touch(&fallback, now);
        self.schedule_neighbors(now);
    }
}
