//! Tour facade
//!
//! The presentation layer talks to a [`Tour`]: it owns the scene graph, the
//! navigation resolver and the load manager, and turns user actions (link
//! clicks, floor buttons) into activations.

use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, LoadConfig, TourConfig};
use crate::error::{TourError, TourResult};
use crate::foundation::time::Clock;
use crate::scene::{
    FloorDirection, Link, LoadManager, LoadStats, NavigationResolver, PreloadReport,
    RequestTicket, Scene, SceneGraph, SceneId, Viewport, ViewportError,
};

/// A navigable multi-floor tour
pub struct Tour<V: Viewport> {
    graph: Arc<SceneGraph>,
    resolver: NavigationResolver,
    loader: LoadManager<V>,
}

impl<V: Viewport> Tour<V> {
    /// Build a tour from a parsed tour file
    pub fn new(config: TourConfig, viewport: V) -> TourResult<Self> {
        config
            .validate()
            .map_err(|e| TourError::Configuration(e.to_string()))?;
        let graph = Arc::new(SceneGraph::build(config.scenes)?);
        Self::from_graph(graph, config.loading, viewport)
    }

    /// Build a tour from a tour file on disk
    pub fn load_from_file(path: impl AsRef<Path>, viewport: V) -> TourResult<Self> {
        let config = TourConfig::load_from_file(path)?;
        Self::new(config, viewport)
    }

    /// Build a tour over an existing graph
    pub fn from_graph(graph: Arc<SceneGraph>, loading: LoadConfig, viewport: V) -> TourResult<Self> {
        let resolver = NavigationResolver::new(Arc::clone(&graph));
        let loader = LoadManager::new(Arc::clone(&graph), loading, viewport)?;
        Ok(Self {
            graph,
            resolver,
            loader,
        })
    }

    /// Replace the clock driving preload delays (builder pattern)
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.loader = self.loader.with_clock(clock);
        self
    }

    /// The scene graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The navigation resolver
    pub fn resolver(&self) -> &NavigationResolver {
        &self.resolver
    }

    /// The load manager
    pub fn loader(&self) -> &LoadManager<V> {
        &self.loader
    }

    /// Mutable access to the load manager
    pub fn loader_mut(&mut self) -> &mut LoadManager<V> {
        &mut self.loader
    }

    /// The rendering collaborator
    pub fn viewport(&self) -> &V {
        self.loader.viewport()
    }

    /// Mutable access to the rendering collaborator
    pub fn viewport_mut(&mut self) -> &mut V {
        self.loader.viewport_mut()
    }

    /// The scene presented to the user
    pub fn active_scene(&self) -> Option<&Scene> {
        self.loader
            .active()
            .and_then(|id| self.graph.get(id.as_str()).ok())
    }

    /// Floor of the active scene
    pub fn current_floor(&self) -> Option<i32> {
        self.active_scene().map(|scene| scene.floor)
    }

    /// Activate the opening scene
    ///
    /// With a floor, the first scene declared on it; otherwise the first
    /// scene declared in the tour.
    pub fn start(&mut self, floor: Option<i32>) -> TourResult<SceneId> {
        let target = match floor {
            Some(floor) => self.resolver.nearest_on_floor(None, floor)?,
            None => self
                .graph
                .iter()
                .next()
                .map(|scene| scene.id.clone())
                .ok_or_else(|| TourError::Configuration("tour has no scenes".to_string()))?,
        };
        self.activate(target.as_str())
    }

    /// Jump straight to a scene
    pub fn activate(&mut self, id: &str) -> TourResult<SceneId> {
        self.loader.activate(id)?;
        Ok(SceneId::from(id))
    }

    /// Follow one of the active scene's links
    pub fn follow_link(&mut self, link: &Link) -> TourResult<SceneId> {
        let current = self.loader.active().cloned().ok_or(TourError::NoActiveScene)?;
        let target = self.resolver.follow_link(current.as_str(), link)?;
        self.activate(target.as_str())
    }

    /// Follow the active scene's link at `index`
    pub fn follow_link_at(&mut self, index: usize) -> TourResult<SceneId> {
        let current = self.loader.active().cloned().ok_or(TourError::NoActiveScene)?;
        let target = self.resolver.follow_link_at(current.as_str(), index)?;
        self.activate(target.as_str())
    }

    /// Switch to the scene on `floor` nearest to the active scene
    pub fn navigate_to_floor(&mut self, floor: i32) -> TourResult<SceneId> {
        let current = self.loader.active().cloned();
        let target = self
            .resolver
            .nearest_on_floor(current.as_ref().map(SceneId::as_str), floor)?;
        log::debug!("Floor {} requested, resolved to '{}'", floor, target);
        self.activate(target.as_str())
    }

    /// Move to the next populated floor above or below
    ///
    /// Returns `Ok(None)` when there is no floor in that direction.
    pub fn step_floor(&mut self, direction: FloorDirection) -> TourResult<Option<SceneId>> {
        let floor = self.current_floor().ok_or(TourError::NoActiveScene)?;
        match self.resolver.adjacent_floor(floor, direction) {
            Some(next) => self.navigate_to_floor(next).map(Some),
            None => Ok(None),
        }
    }

    /// Pump preload timers
    pub fn update(&mut self) -> PreloadReport {
        self.loader.update()
    }

    /// Forward a viewport completion to the load manager
    pub fn complete_materialization(
        &mut self,
        ticket: RequestTicket,
        result: Result<(), ViewportError>,
    ) -> TourResult<()> {
        self.loader.complete_materialization(ticket, result)
    }

    /// Residency counts
    pub fn stats(&self) -> LoadStats {
        self.loader.stats()
    }
}
