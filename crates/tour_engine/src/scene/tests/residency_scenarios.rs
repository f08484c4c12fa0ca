//! Floor switching, budget eviction and stale preload cancellation

use std::sync::Arc;

use crate::config::{LoadConfig, SceneRecord};
use crate::foundation::time::ManualClock;
use crate::scene::{LoadManager, LoadState, NavigationResolver, RecordingViewport, SceneGraph, SceneId};

#[cfg(test)]
mod tests {
    use super::*;

    fn four_scene_graph() -> Arc<SceneGraph> {
        Arc::new(
            SceneGraph::build(vec![
                SceneRecord::new("A", 0, [0.0, 0.0, 0.0]),
                SceneRecord::new("B", 0, [5.0, 0.0, 0.0]),
                SceneRecord::new("C", 1, [1.0, 0.0, 0.0]),
                SceneRecord::new("D", 1, [9.0, 0.0, 0.0]),
            ])
            .unwrap(),
        )
    }

    fn setup(
        graph: &Arc<SceneGraph>,
        budget: usize,
        delay_ms: u64,
    ) -> (NavigationResolver, LoadManager<RecordingViewport>, ManualClock) {
        crate::foundation::logging::init_for_tests();
        let clock = ManualClock::new();
        let config = LoadConfig::new()
            .with_max_loaded_scenes(budget)
            .with_preload_delay_ms(delay_ms);
        let manager = LoadManager::new(Arc::clone(graph), config, RecordingViewport::new())
            .unwrap()
            .with_clock(clock.clone());
        (NavigationResolver::new(Arc::clone(graph)), manager, clock)
    }

    #[test]
    fn test_floor_round_trip_within_budget_of_two() {
        let graph = four_scene_graph();
        let (resolver, mut manager, clock) = setup(&graph, 2, 500);

        manager.activate("A").unwrap();
        assert_eq!(manager.active().unwrap().as_str(), "A");
        assert_eq!(manager.resident_scenes(), vec![SceneId::from("A")]);

        clock.advance_ms(100);
        let up = resolver.nearest_on_floor(Some("A"), 1).unwrap();
        assert_eq!(up.as_str(), "C");
        manager.activate(up.as_str()).unwrap();
        assert_eq!(manager.active().unwrap().as_str(), "C");
        assert_eq!(manager.state("A").unwrap(), LoadState::Loaded);
        assert_eq!(manager.resident_scenes(), vec![SceneId::from("A"), SceneId::from("C")]);
        assert_eq!(manager.stats().evictions, 0);

        clock.advance_ms(100);
        let down = resolver.nearest_on_floor(Some("C"), 0).unwrap();
        assert_eq!(down.as_str(), "A");
        manager.activate(down.as_str()).unwrap();
        assert_eq!(manager.resident_scenes(), vec![SceneId::from("A"), SceneId::from("C")]);
        assert_eq!(manager.stats().resident, 2);
        assert_eq!(manager.viewport().request_count("A"), 1);
    }

    #[test]
    fn test_budget_of_one_evicts_previous_scene() {
        let graph = four_scene_graph();
        let (_resolver, mut manager, _clock) = setup(&graph, 1, 500);

        manager.activate("A").unwrap();
        manager.activate("B").unwrap();

        assert_eq!(manager.state("A").unwrap(), LoadState::Unloaded);
        assert_eq!(manager.state("B").unwrap(), LoadState::Active);
        assert_eq!(manager.stats().resident, 1);
        assert_eq!(manager.viewport().released, vec![SceneId::from("A")]);
    }

    #[test]
    fn test_budget_of_one_never_preloads() {
        let graph = Arc::new(
            SceneGraph::build(vec![
                SceneRecord::new("S", 0, [0.0, 0.0, 0.0]).with_link("N", 0.0),
                SceneRecord::new("N", 0, [1.0, 0.0, 0.0]),
            ])
            .unwrap(),
        );
        let (_resolver, mut manager, clock) = setup(&graph, 1, 50);

        manager.activate("S").unwrap();
        clock.advance_ms(50);
        let report = manager.update();

        assert_eq!(report.dropped, vec![SceneId::from("N")]);
        assert_eq!(manager.state("N").unwrap(), LoadState::Unloaded);
        assert_eq!(manager.stats().resident, 1);
    }

    #[test]
    fn test_navigation_away_cancels_pending_preload() {
        let graph = Arc::new(
            SceneGraph::build(vec![
                SceneRecord::new("S", 0, [0.0, 0.0, 0.0]).with_link("N", 0.0),
                SceneRecord::new("N", 0, [0.0, 3.0, 0.0]),
                SceneRecord::new("M", 0, [3.0, 0.0, 0.0]),
            ])
            .unwrap(),
        );
        let (_resolver, mut manager, clock) = setup(&graph, 5, 500);

        manager.activate("S").unwrap();
        assert!(manager.is_preload_pending("N"));

        clock.advance_ms(200);
        manager.activate("M").unwrap();
        assert!(!manager.is_preload_pending("N"));

        clock.advance_ms(1_000);
        let report = manager.update();

        assert!(report.issued.is_empty());
        assert_eq!(manager.state("N").unwrap(), LoadState::Unloaded);
        assert_eq!(manager.viewport().request_count("N"), 0);
        // cancelling again is a no-op
        assert!(!manager.cancel_preload("N"));
    }

    #[test]
    fn test_shared_neighbor_preload_survives_navigation() {
        let graph = Arc::new(
            SceneGraph::build(vec![
                SceneRecord::new("S", 0, [0.0, 0.0, 0.0]).with_link("N", 0.0).with_link("M", 90.0),
                SceneRecord::new("M", 0, [3.0, 0.0, 0.0]).with_link("N", 0.0),
                SceneRecord::new("N", 0, [0.0, 3.0, 0.0]),
            ])
            .unwrap(),
        );
        let (_resolver, mut manager, clock) = setup(&graph, 5, 500);

        manager.activate("S").unwrap();
        clock.advance_ms(200);
        manager.activate("M").unwrap();

        // N is adjacent to M too, so its original schedule stands
        clock.advance_ms(300);
        let report = manager.update();
        assert_eq!(report.issued, vec![SceneId::from("N")]);
        assert_eq!(manager.state("N").unwrap(), LoadState::Preloading);
    }

    #[test]
    fn test_in_flight_neighbor_preload_is_spared() {
        let graph = Arc::new(
            SceneGraph::build(vec![
                SceneRecord::new("S", 0, [0.0, 0.0, 0.0]).with_link("N", 0.0),
                SceneRecord::new("T", 0, [1.0, 0.0, 0.0]).with_link("N", 0.0),
                SceneRecord::new("N", 0, [0.0, 1.0, 0.0]),
            ])
            .unwrap(),
        );
        let (_resolver, mut manager, _clock) = setup(&graph, 2, 0);

        manager.activate("S").unwrap();
        manager.update();
        assert_eq!(manager.state("N").unwrap(), LoadState::Preloading);

        manager.activate("T").unwrap();

        // N is preloading for T, so S is the only scene that may go
        assert_eq!(manager.state("S").unwrap(), LoadState::Unloaded);
        assert_eq!(manager.state("N").unwrap(), LoadState::Preloading);
        assert_eq!(manager.stats().resident, 2);
    }
}
