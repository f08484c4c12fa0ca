//! Navigation resolver
//!
//! Turns a user action into the id of the next active scene. Two modes:
//! following one of the current scene's links, and switching floors by
//! picking the scene on the target floor closest to where the user stands.

use std::sync::Arc;

use super::{Link, Scene, SceneGraph, SceneId};
use crate::error::{TourError, TourResult};
use crate::foundation::math;

/// Direction for stepping between populated floors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorDirection {
    /// Next floor above
    Up,
    /// Next floor below
    Down,
}

/// Resolves navigation requests against a scene graph
#[derive(Debug, Clone)]
pub struct NavigationResolver {
    graph: Arc<SceneGraph>,
}

impl NavigationResolver {
    /// Create a resolver over `graph`
    pub fn new(graph: Arc<SceneGraph>) -> Self {
        Self { graph }
    }

    /// Graph this resolver reads from
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Target of `link`, provided `current` actually owns it
    ///
    /// A link from stale UI state (an earlier scene's hotspot) is rejected
    /// with [`TourError::InvalidLink`].
    pub fn follow_link(&self, current: &str, link: &Link) -> TourResult<SceneId> {
        let scene = self.graph.get(current)?;
        if !scene.owns_link(link) {
            return Err(TourError::InvalidLink {
                scene: scene.id.clone(),
                target: link.target.clone(),
            });
        }
        Ok(link.target.clone())
    }

    /// Target of the current scene's link at `index`
    pub fn follow_link_at(&self, current: &str, index: usize) -> TourResult<SceneId> {
        let scene = self.graph.get(current)?;
        scene
            .links
            .get(index)
            .map(|link| link.target.clone())
            .ok_or_else(|| TourError::InvalidLink {
                scene: scene.id.clone(),
                target: SceneId::new(format!("<link {index}>")),
            })
    }

    /// Scene on `floor` nearest to `current`
    ///
    /// With no current scene the first scene declared on the floor is chosen.
    /// Otherwise the candidate with the smallest Euclidean distance wins, and
    /// ties go to the earliest declared candidate. The floor only filters
    /// candidates; it is not part of the distance.
    pub fn nearest_on_floor(&self, current: Option<&str>, floor: i32) -> TourResult<SceneId> {
        let origin = current.map(|id| self.graph.get(id)).transpose()?;
        let mut candidates = self.graph.scenes_on_floor(floor);

        let Some(first) = candidates.next() else {
            return Err(TourError::EmptyFloor(floor));
        };
        let Some(origin) = origin else {
            log::debug!("No current scene, defaulting to '{}' on floor {}", first.id, floor);
            return Ok(first.id.clone());
        };

        let (nearest, nearest_distance) = candidates.fold(
            (first, math::distance(&origin.position, &first.position)),
            |(best, best_distance), candidate: &Scene| {
                let d = math::distance(&origin.position, &candidate.position);
                // strict comparison keeps the earliest declared scene on ties
                if d < best_distance {
                    (candidate, d)
                } else {
                    (best, best_distance)
                }
            },
        );

        log::debug!(
            "Nearest scene to '{}' on floor {} is '{}' ({:.2})",
            origin.id,
            floor,
            nearest.id,
            nearest_distance
        );
        Ok(nearest.id.clone())
    }

    /// Next populated floor above or below `floor`
    pub fn adjacent_floor(&self, floor: i32, direction: FloorDirection) -> Option<i32> {
        let floors = self.graph.floors();
        match direction {
            FloorDirection::Up => floors.into_iter().find(|&f| f > floor),
            FloorDirection::Down => floors.into_iter().rev().find(|&f| f < floor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneRecord;

    fn resolver() -> NavigationResolver {
        let graph = SceneGraph::build(vec![
            SceneRecord::new("A", 0, [0.0, 0.0, 0.0]).with_link("B", 90.0),
            SceneRecord::new("B", 0, [5.0, 0.0, 0.0]),
            SceneRecord::new("C", 1, [1.0, 0.0, 0.0]),
            SceneRecord::new("D", 1, [9.0, 0.0, 0.0]),
            SceneRecord::new("E", 3, [-1.0, 0.0, 0.0]),
            SceneRecord::new("F", 3, [1.0, 0.0, 0.0]),
            SceneRecord::new("G", 3, [0.0, 0.0, 1.0]),
        ])
        .unwrap();
        NavigationResolver::new(Arc::new(graph))
    }

    #[test]
    fn test_follow_owned_link() {
        let resolver = resolver();
        let link = resolver.graph().get("A").unwrap().links[0].clone();
        assert_eq!(resolver.follow_link("A", &link).unwrap().as_str(), "B");
        assert_eq!(resolver.follow_link_at("A", 0).unwrap().as_str(), "B");
    }

    #[test]
    fn test_stale_link_rejected() {
        let resolver = resolver();
        let link = resolver.graph().get("A").unwrap().links[0].clone();

        assert!(matches!(
            resolver.follow_link("B", &link),
            Err(TourError::InvalidLink { .. })
        ));
        assert!(matches!(
            resolver.follow_link_at("B", 0),
            Err(TourError::InvalidLink { .. })
        ));
        assert!(matches!(resolver.follow_link("Z", &link), Err(TourError::NotFound(_))));
    }

    #[test]
    fn test_initial_selection_is_first_declared() {
        let resolver = resolver();
        assert_eq!(resolver.nearest_on_floor(None, 1).unwrap().as_str(), "C");
        assert_eq!(resolver.nearest_on_floor(None, 3).unwrap().as_str(), "E");
    }

    #[test]
    fn test_nearest_by_euclidean_distance() {
        let resolver = resolver();
        assert_eq!(resolver.nearest_on_floor(Some("A"), 1).unwrap().as_str(), "C");
        assert_eq!(resolver.nearest_on_floor(Some("D"), 0).unwrap().as_str(), "B");
        assert_eq!(resolver.nearest_on_floor(Some("C"), 0).unwrap().as_str(), "A");
    }

    #[test]
    fn test_ties_go_to_declaration_order() {
        let resolver = resolver();
        // E, F and G are all at distance 1 from A
        for _ in 0..3 {
            assert_eq!(resolver.nearest_on_floor(Some("A"), 3).unwrap().as_str(), "E");
        }
    }

    #[test]
    fn test_same_floor_request_returns_closest_including_self() {
        let resolver = resolver();
        assert_eq!(resolver.nearest_on_floor(Some("B"), 0).unwrap().as_str(), "B");
    }

    #[test]
    fn test_empty_floor_and_unknown_current() {
        let resolver = resolver();
        assert!(matches!(resolver.nearest_on_floor(Some("A"), 2), Err(TourError::EmptyFloor(2))));
        assert!(matches!(resolver.nearest_on_floor(Some("Q"), 1), Err(TourError::NotFound(_))));
    }

    #[test]
    fn test_adjacent_floor_skips_empty_levels() {
        let resolver = resolver();
        assert_eq!(resolver.adjacent_floor(1, FloorDirection::Up), Some(3));
        assert_eq!(resolver.adjacent_floor(3, FloorDirection::Down), Some(1));
        assert_eq!(resolver.adjacent_floor(3, FloorDirection::Up), None);
        assert_eq!(resolver.adjacent_floor(0, FloorDirection::Down), None);
    }
}
