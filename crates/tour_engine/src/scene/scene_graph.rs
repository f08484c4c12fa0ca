//! Scene graph
//!
//! Immutable index of every panorama in the tour and the directed links
//! between them. Built once from the tour file; read-only afterwards.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{SceneRecord, ViewParams};
use crate::error::{TourError, TourResult};
use crate::foundation::math::{utils, Vec3};

/// Unique scene identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Create an id from any string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Directed edge from one scene to another (a hotspot)
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Scene the link leads to
    pub target: SceneId,
    /// Compass bearing of the hotspot, normalized to `[0, 360)`
    pub bearing: f32,
    /// Advisory walking distance for display
    pub distance: Option<f32>,
}

/// One panorama node
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Unique id
    pub id: SceneId,
    /// Floor index, 0 is ground level
    pub floor: i32,
    /// Position used for nearest-scene resolution
    pub position: Vec3,
    /// Optional display label
    pub title: Option<String>,
    /// Panorama source for the viewport
    pub panorama: String,
    /// Initial orientation for the viewport
    pub initial_view: ViewParams,
    /// Outgoing links in display order
    pub links: Vec<Link>,
}

impl Scene {
    /// Whether this scene has a link leading to `target`
    pub fn links_to(&self, target: &str) -> bool {
        self.links.iter().any(|link| link.target.as_str() == target)
    }

    /// Whether `link` is one of this scene's own links
    pub fn owns_link(&self, link: &Link) -> bool {
        self.links.iter().any(|own| own == link)
    }

    /// Label for logs and UI: the title when present, the id otherwise
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

impl From<SceneRecord> for Scene {
    fn from(record: SceneRecord) -> Self {
        let [x, y, z] = record.position;
        Self {
            id: SceneId::from(record.id),
            floor: record.floor,
            position: Vec3::new(x, y, z),
            title: record.title,
            panorama: record.panorama,
            initial_view: record.initial_view,
            links: record
                .links
                .into_iter()
                .map(|link| Link {
                    target: SceneId::from(link.target),
                    bearing: utils::normalize_bearing(link.bearing),
                    distance: link.distance,
                })
                .collect(),
        }
    }
}

/// Reject NaN or infinite coordinates, bearings and distances
fn check_finite(scene: &Scene) -> TourResult<()> {
    if !scene.position.iter().all(|c| c.is_finite()) {
        return Err(TourError::Configuration(format!(
            "scene '{}' has a non-finite position",
            scene.id
        )));
    }
    for link in &scene.links {
        if !link.bearing.is_finite() || link.distance.is_some_and(|d| !d.is_finite()) {
            return Err(TourError::Configuration(format!(
                "link from '{}' to '{}' has a non-finite bearing or distance",
                scene.id, link.target
            )));
        }
    }
    Ok(())
}

/// Read-only index of scenes keyed by id
#[derive(Debug, Clone)]
pub struct SceneGraph {
    /// Scenes in declaration order
    scenes: Vec<Scene>,
    /// Id → index into `scenes`
    by_id: HashMap<SceneId, usize>,
    /// Floor → indices into `scenes`, each list in declaration order
    by_floor: BTreeMap<i32, Vec<usize>>,
}

impl SceneGraph {
    /// Build the graph from scene records
    ///
    /// Fails with [`TourError::Configuration`] when the record set is empty,
    /// an id is declared twice, a number is not finite, a link points at
    /// itself, or a link target is missing.
    pub fn build(records: impl IntoIterator<Item = SceneRecord>) -> TourResult<Self> {
        let scenes: Vec<Scene> = records.into_iter().map(Scene::from).collect();
        if scenes.is_empty() {
            return Err(TourError::Configuration("tour has no scenes".to_string()));
        }

        let mut by_id = HashMap::with_capacity(scenes.len());
        let mut by_floor: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (index, scene) in scenes.iter().enumerate() {
            if by_id.insert(scene.id.clone(), index).is_some() {
                return Err(TourError::Configuration(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
            by_floor.entry(scene.floor).or_default().push(index);
            check_finite(scene)?;
        }

        for scene in &scenes {
            let mut seen = HashSet::new();
            for link in &scene.links {
                if link.target == scene.id {
                    return Err(TourError::Configuration(format!(
                        "scene '{}' links to itself",
                        scene.id
                    )));
                }
                if !by_id.contains_key(&link.target) {
                    return Err(TourError::Configuration(format!(
                        "scene '{}' links to unknown scene '{}'",
                        scene.id, link.target
                    )));
                }
                if !seen.insert(&link.target) {
                    log::warn!("Scene '{}' declares more than one link to '{}'", scene.id, link.target);
                }
            }
        }

        log::info!(
            "Built scene graph: {} scenes across {} floors",
            scenes.len(),
            by_floor.len()
        );
        Ok(Self {
            scenes,
            by_id,
            by_floor,
        })
    }

    /// Look up a scene by id
    pub fn get(&self, id: &str) -> TourResult<&Scene> {
        self.by_id
            .get(id)
            .map(|&index| &self.scenes[index])
            .ok_or_else(|| TourError::NotFound(SceneId::from(id)))
    }

    /// Whether a scene with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Scenes on `floor` in declaration order
    pub fn scenes_on_floor(&self, floor: i32) -> impl Iterator<Item = &Scene> + '_ {
        self.by_floor
            .get(&floor)
            .into_iter()
            .flatten()
            .map(|&index| &self.scenes[index])
    }

    /// Distinct floors, ascending
    pub fn floors(&self) -> Vec<i32> {
        self.by_floor.keys().copied().collect()
    }

    /// Link targets of a scene, in link order
    pub fn neighbors(&self, id: &str) -> TourResult<impl Iterator<Item = &SceneId> + '_> {
        Ok(self.get(id)?.links.iter().map(|link| &link.target))
    }

    /// All scenes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Scene> + '_ {
        self.scenes.iter()
    }

    /// Number of scenes
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Always false for a built graph; present for API symmetry
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<SceneRecord> {
        vec![
            SceneRecord::new("lobby", 0, [0.0, 0.0, 0.0]).with_link("hall", 90.0),
            SceneRecord::new("cellar", -1, [0.0, 0.0, -3.0]),
            SceneRecord::new("hall", 0, [5.0, 0.0, 0.0]).with_link("lobby", -90.0),
            SceneRecord::new("office", 2, [1.0, 1.0, 6.0]),
            SceneRecord::new("kitchen", 0, [2.0, 4.0, 0.0]),
        ]
    }

    #[test]
    fn test_build_and_lookup() {
        let graph = SceneGraph::build(records()).unwrap();

        assert_eq!(graph.len(), 5);
        assert_eq!(graph.get("hall").unwrap().floor, 0);
        assert!(graph.contains("cellar"));
        assert!(matches!(graph.get("attic"), Err(TourError::NotFound(id)) if id.as_str() == "attic"));
    }

    #[test]
    fn test_every_link_target_resolves() {
        let graph = SceneGraph::build(records()).unwrap();
        for scene in graph.iter() {
            for link in &scene.links {
                assert!(graph.get(link.target.as_str()).is_ok());
            }
        }
    }

    #[test]
    fn test_scenes_on_floor_keeps_declaration_order() {
        let graph = SceneGraph::build(records()).unwrap();
        let ids: Vec<&str> = graph.scenes_on_floor(0).map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["lobby", "hall", "kitchen"]);
        assert_eq!(graph.scenes_on_floor(7).count(), 0);
    }

    #[test]
    fn test_floors_sorted_ascending() {
        let graph = SceneGraph::build(records()).unwrap();
        assert_eq!(graph.floors(), vec![-1, 0, 2]);
    }

    #[test]
    fn test_bearing_normalized() {
        let graph = SceneGraph::build(records()).unwrap();
        assert_eq!(graph.get("hall").unwrap().links[0].bearing, 270.0);
    }

    #[test]
    fn test_empty_records_rejected() {
        let result = SceneGraph::build(Vec::new());
        assert!(matches!(result, Err(TourError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut input = records();
        input.push(SceneRecord::new("hall", 3, [0.0, 0.0, 0.0]));
        assert!(matches!(SceneGraph::build(input), Err(TourError::Configuration(_))));
    }

    #[test]
    fn test_dangling_link_rejected() {
        let mut input = records();
        input.push(SceneRecord::new("roof", 3, [0.0, 0.0, 9.0]).with_link("helipad", 0.0));
        let err = SceneGraph::build(input).unwrap_err();
        assert!(matches!(err, TourError::Configuration(ref msg) if msg.contains("helipad")));
    }

    #[test]
    fn test_self_link_rejected() {
        let input = vec![SceneRecord::new("loop", 0, [0.0, 0.0, 0.0]).with_link("loop", 0.0)];
        assert!(matches!(SceneGraph::build(input), Err(TourError::Configuration(_))));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let with_link = |bearing: f32| {
            vec![
                SceneRecord::new("a", 0, [0.0, 0.0, 0.0]).with_link("b", bearing),
                SceneRecord::new("b", 0, [1.0, 0.0, 0.0]),
            ]
        };
        let err = SceneGraph::build(with_link(f32::NAN)).unwrap_err();
        assert!(matches!(err, TourError::Configuration(ref msg) if msg.contains("bearing")));
        assert!(SceneGraph::build(with_link(f32::INFINITY)).is_err());

        let mut far = with_link(0.0);
        far[0].links[0].distance = Some(f32::NAN);
        assert!(matches!(SceneGraph::build(far), Err(TourError::Configuration(_))));

        let lost = vec![SceneRecord::new("void", 0, [f32::NAN, 0.0, 0.0])];
        let err = SceneGraph::build(lost).unwrap_err();
        assert!(matches!(err, TourError::Configuration(ref msg) if msg.contains("position")));
    }

    #[test]
    fn test_links_are_directed() {
        let input = vec![
            SceneRecord::new("a", 0, [0.0, 0.0, 0.0]).with_link("b", 0.0),
            SceneRecord::new("b", 0, [1.0, 0.0, 0.0]),
        ];
        let graph = SceneGraph::build(input).unwrap();

        assert!(graph.get("a").unwrap().links_to("b"));
        assert!(!graph.get("b").unwrap().links_to("a"));
        assert_eq!(graph.neighbors("b").unwrap().count(), 0);
    }
}
