//! Shapes being edited over the map and the live working set that renders them.

pub mod baseline;
pub mod tools;

use std::fmt;

use crate::geometry::{Coordinate, Ring};
use serde::{Deserialize, Serialize};

pub use baseline::{restore, rings_equal, snapshot, Baseline};
pub use tools::{
    ClearAllController, ClearAllStep, ClearController, CreateOutcome, DrawController,
    EditController, SaveOutcome, SaveReport, ToolContext, ToolController, ToolError, ToolResult,
};

/// Local reference identity of a feature, stable for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureKey(u64);

impl FeatureKey {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier assigned by the persistence backend on the first successful create.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Polygon,
}

impl ShapeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
        }
    }

    /// Case-insensitive inverse of [`ShapeKind::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Rectangle, Self::Polygon]
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Display-only styling, derived at render time and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureStyle {
    Normal,
    Hovered,
    Unsaved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub key: FeatureKey,
    pub id: Option<ShapeId>,
    pub kind: ShapeKind,
    pub ring: Ring,
}

impl Feature {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn style(&self, hovered: Option<FeatureKey>) -> FeatureStyle {
        if hovered == Some(self.key) {
            FeatureStyle::Hovered
        } else if self.id.is_none() {
            FeatureStyle::Unsaved
        } else {
            FeatureStyle::Normal
        }
    }
}

/// Ordered, mutable collection of the features currently rendered.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    features: Vec<Feature>,
    next_key: u64,
}

impl Default for WorkingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkingSet {
    pub const fn new() -> Self {
        Self {
            features: Vec::new(),
            next_key: 1,
        }
    }

    fn allocate_key(&mut self) -> FeatureKey {
        let key = FeatureKey(self.next_key);
        self.next_key = self.next_key.saturating_add(1);
        key
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn insert(&mut self, kind: ShapeKind, ring: Ring) -> FeatureKey {
        let key = self.allocate_key();
        self.features.push(Feature {
            key,
            id: None,
            kind,
            ring,
        });
        key
    }

    pub fn insert_persisted(&mut self, id: ShapeId, kind: ShapeKind, ring: Ring) -> FeatureKey {
        if let Some(existing) = self.find_by_id(&id) {
            tracing::warn!(%id, key = %existing.key, "duplicate shape id; keeping first copy");
            return existing.key;
        }
        let key = self.allocate_key();
        self.features.push(Feature {
            key,
            id: Some(id),
            kind,
            ring,
        });
        key
    }

    /// Re-adds a feature under its existing key, as restored from a baseline.
    pub(crate) fn push_restored(&mut self, feature: Feature) {
        self.next_key = self.next_key.max(feature.key.0.saturating_add(1));
        self.features.push(feature);
    }

    pub fn get(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.key == key)
    }

    pub fn contains(&self, key: FeatureKey) -> bool {
        self.get(key).is_some()
    }

    pub fn find_by_id(&self, id: &ShapeId) -> Option<&Feature> {
        self.features
            .iter()
            .find(|feature| feature.id.as_ref() == Some(id))
    }

    /// Records the backend id of a feature; refuses when another feature already owns it.
    pub fn assign_id(&mut self, key: FeatureKey, id: ShapeId) -> bool {
        if self
            .find_by_id(&id)
            .is_some_and(|owner| owner.key != key)
        {
            tracing::warn!(%id, %key, "shape id already assigned to another feature");
            return false;
        }
        match self.features.iter_mut().find(|feature| feature.key == key) {
            Some(feature) => {
                feature.id = Some(id);
                true
            }
            None => false,
        }
    }

    pub fn replace_ring(&mut self, key: FeatureKey, ring: Ring) -> bool {
        match self.features.iter_mut().find(|feature| feature.key == key) {
            Some(feature) => {
                feature.ring = ring;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: FeatureKey) -> Option<Feature> {
        let index = self.features.iter().position(|feature| feature.key == key)?;
        Some(self.features.remove(index))
    }

    pub fn clear(&mut self) {
        self.features.clear();
    }

    /// Topmost feature under `point`; later features draw above earlier ones.
    pub fn hit_test(&self, point: Coordinate) -> Option<FeatureKey> {
        self.features
            .iter()
            .rev()
            .find(|feature| feature.ring.contains(point))
            .map(|feature| feature.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(origin: f64, size: f64) -> Ring {
        Ring::rectangle(
            Coordinate::new(origin, origin),
            Coordinate::new(origin + size, origin + size),
        )
        .unwrap()
    }

    #[test]
    fn insert_allocates_increasing_keys_without_ids() {
        let mut live = WorkingSet::new();
        let first = live.insert(ShapeKind::Rectangle, square(0.0, 1.0));
        let second = live.insert(ShapeKind::Polygon, square(5.0, 1.0));

        assert!(first < second);
        assert_eq!(live.len(), 2);
        assert!(live.features().iter().all(|feature| !feature.is_persisted()));
    }

    #[test]
    fn assign_id_refuses_ids_owned_by_other_features() {
        let mut live = WorkingSet::new();
        let persisted = live.insert_persisted(ShapeId::new("a"), ShapeKind::Polygon, square(0.0, 1.0));
        let pending = live.insert(ShapeKind::Polygon, square(5.0, 1.0));

        assert!(!live.assign_id(pending, ShapeId::new("a")));
        assert!(live.assign_id(pending, ShapeId::new("b")));
        assert_eq!(live.get(persisted).unwrap().id, Some(ShapeId::new("a")));
        assert_eq!(live.get(pending).unwrap().id, Some(ShapeId::new("b")));
    }

    #[test]
    fn insert_persisted_ignores_duplicate_ids() {
        let mut live = WorkingSet::new();
        let first = live.insert_persisted(ShapeId::new("a"), ShapeKind::Polygon, square(0.0, 1.0));
        let again = live.insert_persisted(ShapeId::new("a"), ShapeKind::Polygon, square(9.0, 1.0));

        assert_eq!(first, again);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn hit_test_prefers_topmost_feature() {
        let mut live = WorkingSet::new();
        let below = live.insert(ShapeKind::Rectangle, square(0.0, 10.0));
        let above = live.insert(ShapeKind::Rectangle, square(2.0, 2.0));

        assert_eq!(live.hit_test(Coordinate::new(3.0, 3.0)), Some(above));
        assert_eq!(live.hit_test(Coordinate::new(8.0, 8.0)), Some(below));
        assert_eq!(live.hit_test(Coordinate::new(20.0, 20.0)), None);
    }

    #[test]
    fn style_marks_hover_before_unsaved() {
        let mut live = WorkingSet::new();
        let key = live.insert(ShapeKind::Polygon, square(0.0, 1.0));
        let feature = live.get(key).unwrap();

        assert_eq!(feature.style(None), FeatureStyle::Unsaved);
        assert_eq!(feature.style(Some(key)), FeatureStyle::Hovered);
    }

    #[test]
    fn remove_returns_feature_and_keeps_order() {
        let mut live = WorkingSet::new();
        let a = live.insert(ShapeKind::Polygon, square(0.0, 1.0));
        let b = live.insert(ShapeKind::Polygon, square(2.0, 1.0));
        let c = live.insert(ShapeKind::Polygon, square(4.0, 1.0));

        assert_eq!(live.remove(b).map(|feature| feature.key), Some(b));
        let keys: Vec<_> = live.features().iter().map(|feature| feature.key).collect();
        assert_eq!(keys, vec![a, c]);
        assert!(live.remove(b).is_none());
    }
}
