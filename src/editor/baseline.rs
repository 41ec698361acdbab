use super::{Feature, FeatureKey, WorkingSet};
use crate::geometry::Ring;

/// Last state the backend is known to have accepted. Never mutated, only replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    features: Vec<Feature>,
}

impl Baseline {
    pub fn empty() -> Self {
        Self::default()
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

    pub fn get(&self, key: FeatureKey) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.key == key)
    }

    /// Snapshot of `live` in which the `unaccepted` features keep the geometry recorded here.
    ///
    /// Features listed in `unaccepted` that this baseline never saw are taken from `live`.
    pub fn resnapshot(&self, live: &WorkingSet, unaccepted: &[FeatureKey]) -> Self {
        let features = live
            .features()
            .iter()
            .map(|feature| {
                if unaccepted.contains(&feature.key) {
                    if let Some(accepted) = self.get(feature.key) {
                        return accepted.clone();
                    }
                }
                feature.clone()
            })
            .collect();
        Self { features }
    }

    /// Same baseline with `key` holding `ring`, the geometry the backend confirmed for it.
    pub fn accept(mut self, key: FeatureKey, ring: &Ring) -> Self {
        if let Some(feature) = self.features.iter_mut().find(|feature| feature.key == key) {
            feature.ring = ring.clone();
        }
        self
    }
}

pub fn snapshot(live: &WorkingSet) -> Baseline {
    Baseline {
        features: live.features().to_vec(),
    }
}

/// Replaces the whole working set with fresh copies of the baseline, keys and ids included.
pub fn restore(baseline: &Baseline, live: &mut WorkingSet) {
    live.clear();
    for feature in &baseline.features {
        live.push_restored(feature.clone());
    }
}

/// Exact point-by-point comparison, no tolerance.
pub fn rings_equal(left: &Ring, right: &Ring) -> bool {
    left.len() == right.len()
        && left
            .points()
            .iter()
            .zip(right.points())
            .all(|(a, b)| a.x == b.x && a.y == b.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{ShapeId, ShapeKind};
    use crate::geometry::Coordinate;

    fn square(origin: f64) -> Ring {
        Ring::rectangle(
            Coordinate::new(origin, origin),
            Coordinate::new(origin + 1.0, origin + 1.0),
        )
        .unwrap()
    }

    fn sample_set() -> WorkingSet {
        let mut live = WorkingSet::new();
        live.insert_persisted(ShapeId::new("1"), ShapeKind::Rectangle, square(0.0));
        live.insert(ShapeKind::Polygon, square(3.0));
        live.insert_persisted(ShapeId::new("2"), ShapeKind::Polygon, square(6.0));
        live
    }

    fn assert_same_features(live: &WorkingSet, baseline: &Baseline) {
        assert_eq!(live.len(), baseline.len());
        for (restored, original) in live.features().iter().zip(baseline.features()) {
            assert_eq!(restored.key, original.key);
            assert_eq!(restored.id, original.id);
            assert_eq!(restored.kind, original.kind);
            assert!(rings_equal(&restored.ring, &original.ring));
        }
    }

    #[test]
    fn restore_of_snapshot_reproduces_ids_rings_and_order() {
        let live = sample_set();
        let baseline = snapshot(&live);

        let mut edited = live.clone();
        let first = edited.features()[0].key;
        edited.replace_ring(first, square(40.0));
        edited.remove(edited.features()[2].key);
        edited.insert(ShapeKind::Rectangle, square(90.0));

        restore(&baseline, &mut edited);
        assert_same_features(&edited, &baseline);
    }

    #[test]
    fn snapshot_is_detached_from_later_edits() {
        let mut live = sample_set();
        let baseline = snapshot(&live);
        let first = live.features()[0].key;
        live.replace_ring(first, square(50.0));

        assert!(rings_equal(&baseline.features()[0].ring, &square(0.0)));
    }

    #[test]
    fn restored_keys_do_not_collide_with_new_inserts() {
        let live = sample_set();
        let baseline = snapshot(&live);
        let mut fresh = WorkingSet::new();
        restore(&baseline, &mut fresh);

        let key = fresh.insert(ShapeKind::Polygon, square(20.0));
        assert!(baseline.get(key).is_none());
    }

    #[test]
    fn resnapshot_keeps_accepted_geometry_for_unaccepted_features() {
        let mut live = sample_set();
        let baseline = snapshot(&live);
        let first = live.features()[0].key;
        let last = live.features()[2].key;
        live.replace_ring(first, square(10.0));
        live.replace_ring(last, square(11.0));

        let next = baseline.resnapshot(&live, &[last]);
        assert!(rings_equal(&next.get(first).unwrap().ring, &square(10.0)));
        assert!(rings_equal(&next.get(last).unwrap().ring, &square(6.0)));
    }

    #[test]
    fn accept_overrides_only_the_named_feature() {
        let live = sample_set();
        let baseline = snapshot(&live);
        let first = live.features()[0].key;
        let second = live.features()[1].key;

        let next = baseline.clone().accept(first, &square(20.0));
        assert!(rings_equal(&next.get(first).unwrap().ring, &square(20.0)));
        assert!(rings_equal(&next.get(second).unwrap().ring, &square(3.0)));
        assert!(rings_equal(&baseline.get(first).unwrap().ring, &square(0.0)));
    }

    #[test]
    fn rings_equal_requires_exact_match() {
        let a = square(0.0);
        let b = square(0.0).translated(1e-12, 0.0);
        assert!(rings_equal(&a, &a.clone()));
        assert!(!rings_equal(&a, &b));
        assert!(!rings_equal(
            &a,
            &Ring::polygon(&[
                Coordinate::new(0.0, 0.0),
                Coordinate::new(1.0, 0.0),
                Coordinate::new(1.0, 1.0),
            ])
            .unwrap()
        ));
    }
}
