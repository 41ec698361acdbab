use super::{ApiResult, NewShape, ShapeApi};
use crate::editor::{FeatureKey, SaveOutcome, ShapeId, ToolError};
use crate::geometry::Ring;

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateItem {
    pub key: FeatureKey,
    pub id: ShapeId,
    pub ring: Ring,
}

/// One unit of network work requested by a tool controller.
#[derive(Debug)]
pub enum ApiRequest {
    Create {
        key: FeatureKey,
        shape: NewShape,
    },
    /// Batch save; `skipped` carries outcomes decided locally so they report with the batch.
    Update {
        items: Vec<UpdateItem>,
        skipped: Vec<SaveOutcome>,
    },
    Delete {
        key: FeatureKey,
        id: ShapeId,
    },
    Count,
    DeleteAll,
    /// Removes a shape whose local feature vanished before its create completed.
    DeleteOrphan {
        id: ShapeId,
    },
}

#[derive(Debug)]
pub enum ApiCompletion {
    Created {
        key: FeatureKey,
        result: ApiResult<ShapeId>,
    },
    Updated {
        outcomes: Vec<SaveOutcome>,
    },
    Deleted {
        key: FeatureKey,
        result: ApiResult<()>,
    },
    Counted {
        result: ApiResult<u64>,
    },
    ClearedAll {
        result: ApiResult<()>,
    },
    OrphanDeleted {
        id: ShapeId,
        result: ApiResult<()>,
    },
}

impl ApiRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Count => "count",
            Self::DeleteAll => "delete all",
            Self::DeleteOrphan { .. } => "delete orphan",
        }
    }

    /// Runs the request to completion. Batch updates continue past individual failures.
    pub fn execute(self, api: &dyn ShapeApi) -> ApiCompletion {
        match self {
            Self::Create { key, shape } => ApiCompletion::Created {
                key,
                result: api.create_shape(&shape),
            },
            Self::Update { items, skipped } => {
                let mut outcomes = Vec::with_capacity(items.len() + skipped.len());
                for item in items {
                    let result = api.update_shape(&item.id, &item.ring);
                    if let Err(err) = &result {
                        tracing::warn!(id = %item.id, %err, "shape update failed; continuing batch");
                    }
                    outcomes.push(SaveOutcome {
                        key: item.key,
                        id: Some(item.id),
                        ring: Some(item.ring),
                        result: result.map_err(ToolError::from),
                    });
                }
                outcomes.extend(skipped);
                ApiCompletion::Updated { outcomes }
            }
            Self::Delete { key, id } => ApiCompletion::Deleted {
                key,
                result: api.delete_shape(&id),
            },
            Self::Count => ApiCompletion::Counted {
                result: api.count_shapes(),
            },
            Self::DeleteAll => ApiCompletion::ClearedAll {
                result: api.delete_all_shapes(),
            },
            Self::DeleteOrphan { id } => {
                let result = api.delete_shape(&id);
                ApiCompletion::OrphanDeleted { id, result }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{ApiCall, MockApi};
    use crate::api::ShapeRecord;
    use crate::editor::{FeatureKey, ShapeKind, WorkingSet};
    use crate::geometry::Coordinate;

    fn square(origin: f64) -> Ring {
        Ring::rectangle(
            Coordinate::new(origin, origin),
            Coordinate::new(origin + 1.0, origin + 1.0),
        )
        .unwrap()
    }

    fn keys(count: usize) -> Vec<FeatureKey> {
        let mut live = WorkingSet::new();
        (0..count)
            .map(|_| live.insert(ShapeKind::Polygon, square(0.0)))
            .collect()
    }

    #[test]
    fn batch_update_continues_after_a_failed_item() {
        let api = MockApi::with_shapes(vec![
            ShapeRecord::new(ShapeId::new("a"), ShapeKind::Polygon, &square(0.0)),
            ShapeRecord::new(ShapeId::new("b"), ShapeKind::Polygon, &square(2.0)),
            ShapeRecord::new(ShapeId::new("c"), ShapeKind::Polygon, &square(4.0)),
        ]);
        api.fail_update(ShapeId::new("b"));
        let keys = keys(3);
        let items = ["a", "b", "c"]
            .iter()
            .zip(&keys)
            .map(|(id, key)| UpdateItem {
                key: *key,
                id: ShapeId::new(*id),
                ring: square(9.0),
            })
            .collect();

        let completion = ApiRequest::Update {
            items,
            skipped: Vec::new(),
        }
        .execute(&api);

        let ApiCompletion::Updated { outcomes } = completion else {
            panic!("expected update completion");
        };
        let ok: Vec<bool> = outcomes.iter().map(|outcome| outcome.result.is_ok()).collect();
        assert_eq!(ok, vec![true, false, true]);
        assert_eq!(
            api.calls(),
            vec![
                ApiCall::Update(ShapeId::new("a")),
                ApiCall::Update(ShapeId::new("b")),
                ApiCall::Update(ShapeId::new("c")),
            ]
        );
    }

    #[test]
    fn skipped_outcomes_travel_with_the_batch() {
        let api = MockApi::new();
        let keys = keys(1);
        let completion = ApiRequest::Update {
            items: Vec::new(),
            skipped: vec![SaveOutcome {
                key: keys[0],
                id: None,
                ring: None,
                result: Err(ToolError::NotPersisted(keys[0])),
            }],
        }
        .execute(&api);

        let ApiCompletion::Updated { outcomes } = completion else {
            panic!("expected update completion");
        };
        assert_eq!(outcomes.len(), 1);
        assert!(api.calls().is_empty());
    }
}
