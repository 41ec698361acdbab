use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

use super::{ApiError, ApiResult, BoundsSource, NewShape, ShapeApi, ShapeRecord};
use crate::editor::{ShapeId, ShapeKind};
use crate::geometry::{LonLatBounds, Ring};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    List,
    Count,
    Create(ShapeKind),
    Update(ShapeId),
    Delete(ShapeId),
    DeleteAll,
}

#[derive(Debug, Default)]
struct MockState {
    shapes: Vec<ShapeRecord>,
    next_id: u64,
    create_results: VecDeque<ApiResult<ShapeId>>,
    failing_updates: HashSet<ShapeId>,
    reject_deletes: bool,
    reject_delete_all: bool,
    fail_list: bool,
    calls: Vec<ApiCall>,
}

/// In-memory backend with scriptable failures and a call log.
#[derive(Debug, Default)]
pub(crate) struct MockApi {
    state: Mutex<MockState>,
    bounds: Option<LonLatBounds>,
}

impl MockApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_shapes(records: Vec<ShapeRecord>) -> Self {
        let api = Self::new();
        api.lock().shapes = records;
        api
    }

    pub(crate) fn with_bounds(mut self, bounds: LonLatBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push_create_result(&self, result: ApiResult<ShapeId>) {
        self.lock().create_results.push_back(result);
    }

    pub(crate) fn fail_update(&self, id: ShapeId) {
        self.lock().failing_updates.insert(id);
    }

    pub(crate) fn reject_deletes(&self) {
        self.lock().reject_deletes = true;
    }

    pub(crate) fn reject_delete_all(&self) {
        self.lock().reject_delete_all = true;
    }

    pub(crate) fn fail_list(&self) {
        self.lock().fail_list = true;
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub(crate) fn stored(&self) -> Vec<ShapeRecord> {
        self.lock().shapes.clone()
    }
}

fn rejected(operation: &'static str) -> ApiError {
    ApiError::Rejected {
        operation,
        message: None,
    }
}

impl ShapeApi for MockApi {
    fn list_shapes(&self) -> ApiResult<Vec<ShapeRecord>> {
        let mut state = self.lock();
        state.calls.push(ApiCall::List);
        if state.fail_list {
            return Err(ApiError::Status {
                endpoint: "/shapes".to_string(),
                status: 500,
            });
        }
        Ok(state.shapes.clone())
    }

    fn count_shapes(&self) -> ApiResult<u64> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Count);
        Ok(state.shapes.len() as u64)
    }

    fn create_shape(&self, shape: &NewShape) -> ApiResult<ShapeId> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Create(shape.kind));
        let result = match state.create_results.pop_front() {
            Some(result) => result,
            None => {
                state.next_id += 1;
                Ok(ShapeId::new(format!("shape-{}", state.next_id)))
            }
        };
        if let Ok(id) = &result {
            let record = ShapeRecord::new(id.clone(), shape.kind, &shape.ring);
            state.shapes.push(record);
        }
        result
    }

    fn update_shape(&self, id: &ShapeId, ring: &Ring) -> ApiResult<()> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Update(id.clone()));
        if state.failing_updates.contains(id) {
            return Err(rejected("update"));
        }
        let Some(record) = state.shapes.iter_mut().find(|record| &record.id == id) else {
            return Err(rejected("update"));
        };
        record.coordinates = serde_json::to_value(ring).unwrap_or_default();
        Ok(())
    }

    fn delete_shape(&self, id: &ShapeId) -> ApiResult<()> {
        let mut state = self.lock();
        state.calls.push(ApiCall::Delete(id.clone()));
        if state.reject_deletes {
            return Err(rejected("delete"));
        }
        state.shapes.retain(|record| &record.id != id);
        Ok(())
    }

    fn delete_all_shapes(&self) -> ApiResult<()> {
        let mut state = self.lock();
        state.calls.push(ApiCall::DeleteAll);
        if state.reject_delete_all {
            return Err(rejected("delete all"));
        }
        state.shapes.clear();
        Ok(())
    }
}

impl BoundsSource for MockApi {
    fn imagery_bounds(&self) -> ApiResult<Option<LonLatBounds>> {
        Ok(self.bounds)
    }
}
