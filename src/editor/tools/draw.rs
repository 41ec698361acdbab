use super::{ensure_active, ToolContext, ToolController, ToolError, ToolResult};
use crate::api::{ApiResult, ApiRequest, NewShape};
use crate::editor::{FeatureKey, ShapeId, ShapeKind};
use crate::geometry::{Coordinate, Ring, RingError};
use crate::notification::ToastKind;
use crate::state::ToolKind;

/// How a create completion was folded back into the working set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Saved(ShapeId),
    Failed,
    /// The feature disappeared while its create was in flight; the remote copy is stale.
    Orphaned(ShapeId),
    Dropped,
}

/// Rectangle and polygon drawing: one drawn shape becomes one create request.
#[derive(Debug)]
pub struct DrawController {
    shape: ShapeKind,
    active: bool,
    in_flight: Option<FeatureKey>,
    user_id: Option<String>,
}

impl DrawController {
    pub fn new(shape: ShapeKind, user_id: Option<String>) -> Self {
        Self {
            shape,
            active: false,
            in_flight: None,
            user_id,
        }
    }

    pub fn rectangle(user_id: Option<String>) -> Self {
        Self::new(ShapeKind::Rectangle, user_id)
    }

    pub fn polygon(user_id: Option<String>) -> Self {
        Self::new(ShapeKind::Polygon, user_id)
    }

    pub fn in_flight(&self) -> Option<FeatureKey> {
        self.in_flight
    }

    pub fn complete_rectangle(
        &mut self,
        ctx: &mut ToolContext<'_>,
        start: Coordinate,
        end: Coordinate,
    ) -> ToolResult<ApiRequest> {
        self.complete(ctx, Ring::rectangle(start, end))
    }

    pub fn complete_polygon(
        &mut self,
        ctx: &mut ToolContext<'_>,
        vertices: &[Coordinate],
    ) -> ToolResult<ApiRequest> {
        self.complete(ctx, Ring::polygon(vertices))
    }

    /// Adds the drawn feature without an id and builds its create request.
    fn complete(
        &mut self,
        ctx: &mut ToolContext<'_>,
        ring: Result<Ring, RingError>,
    ) -> ToolResult<ApiRequest> {
        ensure_active(self)?;
        if let Some(key) = self.in_flight {
            tracing::debug!(%key, "draw completed while previous create is in flight");
            ctx.toast("Still saving the previous shape", ToastKind::Warning);
            return Err(ToolError::SaveInFlight);
        }
        let ring = ring.map_err(|err| {
            ctx.toast(format!("Shape not drawn: {err}"), ToastKind::Warning);
            ToolError::from(err)
        })?;

        let key = ctx.live.insert(self.shape, ring.clone());
        self.in_flight = Some(key);
        ctx.render(None);
        tracing::debug!(%key, kind = self.shape.label(), points = ring.len(), "shape drawn");

        Ok(ApiRequest::Create {
            key,
            shape: NewShape {
                kind: self.shape,
                ring,
                user_id: self.user_id.clone(),
            },
        })
    }

    pub fn on_created(
        &mut self,
        ctx: &mut ToolContext<'_>,
        key: FeatureKey,
        result: ApiResult<ShapeId>,
        unaccepted: &[FeatureKey],
    ) -> CreateOutcome {
        if self.in_flight == Some(key) {
            self.in_flight = None;
        }

        match result {
            Ok(id) if !ctx.live.contains(key) => {
                tracing::warn!(%key, %id, "created shape no longer on the map");
                CreateOutcome::Orphaned(id)
            }
            Ok(id) => {
                if !ctx.live.assign_id(key, id.clone()) {
                    return CreateOutcome::Dropped;
                }
                ctx.resnapshot(unaccepted);
                ctx.render(None);
                ctx.toast(
                    format!("{} saved", capitalized(self.shape.label())),
                    ToastKind::Success,
                );
                CreateOutcome::Saved(id)
            }
            Err(err) => {
                tracing::warn!(%key, %err, "create failed; keeping unsaved feature");
                if ctx.live.contains(key) {
                    ctx.render(None);
                }
                ctx.toast(
                    format!("Failed to save {}", self.shape.label()),
                    ToastKind::Error,
                );
                CreateOutcome::Failed
            }
        }
    }
}

impl ToolController for DrawController {
    fn kind(&self) -> ToolKind {
        match self.shape {
            ShapeKind::Rectangle => ToolKind::Rectangle,
            ShapeKind::Polygon => ToolKind::Polygon,
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
