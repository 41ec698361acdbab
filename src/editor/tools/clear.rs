use super::{ensure_active, ToolContext, ToolController, ToolResult};
use crate::api::{ApiRequest, ApiResult};
use crate::editor::FeatureKey;
use crate::geometry::Coordinate;
use crate::notification::{ConfirmAction, ToastKind};
use crate::state::ToolKind;

/// Single-shape deletion: hover highlights, click asks for confirmation.
#[derive(Debug, Default)]
pub struct ClearController {
    active: bool,
    hovered: Option<FeatureKey>,
    selected: Option<FeatureKey>,
}

impl ClearController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<FeatureKey> {
        self.hovered
    }

    pub fn selected(&self) -> Option<FeatureKey> {
        self.selected
    }

    /// Visual-only highlight of the feature under the pointer.
    pub fn hover(&mut self, ctx: &mut ToolContext<'_>, point: Coordinate) -> Option<FeatureKey> {
        if !self.active {
            return None;
        }
        let hit = ctx.live.hit_test(point);
        if hit != self.hovered {
            self.hovered = hit;
            ctx.render(hit);
        }
        hit
    }

    /// Selects the feature under `point` and raises the delete prompt for it.
    pub fn select(
        &mut self,
        ctx: &mut ToolContext<'_>,
        point: Coordinate,
    ) -> ToolResult<Option<FeatureKey>> {
        ensure_active(self)?;
        let Some(key) = ctx.live.hit_test(point) else {
            return Ok(None);
        };
        ctx.notifier
            .show_confirm("Delete this shape?", ConfirmAction::DeleteFeature(key))?;
        self.selected = Some(key);
        Ok(Some(key))
    }

    /// Accepted prompt. Persisted features need a delete request; unsaved ones are removed here.
    pub fn confirm_delete(
        &mut self,
        ctx: &mut ToolContext<'_>,
        key: FeatureKey,
        unaccepted: &[FeatureKey],
    ) -> Option<ApiRequest> {
        self.selected = None;
        let feature = ctx.live.get(key)?;
        if let Some(id) = feature.id.clone() {
            return Some(ApiRequest::Delete { key, id });
        }

        tracing::warn!(%key, "deleting never-persisted shape locally");
        ctx.live.remove(key);
        ctx.resnapshot(unaccepted);
        self.clear_hover_if(key);
        ctx.render(self.hovered);
        ctx.toast("Unsaved shape removed", ToastKind::Warning);
        None
    }

    pub fn reject_delete(&mut self, ctx: &mut ToolContext<'_>) {
        self.selected = None;
        ctx.toast("Deletion canceled", ToastKind::Info);
    }

    pub fn on_deleted(
        &mut self,
        ctx: &mut ToolContext<'_>,
        key: FeatureKey,
        result: ApiResult<()>,
        unaccepted: &[FeatureKey],
    ) {
        match result {
            Ok(()) => {
                ctx.live.remove(key);
                ctx.resnapshot(unaccepted);
                self.clear_hover_if(key);
                ctx.render(self.hovered);
                ctx.toast("Shape deleted", ToastKind::Success);
            }
            Err(err) => {
                tracing::warn!(%key, %err, "delete failed; shape kept");
                ctx.toast("Failed to delete shape", ToastKind::Error);
            }
        }
    }

    fn clear_hover_if(&mut self, key: FeatureKey) {
        if self.hovered == Some(key) {
            self.hovered = None;
        }
    }
}

impl ToolController for ClearController {
    fn kind(&self) -> ToolKind {
        ToolKind::Clear
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.hovered = None;
            self.selected = None;
        }
    }

    fn deactivate(&mut self, ctx: &mut ToolContext<'_>) {
        if !self.active {
            return;
        }
        if let Some(interaction) = self.kind().interaction() {
            ctx.map.remove_interaction(interaction);
        }
        let had_hover = self.hovered.is_some();
        self.set_active(false);
        if had_hover {
            ctx.render(None);
        }
    }
}
