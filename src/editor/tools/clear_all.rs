use super::{ToolContext, ToolController};
use crate::api::{ApiRequest, ApiResult};
use crate::editor::snapshot;
use crate::notification::{ConfirmAction, ToastKind};
use crate::state::ToolKind;

/// Where the clear-all flow stands after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearAllStep {
    AwaitingConfirm,
    Finished,
}

/// Deletes every shape after a count pre-check and a confirmation.
#[derive(Debug, Default)]
pub struct ClearAllController {
    active: bool,
}

impl ClearAllController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> ApiRequest {
        ApiRequest::Count
    }

    pub fn on_counted(&mut self, ctx: &mut ToolContext<'_>, result: ApiResult<u64>) -> ClearAllStep {
        match result {
            Ok(0) => {
                ctx.toast("No shapes to clear", ToastKind::Info);
                ClearAllStep::Finished
            }
            Ok(count) => {
                let noun = if count == 1 { "shape" } else { "shapes" };
                match ctx
                    .notifier
                    .show_confirm(format!("Delete all {count} {noun}?"), ConfirmAction::DeleteAll)
                {
                    Ok(()) => ClearAllStep::AwaitingConfirm,
                    Err(err) => {
                        tracing::warn!(%err, "clear all could not prompt");
                        ClearAllStep::Finished
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%err, "shape count failed");
                ctx.toast("Could not check existing shapes", ToastKind::Error);
                ClearAllStep::Finished
            }
        }
    }

    pub fn confirm(&self) -> ApiRequest {
        ApiRequest::DeleteAll
    }

    pub fn reject(&mut self, ctx: &mut ToolContext<'_>) -> ClearAllStep {
        ctx.toast("Clear all canceled", ToastKind::Info);
        ClearAllStep::Finished
    }

    pub fn on_cleared(&mut self, ctx: &mut ToolContext<'_>, result: ApiResult<()>) -> ClearAllStep {
        match result {
            Ok(()) => {
                ctx.live.clear();
                *ctx.baseline = snapshot(ctx.live);
                ctx.render(None);
                ctx.toast("All shapes deleted", ToastKind::Success);
            }
            Err(err) => {
                tracing::warn!(%err, "delete all failed");
                ctx.toast("Failed to delete all shapes", ToastKind::Error);
            }
        }
        ClearAllStep::Finished
    }
}

impl ToolController for ClearAllController {
    fn kind(&self) -> ToolKind {
        ToolKind::ClearAll
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
