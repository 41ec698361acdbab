mod clear;
mod clear_all;
mod draw;
mod edit;

use std::time::Instant;

use crate::api::ApiError;
use crate::geometry::RingError;
use crate::map::MapSurface;
use crate::notification::{Notifier, ToastKind};
use crate::state::{StateError, ToolKind};
use thiserror::Error;

use super::{Baseline, FeatureKey, WorkingSet};

pub use clear::ClearController;
pub use clear_all::{ClearAllController, ClearAllStep};
pub use draw::{CreateOutcome, DrawController};
pub use edit::{EditController, SaveOutcome, SaveReport};

pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0:?} tool is not active")]
    NotActive(ToolKind),
    #[error("previous shape is still being saved")]
    SaveInFlight,
    #[error("invalid geometry: {0}")]
    Geometry(#[from] RingError),
    #[error("feature {0} not found")]
    FeatureNotFound(FeatureKey),
    #[error("feature {0} has not been persisted yet")]
    NotPersisted(FeatureKey),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Session state a controller may touch while handling one input or completion.
pub struct ToolContext<'a> {
    pub live: &'a mut WorkingSet,
    pub baseline: &'a mut Baseline,
    pub notifier: &'a mut Notifier,
    pub map: &'a mut dyn MapSurface,
    pub now: Instant,
}

impl ToolContext<'_> {
    pub fn toast(&mut self, text: impl Into<String>, kind: ToastKind) {
        self.notifier.show_toast(text, kind, self.now);
    }

    pub fn render(&mut self, hovered: Option<FeatureKey>) {
        self.map.render(self.live.features(), hovered);
    }

    /// Replaces the baseline from the live set, keeping accepted geometry for `unaccepted`.
    pub fn resnapshot(&mut self, unaccepted: &[FeatureKey]) {
        *self.baseline = self.baseline.resnapshot(self.live, unaccepted);
    }
}

/// Shared activation contract: at most one controller is active at a time.
pub trait ToolController {
    fn kind(&self) -> ToolKind;

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    fn activate(&mut self, ctx: &mut ToolContext<'_>) {
        if self.is_active() {
            tracing::debug!(tool = ?self.kind(), "tool already active");
            return;
        }
        if let Some(interaction) = self.kind().interaction() {
            ctx.map.add_interaction(interaction);
        }
        self.set_active(true);
    }

    fn deactivate(&mut self, ctx: &mut ToolContext<'_>) {
        if !self.is_active() {
            return;
        }
        if let Some(interaction) = self.kind().interaction() {
            ctx.map.remove_interaction(interaction);
        }
        self.set_active(false);
    }
}

fn ensure_active(controller: &dyn ToolController) -> ToolResult<()> {
    if controller.is_active() {
        Ok(())
    } else {
        Err(ToolError::NotActive(controller.kind()))
    }
}
