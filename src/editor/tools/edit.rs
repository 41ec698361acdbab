use super::{ensure_active, ToolContext, ToolController, ToolError, ToolResult};
use crate::api::{ApiRequest, UpdateItem};
use crate::editor::{restore, rings_equal, FeatureKey, ShapeId};
use crate::geometry::Ring;
use crate::notification::ToastKind;
use crate::state::ToolKind;

#[derive(Debug)]
pub struct SaveOutcome {
    pub key: FeatureKey,
    pub id: Option<ShapeId>,
    /// Geometry sent to the backend; `None` when nothing was sent.
    pub ring: Option<Ring>,
    pub result: ToolResult<()>,
}

impl SaveOutcome {
    /// Geometry the backend now holds for this feature, if the update went through.
    pub fn accepted_ring(&self) -> Option<&Ring> {
        self.result.as_ref().ok().and(self.ring.as_ref())
    }
}

/// Per-shape results of one batch save.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub outcomes: Vec<SaveOutcome>,
}

impl SaveReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn saved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }

    pub fn failed_keys(&self) -> Vec<FeatureKey> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .map(|outcome| outcome.key)
            .collect()
    }

    pub fn summary(&self) -> (String, ToastKind) {
        let saved = self.saved();
        let total = self.total();
        if saved == total {
            let noun = if total == 1 { "shape" } else { "shapes" };
            (format!("{total} {noun} saved"), ToastKind::Success)
        } else if saved == 0 {
            ("Saving failed".to_string(), ToastKind::Error)
        } else {
            (format!("{saved} of {total} shapes saved"), ToastKind::Warning)
        }
    }
}

/// Modify mode. Tracks touched features until they are saved or discarded.
#[derive(Debug, Default)]
pub struct EditController {
    active: bool,
    pending: Vec<FeatureKey>,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[FeatureKey] {
        &self.pending
    }

    /// Applies a modify event; returns whether this was the first unsaved modification.
    pub fn modify(
        &mut self,
        ctx: &mut ToolContext<'_>,
        key: FeatureKey,
        ring: Ring,
    ) -> ToolResult<bool> {
        ensure_active(self)?;
        if !ctx.live.replace_ring(key, ring) {
            return Err(ToolError::FeatureNotFound(key));
        }
        let first = self.pending.is_empty();
        if !self.pending.contains(&key) {
            self.pending.push(key);
        }
        ctx.render(None);
        Ok(first)
    }

    pub fn translate(
        &mut self,
        ctx: &mut ToolContext<'_>,
        key: FeatureKey,
        dx: f64,
        dy: f64,
    ) -> ToolResult<bool> {
        let ring = ctx
            .live
            .get(key)
            .map(|feature| feature.ring.translated(dx, dy))
            .ok_or(ToolError::FeatureNotFound(key))?;
        self.modify(ctx, key, ring)
    }

    /// Throws away unsaved modifications by restoring the baseline.
    pub fn discard(&mut self, ctx: &mut ToolContext<'_>) {
        tracing::info!(pending = self.pending.len(), "discarding unsaved edits");
        restore(ctx.baseline, ctx.live);
        self.pending.clear();
        ctx.render(None);
    }

    /// Turns pending modifications into an update batch. Unsaved features cannot be updated
    /// and are reported as failures of the batch.
    pub fn begin_save(&mut self, ctx: &mut ToolContext<'_>) -> ApiRequest {
        let mut items = Vec::with_capacity(self.pending.len());
        let mut skipped = Vec::new();
        for key in self.pending.drain(..) {
            let Some(feature) = ctx.live.get(key) else {
                tracing::debug!(%key, "modified feature no longer exists");
                continue;
            };
            match &feature.id {
                Some(id) => items.push(UpdateItem {
                    key,
                    id: id.clone(),
                    ring: feature.ring.clone(),
                }),
                None => {
                    tracing::warn!(%key, "skipping update of shape that was never persisted");
                    skipped.push(SaveOutcome {
                        key,
                        id: None,
                        ring: None,
                        result: Err(ToolError::NotPersisted(key)),
                    });
                }
            }
        }
        tracing::debug!(updates = items.len(), skipped = skipped.len(), "saving edits");
        ApiRequest::Update { items, skipped }
    }

    /// Folds batch results back: the geometry the backend accepted enters the baseline, rejected
    /// geometry stays only in the live set.
    ///
    /// Accepted rings come from the outcome, not the live set, which may have been re-edited or
    /// discarded while the batch was in flight.
    pub fn on_saved(
        &mut self,
        ctx: &mut ToolContext<'_>,
        outcomes: Vec<SaveOutcome>,
        unaccepted: &[FeatureKey],
    ) -> SaveReport {
        let report = SaveReport { outcomes };
        // Features with newer edits, pending here or in a later batch, keep their live geometry.
        let newer = [unaccepted, self.pending.as_slice()].concat();
        let unaccepted = [report.failed_keys(), newer.clone()].concat();

        let mut next = ctx.baseline.resnapshot(ctx.live, &unaccepted);
        let mut live_changed = false;
        for outcome in &report.outcomes {
            let Some(ring) = outcome.accepted_ring() else {
                continue;
            };
            next = next.accept(outcome.key, ring);
            if !newer.contains(&outcome.key)
                && ctx.live.get(outcome.key).is_some_and(|feature| !rings_equal(&feature.ring, ring))
            {
                tracing::debug!(key = %outcome.key, "live geometry realigned with saved geometry");
                live_changed |= ctx.live.replace_ring(outcome.key, ring.clone());
            }
        }
        *ctx.baseline = next;
        if live_changed {
            ctx.render(None);
        }

        if report.total() > 0 {
            let (text, kind) = report.summary();
            ctx.toast(text, kind);
        }
        report
    }
}

impl ToolController for EditController {
    fn kind(&self) -> ToolKind {
        ToolKind::Edit
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        if active {
            self.pending.clear();
        } else if !self.pending.is_empty() {
            tracing::warn!(pending = self.pending.len(), "edit tool left with pending modifications");
            self.pending.clear();
        }
        self.active = active;
    }
}
