//! Session shell: owns the working set, baseline, notifier and tool state, and wires the
//! tool controllers to the map surface and the persistence API.

pub mod console;
mod worker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::{ApiCompletion, ApiRequest, ApiResult, BoundsSource, ShapeApi};
use crate::config::AppConfig;
use crate::editor::{
    snapshot, Baseline, ClearAllController, ClearAllStep, ClearController, CreateOutcome,
    DrawController, EditController, FeatureKey, ShapeId, ShapeKind, ToolContext, ToolController,
    ToolResult, WorkingSet,
};
use crate::geometry::{Coordinate, Ring};
use crate::map::MapSurface;
use crate::notification::{ConfirmAction, Notifier, ToastKind};
use crate::state::{StateError, StateResult, ToolCoordinator, ToolKind, ToolPlan};

pub use worker::{Completion, Dispatch, OperationTicket, RequestWorker};
use worker::COMPLETION_POLL_INTERVAL;

/// Borrows the session parts a controller may touch, leaving the controllers free.
macro_rules! tool_ctx {
    ($session:expr) => {
        ToolContext {
            live: &mut $session.live,
            baseline: &mut $session.baseline,
            notifier: &mut $session.notifier,
            map: &mut $session.map,
            now: Instant::now(),
        }
    };
}

#[derive(Debug)]
struct Tools {
    rectangle: DrawController,
    polygon: DrawController,
    edit: EditController,
    clear: ClearController,
    clear_all: ClearAllController,
}

impl Tools {
    fn new(user_id: Option<String>) -> Self {
        Self {
            rectangle: DrawController::rectangle(user_id.clone()),
            polygon: DrawController::polygon(user_id),
            edit: EditController::new(),
            clear: ClearController::new(),
            clear_all: ClearAllController::new(),
        }
    }

    fn get(&self, tool: ToolKind) -> &dyn ToolController {
        match tool {
            ToolKind::Rectangle => &self.rectangle,
            ToolKind::Polygon => &self.polygon,
            ToolKind::Edit => &self.edit,
            ToolKind::Clear => &self.clear,
            ToolKind::ClearAll => &self.clear_all,
        }
    }

    fn get_mut(&mut self, tool: ToolKind) -> &mut dyn ToolController {
        match tool {
            ToolKind::Rectangle => &mut self.rectangle,
            ToolKind::Polygon => &mut self.polygon,
            ToolKind::Edit => &mut self.edit,
            ToolKind::Clear => &mut self.clear,
            ToolKind::ClearAll => &mut self.clear_all,
        }
    }

    fn draw_mut(&mut self, tool: ToolKind) -> Option<&mut DrawController> {
        match tool {
            ToolKind::Rectangle => Some(&mut self.rectangle),
            ToolKind::Polygon => Some(&mut self.polygon),
            _ => None,
        }
    }

    fn active_count(&self) -> usize {
        ToolKind::ALL
            .into_iter()
            .filter(|tool| self.get(*tool).is_active())
            .count()
    }
}

pub struct Session<M: MapSurface> {
    config: AppConfig,
    map: M,
    live: WorkingSet,
    baseline: Baseline,
    notifier: Notifier,
    coordinator: ToolCoordinator,
    tools: Tools,
    worker: RequestWorker,
    /// Features whose update is in flight; their geometry is not accepted yet.
    saving: Vec<FeatureKey>,
}

impl<M: MapSurface> Session<M> {
    pub fn new(config: AppConfig, map: M, api: Arc<dyn ShapeApi>, dispatch: Dispatch) -> Self {
        let notifier = Notifier::new(config.toast_duration());
        let tools = Tools::new(config.user_id.clone());
        Self {
            config,
            map,
            live: WorkingSet::new(),
            baseline: Baseline::empty(),
            notifier,
            coordinator: ToolCoordinator::new(),
            tools,
            worker: RequestWorker::new(api, dispatch),
            saving: Vec::new(),
        }
    }

    /// Frames the imagery, loads stored shapes, and takes the initial baseline.
    pub fn mount(&mut self, bounds: &dyn BoundsSource) {
        match bounds.imagery_bounds() {
            Ok(Some(bounds)) => {
                let extent = bounds.to_map_extent();
                if extent.is_valid() {
                    self.map.fit_to_extent(extent, self.config.fit_padding_px);
                } else {
                    tracing::warn!(?bounds, "imagery bounds project to an empty extent");
                }
            }
            Ok(None) => tracing::warn!("imagery bounds response was not usable; keeping default view"),
            Err(err) => tracing::warn!(%err, "failed to load imagery bounds"),
        }

        match self.worker.api().list_shapes() {
            Ok(records) => {
                let total = records.len();
                for record in records {
                    match record.ring() {
                        Ok(ring) => {
                            let kind = record.kind.unwrap_or(ShapeKind::Polygon);
                            self.live.insert_persisted(record.id, kind, ring);
                        }
                        Err(err) => {
                            tracing::warn!(id = %record.id, %err, "skipping stored shape with bad geometry");
                        }
                    }
                }
                tracing::info!(loaded = self.live.len(), total, "shapes loaded");
            }
            Err(err) => {
                tracing::warn!(%err, "failed to load shapes");
                self.toast("Failed to load shapes", ToastKind::Error);
            }
        }

        self.baseline = snapshot(&self.live);
        self.map.render(self.live.features(), None);
    }

    /// Resolves a tool button press against the current tool and unsaved edits.
    pub fn request_tool(&mut self, tool: ToolKind) -> StateResult<ToolPlan> {
        if let Some(prompt) = self.notifier.pending_confirm() {
            tracing::info!(?tool, pending = ?prompt.action, "tool request refused while a prompt is open");
            self.toast("Answer the open prompt first", ToastKind::Info);
            return Err(StateError::ConfirmPending);
        }

        let plan = self.coordinator.plan(tool);
        tracing::debug!(?tool, ?plan, "tool requested");
        match plan {
            ToolPlan::Deactivate(current) => {
                self.tools.get_mut(current).deactivate(&mut tool_ctx!(self));
                self.coordinator.deactivate();
            }
            ToolPlan::SaveEdits => {
                let count = self.tools.edit.pending().len();
                let noun = if count == 1 { "shape" } else { "shapes" };
                self.notifier
                    .show_confirm(format!("Save {count} modified {noun}?"), ConfirmAction::SaveEdits)?;
            }
            ToolPlan::ConfirmDiscard { to, .. } => {
                self.notifier.show_confirm(
                    "Discard unsaved edits?",
                    ConfirmAction::DiscardEdits { then: to },
                )?;
            }
            ToolPlan::Switch { to, .. } => self.switch_to(to),
        }
        Ok(plan)
    }

    pub fn draw_rectangle(
        &mut self,
        start: Coordinate,
        end: Coordinate,
    ) -> ToolResult<OperationTicket> {
        let request = self
            .tools
            .rectangle
            .complete_rectangle(&mut tool_ctx!(self), start, end)?;
        Ok(self.dispatch(Some(ToolKind::Rectangle), request))
    }

    pub fn draw_polygon(&mut self, vertices: &[Coordinate]) -> ToolResult<OperationTicket> {
        let request = self
            .tools
            .polygon
            .complete_polygon(&mut tool_ctx!(self), vertices)?;
        Ok(self.dispatch(Some(ToolKind::Polygon), request))
    }

    /// Modify event from the edit interaction.
    pub fn modify_feature(&mut self, key: FeatureKey, ring: Ring) -> ToolResult<()> {
        if self.tools.edit.modify(&mut tool_ctx!(self), key, ring)? {
            self.coordinator.mark_modified();
        }
        Ok(())
    }

    pub fn translate_feature(&mut self, key: FeatureKey, dx: f64, dy: f64) -> ToolResult<()> {
        if self.tools.edit.translate(&mut tool_ctx!(self), key, dx, dy)? {
            self.coordinator.mark_modified();
        }
        Ok(())
    }

    pub fn hover(&mut self, point: Coordinate) -> Option<FeatureKey> {
        self.tools.clear.hover(&mut tool_ctx!(self), point)
    }

    pub fn click(&mut self, point: Coordinate) -> ToolResult<Option<FeatureKey>> {
        self.tools.clear.select(&mut tool_ctx!(self), point)
    }

    /// Accepts the pending prompt and runs its action.
    pub fn accept(&mut self) -> StateResult<ConfirmAction> {
        let prompt = self.notifier.take_confirm()?;
        tracing::debug!(action = ?prompt.action, "prompt accepted");
        match prompt.action {
            ConfirmAction::DiscardEdits { then } => {
                self.tools.edit.discard(&mut tool_ctx!(self));
                self.coordinator.clear_editing();
                self.switch_to(then);
            }
            ConfirmAction::SaveEdits => self.save_edits(),
            ConfirmAction::DeleteFeature(key) => {
                let unaccepted = self.unaccepted();
                if let Some(request) =
                    self.tools
                        .clear
                        .confirm_delete(&mut tool_ctx!(self), key, &unaccepted)
                {
                    self.dispatch(Some(ToolKind::Clear), request);
                }
            }
            ConfirmAction::DeleteAll => {
                let request = self.tools.clear_all.confirm();
                self.dispatch(Some(ToolKind::ClearAll), request);
            }
        }
        Ok(prompt.action)
    }

    /// Rejects the pending prompt; nothing is mutated.
    pub fn reject(&mut self) -> StateResult<ConfirmAction> {
        let prompt = self.notifier.take_confirm()?;
        tracing::debug!(action = ?prompt.action, "prompt rejected");
        match prompt.action {
            ConfirmAction::DiscardEdits { .. } | ConfirmAction::SaveEdits => {
                self.toast("Edits kept", ToastKind::Info);
            }
            ConfirmAction::DeleteFeature(_) => {
                self.tools.clear.reject_delete(&mut tool_ctx!(self));
            }
            ConfirmAction::DeleteAll => {
                self.tools.clear_all.reject(&mut tool_ctx!(self));
                let generation = self.coordinator.generation();
                self.finish(Some(ToolKind::ClearAll), generation);
            }
        }
        Ok(prompt.action)
    }

    /// Applies every completion that has arrived. Returns how many were applied.
    pub fn pump_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.worker.try_next() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Waits up to `timeout` for outstanding requests, applying completions as they land.
    pub fn settle(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = self.pump_completions();
        while self.worker.in_flight() > 0 && Instant::now() < deadline {
            if let Some(completion) = self.worker.wait_next(COMPLETION_POLL_INTERVAL) {
                self.apply(completion);
                applied += 1;
            }
        }
        applied
    }

    pub fn tick(&mut self, now: Instant) {
        self.notifier.tick(now);
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn live(&self) -> &WorkingSet {
        &self.live
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn active_tool(&self) -> Option<ToolKind> {
        self.coordinator.active()
    }

    pub fn coordinator(&self) -> &ToolCoordinator {
        &self.coordinator
    }

    pub fn is_editing(&self) -> bool {
        self.coordinator.is_editing()
    }

    pub fn pending_modifications(&self) -> &[FeatureKey] {
        self.tools.edit.pending()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn hovered(&self) -> Option<FeatureKey> {
        self.tools.clear.hovered()
    }

    pub fn is_saving(&self) -> bool {
        self.worker.in_flight() > 0
    }

    fn toast(&mut self, text: impl Into<String>, kind: ToastKind) {
        self.notifier.show_toast(text, kind, Instant::now());
    }

    fn switch_to(&mut self, to: ToolKind) {
        if let Some(from) = self.coordinator.active() {
            self.tools.get_mut(from).deactivate(&mut tool_ctx!(self));
        }
        self.tools.get_mut(to).activate(&mut tool_ctx!(self));
        self.coordinator.activate(to);
        debug_assert!(self.tools.active_count() <= 1);

        if to == ToolKind::ClearAll {
            let request = self.tools.clear_all.start();
            self.dispatch(Some(to), request);
        }
    }

    fn save_edits(&mut self) {
        let request = self.tools.edit.begin_save(&mut tool_ctx!(self));
        if let ApiRequest::Update { items, .. } = &request {
            self.saving.extend(items.iter().map(|item| item.key));
        }
        self.tools.edit.deactivate(&mut tool_ctx!(self));
        self.coordinator.deactivate();
        self.dispatch(Some(ToolKind::Edit), request);
    }

    fn dispatch(&mut self, tool: Option<ToolKind>, request: ApiRequest) -> OperationTicket {
        let generation = self.coordinator.generation();
        self.worker.dispatch(tool, generation, request)
    }

    fn unaccepted(&self) -> Vec<FeatureKey> {
        let mut keys = self.tools.edit.pending().to_vec();
        keys.extend(self.saving.iter().copied());
        keys
    }

    /// Returns a one-shot tool to "no tool" if the activation that started the work is still current.
    fn finish(&mut self, tool: Option<ToolKind>, generation: u64) {
        let Some(tool) = tool.filter(|tool| tool.is_one_shot()) else {
            return;
        };
        if self.coordinator.finish(tool, generation) {
            self.tools.get_mut(tool).deactivate(&mut tool_ctx!(self));
        }
    }

    fn is_current(&self, ticket: &OperationTicket) -> bool {
        ticket.tool.is_some()
            && self.coordinator.active() == ticket.tool
            && self.coordinator.generation() == ticket.generation
    }

    fn apply(&mut self, completion: Completion) {
        let Completion { ticket, outcome } = completion;
        tracing::debug!(sequence = ticket.sequence, tool = ?ticket.tool, "applying completion");
        match outcome {
            ApiCompletion::Created { key, result } => self.apply_created(ticket, key, result),
            ApiCompletion::Updated { outcomes } => {
                for outcome in &outcomes {
                    if let Some(index) = self.saving.iter().position(|key| *key == outcome.key) {
                        self.saving.remove(index);
                    }
                }
                let unaccepted = self.unaccepted();
                self.tools
                    .edit
                    .on_saved(&mut tool_ctx!(self), outcomes, &unaccepted);
            }
            ApiCompletion::Deleted { key, result } => {
                let unaccepted = self.unaccepted();
                self.tools
                    .clear
                    .on_deleted(&mut tool_ctx!(self), key, result, &unaccepted);
            }
            ApiCompletion::Counted { result } => {
                if !self.is_current(&ticket) {
                    tracing::debug!(sequence = ticket.sequence, "count arrived after clear all was left");
                    return;
                }
                let step = self
                    .tools
                    .clear_all
                    .on_counted(&mut tool_ctx!(self), result);
                if step == ClearAllStep::Finished {
                    self.finish(ticket.tool, ticket.generation);
                }
            }
            ApiCompletion::ClearedAll { result } => {
                self.tools
                    .clear_all
                    .on_cleared(&mut tool_ctx!(self), result);
                self.finish(ticket.tool, ticket.generation);
            }
            ApiCompletion::OrphanDeleted { id, result } => match result {
                Ok(()) => tracing::info!(%id, "removed orphaned remote shape"),
                Err(err) => tracing::warn!(%id, %err, "could not remove orphaned remote shape"),
            },
        }
    }

    fn apply_created(&mut self, ticket: OperationTicket, key: FeatureKey, result: ApiResult<ShapeId>) {
        let unaccepted = self.unaccepted();
        let Some(draw) = ticket.tool.and_then(|tool| self.tools.draw_mut(tool)) else {
            tracing::warn!(tool = ?ticket.tool, %key, "create completion without a drawing tool");
            return;
        };
        let outcome = draw.on_created(&mut tool_ctx!(self), key, result, &unaccepted);
        if let CreateOutcome::Orphaned(id) = outcome {
            self.dispatch(None, ApiRequest::DeleteOrphan { id });
        }
        self.finish(ticket.tool, ticket.generation);
    }
}
