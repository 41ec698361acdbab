use super::{ToolKind, ToolPlan, ToolTransition};

const TRANSITION_HISTORY_LIMIT: usize = 64;

/// Owns which tool is active and whether the user is mid-edit.
///
/// The coordinator only decides and records transitions; installing and removing
/// map interactions is left to the session that owns the map surface.
#[derive(Debug)]
pub struct ToolCoordinator {
    active: Option<ToolKind>,
    editing: bool,
    generation: u64,
    transition_history: Vec<ToolTransition>,
}

impl ToolCoordinator {
    pub fn new() -> Self {
        Self {
            active: None,
            editing: false,
            generation: 0,
            transition_history: Vec::new(),
        }
    }

    pub fn active(&self) -> Option<ToolKind> {
        self.active
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Bumped on every activation so late completions can tell whether their tool is still current.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history(&self) -> &[ToolTransition] {
        &self.transition_history
    }

    pub fn plan(&self, requested: ToolKind) -> ToolPlan {
        match self.active {
            Some(current) if current == requested => {
                if current == ToolKind::Edit && self.editing {
                    ToolPlan::SaveEdits
                } else {
                    ToolPlan::Deactivate(current)
                }
            }
            Some(current) if self.editing => ToolPlan::ConfirmDiscard {
                from: current,
                to: requested,
            },
            from => ToolPlan::Switch {
                from,
                to: requested,
            },
        }
    }

    pub fn activate(&mut self, tool: ToolKind) -> ToolTransition {
        tracing::debug!(from = ?self.active, to = ?tool, "activate tool");
        self.generation = self.generation.saturating_add(1);
        self.editing = false;
        self.record(ToolTransition::new(self.active, Some(tool), Some(tool)))
    }

    pub fn deactivate(&mut self) -> ToolTransition {
        tracing::debug!(from = ?self.active, "deactivate tool");
        self.editing = false;
        self.record(ToolTransition::new(self.active, None, None))
    }

    /// Returns the one-shot tool to "no tool" if it is still the activation that started the work.
    pub fn finish(&mut self, tool: ToolKind, generation: u64) -> bool {
        if self.active != Some(tool) || self.generation != generation {
            tracing::debug!(
                ?tool,
                generation,
                current = ?self.active,
                current_generation = self.generation,
                "ignoring completion for stale tool activation"
            );
            return false;
        }
        self.deactivate();
        true
    }

    /// Flags unsaved edits; only meaningful while the edit tool is active.
    pub fn mark_modified(&mut self) -> bool {
        if self.active != Some(ToolKind::Edit) {
            tracing::warn!(active = ?self.active, "modification reported outside edit mode");
            return false;
        }
        if !self.editing {
            tracing::debug!("first unsaved modification in edit mode");
        }
        self.editing = true;
        true
    }

    pub fn clear_editing(&mut self) {
        self.editing = false;
    }

    fn record(&mut self, transition: ToolTransition) -> ToolTransition {
        self.active = transition.to;
        if self.transition_history.len() == TRANSITION_HISTORY_LIMIT {
            self.transition_history.remove(0);
        }
        self.transition_history.push(transition);
        transition
    }
}

impl Default for ToolCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ToolCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.active {
            Some(tool) => write!(f, "tool={}", tool.label())?,
            None => write!(f, "tool=none")?,
        }
        if self.editing {
            write!(f, " (unsaved edits)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requesting_the_active_tool_plans_deactivation() {
        let mut coordinator = ToolCoordinator::new();
        coordinator.activate(ToolKind::Clear);

        assert_eq!(
            coordinator.plan(ToolKind::Clear),
            ToolPlan::Deactivate(ToolKind::Clear)
        );
    }

    #[test]
    fn entering_edit_does_not_flag_unsaved_changes() {
        let mut coordinator = ToolCoordinator::new();
        coordinator.activate(ToolKind::Edit);
        assert!(!coordinator.is_editing());
        assert_eq!(
            coordinator.plan(ToolKind::Rectangle),
            ToolPlan::Switch {
                from: Some(ToolKind::Edit),
                to: ToolKind::Rectangle
            }
        );

        assert!(coordinator.mark_modified());
        assert!(coordinator.is_editing());
        assert_eq!(
            coordinator.plan(ToolKind::Rectangle),
            ToolPlan::ConfirmDiscard {
                from: ToolKind::Edit,
                to: ToolKind::Rectangle
            }
        );
        assert_eq!(coordinator.plan(ToolKind::Edit), ToolPlan::SaveEdits);
    }

    #[test]
    fn modifications_outside_edit_are_ignored() {
        let mut coordinator = ToolCoordinator::new();
        coordinator.activate(ToolKind::Polygon);
        assert!(!coordinator.mark_modified());
        assert!(!coordinator.is_editing());
    }

    #[test]
    fn finish_ignores_stale_generations() {
        let mut coordinator = ToolCoordinator::new();
        coordinator.activate(ToolKind::Polygon);
        let stale = coordinator.generation();
        coordinator.deactivate();
        coordinator.activate(ToolKind::Polygon);

        assert!(!coordinator.finish(ToolKind::Polygon, stale));
        assert_eq!(coordinator.active(), Some(ToolKind::Polygon));
        assert!(coordinator.finish(ToolKind::Polygon, coordinator.generation()));
        assert_eq!(coordinator.active(), None);
    }

    #[test]
    fn transitions_are_recorded_in_order() {
        let mut coordinator = ToolCoordinator::new();
        coordinator.activate(ToolKind::Rectangle);
        coordinator.activate(ToolKind::Edit);
        coordinator.deactivate();

        assert_eq!(
            coordinator.history(),
            &[
                ToolTransition::new(None, Some(ToolKind::Rectangle), Some(ToolKind::Rectangle)),
                ToolTransition::new(
                    Some(ToolKind::Rectangle),
                    Some(ToolKind::Edit),
                    Some(ToolKind::Edit)
                ),
                ToolTransition::new(Some(ToolKind::Edit), None, None),
            ]
        );
    }

    #[test]
    fn history_is_bounded() {
        let mut coordinator = ToolCoordinator::new();
        for _ in 0..(TRANSITION_HISTORY_LIMIT + 10) {
            coordinator.activate(ToolKind::Clear);
        }
        assert_eq!(coordinator.history().len(), TRANSITION_HISTORY_LIMIT);
    }

    #[test]
    fn display_reports_tool_and_unsaved_state() {
        let mut coordinator = ToolCoordinator::new();
        assert_eq!(coordinator.to_string(), "tool=none");
        coordinator.activate(ToolKind::Edit);
        coordinator.mark_modified();
        assert_eq!(coordinator.to_string(), "tool=edit (unsaved edits)");
    }
}
