use super::ToolKind;

/// What a tool request resolves to, given the coordinator's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPlan {
    /// The requested tool is already active and has nothing to save.
    Deactivate(ToolKind),
    /// Edit is active with unsaved modifications and was requested again.
    SaveEdits,
    /// Unsaved modifications must be discarded before switching.
    ConfirmDiscard { from: ToolKind, to: ToolKind },
    Switch { from: Option<ToolKind>, to: ToolKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolTransition {
    pub from: Option<ToolKind>,
    pub requested: Option<ToolKind>,
    pub to: Option<ToolKind>,
}

impl ToolTransition {
    pub const fn new(
        from: Option<ToolKind>,
        requested: Option<ToolKind>,
        to: Option<ToolKind>,
    ) -> Self {
        Self {
            from,
            requested,
            to,
        }
    }
}
