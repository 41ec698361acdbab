use crate::map::Interaction;

/// One exclusive interactive mode. "No tool" is expressed as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Rectangle,
    Polygon,
    Edit,
    Clear,
    ClearAll,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        Self::Rectangle,
        Self::Polygon,
        Self::Edit,
        Self::Clear,
        Self::ClearAll,
    ];

    /// Map interaction installed while the tool is active. Clear-all drives prompts only.
    pub const fn interaction(self) -> Option<Interaction> {
        match self {
            Self::Rectangle => Some(Interaction::DrawRectangle),
            Self::Polygon => Some(Interaction::DrawPolygon),
            Self::Edit => Some(Interaction::Modify),
            Self::Clear => Some(Interaction::Select),
            Self::ClearAll => None,
        }
    }

    /// Tools that return to "no tool" by themselves once their operation resolves.
    pub const fn is_one_shot(self) -> bool {
        matches!(self, Self::Rectangle | Self::Polygon | Self::ClearAll)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
            Self::Edit => "edit",
            Self::Clear => "clear",
            Self::ClearAll => "clear-all",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.label() == label)
    }
}
