pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{StateError, StateResult};
pub use event::{ToolPlan, ToolTransition};
pub use machine::ToolCoordinator;
pub use model::ToolKind;
