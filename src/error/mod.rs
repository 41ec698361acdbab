use crate::api::ApiError;
use crate::app::console::CommandError;
use crate::config::ConfigPathError;
use crate::editor::ToolError;
use crate::state::StateError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Config(#[from] ConfigPathError),
    #[error("console i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
