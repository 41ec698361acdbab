use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("a confirmation prompt is already pending")]
    ConfirmPending,
    #[error("no confirmation prompt is pending")]
    NoConfirmPending,
}
