//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

use crate::view::RejectionView;

/// Errors emitted by `AdaptiveSelector`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("theme '{tag}' has no questions")]
    EmptyTheme { tag: String },

    #[error("theme '{tag}' cannot produce at least two answer options")]
    NotEnoughOptions { tag: String },
}

/// Errors emitted by `AnswerJudge`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum JudgeError {
    #[error("the answered question is no longer active")]
    StaleOrMissingAnswer,
}

/// Errors emitted by the engine action API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("unknown theme '{tag}'")]
    UnknownTheme { tag: String },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Judge(#[from] JudgeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Human-readable rejection for user-triggered, recoverable errors.
    ///
    /// Returns `None` for faults (storage failures) that the transport should
    /// report generically instead of echoing to the user.
    #[must_use]
    pub fn rejection(&self) -> Option<RejectionView> {
        let reason = match self {
            EngineError::UnknownTheme { tag } => {
                format!("Theme '{tag}' is not available. Pick one from the list.")
            }
            EngineError::Selection(SelectionError::EmptyTheme { tag }) => {
                format!("Theme '{tag}' has no questions yet. Pick another theme.")
            }
            EngineError::Selection(SelectionError::NotEnoughOptions { tag }) => {
                format!("Theme '{tag}' is too small to build answer options. Pick another theme.")
            }
            EngineError::Judge(JudgeError::StaleOrMissingAnswer) => {
                "You already answered this question.".to_owned()
            }
            EngineError::Storage(_) => return None,
        };
        Some(RejectionView { reason })
    }
}
