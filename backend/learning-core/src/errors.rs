use serde::Serialize;
use thiserror::Error;

use crate::models::catalog::{LessonId, ModuleId};
use crate::models::comment::CommentId;

pub type EngineResult<T> = Result<T, EngineError>;

/// Recoverable failures reported back to the host. None of them is fatal and
/// every failing operation leaves engine state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Lesson {lesson_id} is locked")]
    LessonLocked { lesson_id: LessonId },

    #[error("Lesson {lesson_id} not found")]
    LessonNotFound { lesson_id: LessonId },

    #[error("Module {module_id} not found")]
    ModuleNotFound { module_id: ModuleId },

    #[error("Comment {comment_id} not found")]
    CommentNotFound { comment_id: CommentId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Comment {parent_id} cannot take replies (max depth {max_depth})")]
    DepthExceeded {
        parent_id: CommentId,
        max_depth: usize,
    },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid comment seed: {0}")]
    InvalidSeed(String),

    #[error("No comment ids left after {last_id}")]
    IdsExhausted { last_id: CommentId },
}

/// Coarse classification the host maps to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LessonLocked,
    Validation,
    NotFound,
    DepthExceeded,
    InvalidInput,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::LessonLocked { .. } => ErrorKind::LessonLocked,
            EngineError::LessonNotFound { .. }
            | EngineError::ModuleNotFound { .. }
            | EngineError::CommentNotFound { .. } => ErrorKind::NotFound,
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            EngineError::InvalidCatalog(_)
            | EngineError::InvalidSeed(_)
            | EngineError::IdsExhausted { .. } => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: {}", field, err.code),
                })
            })
            .collect::<Vec<_>>()
            .join("; ");
        EngineError::Validation(message)
    }
}
