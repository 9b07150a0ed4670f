pub mod catalog;
pub mod comment;

pub use catalog::{
    Catalog, Lesson, LessonId, LessonStatus, LessonView, Module, ModuleId, ModuleProgress,
    ProgressSummary,
};
pub use comment::{Comment, CommentDraft, CommentFilter, CommentFilterType, CommentId, CommentStats};
