use crate::errors::{EngineError, EngineResult};
use crate::models::catalog::{
    percentage, Catalog, Lesson, LessonId, LessonStatus, LessonView, ModuleId, ModuleProgress,
    ProgressSummary,
};

/// Owns the catalog and the completed/unlocked flags. Hosts read lessons
/// through projections and change them only via `complete_lesson`.
#[derive(Debug, Clone)]
pub struct ProgressService {
    catalog: Catalog,
    current: Option<LessonId>,
}

impl ProgressService {
    pub fn new(catalog: Catalog) -> Self {
        let current = catalog.first_lesson().map(|l| l.id);
        tracing::info!(
            "Progress engine ready: {} modules, {} lessons",
            catalog.modules().len(),
            catalog.total_lessons()
        );
        Self { catalog, current }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn lesson(&self, lesson_id: LessonId) -> EngineResult<&Lesson> {
        self.catalog
            .lesson(lesson_id)
            .ok_or(EngineError::LessonNotFound { lesson_id })
    }

    pub fn lesson_status(&self, lesson_id: LessonId) -> EngineResult<LessonStatus> {
        self.lesson(lesson_id).map(LessonStatus::of)
    }

    pub fn current_lesson(&self) -> Option<&Lesson> {
        self.current.and_then(|id| self.catalog.lesson(id))
    }

    /// Makes an unlocked lesson the current one. Does not complete it.
    pub fn select_lesson(&mut self, lesson_id: LessonId) -> EngineResult<&Lesson> {
        let lesson = self
            .catalog
            .lesson(lesson_id)
            .ok_or(EngineError::LessonNotFound { lesson_id })?;

        if !lesson.unlocked {
            tracing::warn!("Rejected selection of locked lesson {}", lesson_id);
            return Err(EngineError::LessonLocked { lesson_id });
        }

        tracing::debug!("Current lesson set to {}", lesson_id);
        self.current = Some(lesson_id);
        self.lesson(lesson_id)
    }

    /// Marks a lesson completed and unlocks the one after it in flattening
    /// order. Both steps are idempotent.
    pub fn complete_lesson(&mut self, lesson_id: LessonId) -> EngineResult<()> {
        let lesson = self
            .catalog
            .lesson(lesson_id)
            .ok_or(EngineError::LessonNotFound { lesson_id })?;

        if !lesson.unlocked {
            tracing::warn!("Rejected completion of locked lesson {}", lesson_id);
            return Err(EngineError::LessonLocked { lesson_id });
        }

        let next_id = self.catalog.following(lesson_id).map(|(next, _)| next.id);

        if let Some(lesson) = self.catalog.lesson_mut(lesson_id) {
            if lesson.completed {
                tracing::debug!("Lesson {} already completed", lesson_id);
            } else {
                lesson.completed = true;
                tracing::info!("Lesson {} completed", lesson_id);
            }
        }

        if let Some(next) = next_id.and_then(|id| self.catalog.lesson_mut(id)) {
            if !next.unlocked {
                next.unlocked = true;
                tracing::info!("Lesson {} unlocked by completing {}", next.id, lesson_id);
            }
        }

        Ok(())
    }

    /// The lesson after `lesson_id`, regardless of its lock state.
    pub fn next_lesson(&self, lesson_id: LessonId) -> Option<LessonView> {
        self.catalog
            .following(lesson_id)
            .map(|(lesson, module_title)| self.view(lesson, module_title))
    }

    /// Moves to the lesson after the current one. `Ok(None)` once the
    /// current lesson is the last of the course.
    pub fn advance(&mut self) -> EngineResult<Option<&Lesson>> {
        let Some(current) = self.current else {
            return Ok(None);
        };

        match self.catalog.following(current).map(|(next, _)| next.id) {
            Some(next_id) => self.select_lesson(next_id).map(Some),
            None => {
                tracing::debug!("No lesson after {}", current);
                Ok(None)
            }
        }
    }

    pub fn module_progress(&self, module_id: ModuleId) -> EngineResult<u8> {
        self.catalog
            .module(module_id)
            .map(|m| m.progress())
            .ok_or(EngineError::ModuleNotFound { module_id })
    }

    pub fn overall_progress(&self) -> u8 {
        percentage(self.catalog.completed_lessons(), self.catalog.total_lessons())
    }

    pub fn lesson_views(&self) -> Vec<LessonView> {
        self.catalog
            .modules()
            .iter()
            .flat_map(|m| m.lessons.iter().map(move |l| (l, m.title.as_str())))
            .map(|(lesson, module_title)| self.view(lesson, module_title))
            .collect()
    }

    pub fn summary(&self) -> ProgressSummary {
        let modules = self
            .catalog
            .modules()
            .iter()
            .map(|m| ModuleProgress {
                module_id: m.id,
                title: m.title.clone(),
                completed: m.completed_count(),
                total: m.lessons.len(),
                percentage: m.progress(),
            })
            .collect();

        ProgressSummary {
            completed_lessons: self.catalog.completed_lessons(),
            total_lessons: self.catalog.total_lessons(),
            percentage: self.overall_progress(),
            modules,
        }
    }

    fn view(&self, lesson: &Lesson, module_title: &str) -> LessonView {
        LessonView {
            lesson: lesson.clone(),
            module_title: module_title.to_string(),
            status: LessonStatus::of(lesson),
            is_current: self.current == Some(lesson.id),
        }
    }
}
