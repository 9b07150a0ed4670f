use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

pub type LessonId = i64;
pub type ModuleId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(rename = "duration")]
    pub duration_label: String,
    #[serde(rename = "videoUrl")]
    pub media_ref: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub unlocked: bool,
    pub module_id: ModuleId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Module {
    pub fn completed_count(&self) -> usize {
        self.lessons.iter().filter(|l| l.completed).count()
    }

    /// Rounded completion percentage, 0 for a module without lessons.
    pub fn progress(&self) -> u8 {
        percentage(self.completed_count(), self.lessons.len())
    }
}

/// Per-lesson state. Transitions only move forward:
/// `Locked -> Unlocked -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Locked,
    Unlocked,
    Completed,
}

impl LessonStatus {
    pub fn of(lesson: &Lesson) -> Self {
        if lesson.completed {
            LessonStatus::Completed
        } else if lesson.unlocked {
            LessonStatus::Unlocked
        } else {
            LessonStatus::Locked
        }
    }
}

/// Flattened, read-only lesson row handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonView {
    pub lesson: Lesson,
    pub module_title: String,
    pub status: LessonStatus,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleProgress {
    pub module_id: ModuleId,
    pub title: String,
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub percentage: u8,
    pub modules: Vec<ModuleProgress>,
}

/// Ordered modules for one course session. The shape is fixed once built;
/// only lesson flags change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    modules: Vec<Module>,
}

impl Catalog {
    /// Validates ids and resets lock state so that only the very first
    /// lesson is unlocked and nothing is completed.
    pub fn new(mut modules: Vec<Module>) -> EngineResult<Self> {
        let mut module_ids = HashSet::new();
        let mut lesson_ids = HashSet::new();

        for module in &modules {
            if !module_ids.insert(module.id) {
                return Err(EngineError::InvalidCatalog(format!(
                    "duplicate module id {}",
                    module.id
                )));
            }
            for lesson in &module.lessons {
                if !lesson_ids.insert(lesson.id) {
                    return Err(EngineError::InvalidCatalog(format!(
                        "duplicate lesson id {}",
                        lesson.id
                    )));
                }
                if lesson.module_id != module.id {
                    return Err(EngineError::InvalidCatalog(format!(
                        "lesson {} references module {} but belongs to module {}",
                        lesson.id, lesson.module_id, module.id
                    )));
                }
            }
        }

        // The seed unlock goes to the first module's first lesson and nowhere
        // else, so an empty first module would leave the course stuck.
        if modules.first().is_some_and(|m| m.lessons.is_empty()) {
            return Err(EngineError::InvalidCatalog(
                "first module has no lessons".to_string(),
            ));
        }

        for lesson in modules.iter_mut().flat_map(|m| m.lessons.iter_mut()) {
            lesson.completed = false;
            lesson.unlocked = false;
        }
        if let Some(first) = modules.first_mut().and_then(|m| m.lessons.first_mut()) {
            first.unlocked = true;
        }

        Ok(Self { modules })
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let modules: Vec<Module> =
            serde_json::from_str(json).context("Failed to parse catalog JSON")?;
        Ok(Self::new(modules)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let catalog = Self::from_json_str(&raw)
            .with_context(|| format!("Invalid catalog file {}", path.display()))?;
        tracing::info!(
            "Catalog loaded from {}: {} modules, {} lessons",
            path.display(),
            catalog.modules.len(),
            catalog.total_lessons()
        );
        Ok(catalog)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, module_id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    /// Lessons in unlock order: modules in order, lessons in order within each.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }

    pub fn lesson(&self, lesson_id: LessonId) -> Option<&Lesson> {
        self.lessons().find(|l| l.id == lesson_id)
    }

    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.modules.first().and_then(|m| m.lessons.first())
    }

    pub fn total_lessons(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    pub fn completed_lessons(&self) -> usize {
        self.modules.iter().map(Module::completed_count).sum()
    }

    /// The lesson after `lesson_id` in flattening order, with its module title.
    pub fn following(&self, lesson_id: LessonId) -> Option<(&Lesson, &str)> {
        let mut flat = self
            .modules
            .iter()
            .flat_map(|m| m.lessons.iter().map(move |l| (l, m.title.as_str())));
        flat.position(|(l, _)| l.id == lesson_id)?;
        flat.next()
    }

    pub(crate) fn lesson_mut(&mut self, lesson_id: LessonId) -> Option<&mut Lesson> {
        self.modules
            .iter_mut()
            .flat_map(|m| m.lessons.iter_mut())
            .find(|l| l.id == lesson_id)
    }

    /// Course used by the demo player: three modules, six lessons.
    pub fn sample() -> Self {
        let lesson = |id: LessonId, module_id: ModuleId, title: &str, duration: &str, url: &str| {
            Lesson {
                id,
                title: title.to_string(),
                duration_label: duration.to_string(),
                media_ref: format!(
                    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/{}",
                    url
                ),
                description: String::new(),
                completed: false,
                unlocked: false,
                module_id,
                tags: Vec::new(),
                difficulty: None,
            }
        };

        let modules = vec![
            Module {
                id: 1,
                title: "React Fundamentals".to_string(),
                description: "Core concepts and project setup".to_string(),
                lessons: vec![
                    lesson(1, 1, "Introduction to React", "15:30", "BigBuckBunny.mp4"),
                    lesson(2, 1, "Components and Props", "22:15", "ElephantsDream.mp4"),
                    lesson(3, 1, "Advanced Components and Props", "22:15", "ElephantsDream.mp4"),
                ],
            },
            Module {
                id: 2,
                title: "State and Hooks".to_string(),
                description: "Advanced state management".to_string(),
                lessons: vec![
                    lesson(4, 2, "useState and useEffect", "28:45", "ForBiggerBlazes.mp4"),
                    lesson(5, 2, "Custom Hooks", "18:20", "ForBiggerEscapes.mp4"),
                ],
            },
            Module {
                id: 3,
                title: "Routing and Navigation".to_string(),
                description: "Moving between pages".to_string(),
                lessons: vec![lesson(6, 3, "React Router Basics", "25:10", "BigBuckBunny.mp4")],
            },
        ];

        Self { modules }.normalized()
    }

    fn normalized(mut self) -> Self {
        if let Some(first) = self.modules.first_mut().and_then(|m| m.lessons.first_mut()) {
            first.unlocked = true;
        }
        self
    }
}

/// `round(100 * part / whole)`, 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 * 100.0) / whole as f64).round().min(100.0) as u8
}
