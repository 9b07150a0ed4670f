#![allow(dead_code)]

use learning_core::models::catalog::{Catalog, Lesson, LessonId, Module, ModuleId};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn lesson(id: LessonId, module_id: ModuleId) -> Lesson {
    Lesson {
        id,
        title: format!("Lesson {}", id),
        duration_label: "12:00".to_string(),
        media_ref: format!("https://cdn.example.com/lessons/{}.mp4", id),
        description: String::new(),
        completed: false,
        unlocked: false,
        module_id,
        tags: Vec::new(),
        difficulty: None,
    }
}

pub fn module(id: ModuleId, lesson_ids: impl IntoIterator<Item = LessonId>) -> Module {
    Module {
        id,
        title: format!("Module {}", id),
        description: String::new(),
        lessons: lesson_ids.into_iter().map(|lid| lesson(lid, id)).collect(),
    }
}

/// Two modules, three lessons each: ids 1-3 and 4-6.
pub fn two_by_three() -> Catalog {
    Catalog::new(vec![module(1, 1..=3), module(2, 4..=6)]).expect("fixture catalog is valid")
}
