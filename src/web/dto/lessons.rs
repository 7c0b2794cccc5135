use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{detail::video_url, entity::Lesson};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonResponse {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub content: String,
    pub order_index: i32,
    pub video_id: Option<String>,
    pub video_url: Option<String>,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id(),
            module_id: lesson.module_id(),
            title: lesson.title().to_string(),
            content: lesson.content().to_string(),
            order_index: lesson.order_index(),
            video_id: lesson.video_id().map(str::to_string),
            video_url: lesson.video_id().map(video_url),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LessonCreateBody {
    pub module_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub order_index: Option<i32>,
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LessonPatchBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub order_index: Option<i32>,
    pub video_id: Option<String>,
}
