use serde::{Deserialize, Serialize};

use crate::{
    generation::{CourseRequest, GenerationReport, ModuleRequest},
    model::{
        detail::CourseDetail,
        entity::{CourseStatus, Module, ModuleKind},
    },
};

fn default_lessons() -> usize {
    3
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GenerateCourseBody {
    /// Topic of the course.
    pub prompt: String,
    pub num_content_modules: usize,
    #[serde(default = "default_lessons")]
    pub num_lessons_per_module: usize,
    /// Intermediate tests, clamped to the number of content modules.
    #[serde(default)]
    pub num_test_modules: usize,
}

impl From<GenerateCourseBody> for CourseRequest {
    fn from(body: GenerateCourseBody) -> Self {
        Self {
            prompt: body.prompt,
            num_content_modules: body.num_content_modules,
            num_lessons_per_module: body.num_lessons_per_module,
            num_test_modules: body.num_test_modules,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GenerateModuleBody {
    pub prompt: String,
    pub module_type: ModuleKind,
    /// Lessons of a content module, ignored for assessments.
    pub num_lessons: Option<usize>,
}

impl From<GenerateModuleBody> for ModuleRequest {
    fn from(body: GenerateModuleBody) -> Self {
        Self {
            prompt: body.prompt,
            kind: body.module_type,
            num_lessons: body.num_lessons.unwrap_or_else(default_lessons),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseGeneratedResponse {
    pub course: CourseDetail,
    pub report: GenerationReport,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleGeneratedResponse {
    pub module: Module,
    pub report: GenerationReport,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CoursePatchBody {
    pub title: Option<String>,
    pub status: Option<CourseStatus>,
}
