//! In-memory course tree produced by generation, before anything is written.

use serde::{Deserialize, Serialize};

use crate::model::entity::ModuleKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseDraft {
    pub title: String,
    pub modules: Vec<ModuleDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleDraft {
    pub title: String,
    pub body: ModuleBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModuleBody {
    Content { lessons: Vec<LessonDraft> },
    Assessment { quiz: QuizDraft },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonDraft {
    pub title: String,
    pub content: String,
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizDraft {
    pub title: String,
    pub questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionDraft {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl ModuleDraft {
    pub fn content(title: impl Into<String>, lessons: Vec<LessonDraft>) -> Self {
        Self {
            title: title.into(),
            body: ModuleBody::Content { lessons },
        }
    }

    pub fn assessment(title: impl Into<String>, quiz: QuizDraft) -> Self {
        Self {
            title: title.into(),
            body: ModuleBody::Assessment { quiz },
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match self.body {
            ModuleBody::Content { .. } => ModuleKind::Content,
            ModuleBody::Assessment { .. } => ModuleKind::Assessment,
        }
    }

    pub fn lessons(&self) -> &[LessonDraft] {
        match &self.body {
            ModuleBody::Content { lessons } => lessons,
            ModuleBody::Assessment { .. } => &[],
        }
    }

    pub fn quiz(&self) -> Option<&QuizDraft> {
        match &self.body {
            ModuleBody::Content { .. } => None,
            ModuleBody::Assessment { quiz } => Some(quiz),
        }
    }
}

impl QuestionDraft {
    pub fn is_well_formed(&self) -> bool {
        !self.options.is_empty() && self.options.contains(&self.correct_answer)
    }
}

impl CourseDraft {
    pub fn kinds(&self) -> Vec<ModuleKind> {
        self.modules.iter().map(ModuleDraft::kind).collect()
    }
}
