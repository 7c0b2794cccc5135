use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseResult, ModelManager,
        entity::{Course, CourseStatus, Lesson, Module, ModuleKind, Question, Quiz, UserEntity},
    },
    web::AuthenticatedUser,
};

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseDetail {
    pub id: Uuid,
    pub title: String,
    pub status: CourseStatus,
    /// Username of the author, if the account still exists.
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modules: Vec<ModuleDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleDetail {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub kind: ModuleKind,
    pub lessons: Vec<LessonDetail>,
    pub quiz: Option<QuizDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonDetail {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub order_index: i32,
    pub video_id: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizDetail {
    pub id: Uuid,
    pub title: String,
    pub questions: Vec<QuestionDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuestionDetail {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub order_index: i32,
}

impl From<Lesson> for LessonDetail {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id(),
            title: lesson.title().to_string(),
            content: lesson.content().to_string(),
            order_index: lesson.order_index(),
            video_url: lesson.video_id().map(video_url),
            video_id: lesson.video_id().map(str::to_string),
        }
    }
}

impl From<Question> for QuestionDetail {
    fn from(question: Question) -> Self {
        Self {
            id: question.id(),
            question_text: question.question_text().to_string(),
            options: question.options().to_vec(),
            correct_answer: question.correct_answer().to_string(),
            order_index: question.order_index(),
        }
    }
}

impl QuizDetail {
    pub fn new(quiz: &Quiz, questions: Vec<Question>) -> Self {
        Self {
            id: quiz.id(),
            title: quiz.title().to_string(),
            questions: questions.into_iter().map(QuestionDetail::from).collect(),
        }
    }

    pub async fn fetch(mm: &ModelManager, actor: &AuthenticatedUser, quiz: &Quiz) -> DatabaseResult<Self> {
        let questions = Question::all_by_quizzes(mm, actor, &[quiz.id()]).await?;
        Ok(Self::new(quiz, questions))
    }
}

impl CourseDetail {
    /// Loads the whole tree of `course` with four queries, ordered the way it
    /// was written.
    pub async fn fetch(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course: Course,
    ) -> DatabaseResult<Self> {
        let modules = Module::all_by_course(mm, actor, course.id()).await?;
        let module_ids: Vec<Uuid> = modules.iter().map(Module::id).collect();

        let mut lessons: HashMap<Uuid, Vec<LessonDetail>> = HashMap::new();
        for lesson in Lesson::all_by_modules(mm, actor, &module_ids).await? {
            lessons
                .entry(lesson.module_id())
                .or_default()
                .push(LessonDetail::from(lesson));
        }

        let quizzes = Quiz::all_by_modules(mm, actor, &module_ids).await?;
        let quiz_ids: Vec<Uuid> = quizzes.iter().map(Quiz::id).collect();

        let mut questions: HashMap<Uuid, Vec<Question>> = HashMap::new();
        for question in Question::all_by_quizzes(mm, actor, &quiz_ids).await? {
            questions.entry(question.quiz_id()).or_default().push(question);
        }

        let mut quizzes: HashMap<Uuid, QuizDetail> = quizzes
            .into_iter()
            .map(|quiz| {
                let quiz_questions = questions.remove(&quiz.id()).unwrap_or_default();
                (quiz.module_id(), QuizDetail::new(&quiz, quiz_questions))
            })
            .collect();

        let modules = modules
            .into_iter()
            .map(|module| ModuleDetail {
                id: module.id(),
                title: module.title().to_string(),
                order_index: module.order_index(),
                kind: module.kind(),
                lessons: lessons.remove(&module.id()).unwrap_or_default(),
                quiz: quizzes.remove(&module.id()),
            })
            .collect();

        let author = UserEntity::find_by_id(mm, actor, course.created_by()).await?;

        Ok(Self {
            id: course.id(),
            title: course.title().to_string(),
            status: course.status(),
            created_by: author.map(|user| user.username().to_string()),
            created_at: *course.created_at(),
            modules,
        })
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|module| module.lessons.len()).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn video_url_points_to_watch_page() {
        assert_eq!(video_url("abc123"), "https://www.youtube.com/watch?v=abc123");
    }
}
