use crate::model::error::DatabaseError;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Question {
    id: Uuid,
    quiz_id: Uuid,
    question_text: String,
    options: Vec<String>,
    correct_answer: String,
    order_index: i32,
}

#[derive(Debug, Clone)]
pub struct QuestionCreate {
    pub quiz_id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    /// `None` appends after the last question of the quiz.
    pub order_index: Option<i32>,
}

impl ResourceTyped for Question {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Question
    }
}

impl Question {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }

    pub(crate) async fn insert<'e, E>(
        executor: E,
        quiz_id: Uuid,
        question_text: &str,
        options: &[String],
        correct_answer: &str,
        order_index: i32,
    ) -> DatabaseResult<Self>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let question = sqlx::query_as(
            r#"
            INSERT INTO questions (id, quiz_id, question_text, options, correct_answer, order_index)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING id, quiz_id, question_text, options, correct_answer, order_index
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(quiz_id)
        .bind(question_text)
        .bind(options)
        .bind(correct_answer)
        .bind(order_index)
        .fetch_one(executor)
        .await?;

        Ok(question)
    }
}

#[async_trait]
impl CrudRepository<Question, QuestionCreate, Uuid> for Question {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionCreate,
    ) -> DatabaseResult<Self> {
        let quiz_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM quizzes WHERE id = $1)")
                .bind(data.quiz_id)
                .fetch_one(mm.executor())
                .await?;
        if !quiz_exists {
            return Err(DatabaseError::ParentNotFound);
        }

        let order_index = match data.order_index {
            Some(order) => order,
            None => {
                sqlx::query_scalar(
                    "SELECT COALESCE(MAX(order_index), 0) + 1 FROM questions WHERE quiz_id = $1",
                )
                .bind(data.quiz_id)
                .fetch_one(mm.executor())
                .await?
            }
        };

        Self::insert(
            mm.executor(),
            data.quiz_id,
            &data.question_text,
            &data.options,
            &data.correct_answer,
            order_index,
        )
        .await
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        sqlx::query(
            r#"
            UPDATE questions
            SET question_text = $1, options = $2, correct_answer = $3, order_index = $4
            WHERE id = $5
            "#,
        )
        .bind(&data.question_text)
        .bind(&data.options)
        .bind(&data.correct_answer)
        .bind(order_index)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.question_text = data.question_text;
        self.options = data.options;
        self.correct_answer = data.correct_answer;
        self.order_index = order_index;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;

        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM questions ORDER BY quiz_id, order_index LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

// Utils

impl Question {
    pub async fn all_by_quizzes(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        quiz_ids: &[Uuid],
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            "SELECT * FROM questions WHERE quiz_id = ANY($1) ORDER BY order_index, id",
        )
        .bind(quiz_ids)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn question(options: &[&str], correct: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            question_text: String::from("What is ownership?"),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct.to_string(),
            order_index: 1,
        }
    }

    #[test]
    fn answer_check_is_exact() {
        let q = question(&["Borrow", "Move"], "Move");
        assert!(q.is_correct("Move"));
        assert!(!q.is_correct("move"));
    }
}
