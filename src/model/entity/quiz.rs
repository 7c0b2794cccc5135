use crate::model::entity::{Module, ModuleKind};
use crate::model::error::DatabaseError;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Quiz {
    id: Uuid,
    module_id: Uuid,
    title: String,
}

#[derive(Debug, Clone)]
pub struct QuizCreate {
    pub module_id: Uuid,
    pub title: String,
}

impl ResourceTyped for Quiz {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Quiz
    }
}

impl Quiz {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn module_id(&self) -> Uuid {
        self.module_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) async fn insert<'e, E>(executor: E, module_id: Uuid, title: &str) -> DatabaseResult<Self>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let quiz = sqlx::query_as(
            "INSERT INTO quizzes (id, module_id, title) VALUES ($1,$2,$3) RETURNING id, module_id, title",
        )
        .bind(Uuid::new_v4())
        .bind(module_id)
        .bind(title)
        .fetch_one(executor)
        .await
        .map_err(DatabaseError::from_insert)?;

        Ok(quiz)
    }
}

#[async_trait]
impl CrudRepository<Quiz, QuizCreate, Uuid> for Quiz {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizCreate,
    ) -> DatabaseResult<Self> {
        Module::ensure_kind(mm, data.module_id, ModuleKind::Assessment).await?;
        Self::insert(mm.executor(), data.module_id, &data.title).await
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE quizzes SET title = $1 WHERE id = $2")
            .bind(&data.title)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.title = data.title;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM quizzes WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM quizzes WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM quizzes ORDER BY title LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

// Utils

impl Quiz {
    pub async fn all_by_modules(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        module_ids: &[Uuid],
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM quizzes WHERE module_id = ANY($1)")
            .bind(module_ids)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    /// Course the quiz belongs to, through its module.
    pub async fn course_id(&self, mm: &ModelManager) -> DatabaseResult<Uuid> {
        let course_id = sqlx::query_scalar("SELECT course_id FROM modules WHERE id = $1")
            .bind(self.module_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(course_id)
    }
}
