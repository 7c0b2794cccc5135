use crate::model::entity::{Module, ModuleKind};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    module_id: Uuid,
    title: String,
    content: String,
    order_index: i32,
    video_id: Option<String>,
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn module_id(&self) -> Uuid {
        self.module_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub(crate) async fn insert<'e, E>(
        executor: E,
        module_id: Uuid,
        title: &str,
        content: &str,
        order_index: i32,
        video_id: Option<&str>,
    ) -> DatabaseResult<Self>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let lesson = sqlx::query_as(
            r#"
            INSERT INTO lessons (id, module_id, title, content, order_index, video_id)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING id, module_id, title, content, order_index, video_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(module_id)
        .bind(title)
        .bind(content)
        .bind(order_index)
        .bind(video_id)
        .fetch_one(executor)
        .await?;

        Ok(lesson)
    }
}

#[derive(Debug, Clone)]
pub struct LessonCreate {
    pub module_id: Uuid,
    pub title: String,
    pub content: String,
    /// `None` appends after the last lesson of the module.
    pub order_index: Option<i32>,
    pub video_id: Option<String>,
}

#[async_trait]
impl CrudRepository<Lesson, LessonCreate, Uuid> for Lesson {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        Module::ensure_kind(mm, data.module_id, ModuleKind::Content).await?;

        let order_index = match data.order_index {
            Some(order) => order,
            None => {
                sqlx::query_scalar(
                    "SELECT COALESCE(MAX(order_index), 0) + 1 FROM lessons WHERE module_id = $1",
                )
                .bind(data.module_id)
                .fetch_one(mm.executor())
                .await?
            }
        };

        Self::insert(
            mm.executor(),
            data.module_id,
            &data.title,
            &data.content,
            order_index,
            data.video_id.as_deref(),
        )
        .await
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        sqlx::query(
            "UPDATE lessons SET title = $1, content = $2, order_index = $3, video_id = $4 WHERE id = $5",
        )
        .bind(&data.title)
        .bind(&data.content)
        .bind(order_index)
        .bind(&data.video_id)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.content = data.content;
        self.order_index = order_index;
        self.video_id = data.video_id;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM lessons WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
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
            "SELECT * FROM lessons ORDER BY module_id, order_index LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

// Utils

impl Lesson {
    pub async fn all_by_modules(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        module_ids: &[Uuid],
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM lessons WHERE module_id = ANY($1) ORDER BY order_index, id",
        )
        .bind(module_ids)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// All lesson text of a course in module then lesson order.
    pub async fn course_text(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Vec<String>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT l.title, l.content
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            ORDER BY m.order_index, m.inserted_at, l.order_index
            "#,
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(title, content)| format!("{title}\n{content}"))
            .collect())
    }
}
