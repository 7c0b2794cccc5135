use crate::model::error::DatabaseError;
use crate::model::persist::lock_module_order;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Holds lessons.
    Content,
    /// Holds a single quiz.
    Assessment,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Assessment => "assessment",
        }
    }
}

impl From<&str> for ModuleKind {
    fn from(value: &str) -> Self {
        match value {
            "assessment" => Self::Assessment,
            _ => Self::Content,
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Module {
    id: Uuid,
    course_id: Uuid,
    title: String,
    order_index: i32,
    kind: String,
}

#[derive(Debug, Clone)]
pub struct ModuleCreate {
    pub course_id: Uuid,
    pub title: String,
    /// `None` appends after the last module of the course.
    pub order_index: Option<i32>,
    pub kind: ModuleKind,
}

impl ResourceTyped for Module {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Module
    }
}

impl Module {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn kind(&self) -> ModuleKind {
        ModuleKind::from(self.kind.as_str())
    }

    pub(crate) async fn insert<'e, E>(
        executor: E,
        course_id: Uuid,
        title: &str,
        order_index: i32,
        kind: ModuleKind,
    ) -> DatabaseResult<Self>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let module = sqlx::query_as(
            r#"
            INSERT INTO modules (id, course_id, title, order_index, kind)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING id, course_id, title, order_index, kind
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(title)
        .bind(order_index)
        .bind(kind.as_str())
        .fetch_one(executor)
        .await?;

        Ok(module)
    }

    /// Order index one past the current maximum of the course, starting at 1.
    pub(crate) async fn next_order_index<'e, E>(executor: E, course_id: Uuid) -> DatabaseResult<i32>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(order_index), 0) + 1 FROM modules WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_one(executor)
        .await?;

        Ok(next)
    }

    /// Kind of module `id`, `None` if it does not exist.
    pub(crate) async fn kind_of(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<ModuleKind>> {
        let kind: Option<String> = sqlx::query_scalar("SELECT kind FROM modules WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;

        Ok(kind.as_deref().map(ModuleKind::from))
    }

    /// Fails unless module `id` exists and is of kind `expected`.
    pub(crate) async fn ensure_kind(
        mm: &ModelManager,
        id: Uuid,
        expected: ModuleKind,
    ) -> DatabaseResult<()> {
        match Self::kind_of(mm, id).await? {
            None => Err(DatabaseError::ParentNotFound),
            Some(kind) if kind != expected => Err(DatabaseError::KindMismatch { expected }),
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl CrudRepository<Module, ModuleCreate, Uuid> for Module {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ModuleCreate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;

        let next = lock_module_order(&mut tx, data.course_id).await?;
        let order_index = data.order_index.unwrap_or(next);
        let module =
            Self::insert(&mut *tx, data.course_id, &data.title, order_index, data.kind).await?;

        tx.commit().await?;
        Ok(module)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: ModuleCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        sqlx::query("UPDATE modules SET title = $1, order_index = $2 WHERE id = $3")
            .bind(&data.title)
            .bind(order_index)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.title = data.title;
        self.order_index = order_index;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM modules WHERE id = $1")
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
        let result = sqlx::query_as(
            "SELECT id, course_id, title, order_index, kind FROM modules WHERE id = $1",
        )
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
            r#"
            SELECT id, course_id, title, order_index, kind
            FROM modules
            ORDER BY course_id, order_index, inserted_at
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

// Utils

impl Module {
    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT id, course_id, title, order_index, kind
            FROM modules
            WHERE course_id = $1
            ORDER BY order_index, inserted_at
            "#,
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}
