use crate::impl_paginatable_for;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::{AuthenticatedUser, UserRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl From<&str> for CourseStatus {
    fn from(value: &str) -> Self {
        match value {
            "published" => Self::Published,
            _ => Self::Draft,
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    title: String,
    created_by: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CourseCreate {
    pub title: String,
    pub created_by: Uuid,
    pub status: CourseStatus,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_by(&self) -> Uuid {
        self.created_by
    }

    pub fn status(&self) -> CourseStatus {
        CourseStatus::from(self.status.as_str())
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    /// Students only ever see published courses.
    pub fn visible_to(&self, actor: &AuthenticatedUser) -> bool {
        actor.user_role() == UserRole::Admin || self.status() == CourseStatus::Published
    }

    pub(crate) async fn insert<'e, E>(executor: E, data: &CourseCreate) -> DatabaseResult<Self>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let course = sqlx::query_as(
            r#"
            INSERT INTO courses (id, title, created_by, status)
            VALUES ($1,$2,$3,$4)
            RETURNING id, title, created_by, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(data.created_by)
        .bind(data.status.as_str())
        .fetch_one(executor)
        .await?;

        Ok(course)
    }
}

#[async_trait]
impl CrudRepository<Course, CourseCreate, Uuid> for Course {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        Self::insert(mm.executor(), &data).await
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE courses SET title = $1, status = $2 WHERE id = $3")
            .bind(&data.title)
            .bind(data.status.as_str())
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.title = data.title;
        self.status = data.status.to_string();
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
            "SELECT id, title, created_by, status, created_at FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(mm.executor())
        .await?;

        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT id, title, created_by, status, created_at
            FROM courses
            WHERE $1 OR status = 'published'
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(actor.user_role() == UserRole::Admin)
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE $1 OR status = 'published'")
                .bind(actor.user_role() == UserRole::Admin)
                .fetch_one(mm.executor())
                .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Course, CourseCreate, Uuid);

#[cfg(test)]
mod test {
    use super::*;

    fn course(status: CourseStatus) -> Course {
        Course {
            id: Uuid::new_v4(),
            title: String::from("Rust"),
            created_by: Uuid::new_v4(),
            status: status.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!(CourseStatus::from("published"), CourseStatus::Published);
        assert_eq!(CourseStatus::from("draft"), CourseStatus::Draft);
        assert_eq!(CourseStatus::from("garbage"), CourseStatus::Draft);
        assert_eq!(CourseStatus::Published.to_string(), "published");
    }

    #[test]
    fn drafts_hidden_from_students() {
        let student = AuthenticatedUser::new(Uuid::new_v4(), UserRole::Student);
        let admin = AuthenticatedUser::new(Uuid::new_v4(), UserRole::Admin);

        assert!(!course(CourseStatus::Draft).visible_to(&student));
        assert!(course(CourseStatus::Published).visible_to(&student));
        assert!(course(CourseStatus::Draft).visible_to(&admin));
    }
}
