use crate::{
    Config,
    model::{
        CrudRepository, DatabaseResult, ModelManager, ResourceType,
        entity::{Course, Module},
    },
    web::{AppState, AuthenticatedUser, WebError, WebResult, doc::ApiDoc},
};
use axum::Router;
use serde::Deserialize;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub mod courses;
pub mod lessons;
pub mod modules;
pub mod questions;
pub mod quizzes;
pub mod user;

const MAX_PAGE_SIZE: i64 = 100;

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

impl PaginationQuery {
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

pub fn build_app<S: Send + Sync + Clone + 'static>(
    state: AppState,
    config: &'static Config,
) -> Router<S> {
    let mut router = Router::new()
        .nest("/api/v1/account/", user::routes(state.clone()))
        .nest("/api/v1/courses/", courses::routes(state.clone()))
        .nest("/api/v1/modules/", modules::routes(state.clone()))
        .nest("/api/v1/lessons/", lessons::routes(state.clone()))
        .nest("/api/v1/quizzes/", quizzes::routes(state.clone()))
        .nest("/api/v1/questions/", questions::routes(state.clone()))
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    if config.app().docs() {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}

/// Rejects titles the store would refuse.
pub(crate) fn check_title(r#type: ResourceType, title: &str) -> WebResult<()> {
    let length = title.trim().chars().count();
    if length == 0 || length > crate::generation::MAX_TITLE_CHARS {
        return Err(WebError::resource_bad_request(
            r#type,
            format!(
                "title must be between 1 and {} characters",
                crate::generation::MAX_TITLE_CHARS
            ),
        ));
    }
    Ok(())
}

/// The course `id` as seen by `user`. Drafts are invisible to students.
pub(crate) async fn visible_course(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<Course> {
    let found = Course::find_by_id(mm, user, id).await;
    visible_or_not_found(found, user, ResourceType::Course)
}

/// Hidden and missing courses both read as not found for `r#type`; lookup
/// failures stay server errors.
fn visible_or_not_found(
    found: DatabaseResult<Option<Course>>,
    user: &AuthenticatedUser,
    r#type: ResourceType,
) -> WebResult<Course> {
    found
        .map_err(|e| WebError::resource_fetch_error(ResourceType::Course, e))?
        .filter(|course| course.visible_to(user))
        .ok_or(WebError::resource_not_found(r#type))
}

/// Fails with not-found unless module `id`'s course is visible to `user`.
pub(crate) async fn ensure_module_visible(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    id: Uuid,
    r#type: ResourceType,
) -> WebResult<Module> {
    let module = Module::find_by_id(mm, user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(ResourceType::Module, e))?
        .ok_or(WebError::resource_not_found(r#type.clone()))?;

    let course = Course::find_by_id(mm, user, module.course_id()).await;
    visible_or_not_found(course, user, r#type)?;

    Ok(module)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::DatabaseError;
    use axum::http::StatusCode;

    #[test]
    fn pagination_defaults_and_bounds() {
        let query: PaginationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!((query.limit(), query.offset()), (20, 0));

        let query: PaginationQuery = serde_json::from_str(r#"{"limit": 5000, "offset": -3}"#).unwrap();
        assert_eq!((query.limit(), query.offset()), (MAX_PAGE_SIZE, 0));
    }

    #[test]
    fn course_lookup_failure_is_not_a_missing_resource() {
        let student = AuthenticatedUser::new(Uuid::new_v4(), crate::web::UserRole::Student);

        let err = visible_or_not_found(
            Err(DatabaseError::SqlxError(sqlx::Error::PoolTimedOut)),
            &student,
            ResourceType::Lesson,
        )
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = visible_or_not_found(Ok(None), &student, ResourceType::Lesson).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("lesson"));
    }

    #[test]
    fn titles_are_bounded() {
        assert!(check_title(ResourceType::Module, "Intro").is_ok());
        assert!(check_title(ResourceType::Module, "   ").is_err());
        assert!(check_title(ResourceType::Module, &"x".repeat(201)).is_err());
    }
}
