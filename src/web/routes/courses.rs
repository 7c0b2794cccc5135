use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    generation::{CourseRequest, ModuleRequest},
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped,
        detail::CourseDetail,
        entity::{Course, CourseCreate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::courses::{
            CourseGeneratedResponse, CoursePatchBody, GenerateCourseBody, GenerateModuleBody,
            ModuleGeneratedResponse,
        },
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, check_title, visible_course},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(courses_list_handler))
        .route("/generate", post(courses_generate_handler))
        .route(
            "/{id}",
            get(courses_get_handler)
                .patch(courses_update_handler)
                .delete(courses_delete_handler),
        )
        .route("/{id}/generate-module", post(courses_generate_module_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/",
    description = "Page of courses. Students only see published ones",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<Course>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn courses_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let courses = Course::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/generate",
    description = "Generates a whole course from a topic prompt and stores it as a draft",
    request_body = GenerateCourseBody,
    responses(
        (status = 201, description = "Course generated", body = CourseGeneratedResponse),
        (status = 400, description = "Invalid generation request", body = ErrorResponse),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 500, description = "Generation failed, nothing was saved", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn courses_generate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<GenerateCourseBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;
    let request = CourseRequest::from(payload);

    let (course, report) = state
        .generator()
        .generate_course(state.pool(), &grant, &request)
        .await?;

    let course = CourseDetail::fetch(state.pool(), grant.actor(), course)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((
        StatusCode::CREATED,
        Json(CourseGeneratedResponse { course, report }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}",
    description = "Full course tree: modules in order with their lessons or quiz",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Course found", body = CourseDetail),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn courses_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = visible_course(state.pool(), user, id).await?;

    let detail = CourseDetail::fetch(state.pool(), user, course)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(detail)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/courses/{course_id}",
    description = "Renames or (un)publishes a course",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    request_body = CoursePatchBody,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid title", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn courses_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CoursePatchBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;
    let actor = grant.actor();

    let found = Course::find_by_id(state.pool(), actor, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Course::get_resource_type()))?;

    if let Some(title) = payload.title.as_deref() {
        check_title(Course::get_resource_type(), title)?;
    }

    let update = CourseCreate {
        title: payload
            .title
            .map(|title| title.trim().to_string())
            .unwrap_or_else(|| found.title().to_string()),
        created_by: found.created_by(),
        status: payload.status.unwrap_or(found.status()),
    };

    let updated = found
        .update(state.pool(), actor, update)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    tracing::info!(course_id = %updated.id(), status = %updated.status(), "course updated");
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{course_id}",
    description = "Deletes a course with all its modules, lessons and quizzes",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn courses_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let found = Course::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Course::get_resource_type()))?;

    found
        .delete(state.pool(), grant.actor())
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/generate-module",
    description = "Generates one content or assessment module and appends it to the course",
    params(
        ("course_id" = Uuid, Path, description = "ID of the course")
    ),
    request_body = GenerateModuleBody,
    responses(
        (status = 201, description = "Module generated", body = ModuleGeneratedResponse),
        (status = 400, description = "Invalid generation request", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Generation failed, nothing was saved", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []), ("bearer" = []))
)]
async fn courses_generate_module_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateModuleBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let course = Course::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Course::get_resource_type()))?;

    let request = ModuleRequest::from(payload);
    let (module, report) = state
        .generator()
        .generate_module(state.pool(), &grant, &course, &request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ModuleGeneratedResponse { module, report }),
    ))
}
