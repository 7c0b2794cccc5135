use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{Lesson, LessonCreate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::lessons::{LessonCreateBody, LessonPatchBody, LessonResponse},
        error::ErrorResponse,
        middlewares,
        routes::{check_title, ensure_module_visible},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(lessons_create_handler))
        .route(
            "/{id}",
            get(lessons_get_handler)
                .patch(lessons_update_handler)
                .delete(lessons_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/",
    description = "Adds a lesson to a content module",
    request_body = LessonCreateBody,
    responses(
        (status = 201, description = "Lesson created", body = LessonResponse),
        (status = 400, description = "Parent is missing or not a content module", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("cookie" = []), ("bearer" = []))
)]
async fn lessons_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<LessonCreateBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;
    check_title(Lesson::get_resource_type(), &payload.title)?;

    let created = Lesson::create(
        state.pool(),
        grant.actor(),
        LessonCreate {
            module_id: payload.module_id,
            title: payload.title.trim().to_string(),
            content: payload.content,
            order_index: payload.order_index,
            video_id: payload.video_id.filter(|id| !id.trim().is_empty()),
        },
    )
    .await
    .map_err(|e| WebError::from_database(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(LessonResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}",
    description = "Fetch comprehensive info about lesson including its content",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to get")
    ),
    responses(
        (status = 200, description = "Lesson found", body = LessonResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(("cookie" = []), ("bearer" = [])),
    tag = "lessons"
)]
async fn lessons_get_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Lesson::get_resource_type()))?;

    ensure_module_visible(state.pool(), user, lesson.module_id(), Lesson::get_resource_type())
        .await?;

    Ok((StatusCode::OK, Json(LessonResponse::from(lesson))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/lessons/{lesson_id}",
    description = "Edits a lesson",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    request_body = LessonPatchBody,
    responses(
        (status = 200, description = "Lesson updated", body = LessonResponse),
        (status = 400, description = "Invalid title", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(("cookie" = []), ("bearer" = [])),
    tag = "lessons"
)]
async fn lessons_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LessonPatchBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let found = Lesson::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Lesson::get_resource_type()))?;

    if let Some(title) = payload.title.as_deref() {
        check_title(Lesson::get_resource_type(), title)?;
    }

    let update = LessonCreate {
        module_id: found.module_id(),
        title: payload
            .title
            .map(|title| title.trim().to_string())
            .unwrap_or_else(|| found.title().to_string()),
        content: payload
            .content
            .unwrap_or_else(|| found.content().to_string()),
        order_index: payload.order_index,
        video_id: match payload.video_id {
            Some(id) if id.trim().is_empty() => None,
            Some(id) => Some(id),
            None => found.video_id().map(str::to_string),
        },
    };

    let updated = found
        .update(state.pool(), grant.actor(), update)
        .await
        .map_err(|e| WebError::from_database(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(LessonResponse::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{lesson_id}",
    description = "Deletes a lesson",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(("cookie" = []), ("bearer" = [])),
    tag = "lessons"
)]
async fn lessons_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let found = Lesson::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Lesson::get_resource_type()))?;

    found
        .delete(state.pool(), grant.actor())
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
