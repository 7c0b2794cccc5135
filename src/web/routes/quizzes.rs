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
        CrudRepository, ModelManager, ResourceTyped,
        detail::QuizDetail,
        entity::{Question, Quiz, QuizCreate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::quizzes::{QuizCheckRequest, QuizCheckResponse, QuizCreateBody, QuizPatchBody},
        error::ErrorResponse,
        middlewares,
        routes::{check_title, ensure_module_visible},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(quizzes_create_handler))
        .route("/{id}", get(quizzes_get_handler).patch(quizzes_update_handler))
        .route("/{id}/check", post(quizzes_check_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Quiz `id` if its course is visible to `user`.
async fn find_visible(mm: &ModelManager, user: &AuthenticatedUser, id: Uuid) -> WebResult<Quiz> {
    let quiz = Quiz::find_by_id(mm, user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Quiz::get_resource_type()))?;

    ensure_module_visible(mm, user, quiz.module_id(), Quiz::get_resource_type()).await?;
    Ok(quiz)
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/",
    description = "Attaches a quiz to an assessment module that has none yet",
    request_body = QuizCreateBody,
    responses(
        (status = 201, description = "Quiz created", body = Quiz),
        (status = 400, description = "Parent is missing or not an assessment module", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 409, description = "The module already has a quiz", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn quizzes_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreateBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;
    check_title(Quiz::get_resource_type(), &payload.title)?;

    let created = Quiz::create(
        state.pool(),
        grant.actor(),
        QuizCreate {
            module_id: payload.module_id,
            title: payload.title.trim().to_string(),
        },
    )
    .await
    .map_err(|e| WebError::from_database(Quiz::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{quiz_id}",
    description = "Quiz with its questions in order",
    params(
        ("quiz_id" = Uuid, Path, description = "ID of the quiz")
    ),
    responses(
        (status = 200, description = "Quiz found", body = QuizDetail),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn quizzes_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = find_visible(state.pool(), user, id).await?;

    let detail = QuizDetail::fetch(state.pool(), user, &quiz)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(detail)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/quizzes/{quiz_id}",
    description = "Renames a quiz",
    params(
        ("quiz_id" = Uuid, Path, description = "ID of the quiz")
    ),
    request_body = QuizPatchBody,
    responses(
        (status = 200, description = "Quiz updated", body = Quiz),
        (status = 400, description = "Invalid title", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn quizzes_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuizPatchBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;
    check_title(Quiz::get_resource_type(), &payload.title)?;

    let found = Quiz::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Quiz::get_resource_type()))?;

    let update = QuizCreate {
        module_id: found.module_id(),
        title: payload.title.trim().to_string(),
    };
    let updated = found
        .update(state.pool(), grant.actor(), update)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{quiz_id}/check",
    description = "Scores submitted answers against the quiz",
    params(
        ("quiz_id" = Uuid, Path, description = "ID of the quiz")
    ),
    request_body = QuizCheckRequest,
    responses(
        (status = 200, description = "Answers checked", body = QuizCheckResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []), ("bearer" = []))
)]
async fn quizzes_check_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<QuizCheckRequest>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = find_visible(state.pool(), user, id).await?;

    let questions = Question::all_by_quizzes(state.pool(), user, &[quiz.id()])
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    let graded = QuizCheckResponse::grade(&questions, &req.answers);
    tracing::debug!(quiz_id = %quiz.id(), score = graded.score, total = graded.total, "quiz checked");

    Ok((StatusCode::OK, Json(graded)))
}
