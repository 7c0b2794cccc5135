use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{patch, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{Question, QuestionCreate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::quizzes::{QuestionCreateBody, QuestionPatchBody},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(questions_create_handler))
        .route(
            "/{id}",
            patch(questions_update_handler).delete(questions_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn check_question(data: &QuestionCreate) -> Result<(), WebError> {
    if data.question_text.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Question::get_resource_type(),
            "question text is required",
        ));
    }
    if data.options.is_empty() || !data.options.contains(&data.correct_answer) {
        return Err(WebError::resource_bad_request(
            Question::get_resource_type(),
            "correct answer must be one of the options",
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/questions/",
    description = "Adds a multiple-choice question to a quiz",
    request_body = QuestionCreateBody,
    responses(
        (status = 201, description = "Question created", body = Question),
        (status = 400, description = "Unknown quiz or answer not among options", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "questions",
    security(("cookie" = []), ("bearer" = []))
)]
async fn questions_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreateBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let data = QuestionCreate {
        quiz_id: payload.quiz_id,
        question_text: payload.question_text,
        options: payload.options,
        correct_answer: payload.correct_answer,
        order_index: payload.order_index,
    };
    check_question(&data)?;

    let created = Question::create(state.pool(), grant.actor(), data)
        .await
        .map_err(|e| WebError::from_database(Question::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/questions/{question_id}",
    description = "Edits a question",
    params(
        ("question_id" = Uuid, Path, description = "ID of the question")
    ),
    request_body = QuestionPatchBody,
    responses(
        (status = 200, description = "Question updated", body = Question),
        (status = 400, description = "Answer not among options", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "questions",
    security(("cookie" = []), ("bearer" = []))
)]
async fn questions_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionPatchBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let found = Question::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Question::get_resource_type()))?;

    let data = QuestionCreate {
        quiz_id: found.quiz_id(),
        question_text: payload
            .question_text
            .unwrap_or_else(|| found.question_text().to_string()),
        options: payload.options.unwrap_or_else(|| found.options().to_vec()),
        correct_answer: payload
            .correct_answer
            .unwrap_or_else(|| found.correct_answer().to_string()),
        order_index: payload.order_index,
    };
    check_question(&data)?;

    let updated = found
        .update(state.pool(), grant.actor(), data)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/questions/{question_id}",
    description = "Deletes a question",
    params(
        ("question_id" = Uuid, Path, description = "ID of the question")
    ),
    responses(
        (status = 200, description = "Question deleted"),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "questions",
    security(("cookie" = []), ("bearer" = []))
)]
async fn questions_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let found = Question::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Question::get_resource_type()))?;

    found
        .delete(state.pool(), grant.actor())
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
