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
        entity::{Module, ModuleCreate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::modules::{ModuleCreateBody, ModulePatchBody},
        error::ErrorResponse,
        middlewares,
        routes::check_title,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(modules_create_handler))
        .route(
            "/{id}",
            patch(modules_update_handler).delete(modules_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/modules/",
    description = "Adds a module to a course. Without `order_index` it goes after the last one",
    request_body = ModuleCreateBody,
    responses(
        (status = 201, description = "Module created", body = Module),
        (status = 400, description = "Invalid title or unknown course", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []), ("bearer" = []))
)]
async fn modules_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ModuleCreateBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;
    check_title(Module::get_resource_type(), &payload.title)?;

    let created = Module::create(
        state.pool(),
        grant.actor(),
        ModuleCreate {
            course_id: payload.course_id,
            title: payload.title.trim().to_string(),
            order_index: payload.order_index,
            kind: payload.kind,
        },
    )
    .await
    .map_err(|e| WebError::from_database(Module::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/modules/{module_id}",
    description = "Renames or reorders a module. Its kind cannot change",
    params(
        ("module_id" = Uuid, Path, description = "ID of the module")
    ),
    request_body = ModulePatchBody,
    responses(
        (status = 200, description = "Module updated", body = Module),
        (status = 400, description = "Invalid title", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []), ("bearer" = []))
)]
async fn modules_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModulePatchBody>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let found = Module::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Module::get_resource_type()))?;

    if let Some(title) = payload.title.as_deref() {
        check_title(Module::get_resource_type(), title)?;
    }

    let update = ModuleCreate {
        course_id: found.course_id(),
        title: payload
            .title
            .map(|title| title.trim().to_string())
            .unwrap_or_else(|| found.title().to_string()),
        order_index: payload.order_index.or(Some(found.order_index())),
        kind: found.kind(),
    };

    let updated = found
        .update(state.pool(), grant.actor(), update)
        .await
        .map_err(|e| WebError::from_database(Module::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/modules/{module_id}",
    description = "Deletes a module with its lessons or quiz",
    params(
        ("module_id" = Uuid, Path, description = "ID of the module")
    ),
    responses(
        (status = 200, description = "Module deleted"),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []), ("bearer" = []))
)]
async fn modules_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let grant = ctx.require_admin()?;

    let found = Module::find_by_id(state.pool(), grant.actor(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Module::get_resource_type()))?;

    found
        .delete(state.pool(), grant.actor())
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
