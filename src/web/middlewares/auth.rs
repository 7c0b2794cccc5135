use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    Config, auth,
    auth::CryptError,
    model::{CrudRepository, ResourceTyped, entity::UserEntity},
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_TOKEN: &str = "SID";

/// Session token from the `SID` cookie, else from `Authorization: Bearer`.
fn find_token(cookies: &Cookies, req: &Request) -> Option<(String, &'static str)> {
    if let Some(cookie) = cookies.get(AUTH_TOKEN) {
        return Some((cookie.value().to_string(), AUTH_TOKEN));
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| (token.trim().to_string(), "Authorization"))
}

pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let Some((token, source_name)) = find_token(&cookies, &req) else {
        req.extensions_mut().insert(RequestContext::new(None));
        return Ok(next.run(req).await);
    };

    let claims = auth::process_token(&token, Config::get_or_init(false).await.app().jwt())
        .map_err(|e| WebError::auth_token_invalid(source_name, e.into()))?;

    let id = claims.claims.user_id().ok_or_else(|| {
        WebError::auth_token_invalid(
            source_name,
            CryptError::InvalidSubject(claims.claims.sub.clone()),
        )
    })?;

    let user = UserEntity::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    let ctx = user.map(|user| AuthenticatedUser::new(id, user.role()));
    req.extensions_mut().insert(RequestContext::new(ctx));
    Ok(next.run(req).await)
}
