//! Request context, e.g. user id, its role, etc.
//!

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::web::{WebResult, error::WebError};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user_id: uuid::Uuid,
    user_role: UserRole,
}

impl AuthenticatedUser {
    pub fn new(user_id: uuid::Uuid, user_role: UserRole) -> Self {
        Self { user_id, user_role }
    }

    /// Internal actor for lookups done on behalf of the server itself.
    pub fn admin() -> Self {
        Self {
            user_role: UserRole::Admin,
            user_id: uuid::Uuid::max(),
        }
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.user_id
    }

    pub fn user_role(&self) -> UserRole {
        self.user_role
    }

    pub fn is_admin(&self) -> bool {
        self.user_role == UserRole::Admin
    }

    pub fn admin_grant(&self) -> Option<AdminGrant> {
        self.is_admin().then(|| AdminGrant {
            actor: self.clone(),
        })
    }
}

/// Proof that the holder is an administrator. Only obtainable from an
/// [`AuthenticatedUser`] with the admin role.
#[derive(Debug, Clone)]
pub struct AdminGrant {
    actor: AuthenticatedUser,
}

impl AdminGrant {
    pub fn user_id(&self) -> uuid::Uuid {
        self.actor.user_id
    }

    pub fn actor(&self) -> &AuthenticatedUser {
        &self.actor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Student,
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            _ => Self::Student,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    maybe_user: Option<AuthenticatedUser>,
}

impl RequestContext {
    pub fn new(maybe_user: Option<AuthenticatedUser>) -> Self {
        Self { maybe_user }
    }

    pub fn maybe_user(&self) -> Option<&AuthenticatedUser> {
        self.maybe_user.as_ref()
    }

    pub fn user(&self) -> WebResult<&AuthenticatedUser> {
        self.maybe_user.as_ref().ok_or(WebError::auth_required())
    }

    /// Writes are for admins only.
    pub fn require_admin(&self) -> WebResult<AdminGrant> {
        self.user()?
            .admin_grant()
            .ok_or(WebError::admin_required())
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>();
        if let Some(ctx) = ctx {
            Ok(ctx.clone())
        } else {
            Ok(RequestContext::new(None))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roles_parse_from_storage() {
        assert_eq!(UserRole::from("admin"), UserRole::Admin);
        assert_eq!(UserRole::from("student"), UserRole::Student);
        assert_eq!(UserRole::from("anything"), UserRole::Student);
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }

    #[test]
    fn only_admins_get_a_grant() {
        let id = uuid::Uuid::new_v4();
        let grant = AuthenticatedUser::new(id, UserRole::Admin).admin_grant().unwrap();
        assert_eq!(grant.user_id(), id);
        assert!(AuthenticatedUser::new(id, UserRole::Student).admin_grant().is_none());
    }

    #[test]
    fn anonymous_context_requires_auth() {
        let ctx = RequestContext::new(None);
        assert!(ctx.user().is_err());
        assert_eq!(
            ctx.require_admin().unwrap_err().status_code(),
            axum::http::StatusCode::UNAUTHORIZED
        );

        let student = RequestContext::new(Some(AuthenticatedUser::new(
            uuid::Uuid::new_v4(),
            UserRole::Student,
        )));
        assert_eq!(
            student.require_admin().unwrap_err().status_code(),
            axum::http::StatusCode::FORBIDDEN
        );
    }
}
