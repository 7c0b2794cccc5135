use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::middlewares::AUTH_TOKEN;

pub struct SessionAuthModifier;

impl Modify for SessionAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    AUTH_TOKEN,
                    "JWT token for current user",
                ))),
            );
            schema.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::user::user_signup_handler,
        crate::web::routes::user::user_signin_handler,
        crate::web::routes::user::user_verify_handler,
        crate::web::routes::courses::courses_list_handler,
        crate::web::routes::courses::courses_generate_handler,
        crate::web::routes::courses::courses_get_handler,
        crate::web::routes::courses::courses_update_handler,
        crate::web::routes::courses::courses_delete_handler,
        crate::web::routes::courses::courses_generate_module_handler,
        crate::web::routes::modules::modules_create_handler,
        crate::web::routes::modules::modules_update_handler,
        crate::web::routes::modules::modules_delete_handler,
        crate::web::routes::lessons::lessons_create_handler,
        crate::web::routes::lessons::lessons_get_handler,
        crate::web::routes::lessons::lessons_update_handler,
        crate::web::routes::lessons::lessons_delete_handler,
        crate::web::routes::quizzes::quizzes_create_handler,
        crate::web::routes::quizzes::quizzes_get_handler,
        crate::web::routes::quizzes::quizzes_update_handler,
        crate::web::routes::quizzes::quizzes_check_handler,
        crate::web::routes::questions::questions_create_handler,
        crate::web::routes::questions::questions_update_handler,
        crate::web::routes::questions::questions_delete_handler,
    ),
    modifiers(&SessionAuthModifier),
    tags(
        (name = "account", description = "Sign up, sign in and session checks"),
        (name = "courses", description = "Course browsing, editing and generation"),
        (name = "modules", description = "Module editing"),
        (name = "lessons", description = "Lesson reading and editing"),
        (name = "quizzes", description = "Quizzes and answer checking"),
        (name = "questions", description = "Quiz question editing"),
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_lists_generation_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/courses/generate"));
        assert!(doc.paths.paths.contains_key("/api/v1/quizzes/{quiz_id}/check"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("cookie"));
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
