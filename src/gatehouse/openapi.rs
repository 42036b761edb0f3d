use utoipa::{openapi::Tag, OpenApi};

use super::handlers::{about, health, index, login, logout, register};

#[derive(OpenApi)]
#[openapi(
    paths(
        index::index,
        about::about,
        login::login_get,
        login::login_post,
        register::register_get,
        register::register_post,
        logout::logout,
        health::health,
    ),
    components(schemas(login::LoginForm, register::RegisterForm, health::Health))
)]
struct ApiDoc;

/// `OpenAPI` document for every served route. Static files and the 404
/// fallback are not documented.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    doc.tags = Some(
        [
            ("auth", "Registration, login and logout"),
            ("pages", "Informational pages"),
            ("health", "Liveness and database status"),
        ]
        .into_iter()
        .map(|(name, description)| {
            let mut tag = Tag::new(name);
            tag.description = Some(description.to_string());
            tag
        })
        .collect(),
    );

    doc
}
