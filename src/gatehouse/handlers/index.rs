use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::instrument;

use super::{respond, Outcome};
use crate::gatehouse::{state::AppState, view::View};

#[utoipa::path(
    get,
    path = "/",
    responses (
        (status = 200, description = "Home page", body = String, content_type = "text/html")
    ),
    tag = "pages",
)]
#[instrument(skip_all)]
pub async fn index(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let session = state.sessions().load(&headers);
    let view = if session.is_authenticated() {
        View::new("index/auth")
    } else {
        View::new("index/anon")
    };
    respond(&state, session, Outcome::Render(view))
}
