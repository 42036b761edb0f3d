use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::instrument;

use super::{respond, Outcome};
use crate::gatehouse::{state::AppState, view::View};

#[utoipa::path(
    get,
    path = "/about",
    responses (
        (status = 200, description = "About page", body = String, content_type = "text/html")
    ),
    tag = "pages",
)]
#[instrument(skip_all)]
pub async fn about(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let session = state.sessions().load(&headers);
    respond(&state, session, Outcome::Render(View::new("about/about")))
}
