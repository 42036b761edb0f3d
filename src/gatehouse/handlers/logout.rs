use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::instrument;

use super::{respond, Outcome};
use crate::gatehouse::{session::Flash, state::AppState};

#[utoipa::path(
    get,
    path = "/logout",
    responses (
        (status = 303, description = "Session cleared, redirect to the home page")
    ),
    tag = "auth",
)]
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let mut session = state.sessions().load(&headers);

    if session.is_authenticated() {
        session.empty();
        session.add_flash(Flash::notice("Goodbye!"));
    }

    respond(&state, session, Outcome::Redirect(""))
}
