//! Page handlers.
//!
//! Every handler loads the session from the request cookie, decides an
//! [`Outcome`] and hands both to [`respond`], which renders or redirects and
//! writes the whole session back into `Set-Cookie` on the same response.

use axum::{
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::Value;
use tracing::{error, warn};

use super::{
    csrf,
    error::GENERIC_ERROR,
    session::Session,
    state::AppState,
    view::{flashes_value, View},
};

pub mod about;
pub mod health;
pub mod index;
pub mod login;
pub mod logout;
pub mod register;

#[cfg(test)]
mod tests;

/// How a request ends.
#[derive(Debug)]
pub(super) enum Outcome {
    Render(View),
    /// Path relative to the base URI; `""` is the home page.
    Redirect(&'static str),
}

/// Turn an outcome into a response and persist `session` on it.
pub(super) fn respond(state: &AppState, mut session: Session, outcome: Outcome) -> Response {
    let mut response = match outcome {
        Outcome::Render(view) => render(state, &mut session, view),
        Outcome::Redirect(path) => {
            Redirect::to(&format!("{}{path}", state.config().base_uri())).into_response()
        }
    };

    match state.sessions().cookie(&session) {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to persist session: {err}"),
    }

    response
}

fn render(state: &AppState, session: &mut Session, mut view: View) -> Response {
    let token = match csrf::issue(session) {
        Ok(token) => token,
        Err(err) => {
            error!("{err:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR).into_response();
        }
    };

    let flashes = session.take_flashes();
    let vars = view.vars_mut();
    vars.insert("base_uri".into(), state.config().base_uri().into());
    vars.insert(csrf::TOKEN_FIELD.into(), token.into());
    vars.insert("flashes".into(), flashes_value(&flashes));
    if let Some(site_key) = state.captcha().site_key() {
        vars.insert("recaptcha_site_key".into(), site_key.into());
    }
    if session.is_authenticated() {
        vars.insert("auth_level".into(), "auth".into());
        vars.insert(
            "display_name".into(),
            session.first_name().map_or(Value::Null, Value::from),
        );
    } else {
        vars.insert("auth_level".into(), "anon".into());
    }

    match state.views().render(view.name(), view.vars()) {
        Ok(html) => axum::response::Html(html).into_response(),
        Err(err) => {
            error!("Failed to render {}: {err}", view.name());
            // Not shown, so keep them for the next page.
            for flash in flashes {
                session.add_flash(flash);
            }
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR).into_response()
        }
    }
}

/// Response for a POST whose anti-forgery token does not match the session.
/// The session cookie is left untouched.
pub(super) fn reject_forgery(path: &str) -> Response {
    warn!("Invalid anti-forgery token on {path}");
    (StatusCode::FORBIDDEN, "Invalid token").into_response()
}

/// Extract a client IP from common proxy headers.
pub(super) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = value.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return Some(first.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
