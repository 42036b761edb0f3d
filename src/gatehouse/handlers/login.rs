use axum::{
    extract::{Extension, Form},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::{reject_forgery, respond, Outcome};
use crate::gatehouse::{
    csrf,
    error::{require, AuthError},
    session::{Flash, Session},
    state::AppState,
    store::StoreError,
    throttle,
    view::View,
};

const TEMPLATE: &str = "login/login";

#[derive(ToSchema, Deserialize, Default)]
pub struct LoginForm {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/login",
    responses (
        (status = 200, description = "Login form", body = String, content_type = "text/html")
    ),
    tag = "auth",
)]
#[instrument(skip_all)]
pub async fn login_get(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let session = state.sessions().load(&headers);
    respond(&state, session, Outcome::Render(View::new(TEMPLATE)))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Login form re-rendered with a flash", body = String, content_type = "text/html"),
        (status = 303, description = "Logged in, redirect to the home page"),
        (status = 403, description = "Invalid anti-forgery token", body = String)
    ),
    tag = "auth",
)]
#[instrument(skip_all)]
pub async fn login_post(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    form: Option<Form<LoginForm>>,
) -> Response {
    let mut session = state.sessions().load(&headers);
    let form = form.map(|Form(form)| form).unwrap_or_default();

    if !csrf::verify(&session, form.token.as_deref()) {
        return reject_forgery("/login");
    }

    let outcome = login(&state, &mut session, &form).await;
    respond(&state, session, outcome)
}

async fn login(state: &AppState, session: &mut Session, form: &LoginForm) -> Outcome {
    let view = View::new(TEMPLATE).repopulate(&[("email", form.email.as_deref())]);

    // Blocked sessions never reach the store and look like a wrong password,
    // counter included.
    if throttle::is_blocked(session) {
        info!("Brute force login prevented");
        failed_attempt(session);
        return Outcome::Render(view);
    }

    let [email, password] = match require([
        ("email", form.email.as_deref()),
        ("password", form.password.as_deref()),
    ]) {
        Ok(fields) => fields,
        Err(err) => {
            session.add_flash(err.report());
            return Outcome::Render(view);
        }
    };

    let user = match state.store().fetch_by_email(email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            // Same cost as a real comparison so timing does not reveal the miss.
            let _ = state.passhash().matches(state.dummy_hash(), password);
            failed_attempt(session);
            return Outcome::Render(view);
        }
        Err(err) => {
            session.add_flash(AuthError::infrastructure(err).report());
            return Outcome::Render(view);
        }
    };

    if !state.passhash().matches(&user.password, password) {
        failed_attempt(session);
        return Outcome::Render(view);
    }

    if !user.is_active() {
        debug!("Login refused for inactive account {}", user.id);
        session.add_flash(Flash::notice("Account is inactive so login is disabled."));
        return Outcome::Render(view);
    }

    session.empty();
    session.authenticate(user.id, user.email, user.first_name);
    session.add_flash(Flash::success("Login successful!"));
    info!("User {} logged in", user.id);

    Outcome::Redirect("")
}

fn failed_attempt(session: &mut Session) {
    let attempts = throttle::record_attempt(session);
    session.add_flash(incorrect_password(attempts));
}

fn incorrect_password(attempts: u32) -> Flash {
    Flash::warning(format!("Password is incorrect - Attempt: {attempts}"))
}
