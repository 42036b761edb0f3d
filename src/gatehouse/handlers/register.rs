use axum::{
    extract::{Extension, Form},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{extract_client_ip, reject_forgery, respond, Outcome};
use crate::gatehouse::{
    csrf,
    error::{require, AuthError},
    session::{Flash, Session},
    state::AppState,
    store::{NewUser, StoreError},
    throttle,
    view::View,
};

const TEMPLATE: &str = "register/register";

#[derive(ToSchema, Deserialize, Default)]
pub struct RegisterForm {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default, rename = "g-recaptcha-response")]
    recaptcha_response: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/register",
    responses (
        (status = 200, description = "Registration form", body = String, content_type = "text/html")
    ),
    tag = "auth",
)]
#[instrument(skip_all)]
pub async fn register_get(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let session = state.sessions().load(&headers);
    respond(&state, session, Outcome::Render(View::new(TEMPLATE)))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Registration form re-rendered with a flash", body = String, content_type = "text/html"),
        (status = 303, description = "Account created, redirect to the login page"),
        (status = 403, description = "Invalid anti-forgery token", body = String)
    ),
    tag = "auth",
)]
#[instrument(skip_all)]
pub async fn register_post(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    form: Option<Form<RegisterForm>>,
) -> Response {
    let mut session = state.sessions().load(&headers);
    let form = form.map(|Form(form)| form).unwrap_or_default();

    if !csrf::verify(&session, form.token.as_deref()) {
        return reject_forgery("/register");
    }

    let remote_ip = extract_client_ip(&headers);
    let outcome = register(&state, &mut session, &form, remote_ip.as_deref()).await;
    respond(&state, session, outcome)
}

async fn register(
    state: &AppState,
    session: &mut Session,
    form: &RegisterForm,
    remote_ip: Option<&str>,
) -> Outcome {
    if throttle::is_register_blocked(session) {
        info!("Brute force register prevented");
        return Outcome::Redirect("register");
    }

    // The password is never echoed back.
    let view = View::new(TEMPLATE).repopulate(&[
        ("first_name", form.first_name.as_deref()),
        ("last_name", form.last_name.as_deref()),
        ("email", form.email.as_deref()),
    ]);

    let [first_name, last_name, email, password] = match require([
        ("first_name", form.first_name.as_deref()),
        ("last_name", form.last_name.as_deref()),
        ("email", form.email.as_deref()),
        ("password", form.password.as_deref()),
    ]) {
        Ok(fields) => fields,
        Err(err) => {
            session.add_flash(err.report());
            return Outcome::Render(view);
        }
    };

    match state
        .captcha()
        .verify(form.recaptcha_response.as_deref(), remote_ip)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            session.add_flash(Flash::error("reCAPTCHA invalid!"));
            return Outcome::Render(view);
        }
        Err(err) => {
            session.add_flash(AuthError::infrastructure(err).report());
            return Outcome::Render(view);
        }
    }

    let hash = match state.passhash().hash(password) {
        Ok(hash) => hash,
        Err(err) => {
            session.add_flash(AuthError::infrastructure(err).report());
            return Outcome::Redirect("register");
        }
    };

    match state.store().fetch_id_by_email(email).await {
        Err(StoreError::NotFound) => {}
        Ok(_) => {
            session.add_flash(AuthError::Conflict(email.to_string()).report());
            return Outcome::Render(view);
        }
        Err(err) => {
            session.add_flash(AuthError::infrastructure(err).report());
            return Outcome::Render(view);
        }
    }

    let user = NewUser {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        password: hash,
    };

    match state.store().insert(user).await {
        Ok(()) => {
            info!("Account created for {email}");
            session.add_flash(Flash::success(format!(
                "Account created successfully for: {email}"
            )));
            Outcome::Redirect("login")
        }
        // Lost a race with a concurrent registration of the same email.
        Err(StoreError::Conflict) => {
            session.add_flash(AuthError::Conflict(email.to_string()).report());
            Outcome::Render(view)
        }
        Err(err) => {
            session.add_flash(AuthError::infrastructure(err).report());
            Outcome::Render(view)
        }
    }
}
