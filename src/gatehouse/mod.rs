use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, services::ServeDir, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod captcha;
mod config;
pub mod csrf;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod passhash;
pub mod session;
pub mod state;
pub mod store;
pub mod throttle;
pub mod view;

pub use self::config::{redact_dsn, Config};

use self::{
    captcha::Recaptcha,
    handlers::{about, health, index, login, logout, register},
    passhash::Argon2Passhash,
    state::AppState,
    store::PgUserStore,
    view::HandlebarsView,
};

/// Build the application router around `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(state.config().static_root());

    Router::new()
        .route("/", get(index::index))
        .route("/about", get(about::about))
        .route("/login", get(login::login_get).post(login::login_post))
        .route(
            "/register",
            get(register::register_get).post(register::register_post),
        )
        .route("/logout", get(logout::logout))
        .route("/health", get(health::health))
        .nest_service("/static", static_files)
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Returns an error if a dependency cannot be initialized or the server fails to start
pub async fn new(config: Config) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(config.dsn())
        .await
        .context("Failed to connect to database")?;

    let views = HandlebarsView::load(Path::new(config.template_root()), config.base_uri())
        .with_context(|| format!("Failed to load templates from {}", config.template_root()))?;

    let captcha = Recaptcha::new(&config).context("Failed to build reCAPTCHA client")?;

    let port = config.port();

    let state = AppState::new(
        config,
        Arc::new(PgUserStore::new(pool)),
        Arc::new(Argon2Passhash),
        Arc::new(captcha),
        Arc::new(views),
    )?;

    let app = router(Arc::new(state));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        method = %request.method(),
        route,
        request_id
    )
}
