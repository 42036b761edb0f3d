//! Handler tests driving the full router with in-memory collaborators.

use super::extract_client_ip;
use crate::gatehouse::{
    captcha::{CaptchaError, CaptchaVerifier},
    csrf,
    error::{GENERIC_ERROR, MAX_FIELD_LEN},
    passhash::{HashError, Passhash},
    router,
    session::{Flash, Session},
    state::AppState,
    store::{memory::MemoryUserStore, STATUS_ACTIVE},
    view::{HandlebarsView, Renderer, ViewError, ViewVars},
    Config,
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, Request, StatusCode,
    },
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tower::ServiceExt;

const STATUS_INACTIVE: i16 = 2;
const PASSWORD: &str = "correct horse";

/// Renders the template name and variables as JSON so tests can inspect them.
struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, name: &str, vars: &ViewVars) -> Result<String, ViewError> {
        Ok(json!({ "template": name, "vars": vars }).to_string())
    }
}

/// Fails the first `failures` renders, then behaves like [`JsonRenderer`].
struct FlakyRenderer {
    failures: AtomicUsize,
}

impl Renderer for FlakyRenderer {
    fn render(&self, name: &str, vars: &ViewVars) -> Result<String, ViewError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ViewError::Io(std::io::Error::other("template root vanished")));
        }
        JsonRenderer.render(name, vars)
    }
}

/// Reversible stand-in for Argon2; fails every `hash` call after the first
/// `ok_hashes` when configured to.
struct PlainPasshash {
    calls: AtomicUsize,
    ok_hashes: usize,
}

impl PlainPasshash {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            ok_hashes: usize::MAX,
        }
    }

    fn failing_after(ok_hashes: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            ok_hashes,
        }
    }
}

impl Passhash for PlainPasshash {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_hashes {
            return Err(HashError::new("out of memory"));
        }
        Ok(plain(password))
    }

    fn matches(&self, hash: &str, candidate: &str) -> bool {
        hash == plain(candidate)
    }
}

fn plain(password: &str) -> String {
    format!("plain${password}")
}

/// `Some(verdict)` answers every check, `None` fails like an unreachable service.
struct FixedCaptcha(Option<bool>);

#[async_trait]
impl CaptchaVerifier for FixedCaptcha {
    fn site_key(&self) -> Option<&str> {
        None
    }

    async fn verify(
        &self,
        _response: Option<&str>,
        _remote_ip: Option<&str>,
    ) -> Result<bool, CaptchaError> {
        match self.0 {
            Some(verdict) => Ok(verdict),
            None => {
                let err = reqwest::Client::new()
                    .get("not a url")
                    .build()
                    .expect_err("invalid url");
                Err(CaptchaError::Transport(err))
            }
        }
    }
}

fn config() -> Config {
    Config::new(
        "postgres://localhost/gatehouse".to_string(),
        SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
    )
    .with_session_name("sid".to_string())
}

fn seeded(status_id: i16) -> MemoryUserStore {
    MemoryUserStore::default().with_user("a@example.com", "Ada", &plain(PASSWORD), status_id)
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Reply {
    fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    fn page(&self) -> Value {
        serde_json::from_str(&self.body).expect("json page")
    }

    fn template(&self) -> String {
        self.page()["template"].as_str().unwrap_or_default().to_string()
    }

    fn var(&self, key: &str) -> Value {
        self.page()["vars"][key].clone()
    }

    fn flashes(&self) -> Vec<String> {
        self.var("flashes")
            .as_array()
            .map(|flashes| {
                flashes
                    .iter()
                    .filter_map(|f| f["message"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A browser: keeps the session cookie and the last anti-forgery token.
struct Client {
    app: Router,
    state: Arc<AppState>,
    cookie: Option<String>,
    token: Option<String>,
}

impl Client {
    fn new(store: Arc<MemoryUserStore>) -> Self {
        Self::with(store, PlainPasshash::new(), FixedCaptcha(Some(true)))
    }

    fn with(store: Arc<MemoryUserStore>, passhash: PlainPasshash, captcha: FixedCaptcha) -> Self {
        Self::with_views(store, passhash, captcha, Arc::new(JsonRenderer))
    }

    fn with_views(
        store: Arc<MemoryUserStore>,
        passhash: PlainPasshash,
        captcha: FixedCaptcha,
        views: Arc<dyn Renderer>,
    ) -> Self {
        let state = Arc::new(
            AppState::new(config(), store, Arc::new(passhash), Arc::new(captcha), views)
                .expect("state"),
        );
        Self {
            app: router(state.clone()),
            state,
            cookie: None,
            token: None,
        }
    }

    /// Replace the browser cookie with one carrying `session`.
    fn set_session(&mut self, session: &Session) {
        let cookie = self.state.sessions().cookie(session).expect("cookie");
        self.cookie = cookie_pair(&cookie);
    }

    async fn get(&mut self, path: &str) -> Reply {
        let request = self.request("GET", path).body(Body::empty()).expect("request");
        self.send(request).await
    }

    /// POST `fields` plus the current anti-forgery token.
    async fn post(&mut self, path: &str, fields: &[(&str, &str)]) -> Reply {
        let token = self.token.clone().unwrap_or_default();
        let mut fields = fields.to_vec();
        fields.push(("token", token.as_str()));
        self.post_raw(path, &fields).await
    }

    async fn post_raw(&mut self, path: &str, fields: &[(&str, &str)]) -> Reply {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request("POST", path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder
    }

    async fn send(&mut self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = String::from_utf8_lossy(&bytes).into_owned();

        if let Some(cookie) = headers.get(SET_COOKIE) {
            self.cookie = cookie_pair(cookie);
        }
        if let Ok(page) = serde_json::from_str::<Value>(&body) {
            if let Some(token) = page["vars"]["token"].as_str() {
                self.token = Some(token.to_string());
            }
        }

        Reply {
            status,
            headers,
            body,
        }
    }

    async fn login(&mut self, email: &str, password: &str) -> Reply {
        self.get("/login").await;
        self.post("/login", &[("email", email), ("password", password)])
            .await
    }
}

fn cookie_pair(set_cookie: &HeaderValue) -> Option<String> {
    set_cookie
        .to_str()
        .ok()
        .and_then(|raw| raw.split(';').next())
        .map(str::to_string)
}

fn registration<'a>(email: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("first_name", "Ada"),
        ("last_name", "Lovelace"),
        ("email", email),
        ("password", PASSWORD),
        ("g-recaptcha-response", "human"),
    ]
}

#[tokio::test]
async fn login_form_renders_with_token() {
    let mut client = Client::new(Arc::new(MemoryUserStore::default()));
    let reply = client.get("/login").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.template(), "login/login");
    assert_eq!(reply.var("auth_level"), "anon");
    assert!(reply.var("token").as_str().is_some_and(|t| !t.is_empty()));
    assert!(reply.headers.get(SET_COOKIE).is_some());
}

#[tokio::test]
async fn successful_login_redirects_home_with_identity() {
    let mut client = Client::new(Arc::new(seeded(STATUS_ACTIVE)));

    let reply = client.login("a@example.com", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), Some("/"));

    let home = client.get("/").await;
    assert_eq!(home.template(), "index/auth");
    assert_eq!(home.var("auth_level"), "auth");
    assert_eq!(home.var("display_name"), "Ada");
    assert_eq!(home.flashes(), vec!["Login successful!"]);

    // Flashes are shown once.
    assert!(client.get("/").await.flashes().is_empty());
}

#[tokio::test]
async fn five_wrong_passwords_block_the_sixth_attempt() {
    let store = Arc::new(seeded(STATUS_ACTIVE));
    let mut client = Client::new(store.clone());
    client.get("/login").await;

    for attempt in 1..=5 {
        let reply = client
            .post("/login", &[("email", "a@example.com"), ("password", "wrong")])
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            reply.flashes(),
            vec![format!("Password is incorrect - Attempt: {attempt}")]
        );
    }
    let lookups = store.lookups();

    let reply = client
        .post("/login", &[("email", "a@example.com"), ("password", PASSWORD)])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.template(), "login/login");
    assert_eq!(reply.flashes(), vec!["Password is incorrect - Attempt: 6"]);
    assert_eq!(store.lookups(), lookups, "blocked login must not hit the store");

    // The shown count keeps advancing exactly like a wrong password would.
    let reply = client
        .post("/login", &[("email", "a@example.com"), ("password", "wrong")])
        .await;
    assert_eq!(reply.flashes(), vec!["Password is incorrect - Attempt: 7"]);
    assert_eq!(store.lookups(), lookups);

    assert_eq!(client.get("/").await.template(), "index/anon");
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let mut unknown = Client::new(Arc::new(seeded(STATUS_ACTIVE)));
    let mut wrong = Client::new(Arc::new(seeded(STATUS_ACTIVE)));

    let a = unknown.login("nobody@example.com", "wrong").await;
    let b = wrong.login("a@example.com", "wrong").await;

    assert_eq!(a.status, b.status);
    assert_eq!(a.template(), b.template());
    assert_eq!(a.flashes(), b.flashes());
    assert_eq!(a.flashes(), vec!["Password is incorrect - Attempt: 1"]);
}

#[tokio::test]
async fn inactive_account_never_authenticates_nor_counts() {
    let mut client = Client::new(Arc::new(seeded(STATUS_INACTIVE)));

    let reply = client.login("a@example.com", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.flashes(),
        vec!["Account is inactive so login is disabled."]
    );

    let reply = client
        .post("/login", &[("email", "a@example.com"), ("password", "wrong")])
        .await;
    assert_eq!(reply.flashes(), vec!["Password is incorrect - Attempt: 1"]);

    assert_eq!(client.get("/").await.template(), "index/anon");
}

#[tokio::test]
async fn missing_password_repopulates_email_only() {
    let mut client = Client::new(Arc::new(seeded(STATUS_ACTIVE)));
    client.get("/login").await;

    let reply = client
        .post("/login", &[("email", "a@example.com"), ("password", "")])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.flashes(), vec!["Field missing: password"]);
    assert_eq!(reply.var("email"), "a@example.com");
    assert_eq!(reply.var("password"), Value::Null);
}

#[tokio::test]
async fn store_failure_on_login_shows_generic_error() {
    let store = Arc::new(seeded(STATUS_ACTIVE));
    store.fail();
    let mut client = Client::new(store);

    let reply = client.login("a@example.com", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.flashes(), vec![GENERIC_ERROR]);
}

#[tokio::test]
async fn store_failure_on_login_does_not_count_as_attempt() {
    let store = Arc::new(seeded(STATUS_ACTIVE));
    let mut client = Client::new(store.clone());
    client.get("/login").await;

    store.fail();
    for _ in 0..3 {
        let reply = client
            .post("/login", &[("email", "a@example.com"), ("password", "wrong")])
            .await;
        assert_eq!(reply.flashes(), vec![GENERIC_ERROR]);
    }

    store.recover();
    let reply = client
        .post("/login", &[("email", "a@example.com"), ("password", "wrong")])
        .await;
    assert_eq!(reply.flashes(), vec!["Password is incorrect - Attempt: 1"]);
}

#[tokio::test]
async fn flashes_survive_a_failed_render() {
    let mut client = Client::with_views(
        Arc::new(MemoryUserStore::default()),
        PlainPasshash::new(),
        FixedCaptcha(Some(true)),
        Arc::new(FlakyRenderer {
            failures: AtomicUsize::new(1),
        }),
    );

    let mut session = Session::default();
    session.add_flash(Flash::success("Account created successfully for: a@example.com"));
    client.set_session(&session);

    let reply = client.get("/about").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, GENERIC_ERROR);
    assert!(reply.headers.get(SET_COOKIE).is_some());

    let reply = client.get("/about").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.flashes(),
        vec!["Account created successfully for: a@example.com"]
    );
    assert!(client.get("/about").await.flashes().is_empty());
}

#[tokio::test]
async fn successful_login_resets_the_counter() {
    let mut client = Client::new(Arc::new(seeded(STATUS_ACTIVE)));
    client.login("a@example.com", "wrong").await;
    client
        .post("/login", &[("email", "a@example.com"), ("password", "wrong")])
        .await;
    let reply = client
        .post("/login", &[("email", "a@example.com"), ("password", PASSWORD)])
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);

    client.get("/logout").await;
    let reply = client.login("a@example.com", "wrong").await;
    assert_eq!(reply.flashes(), vec!["Password is incorrect - Attempt: 1"]);
}

#[tokio::test]
async fn logout_clears_identity() {
    let mut client = Client::new(Arc::new(seeded(STATUS_ACTIVE)));
    client.login("a@example.com", PASSWORD).await;

    let reply = client.get("/logout").await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), Some("/"));

    let home = client.get("/").await;
    assert_eq!(home.template(), "index/anon");
    assert_eq!(home.var("display_name"), Value::Null);
    assert_eq!(home.flashes(), vec!["Goodbye!"]);
}

#[tokio::test]
async fn logout_without_session_is_safe() {
    let mut client = Client::new(Arc::new(MemoryUserStore::default()));

    let reply = client.get("/logout").await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), Some("/"));
    assert!(client.get("/").await.flashes().is_empty());
}

#[tokio::test]
async fn registration_creates_account_and_redirects_to_login() {
    let store = Arc::new(MemoryUserStore::default());
    let mut client = Client::new(store.clone());
    client.get("/register").await;

    let reply = client
        .post("/register", &registration("a@example.com"))
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), Some("/login"));
    assert_eq!(store.count("a@example.com"), 1);

    let login = client.get("/login").await;
    assert_eq!(
        login.flashes(),
        vec!["Account created successfully for: a@example.com"]
    );

    // The stored password is the hash, never the plaintext.
    let reply = client.login("a@example.com", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn duplicate_registration_keeps_one_record() {
    let store = Arc::new(seeded(STATUS_ACTIVE));
    let mut client = Client::new(store.clone());
    client.get("/register").await;

    let reply = client
        .post("/register", &registration("a@example.com"))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.template(), "register/register");
    assert_eq!(
        reply.flashes(),
        vec!["Account already exists for: a@example.com"]
    );
    assert_eq!(reply.var("first_name"), "Ada");
    assert_eq!(reply.var("password"), Value::Null);
    assert_eq!(store.count("a@example.com"), 1);
}

#[tokio::test]
async fn registration_requires_every_field() {
    let store = Arc::new(MemoryUserStore::default());
    let mut client = Client::new(store.clone());
    client.get("/register").await;

    let reply = client
        .post(
            "/register",
            &[
                ("first_name", "Ada"),
                ("email", "a@example.com"),
                ("password", PASSWORD),
            ],
        )
        .await;
    assert_eq!(reply.flashes(), vec!["Field missing: last_name"]);
    assert_eq!(reply.var("email"), "a@example.com");
    assert_eq!(store.count("a@example.com"), 0);
}

#[tokio::test]
async fn oversized_fields_are_rejected_before_the_store() {
    let store = Arc::new(seeded(STATUS_ACTIVE));
    let mut client = Client::new(store.clone());
    let long_email = format!("{}@example.com", "a".repeat(200));

    let reply = client.login(&long_email, PASSWORD).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.flashes(), vec!["Field too long: email"]);
    assert_eq!(store.lookups(), 0);

    client.get("/register").await;
    let long_name = "A".repeat(MAX_FIELD_LEN + 1);
    let reply = client
        .post(
            "/register",
            &[
                ("first_name", long_name.as_str()),
                ("last_name", "Lovelace"),
                ("email", "b@example.com"),
                ("password", PASSWORD),
                ("g-recaptcha-response", "human"),
            ],
        )
        .await;
    assert_eq!(reply.flashes(), vec!["Field too long: first_name"]);
    assert_eq!(store.count("b@example.com"), 0);
    assert_eq!(store.lookups(), 0);
}

#[tokio::test]
async fn longest_accepted_fields_fit_in_the_session_cookie() {
    let store = Arc::new(MemoryUserStore::default());
    let mut client = Client::new(store.clone());
    let email = format!("{}@example.com", "e".repeat(MAX_FIELD_LEN - 12));
    let name = "N".repeat(MAX_FIELD_LEN);
    let password = "p".repeat(MAX_FIELD_LEN);

    client.get("/register").await;
    let reply = client
        .post(
            "/register",
            &[
                ("first_name", name.as_str()),
                ("last_name", name.as_str()),
                ("email", email.as_str()),
                ("password", password.as_str()),
                ("g-recaptcha-response", "human"),
            ],
        )
        .await;
    assert_eq!(reply.location(), Some("/login"));

    let reply = client.login(&email, &password).await;
    assert_eq!(reply.location(), Some("/"));
    let cookie = reply.headers.get(SET_COOKIE).expect("session cookie");
    assert!(cookie.len() < 4096, "cookie is {} bytes", cookie.len());
}

#[tokio::test]
async fn rejected_captcha_blocks_registration() {
    let store = Arc::new(MemoryUserStore::default());
    let mut client = Client::with(store.clone(), PlainPasshash::new(), FixedCaptcha(Some(false)));
    client.get("/register").await;

    let reply = client
        .post("/register", &registration("a@example.com"))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.flashes(), vec!["reCAPTCHA invalid!"]);
    assert_eq!(store.count("a@example.com"), 0);
}

#[tokio::test]
async fn unreachable_captcha_service_shows_generic_error() {
    let store = Arc::new(MemoryUserStore::default());
    let mut client = Client::with(store.clone(), PlainPasshash::new(), FixedCaptcha(None));
    client.get("/register").await;

    let reply = client
        .post("/register", &registration("a@example.com"))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.flashes(), vec![GENERIC_ERROR]);
    assert_eq!(store.count("a@example.com"), 0);
}

#[tokio::test]
async fn hash_failure_redirects_back_to_register() {
    let store = Arc::new(MemoryUserStore::default());
    // The first hash is the startup dummy hash.
    let mut client = Client::with(
        store.clone(),
        PlainPasshash::failing_after(1),
        FixedCaptcha(Some(true)),
    );
    client.get("/register").await;

    let reply = client
        .post("/register", &registration("a@example.com"))
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), Some("/register"));
    assert_eq!(store.count("a@example.com"), 0);

    assert_eq!(client.get("/register").await.flashes(), vec![GENERIC_ERROR]);
}

#[tokio::test]
async fn store_failure_on_register_shows_generic_error() {
    let store = Arc::new(MemoryUserStore::default());
    let mut client = Client::new(store.clone());
    client.get("/register").await;
    store.fail();

    let reply = client
        .post("/register", &registration("a@example.com"))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.template(), "register/register");
    assert_eq!(reply.flashes(), vec![GENERIC_ERROR]);
}

#[tokio::test]
async fn blocked_register_session_is_redirected() {
    let store = Arc::new(MemoryUserStore::default());
    let mut client = Client::new(store.clone());

    let mut session = Session::default();
    session.register_attempts = 5;
    let token = csrf::issue(&mut session).expect("token");
    client.set_session(&session);
    client.token = Some(token);

    let reply = client
        .post("/register", &registration("a@example.com"))
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), Some("/register"));
    assert_eq!(store.count("a@example.com"), 0);
    assert!(client.get("/register").await.flashes().is_empty());
}

#[tokio::test]
async fn post_without_matching_token_is_forbidden() {
    let store = Arc::new(seeded(STATUS_ACTIVE));
    let mut client = Client::new(store.clone());

    // No form was ever rendered for this browser.
    let reply = client
        .post_raw(
            "/login",
            &[("email", "a@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body, "Invalid token");

    client.get("/register").await;
    let reply = client
        .post_raw(
            "/register",
            &[("email", "a@example.com"), ("token", "forged")],
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(store.lookups(), 0);
}

#[tokio::test]
async fn tampered_cookie_starts_a_fresh_session() {
    let mut client = Client::new(Arc::new(seeded(STATUS_ACTIVE)));
    client.login("a@example.com", PASSWORD).await;

    client.cookie = client.cookie.take().map(|c| format!("{c}x"));
    assert_eq!(client.get("/").await.template(), "index/anon");
}

#[tokio::test]
async fn health_reports_database_status() {
    let store = Arc::new(MemoryUserStore::default());
    let mut client = Client::new(store.clone());

    let reply = client.get("/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.page()["database"], "ok");
    assert_eq!(reply.page()["name"], env!("CARGO_PKG_NAME"));
    assert!(reply
        .headers
        .get("X-App")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(env!("CARGO_PKG_NAME"))));

    store.fail();
    let reply = client.get("/health").await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.page()["database"], "error");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let mut client = Client::new(Arc::new(MemoryUserStore::default()));
    let reply = client.get("/nope").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn about_page_renders() {
    let mut client = Client::new(Arc::new(MemoryUserStore::default()));
    let reply = client.get("/about").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.template(), "about/about");
}

#[tokio::test]
async fn shipped_templates_carry_token_and_flashes() {
    let views = HandlebarsView::load(
        &Path::new(env!("CARGO_MANIFEST_DIR")).join("template"),
        "/",
    )
    .expect("templates");
    let mut client = Client::with_views(
        Arc::new(seeded(STATUS_ACTIVE)),
        PlainPasshash::new(),
        FixedCaptcha(Some(true)),
        Arc::new(views),
    );

    let reply = client.get("/login").await;
    assert_eq!(reply.status, StatusCode::OK);
    let token = reply
        .body
        .split(r#"name="token" value=""#)
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .expect("token field")
        .to_string();
    assert!(!token.is_empty());

    client.token = Some(token);
    let reply = client
        .post("/login", &[("email", "a@example.com"), ("password", "wrong")])
        .await;
    assert!(reply.body.contains("Password is incorrect - Attempt: 1"));
    assert!(reply.body.contains(r#"value="a@example.com""#));
}

#[test]
fn client_ip_prefers_forwarded_for() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
    assert_eq!(extract_client_ip(&headers).as_deref(), Some("10.0.0.2"));

    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
    );
    assert_eq!(extract_client_ip(&headers).as_deref(), Some("203.0.113.7"));

    assert_eq!(extract_client_ip(&HeaderMap::new()), None);
}
