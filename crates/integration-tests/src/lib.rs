//! Integration tests for Gatehouse.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gatehouse-integration-tests
//! ```
//!
//! Each test starts a [`StubService`], an in-process account service
//! bound to an ephemeral port, and drives the real client crate against
//! it over HTTP. Nothing external is required.
//!
//! The stub speaks the same wire dialect as production deployments,
//! including the legacy `isApproved` field spelling on roster records,
//! so the client's normalization is exercised end to end.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use gatehouse_client::config::ClientConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

/// Email of the one admin account the stub accepts.
pub const ADMIN_EMAIL: &str = "root@example.com";
/// Password of the stub admin.
pub const ADMIN_PASSWORD: &str = "root-password";
/// Bearer token issued on admin login.
pub const ADMIN_TOKEN: &str = "stub-admin-token";
/// Password the stub accepts for any user login.
pub const USER_PASSWORD: &str = "user-password";
/// Bearer token issued on user login.
pub const USER_TOKEN: &str = "stub-user-token";
/// Reset token the stub always rejects as expired.
pub const EXPIRED_RESET_TOKEN: &str = "expired-token";

#[derive(Clone, Serialize)]
struct StubAccount {
    id: i64,
    username: String,
    email: String,
    // The spelling older deployments still emit.
    #[serde(rename = "isApproved")]
    is_approved: bool,
}

#[derive(Default)]
struct StubInner {
    accounts: Mutex<Vec<StubAccount>>,
    force_unauthorized: AtomicBool,
    list_delay_ms: AtomicU64,
    approve_delay_ms: AtomicU64,
    list_hits: AtomicU64,
    approve_hits: AtomicU64,
    delete_hits: AtomicU64,
}

impl StubInner {
    fn lock_accounts(&self) -> MutexGuard<'_, Vec<StubAccount>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Default)]
struct StubState {
    inner: Arc<StubInner>,
}

/// In-process account service for integration tests.
///
/// Seeded accounts, induced delays and forced 401s are all controlled
/// from the test body; route hit counters make "no request was sent"
/// assertions possible.
pub struct StubService {
    addr: SocketAddr,
    state: StubState,
    server: tokio::task::JoinHandle<()>,
}

impl StubService {
    /// Bind an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = StubState::default();
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub service");
        let addr = listener.local_addr().expect("Failed to read stub address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Stub service crashed");
        });
        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the running stub, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at the stub.
    ///
    /// The state directory only matters to tests that persist to disk;
    /// those should override it.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api_url: Url::parse(&self.base_url()).expect("Stub URL is valid"),
            state_dir: PathBuf::from(".gatehouse-test"),
            http_timeout: Duration::from_secs(5),
        }
    }

    /// Add an account to the roster. Its email is `{username}@example.com`.
    pub fn seed(&self, id: i64, username: &str, approved: bool) {
        self.state.inner.lock_accounts().push(StubAccount {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            is_approved: approved,
        });
    }

    /// Make every bearer-authorized route answer 401 from now on.
    pub fn force_unauthorized(&self, on: bool) {
        self.state
            .inner
            .force_unauthorized
            .store(on, Ordering::SeqCst);
    }

    /// Delay roster list responses by `ms` milliseconds.
    pub fn set_list_delay(&self, ms: u64) {
        self.state.inner.list_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Delay approval responses by `ms` milliseconds.
    pub fn set_approve_delay(&self, ms: u64) {
        self.state.inner.approve_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// How many times the roster list route was hit.
    #[must_use]
    pub fn list_hits(&self) -> u64 {
        self.state.inner.list_hits.load(Ordering::SeqCst)
    }

    /// How many times the approval route was hit.
    #[must_use]
    pub fn approve_hits(&self) -> u64 {
        self.state.inner.approve_hits.load(Ordering::SeqCst)
    }

    /// How many times the delete route was hit.
    #[must_use]
    pub fn delete_hits(&self) -> u64 {
        self.state.inner.delete_hits.load(Ordering::SeqCst)
    }

    /// Current approval state of `id`, if the account exists.
    #[must_use]
    pub fn is_approved(&self, id: i64) -> Option<bool> {
        self.state
            .inner
            .lock_accounts()
            .iter()
            .find(|account| account.id == id)
            .map(|account| account.is_approved)
    }

    /// Number of accounts currently registered.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.state.inner.lock_accounts().len()
    }
}

impl Drop for StubService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: StubState) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/admin/login", post(admin_login))
        .route("/api/signup", post(signup))
        .route("/api/forgot-password", post(forgot_password))
        .route("/api/reset-password/{token}", post(reset_password))
        .route("/api/admin/users", get(list_accounts))
        .route("/api/admin/users/{id}", delete(delete_account))
        .route("/api/admin/approve/{id}", post(approve_account))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct SignupBody {
    username: String,
    email: String,
    #[allow(dead_code)]
    password: String,
}

#[derive(Deserialize)]
struct ApproveBody {
    approved: bool,
}

#[derive(Deserialize)]
struct EmailBody {
    email: String,
}

#[derive(Deserialize)]
struct PasswordBody {
    #[allow(dead_code)]
    password: String,
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn admin_authorized(state: &StubState, headers: &HeaderMap) -> bool {
    if state.inner.force_unauthorized.load(Ordering::SeqCst) {
        return false;
    }
    bearer(headers) == Some(ADMIN_TOKEN)
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

async fn login(State(state): State<StubState>, Json(body): Json<LoginBody>) -> Response {
    let account = state
        .inner
        .lock_accounts()
        .iter()
        .find(|account| account.email == body.email)
        .cloned();

    match account {
        Some(account) if body.password == USER_PASSWORD => Json(json!({
            "token": USER_TOKEN,
            "user": {
                "id": account.id,
                "username": account.username,
                "email": account.email,
                "isApproved": account.is_approved,
                "role": "user",
            },
        }))
        .into_response(),
        _ => error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn admin_login(Json(body): Json<LoginBody>) -> Response {
    if body.email == ADMIN_EMAIL && body.password == ADMIN_PASSWORD {
        Json(json!({
            "token": ADMIN_TOKEN,
            "user": {
                "username": "root",
                "email": ADMIN_EMAIL,
                "is_approved": true,
                "role": "admin",
            },
        }))
        .into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "Invalid credentials")
    }
}

async fn signup(State(state): State<StubState>, Json(body): Json<SignupBody>) -> Response {
    let mut accounts = state.inner.lock_accounts();
    if accounts.iter().any(|account| account.email == body.email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": [ { "msg": "Email already in use" } ] })),
        )
            .into_response();
    }

    let id = accounts.iter().map(|account| account.id).max().unwrap_or(0) + 1;
    accounts.push(StubAccount {
        id,
        username: body.username,
        email: body.email,
        is_approved: false,
    });

    (
        StatusCode::CREATED,
        Json(json!({ "message": "Signup successful" })),
    )
        .into_response()
}

async fn forgot_password(State(state): State<StubState>, Json(body): Json<EmailBody>) -> Response {
    let known = state
        .inner
        .lock_accounts()
        .iter()
        .any(|account| account.email == body.email);

    if known {
        Json(json!({ "message": "Reset link sent" })).into_response()
    } else {
        error(StatusCode::NOT_FOUND, "User not found")
    }
}

async fn reset_password(Path(token): Path<String>, Json(_body): Json<PasswordBody>) -> Response {
    if token == EXPIRED_RESET_TOKEN {
        return error(StatusCode::BAD_REQUEST, "Invalid or expired token");
    }
    Json(json!({ "message": "Password updated" })).into_response()
}

async fn list_accounts(State(state): State<StubState>, headers: HeaderMap) -> Response {
    state.inner.list_hits.fetch_add(1, Ordering::SeqCst);

    if !admin_authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    // Snapshot before the delay so a slow response carries the data from
    // when the request arrived.
    let snapshot = state.inner.lock_accounts().clone();
    pause(state.inner.list_delay_ms.load(Ordering::SeqCst)).await;

    Json(snapshot).into_response()
}

async fn approve_account(
    State(state): State<StubState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<ApproveBody>,
) -> Response {
    state.inner.approve_hits.fetch_add(1, Ordering::SeqCst);
    pause(state.inner.approve_delay_ms.load(Ordering::SeqCst)).await;

    if !admin_authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let mut accounts = state.inner.lock_accounts();
    match accounts.iter_mut().find(|account| account.id == id) {
        Some(account) => {
            account.is_approved = body.approved;
            Json(json!({ "message": "Approval updated" })).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn delete_account(
    State(state): State<StubState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    state.inner.delete_hits.fetch_add(1, Ordering::SeqCst);

    if !admin_authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let mut accounts = state.inner.lock_accounts();
    let before = accounts.len();
    accounts.retain(|account| account.id != id);

    if accounts.len() == before {
        error(StatusCode::NOT_FOUND, "User not found")
    } else {
        Json(json!({ "message": "User deleted" })).into_response()
    }
}
