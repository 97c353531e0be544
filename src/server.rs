//!
//! nexusgate HTTP server
//! ---------------------
//! This module defines the Axum-based HTTP boundary in front of the
//! credential & role gate.
//!
//! Responsibilities:
//! - Compose the gate once at startup: identity store, verification path
//!   (local or external, from configuration) and session manager.
//! - Login/logout endpoints with an HttpOnly session cookie.
//! - Signup endpoint applying the registration intake rules.
//! - Session introspection (`/me`) for the dashboards to ask who is logged in.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::{get, post}, Router, extract::State, Json};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::identity::{
    AuthDecision, CredentialGate, CredentialVerifier, DenyReason, LocalVerifier,
    MemoryIdentityStore, NewIdentity, RegisterError, RestVerifier, Role, SessionManager,
};

const SESSION_COOKIE: &str = "nexus_session";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<CredentialGate>,
    pub store: Arc<MemoryIdentityStore>,
    pub config: Arc<Config>,
}

/// Start the nexusgate HTTP server. Builds the store, seeds the first admin
/// when the store is empty, fixes the verification path from configuration
/// and mounts all routes.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(MemoryIdentityStore::new(config.email_domain.clone()));
    if store.is_empty() {
        let admin = store.seed_admin(&config.seed_admin_email, &config.seed_admin_password)?;
        info!(target: "startup", "seeded first admin account email={}", admin.email);
    }

    let sessions = SessionManager::new(Duration::from_secs(config.session_ttl_secs));
    let verifier: Arc<dyn CredentialVerifier> = match &config.external_provider {
        Some(p) => {
            info!(target: "startup", "credential verification: external provider at {}", p.base_url);
            Arc::new(RestVerifier::new(p.base_url.clone(), p.api_key.clone()))
        }
        None => {
            info!(target: "startup", "credential verification: local identity store");
            Arc::new(LocalVerifier::new(store.clone()))
        }
    };
    let gate = Arc::new(CredentialGate::new(store.clone(), verifier, sessions));

    let http_port = config.http_port;
    let state = AppState { gate, store, config: Arc::new(config) };

    let app = Router::new()
        .route("/", get(|| async { "nexusgate ok" }))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/signup", post(signup))
        .route("/me", get(me))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    info!(target: "startup", "listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
    // The login form defaults to the student role when none is picked.
    #[serde(default = "default_role")]
    role: String,
}

#[derive(Debug, Deserialize)]
struct SignupPayload {
    username: String,
    email: String,
    password: String,
    #[serde(default = "default_role")]
    role: String,
    #[serde(default)]
    department: String,
    #[serde(default)]
    student_id: Option<String>,
}

fn default_role() -> String {
    "student".to_string()
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

fn set_session_cookie(token: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!("{}={}; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE, token)).unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE)).unwrap()
}

fn deny_error(reason: DenyReason) -> AppError {
    match reason {
        // One code and one message for both, so the response cannot be used
        // to probe which emails have accounts.
        DenyReason::UnknownIdentity | DenyReason::BadSecret => {
            AppError::auth("invalid_credentials", reason.user_message())
        }
        DenyReason::RoleMismatch => AppError::forbidden("role_mismatch", reason.user_message()),
        DenyReason::ProviderUnavailable => {
            AppError::unavailable("provider_unavailable", reason.user_message())
        }
    }
}

fn error_response(err: &AppError, retryable: bool) -> (StatusCode, HeaderMap, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        HeaderMap::new(),
        Json(json!({"status": "error", "code": err.code_str(), "error": err.message(), "retryable": retryable})),
    )
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> impl IntoResponse {
    match state.gate.authenticate(&payload.email, &payload.password, &payload.role).await {
        AuthDecision::Granted { principal, destination, session } => {
            let mut headers = HeaderMap::new();
            headers.insert("Set-Cookie", set_session_cookie(&session.token));
            (
                StatusCode::OK,
                headers,
                Json(json!({
                    "status": "ok",
                    "username": principal.username,
                    "role": principal.role,
                    "redirect": destination.path(),
                })),
            )
        }
        AuthDecision::Denied { reason } => error_response(&deny_error(reason), reason.retryable()),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = parse_cookie(&headers, SESSION_COOKIE) {
        state.gate.sessions().logout(&token);
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (StatusCode::OK, h, Json(json!({"status": "ok"})))
}

async fn signup(State(state): State<AppState>, Json(payload): Json<SignupPayload>) -> impl IntoResponse {
    let Some(role) = Role::parse(&payload.role) else {
        return error_response(&AppError::user("invalid_role", "Unknown role."), false);
    };
    let new = NewIdentity {
        email: payload.email,
        username: payload.username,
        password: payload.password,
        role,
        department: payload.department,
        student_id: payload.student_id,
    };
    match state.store.register(new) {
        Ok(identity) => (
            StatusCode::CREATED,
            HeaderMap::new(),
            Json(json!({
                "status": "ok",
                "email": identity.email,
                "username": identity.username,
                "role": identity.role,
                "verified": identity.verified,
            })),
        ),
        Err(e) => {
            let err = match &e {
                RegisterError::DomainNotAllowed(_) => AppError::user("email_domain", e.to_string()),
                RegisterError::EmailTaken => AppError::conflict("email_taken", e.to_string()),
                RegisterError::UsernameTaken => AppError::conflict("username_taken", e.to_string()),
                RegisterError::StudentIdTaken => AppError::conflict("student_id_taken", e.to_string()),
                RegisterError::Hashing(_) => AppError::internal("hashing", e.to_string()),
            };
            error_response(&err, false)
        }
    }
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(token) = parse_cookie(&headers, SESSION_COOKIE) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status": "unauthorized"})));
    };
    match state.gate.sessions().validate(&token) {
        Some(p) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "email": p.email, "username": p.username, "role": p.role})),
        ),
        None => (StatusCode::UNAUTHORIZED, Json(json!({"status": "unauthorized"}))),
    }
}
