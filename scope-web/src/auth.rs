//! Authentication and session management
//!
//! Every page is gated by a login. Credentials are bcrypt hashes loaded from
//! configuration and sessions live in memory. The outcome of resolving a
//! request's session cookie is an explicit [`AuthState`] that the middleware
//! attaches to the request for handlers to read.

use crate::{templates::LoginTemplate, Error, Result};
use askama::Template;
use axum::{
    extract::{Request, State},
    http::{header::COOKIE, header::SET_COOKIE, HeaderMap, HeaderValue},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use tracing::{debug, info, warn};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "scope_session";

/// Paths reachable without a session
const PUBLIC_PATHS: [&str; 3] = ["/login", "/logout", "/api/health"];

/// An authenticated operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
}

/// Authentication state of one request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn username(&self) -> &str {
        self.user().map(|u| u.username.as_str()).unwrap_or("")
    }
}

/// Session data stored in memory
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new(username: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: generate_session_id(),
            username,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if session is valid (not expired)
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// In-memory session store
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    /// Create a new session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session
    pub fn store(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|e| {
            Error::Internal(anyhow::anyhow!("Failed to acquire session lock: {}", e))
        })?;
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    /// Retrieve a session by ID
    pub fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().map_err(|e| {
            Error::Internal(anyhow::anyhow!("Failed to acquire session lock: {}", e))
        })?;
        Ok(sessions.get(session_id).cloned())
    }

    /// Remove a session
    pub fn remove(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|e| {
            Error::Internal(anyhow::anyhow!("Failed to acquire session lock: {}", e))
        })?;
        sessions.remove(session_id);
        Ok(())
    }

    /// Clean up expired sessions
    pub fn cleanup_expired(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().map_err(|e| {
            Error::Internal(anyhow::anyhow!("Failed to acquire session lock: {}", e))
        })?;
        let now = Utc::now();
        let initial_count = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        Ok(initial_count - sessions.len())
    }
}

/// A configured operator account
#[derive(Debug, Clone, Deserialize)]
pub struct UserCredentials {
    pub username: String,
    /// bcrypt hash
    pub password_hash: String,
}

impl UserCredentials {
    /// Hash a plain password into a credential entry
    pub fn with_password(username: &str, password: &str, cost: u32) -> Result<Self> {
        let password_hash = bcrypt::hash(password, cost)
            .map_err(|e| Error::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?;
        Ok(Self {
            username: username.to_string(),
            password_hash,
        })
    }
}

/// Demo accounts used when no users are configured
pub fn demo_users(cost: u32) -> Result<Vec<UserCredentials>> {
    warn!("No users configured; enabling demo accounts 'admin' and 'user'");
    Ok(vec![
        UserCredentials::with_password("admin", "admin123", cost)?,
        UserCredentials::with_password("user", "user123", cost)?,
    ])
}

/// Credential check and session issuing
#[derive(Debug, Clone)]
pub struct AuthService {
    pub session_store: SessionStore,
    users: Arc<HashMap<String, UserCredentials>>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(users: Vec<UserCredentials>, session_ttl: Duration) -> Self {
        let users = users
            .into_iter()
            .map(|u| (u.username.clone(), u))
            .collect();
        Self {
            session_store: SessionStore::new(),
            users: Arc::new(users),
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// The single Anonymous -> Authenticated transition.
    ///
    /// Returns a new session when the credentials match a configured user.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<Session>> {
        let Some(user) = self.users.get(username) else {
            debug!("Login attempt for unknown user");
            return Ok(None);
        };

        match bcrypt::verify(password, &user.password_hash) {
            Ok(true) => {
                let session = Session::new(user.username.clone(), self.session_ttl);
                self.session_store.store(session.clone())?;
                info!(username = %user.username, "User logged in");
                Ok(Some(session))
            }
            Ok(false) => Ok(None),
            Err(e) => {
                warn!(username = %user.username, "Stored password hash is unusable: {}", e);
                Ok(None)
            }
        }
    }

    /// Resolve the auth state carried by a cookie header
    pub fn resolve(&self, cookie_header: Option<&str>) -> AuthState {
        let Some(session_id) = cookie_header.and_then(extract_session_id_from_cookie) else {
            return AuthState::Anonymous;
        };

        match self.session_store.get(&session_id) {
            Ok(Some(session)) if session.is_valid() => AuthState::Authenticated(User {
                username: session.username,
            }),
            Ok(Some(_)) => {
                // Remove expired session
                let _ = self.session_store.remove(&session_id);
                AuthState::Anonymous
            }
            Ok(None) => AuthState::Anonymous,
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                AuthState::Anonymous
            }
        }
    }

    /// Logout user (remove session)
    pub fn logout(&self, session_id: &str) -> Result<()> {
        self.session_store.remove(session_id)
    }
}

/// Generate a random session ID
fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| {
            let char_type = rng.gen_range(0..3);
            match char_type {
                0 => rng.gen_range(b'a'..=b'z') as char,
                1 => rng.gen_range(b'A'..=b'Z') as char,
                _ => rng.gen_range(b'0'..=b'9') as char,
            }
        })
        .collect()
}

/// Extract session ID from cookie header
fn extract_session_id_from_cookie(cookie_header: &str) -> Option<String> {
    cookie::Cookie::split_parse(cookie_header)
        .filter_map(|c| c.ok())
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(COOKIE).and_then(|v| v.to_str().ok())
}

/// Resolves the session of every request and gates protected paths.
///
/// Anonymous page requests are redirected to `/login`; anonymous API
/// requests get a 401.
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth = auth_service.resolve(cookie_header(request.headers()));
    let path = request.uri().path();

    if !auth.is_authenticated() && !PUBLIC_PATHS.contains(&path) {
        if path.starts_with("/api/") {
            return Error::Unauthorized.into_response();
        }
        return Redirect::to("/login").into_response();
    }

    request.extensions_mut().insert(auth);
    next.run(request).await
}

/// Login form data
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn render_login(product_name: &str, error: Option<&str>, warning: Option<&str>) -> Result<Html<String>> {
    let template = LoginTemplate {
        product_name: product_name.to_string(),
        error: error.map(str::to_string),
        warning: warning.map(str::to_string),
    };
    Ok(Html(template.render()?))
}

/// Login page handler
pub async fn login_page(State(state): State<crate::AppState>, headers: HeaderMap) -> Result<Response> {
    if state.auth.resolve(cookie_header(&headers)).is_authenticated() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(render_login(&state.settings.product_name, None, None)?.into_response())
}

/// Login form handler
pub async fn login_handler(
    State(state): State<crate::AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let product_name = &state.settings.product_name;
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Ok(render_login(product_name, None, Some("Please enter both username and password."))?.into_response());
    }

    // bcrypt verification blocks
    let auth = state.auth.clone();
    let username = form.username.trim().to_string();
    let session = tokio::task::spawn_blocking(move || auth.authenticate(&username, &form.password))
        .await
        .map_err(|e| Error::Internal(anyhow::anyhow!("Login task failed: {}", e)))??;

    match session {
        Some(session) => {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
                SESSION_COOKIE,
                session.id,
                state.auth.session_ttl().num_seconds(),
                if cfg!(feature = "secure_cookies") {
                    "; Secure"
                } else {
                    ""
                }
            );
            let mut response = Redirect::to("/").into_response();
            response.headers_mut().insert(
                SET_COOKIE,
                HeaderValue::from_str(&cookie)
                    .map_err(|e| Error::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))?,
            );
            Ok(response)
        }
        None => Ok(render_login(product_name, Some("Invalid username or password."), None)?.into_response()),
    }
}

/// Logout handler
pub async fn logout_handler(State(state): State<crate::AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = cookie_header(&headers).and_then(extract_session_id_from_cookie) {
        if let Err(e) = state.auth.logout(&session_id) {
            warn!("Failed to remove session: {}", e);
        }
    }

    let mut response = Redirect::to("/login").into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_static("scope_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    response
}
