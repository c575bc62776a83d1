use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
#[cfg(feature = "web")]
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
#[cfg(feature = "web")]
use log::info;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

#[cfg(feature = "web")]
use crate::app::SharedState;
use crate::config::UserEntry;
use crate::error::AuthError;
#[cfg(feature = "web")]
use crate::error::AppResult;
#[cfg(feature = "web")]
use crate::store::TabularStore;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// What an authenticated user may do
///
/// Configuration strings map as follows: `owner` (or `patron`) is the
/// reporting role; anything else is a data-entry user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Role {
    Standard,
    Owner,
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "owner" | "patron" => Role::Owner,
            _ => Role::Standard,
        }
    }
}

impl Role {
    /// Landing page of the role's view
    pub fn home(self) -> &'static str {
        match self {
            Role::Standard => "/entry",
            Role::Owner => "/report",
        }
    }
}

/// An authenticated user for the current conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub expires_at: SystemTime,
}

impl Session {
    fn new(username: &str, role: Role) -> Self {
        Session {
            username: username.to_string(),
            role,
            expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at <= SystemTime::now()
    }
}

/// Static username -> (password, role) table loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    users: HashMap<String, UserEntry>,
}

impl UserTable {
    pub fn new(users: HashMap<String, UserEntry>) -> Self {
        let table = UserTable { users };
        let plaintext = table.plaintext_users();
        if !plaintext.is_empty() {
            warn!(
                "{} user(s) have plaintext passwords in the configuration; store Argon2 hashes instead: {}",
                plaintext.len(),
                plaintext.join(", ")
            );
        }
        table
    }

    /// Usernames whose configured password is not an Argon2 hash, sorted
    pub fn plaintext_users(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .users
            .iter()
            .filter(|(_, entry)| !is_password_hash(&entry.password))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Check a username/password pair
    ///
    /// Succeeds only when the user exists and the password matches. Every
    /// other case is `InvalidCredentials`, whichever part was wrong.
    ///
    /// # Arguments
    /// * `username` - Username typed on the login form
    /// * `password` - Password typed on the login form
    ///
    /// # Returns
    /// * `Result<Session, AuthError>` - A session carrying the configured role
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let entry = self
            .users
            .get(username)
            .ok_or(AuthError::InvalidCredentials)?;

        if verify_password(password, &entry.password) {
            Ok(Session::new(username, entry.role))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn is_password_hash(stored: &str) -> bool {
    stored.starts_with("$argon2")
}

/// Verify a password against the configured value
///
/// Argon2 PHC strings are verified with Argon2; anything else is compared
/// as plaintext.
fn verify_password(password: &str, stored: &str) -> bool {
    if !is_password_hash(stored) {
        return password == stored;
    }

    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            warn!("ignoring malformed Argon2 hash in user table");
            false
        }
    }
}

/// Live sessions keyed by an opaque id
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `session` and return its id
    pub fn insert(&self, session: Session) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(session_id.clone(), session);
        session_id
    }

    /// The session for `session_id`, if present and not expired
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(session_id)
            .filter(|s| !s.is_expired())
            .cloned()
    }

    /// Discard a session. Returns the removed session, if any.
    pub fn logout(&self, session_id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Login form data
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Resolve the session named by the request's cookie
#[cfg(feature = "web")]
pub fn current_session(sessions: &SessionStore, jar: &CookieJar) -> Option<Session> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| sessions.get(cookie.value()))
}

/// Gate a view on a role
///
/// No session sends the user to the login page; a session with another
/// role sends the user to their own view.
#[cfg(feature = "web")]
pub fn require_role(session: Option<Session>, role: Role) -> Result<Session, Redirect> {
    match session {
        None => Err(Redirect::to("/login")),
        Some(session) if session.role != role => Err(Redirect::to(session.role.home())),
        Some(session) => Ok(session),
    }
}

/// Root: forward to the login page or the user's own view
#[cfg(feature = "web")]
pub async fn serve_home<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
) -> Redirect {
    match current_session(&state.sessions, &jar) {
        Some(session) => Redirect::to(session.role.home()),
        None => Redirect::to("/login"),
    }
}

/// Serve the login page
#[cfg(feature = "web")]
pub async fn serve_login_page<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
) -> AppResult<Response> {
    if let Some(session) = current_session(&state.sessions, &jar) {
        return Ok(Redirect::to(session.role.home()).into_response());
    }
    Ok(state
        .pages
        .login(&LoginForm::default(), None)?
        .into_response())
}

/// Handle login form submissions
///
/// A valid pair creates a session, sets the cookie and redirects to the
/// role's view. Anything else re-renders the form with an error.
#[cfg(feature = "web")]
pub async fn handle_login<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
    Form(credentials): Form<LoginForm>,
) -> AppResult<Response> {
    match state
        .users
        .authenticate(&credentials.username, &credentials.password)
    {
        Ok(session) => {
            info!("user {} logged in as {:?}", session.username, session.role);
            let home = session.role.home();
            let session_id = state.sessions.insert(session);
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            Ok((jar.add(cookie), Redirect::to(home)).into_response())
        }
        Err(err) => {
            warn!("failed login attempt for {:?}", credentials.username);
            let form = LoginForm {
                username: credentials.username,
                password: String::new(),
            };
            let page = state.pages.login(&form, Some(&err.to_string()))?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
    }
}

/// Handle user logout
///
/// Drops the server-side session, clears the cookie and returns to login.
#[cfg(feature = "web")]
pub async fn handle_logout<S: TabularStore>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Some(session) = state.sessions.logout(cookie.value()) {
            info!("user {} logged out", session.username);
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

    fn entry(password: &str, role: Role) -> UserEntry {
        UserEntry {
            password: password.to_string(),
            role,
        }
    }

    fn table() -> UserTable {
        let mut users = HashMap::new();
        users.insert("ayse".to_string(), entry("secret", Role::Standard));
        users.insert("boss".to_string(), entry("topsecret", Role::Owner));
        UserTable::new(users)
    }

    #[test]
    fn authenticate_returns_configured_role() {
        let users = table();

        let session = users.authenticate("ayse", "secret").unwrap();
        assert_eq!(session.username, "ayse");
        assert_eq!(session.role, Role::Standard);

        let session = users.authenticate("boss", "topsecret").unwrap();
        assert_eq!(session.role, Role::Owner);
    }

    #[test]
    fn every_mismatch_is_invalid_credentials() {
        let users = table();
        for (u, p) in [
            ("ayse", "wrong"),
            ("ayse", ""),
            ("ayse", "Secret"),
            ("ayse", "secret "),
            ("nobody", "secret"),
            ("", ""),
            ("boss", "secret"),
        ] {
            assert_eq!(
                users.authenticate(u, p),
                Err(AuthError::InvalidCredentials),
                "{u}/{p} must not authenticate"
            );
        }
    }

    #[test]
    fn argon2_hashes_are_verified() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"hunter2", &salt)
            .unwrap()
            .to_string();

        let mut users = HashMap::new();
        users.insert("boss".to_string(), entry(&hash, Role::Owner));
        users.insert("ayse".to_string(), entry("plain", Role::Standard));
        let users = UserTable::new(users);

        assert!(users.authenticate("boss", "hunter2").is_ok());
        assert!(users.authenticate("boss", &hash).is_err());
        assert_eq!(users.plaintext_users(), vec!["ayse".to_string()]);
    }

    #[test]
    fn role_strings() {
        assert_eq!(Role::from("owner".to_string()), Role::Owner);
        assert_eq!(Role::from("Patron".to_string()), Role::Owner);
        assert_eq!(Role::from("standard".to_string()), Role::Standard);
        assert_eq!(Role::from("kullanici".to_string()), Role::Standard);
        assert_eq!(Role::Owner.home(), "/report");
        assert_eq!(Role::Standard.home(), "/entry");
    }

    #[test]
    fn session_store_lifecycle() {
        let store = SessionStore::new();
        let session = table().authenticate("ayse", "secret").unwrap();

        let id = store.insert(session.clone());
        assert_eq!(store.get(&id), Some(session.clone()));
        assert_eq!(store.get("not-a-session"), None);

        assert_eq!(store.logout(&id), Some(session));
        assert_eq!(store.get(&id), None);
        assert!(store.is_empty());
    }

    #[test]
    fn expired_sessions_are_ignored_and_pruned() {
        let store = SessionStore::new();
        let mut stale = Session::new("ayse", Role::Standard);
        stale.expires_at = SystemTime::now() - Duration::from_secs(1);

        let stale_id = store.insert(stale);
        assert_eq!(store.get(&stale_id), None);

        store.insert(Session::new("boss", Role::Owner));
        assert_eq!(store.len(), 1);
    }
}
