//! Cookie-held admin sessions and the OAuth CSRF state cookie.
//!
//! The session cookie value is base64 of the JSON-encoded [`AdminSession`].
//! It is not signed or encrypted; the GitHub token inside it is what actually
//! authorizes writes.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::models::GitHubUser;

pub const SESSION_COOKIE_NAME: &str = "web2app_admin_session";
pub const STATE_COOKIE_NAME: &str = "web2app_oauth_state";

pub const SESSION_DURATION_MS: i64 = 7 * 24 * 60 * 60 * 1000;
pub const STATE_MAX_AGE_SECS: i64 = 10 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub user: GitHubUser,
    pub access_token: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl AdminSession {
    pub fn new(user: GitHubUser, access_token: String) -> Self {
        Self {
            user,
            access_token,
            expires_at: now_ms() + SESSION_DURATION_MS,
        }
    }

    pub fn encode(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        STANDARD.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    /// `None` for anything that is not base64 of a session document.
    pub fn decode(value: &str) -> Option<Self> {
        let bytes = STANDARD.decode(value.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at < now_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }
}

/// Why a request carries no usable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Missing,
    Expired,
}

/// Read and validate the session cookie.
pub fn session_from_headers(headers: &HeaderMap) -> Result<AdminSession, SessionState> {
    let value = read_cookie(headers, SESSION_COOKIE_NAME).ok_or(SessionState::Missing)?;
    let session = AdminSession::decode(&value).ok_or(SessionState::Missing)?;
    if session.is_expired() {
        return Err(SessionState::Expired);
    }
    Ok(session)
}

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

fn build_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value establishing `session`.
pub fn session_cookie(session: &AdminSession, secure: bool) -> String {
    build_cookie(
        SESSION_COOKIE_NAME,
        &session.encode(),
        SESSION_DURATION_MS / 1000,
        secure,
    )
}

pub fn clear_session_cookie(secure: bool) -> String {
    build_cookie(SESSION_COOKIE_NAME, "", 0, secure)
}

pub fn state_cookie(state: &str, secure: bool) -> String {
    build_cookie(STATE_COOKIE_NAME, state, STATE_MAX_AGE_SECS, secure)
}

pub fn clear_state_cookie(secure: bool) -> String {
    build_cookie(STATE_COOKIE_NAME, "", 0, secure)
}

/// Random 32-hex-character OAuth state.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
