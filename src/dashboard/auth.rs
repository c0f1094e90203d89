//! GitHub OAuth login for the admin area.
//!
//! ```text
//! /api/admin/login ──302──> github.com/login/oauth/authorize (state cookie set)
//!        github ──302──> /api/admin/callback?code&state
//!                          exchange code → fetch user → check push access
//!                          ──302──> /admin/dashboard (session cookie set)
//! ```
//!
//! Any callback failure redirects to `/admin?error=<message>`.

use axum::{
    Json, Router,
    extract::{FromRequestParts, Query, State},
    http::{HeaderMap, header::SET_COOKIE, request::Parts},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;

use super::api::{ApiError, SharedState};
use super::github::authorize_url;
use super::session::{
    self, AdminSession, STATE_COOKIE_NAME, SessionState, clear_session_cookie,
    clear_state_cookie, generate_state, read_cookie, session_from_headers,
};

impl FromRequestParts<SharedState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers).map_err(|e| match e {
            SessionState::Missing => ApiError::Unauthorized,
            SessionState::Expired => ApiError::SessionExpired {
                secure: state.secure_cookies(),
            },
        })
    }
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub fn auth_router() -> Router<SharedState> {
    Router::new()
        .route("/api/admin/login", get(login))
        .route("/api/admin/callback", get(callback))
        .route("/api/admin/session", get(current_session))
        .route("/api/admin/logout", get(logout).post(logout))
}

/// `<app_url>/admin?error=<message>`, percent-encoded.
fn error_redirect_url(base_url: &str, message: &str) -> String {
    let fallback = format!("{}/admin", base_url);
    match reqwest::Url::parse(&fallback) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("error", message);
            url.to_string()
        }
        Err(_) => fallback,
    }
}

async fn login(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let csrf = generate_state();
    let url = authorize_url(&state.config.github, &state.config.callback_url(), &csrf)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        AppendHeaders([(
            SET_COOKIE,
            session::state_cookie(&csrf, state.secure_cookies()),
        )]),
        Redirect::temporary(&url),
    )
        .into_response())
}

async fn callback(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let base = state.config.base_url().to_string();
    let secure = state.secure_cookies();
    let fail = |message: &str| {
        tracing::warn!(reason = message, "admin login rejected");
        (
            AppendHeaders([(SET_COOKIE, clear_state_cookie(secure))]),
            Redirect::temporary(&error_redirect_url(&base, message)),
        )
            .into_response()
    };

    if let Some(error) = query.error.filter(|e| !e.is_empty()) {
        return fail(&error);
    }
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return fail("No authorization code received");
    };
    let expected = read_cookie(&headers, STATE_COOKIE_NAME);
    if expected.is_none() || expected != query.state {
        return fail("Invalid OAuth state");
    }

    let token = match state.identity.exchange_code(&code).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "OAuth code exchange failed");
            return fail("Failed to authenticate with GitHub");
        }
    };
    let user = match state.identity.fetch_user(&token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch GitHub user");
            return fail("Failed to get user information");
        }
    };
    match state.identity.has_push_access(&token).await {
        Ok(true) => {}
        Ok(false) => return fail("You do not have write access to the templates repository"),
        Err(e) => {
            tracing::error!(error = %e, "repository permission check failed");
            return fail("You do not have write access to the templates repository");
        }
    }

    tracing::info!(user = %user.login, "admin signed in");
    let session = AdminSession::new(user, token);
    (
        AppendHeaders([
            (SET_COOKIE, session::session_cookie(&session, secure)),
            (SET_COOKIE, clear_state_cookie(secure)),
        ]),
        Redirect::temporary(&format!("{}/admin/dashboard", base)),
    )
        .into_response()
}

async fn current_session(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    match session_from_headers(&headers) {
        Ok(session) => Json(json!({"authenticated": true, "user": session.user})).into_response(),
        Err(SessionState::Missing) => Json(json!({"authenticated": false})).into_response(),
        Err(SessionState::Expired) => (
            AppendHeaders([(SET_COOKIE, clear_session_cookie(state.secure_cookies()))]),
            Json(json!({"authenticated": false})),
        )
            .into_response(),
    }
}

async fn logout(State(state): State<SharedState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie(state.secure_cookies()))]),
        Redirect::temporary(&format!("{}/admin", state.config.base_url())),
    )
}
