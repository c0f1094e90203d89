//! Typed error hierarchy for the admin back-end.
//!
//! Two enums cover the two outbound dependencies:
//! - `GitHubError`: Contents API and OAuth failures
//! - `IconError`: favicon discovery failures
//!
//! HTTP mapping lives in `dashboard::api::ApiError`.

use thiserror::Error;

/// Errors from the GitHub Contents API and OAuth endpoints.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status; `message` is GitHub's own error text.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Failed to parse {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    NotConfigured(String),

    #[error("OAuth error: {0}")]
    OAuth(String),
}

impl GitHubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound { .. })
            || matches!(self, GitHubError::Api { status: 404, .. })
    }
}

/// Errors from fetching a website's favicon.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IconError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("No icon found")]
    NotFound,
}
