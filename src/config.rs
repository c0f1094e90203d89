//! Layered configuration for the admin back-end.
//!
//! Values come from an optional TOML file (`web2app.toml` by default), then
//! environment variables, then CLI flags applied by the caller.
//!
//! ```toml
//! [github]
//! org = "web2appstudio"
//! repo = "web2app-templates"
//! branch = "main"
//! api_url = "https://api.github.com"
//!
//! [server]
//! port = 3000
//! app_url = "https://studio.example.com"
//! production = true
//! ```
//!
//! Secrets (`GITHUB_CLIENT_SECRET`, `GITHUB_TEMPLATES_TOKEN`) may live in the
//! file but are normally supplied through the environment or `.env`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "web2app.toml";

const REDACTED: &str = "********";

/// GitHub endpoints, the catalog repository, and OAuth credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitHubSection {
    pub org: String,
    pub repo: String,
    pub branch: String,
    pub api_url: String,
    pub authorize_url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Token used by the public read endpoints and maintenance commands.
    pub templates_token: Option<String>,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            org: "web2appstudio".to_string(),
            repo: "web2app-templates".to_string(),
            branch: "main".to_string(),
            api_url: "https://api.github.com".to_string(),
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            client_id: None,
            client_secret: None,
            templates_token: None,
        }
    }
}

/// HTTP listener and public URL settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
    /// Public base URL; the OAuth callback and post-login redirects hang off it.
    pub app_url: String,
    /// Marks session cookies `Secure`.
    pub production: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: 3000,
            app_url: "http://localhost:3000".to_string(),
            production: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    pub github: GitHubSection,
    pub server: ServerSection,
}

impl AdminConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse web2app.toml")
    }

    /// Load `path` if it exists, then apply the process environment.
    pub fn resolve(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay environment values. `lookup` is `std::env::var` in production
    /// and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("GITHUB_ORG") {
            self.github.org = v;
        }
        if let Some(v) = non_empty("GITHUB_REPO") {
            self.github.repo = v;
        }
        if let Some(v) = non_empty("GITHUB_BRANCH") {
            self.github.branch = v;
        }
        if let Some(v) = non_empty("GITHUB_API_URL") {
            self.github.api_url = v;
        }
        if let Some(v) = non_empty("GITHUB_CLIENT_ID") {
            self.github.client_id = Some(v);
        }
        if let Some(v) = non_empty("GITHUB_CLIENT_SECRET") {
            self.github.client_secret = Some(v);
        }
        if let Some(v) = non_empty("GITHUB_TEMPLATES_TOKEN") {
            self.github.templates_token = Some(v);
        }
        if let Some(v) = non_empty("APP_URL") {
            self.server.app_url = v;
        }
        if let Some(port) = non_empty("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(env) = non_empty("APP_ENV") {
            self.server.production = env.eq_ignore_ascii_case("production");
        }
    }

    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server.app_url.trim_end_matches('/')
    }

    pub fn callback_url(&self) -> String {
        format!("{}/api/admin/callback", self.base_url())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.github.client_id.is_none() || self.github.client_secret.is_none() {
            warnings.push(
                "GitHub OAuth credentials not configured (GITHUB_CLIENT_ID / GITHUB_CLIENT_SECRET); admin login will fail"
                    .to_string(),
            );
        }
        if self.github.templates_token.is_none() {
            warnings.push(
                "GITHUB_TEMPLATES_TOKEN not set; public endpoints will return 500".to_string(),
            );
        }
        for (name, url) in [
            ("github.api_url", &self.github.api_url),
            ("github.authorize_url", &self.github.authorize_url),
            ("github.token_url", &self.github.token_url),
            ("server.app_url", &self.server.app_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                warnings.push(format!("Invalid URL '{}' for {}", url, name));
            }
        }
        if self.github.org.is_empty() || self.github.repo.is_empty() {
            warnings.push("github.org and github.repo must both be set".to_string());
        }

        warnings
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        let mut copy = self.clone();
        copy.github.client_secret = mask(&self.github.client_secret);
        copy.github.templates_token = mask(&self.github.templates_token);
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
