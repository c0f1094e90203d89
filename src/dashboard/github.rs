use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::models::GitHubUser;
use super::store::{ContentEntry, ContentStore, IdentityProvider};
use crate::config::{AdminConfig, GitHubSection};
use crate::errors::GitHubError;

const USER_AGENT: &str = "Web2App-Studio-Admin";
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";
const OAUTH_SCOPE: &str = "repo user:email";

/// Response from GitHub's OAuth token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// The subset of a Contents API file response we need.
#[derive(Debug, Deserialize)]
struct FileMetadata {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RepoPermissions {
    #[serde(default)]
    push: bool,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    permissions: Option<RepoPermissions>,
}

#[derive(Debug, Serialize)]
struct PutFileBody<'a> {
    message: &'a str,
    content: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteFileBody<'a> {
    message: &'a str,
    sha: String,
    branch: &'a str,
}

/// Build the GitHub authorize URL the login endpoint redirects to.
pub fn authorize_url(
    github: &GitHubSection,
    redirect_uri: &str,
    state: &str,
) -> Result<String, GitHubError> {
    let client_id = github.client_id.as_deref().unwrap_or_default();
    let url = reqwest::Url::parse_with_params(
        &github.authorize_url,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("scope", OAUTH_SCOPE),
            ("state", state),
        ],
    )
    .map_err(|e| GitHubError::NotConfigured(format!("Invalid authorize URL: {}", e)))?;
    Ok(url.to_string())
}

/// Base64 body content for a Contents API PUT.
pub fn encode_content(content: &[u8]) -> String {
    STANDARD.encode(content)
}

/// Client for the catalog repository's Contents API and the OAuth endpoints.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    github: GitHubSection,
}

impl GitHubClient {
    pub fn new(config: &AdminConfig) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            github: config.github.clone(),
        })
    }

    fn api_base(&self) -> &str {
        self.github.api_url.trim_end_matches('/')
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_base(),
            self.github.org,
            self.github.repo
        )
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/contents/{}", self.repo_url(), path.trim_start_matches('/'))
    }

    fn authed(&self, builder: RequestBuilder, token: &str, accept: &str) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", accept)
    }

    async fn get_contents(
        &self,
        token: &str,
        path: &str,
        accept: &str,
    ) -> Result<Option<Response>, GitHubError> {
        let resp = self
            .authed(self.http.get(self.contents_url(path)), token, accept)
            .query(&[("ref", self.github.branch.as_str())])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(Some(resp))
    }
}

/// Turn a non-success response into an error carrying GitHub's message.
async fn api_error(resp: Response) -> GitHubError {
    let status = resp.status().as_u16();
    let message = resp
        .json::<ApiMessage>()
        .await
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| format!("GitHub API error: {}", status));
    GitHubError::Api { status, message }
}

#[async_trait]
impl ContentStore for GitHubClient {
    async fn file_sha(&self, token: &str, path: &str) -> Result<Option<String>, GitHubError> {
        let Some(resp) = self.get_contents(token, path, ACCEPT_JSON).await? else {
            return Ok(None);
        };
        let meta: FileMetadata = resp.json().await?;
        Ok(Some(meta.sha))
    }

    async fn read_raw(&self, token: &str, path: &str) -> Result<Option<Vec<u8>>, GitHubError> {
        let Some(resp) = self.get_contents(token, path, ACCEPT_RAW).await? else {
            return Ok(None);
        };
        Ok(Some(resp.bytes().await?.to_vec()))
    }

    async fn list_dir(
        &self,
        token: &str,
        path: &str,
    ) -> Result<Option<Vec<ContentEntry>>, GitHubError> {
        let Some(resp) = self.get_contents(token, path, ACCEPT_JSON).await? else {
            return Ok(None);
        };
        let text = resp.text().await?;
        let entries = serde_json::from_str(&text).map_err(|source| GitHubError::Decode {
            path: path.to_string(),
            source,
        })?;
        Ok(Some(entries))
    }

    async fn put_file(
        &self,
        token: &str,
        path: &str,
        content_base64: &str,
        message: &str,
    ) -> Result<(), GitHubError> {
        let sha = self.file_sha(token, path).await?;
        let body = PutFileBody {
            message,
            content: content_base64,
            branch: &self.github.branch,
            sha,
        };
        let resp = self
            .authed(self.http.put(self.contents_url(path)), token, ACCEPT_JSON)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        tracing::info!(path, message, "committed file");
        Ok(())
    }

    async fn delete_file(&self, token: &str, path: &str, message: &str) -> Result<(), GitHubError> {
        let sha = self
            .file_sha(token, path)
            .await?
            .ok_or_else(|| GitHubError::NotFound {
                path: path.to_string(),
            })?;
        let body = DeleteFileBody {
            message,
            sha,
            branch: &self.github.branch,
        };
        let resp = self
            .authed(self.http.delete(self.contents_url(path)), token, ACCEPT_JSON)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        tracing::info!(path, message, "deleted file");
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for GitHubClient {
    async fn exchange_code(&self, code: &str) -> Result<String, GitHubError> {
        let (Some(client_id), Some(client_secret)) = (
            self.github.client_id.as_deref(),
            self.github.client_secret.as_deref(),
        ) else {
            return Err(GitHubError::NotConfigured(
                "GitHub OAuth credentials not configured".to_string(),
            ));
        };

        let resp: TokenResponse = self
            .http
            .post(&self.github.token_url)
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "client_id": client_id,
                "client_secret": client_secret,
                "code": code,
            }))
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(GitHubError::OAuth(resp.error_description.unwrap_or(err)));
        }
        resp.access_token
            .ok_or_else(|| GitHubError::OAuth("Token response had no access_token".to_string()))
    }

    async fn fetch_user(&self, token: &str) -> Result<GitHubUser, GitHubError> {
        let url = format!("{}/user", self.api_base());
        let resp = self
            .authed(self.http.get(url), token, ACCEPT_JSON)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn has_push_access(&self, token: &str) -> Result<bool, GitHubError> {
        let resp = self
            .authed(self.http.get(self.repo_url()), token, ACCEPT_JSON)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Ok(false);
        }
        let repo: RepoResponse = resp.json().await?;
        Ok(repo.permissions.unwrap_or_default().push)
    }
}
