use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::models::GitHubUser;
use crate::errors::GitHubError;

/// One entry of a Contents API directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub download_url: Option<String>,
}

impl ContentEntry {
    pub fn is_json_file(&self) -> bool {
        self.kind == "file" && self.name.ends_with(".json")
    }
}

/// File-level access to the repository that backs the catalog.
/// Real implementation: `GitHubClient`. Test double: `testing::MemoryStore`.
///
/// Every call carries the access token of whoever is acting: the admin's
/// session token or the server's read token.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// SHA of the file at `path`, or `None` if it does not exist.
    async fn file_sha(&self, token: &str, path: &str) -> Result<Option<String>, GitHubError>;

    /// Raw bytes of the file at `path`, or `None` if it does not exist.
    async fn read_raw(&self, token: &str, path: &str) -> Result<Option<Vec<u8>>, GitHubError>;

    /// Directory listing, or `None` if the directory does not exist.
    async fn list_dir(
        &self,
        token: &str,
        path: &str,
    ) -> Result<Option<Vec<ContentEntry>>, GitHubError>;

    /// Create or overwrite `path`. Overwrites send the current SHA.
    async fn put_file(
        &self,
        token: &str,
        path: &str,
        content_base64: &str,
        message: &str,
    ) -> Result<(), GitHubError>;

    /// Delete `path`; `GitHubError::NotFound` if it does not exist.
    async fn delete_file(&self, token: &str, path: &str, message: &str) -> Result<(), GitHubError>;
}

/// The OAuth side of GitHub: code exchange, identity, and repo permissions.
/// Real implementation: `GitHubClient`. Test double: `testing::StaticIdentity`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<String, GitHubError>;

    async fn fetch_user(&self, token: &str) -> Result<GitHubUser, GitHubError>;

    /// Whether the token's user may push to the catalog repository.
    async fn has_push_access(&self, token: &str) -> Result<bool, GitHubError>;
}
