//! In-memory doubles for the outbound seams, shared by unit and
//! integration tests. Compiled only for tests or with the `testing` feature.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::dashboard::icons::{FetchedImage, IconFetcher};
use crate::dashboard::models::GitHubUser;
use crate::dashboard::store::{ContentEntry, ContentStore, IdentityProvider};
use crate::errors::GitHubError;

/// A commit recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub path: String,
    pub message: String,
    pub deleted: bool,
}

#[derive(Default)]
struct StoreInner {
    files: BTreeMap<String, (String, Vec<u8>)>,
    commits: Vec<Commit>,
    version: u64,
}

/// A repository held in memory. SHAs change on every write.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
    fail_writes: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording a commit.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().unwrap();
        inner.version += 1;
        let sha = format!("sha{}", inner.version);
        inner.files.insert(path.to_string(), (sha, content.into()));
    }

    pub fn insert_json(&self, path: &str, value: &impl serde::Serialize) {
        self.insert(path, serde_json::to_vec_pretty(value).unwrap());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().files.get(path).map(|(_, b)| b.clone())
    }

    pub fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path).map(|b| serde_json::from_slice(&b).unwrap())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.lock().unwrap().files.contains_key(path)
    }

    pub fn commits(&self) -> Vec<Commit> {
        self.inner.lock().unwrap().commits.clone()
    }

    /// Make every subsequent write fail with a GitHub-style message.
    pub fn fail_writes_with(&self, message: &str) {
        *self.fail_writes.lock().unwrap() = Some(message.to_string());
    }

    fn write_failure(&self) -> Option<GitHubError> {
        self.fail_writes
            .lock()
            .unwrap()
            .clone()
            .map(|message| GitHubError::Api {
                status: 422,
                message,
            })
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn file_sha(&self, _token: &str, path: &str) -> Result<Option<String>, GitHubError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|(sha, _)| sha.clone()))
    }

    async fn read_raw(&self, _token: &str, path: &str) -> Result<Option<Vec<u8>>, GitHubError> {
        Ok(self.get(path))
    }

    async fn list_dir(
        &self,
        _token: &str,
        path: &str,
    ) -> Result<Option<Vec<ContentEntry>>, GitHubError> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let inner = self.inner.lock().unwrap();
        let entries: Vec<ContentEntry> = inner
            .files
            .iter()
            .filter_map(|(p, (sha, _))| {
                let rest = p.strip_prefix(&prefix)?;
                let (name, kind) = match rest.split_once('/') {
                    Some((dir, _)) => (dir, "dir"),
                    None => (rest, "file"),
                };
                Some(ContentEntry {
                    name: name.to_string(),
                    path: format!("{}{}", prefix, name),
                    sha: sha.clone(),
                    kind: kind.to_string(),
                    download_url: None,
                })
            })
            .collect();
        if entries.is_empty() {
            return Ok(None);
        }
        let mut deduped: Vec<ContentEntry> = Vec::new();
        for entry in entries {
            if !deduped.iter().any(|e| e.path == entry.path) {
                deduped.push(entry);
            }
        }
        Ok(Some(deduped))
    }

    async fn put_file(
        &self,
        _token: &str,
        path: &str,
        content_base64: &str,
        message: &str,
    ) -> Result<(), GitHubError> {
        if let Some(err) = self.write_failure() {
            return Err(err);
        }
        let bytes = STANDARD.decode(content_base64).map_err(|e| GitHubError::Api {
            status: 422,
            message: format!("content is not valid Base64: {}", e),
        })?;
        let mut inner = self.inner.lock().unwrap();
        inner.version += 1;
        let sha = format!("sha{}", inner.version);
        inner.files.insert(path.to_string(), (sha, bytes));
        inner.commits.push(Commit {
            path: path.to_string(),
            message: message.to_string(),
            deleted: false,
        });
        Ok(())
    }

    async fn delete_file(&self, _token: &str, path: &str, message: &str) -> Result<(), GitHubError> {
        if let Some(err) = self.write_failure() {
            return Err(err);
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.files.remove(path).is_none() {
            return Err(GitHubError::NotFound {
                path: path.to_string(),
            });
        }
        inner.commits.push(Commit {
            path: path.to_string(),
            message: message.to_string(),
            deleted: true,
        });
        Ok(())
    }
}

/// Identity provider answering from fixed tables.
pub struct StaticIdentity {
    /// OAuth code → access token.
    pub codes: HashMap<String, String>,
    pub user: GitHubUser,
    /// Tokens allowed to push to the catalog repository.
    pub writers: Vec<String>,
}

impl StaticIdentity {
    /// One valid code (`good-code` → `gho_admin`) for a user with push access.
    pub fn admin() -> Self {
        Self {
            codes: HashMap::from([("good-code".to_string(), "gho_admin".to_string())]),
            user: sample_user(),
            writers: vec!["gho_admin".to_string()],
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn exchange_code(&self, code: &str) -> Result<String, GitHubError> {
        self.codes
            .get(code)
            .cloned()
            .ok_or_else(|| GitHubError::OAuth("bad_verification_code".to_string()))
    }

    async fn fetch_user(&self, _token: &str) -> Result<GitHubUser, GitHubError> {
        Ok(self.user.clone())
    }

    async fn has_push_access(&self, token: &str) -> Result<bool, GitHubError> {
        Ok(self.writers.iter().any(|w| w == token))
    }
}

pub fn sample_user() -> GitHubUser {
    GitHubUser {
        id: 583231,
        login: "octocat".to_string(),
        name: Some("The Octocat".to_string()),
        avatar_url: "https://avatars.githubusercontent.com/u/583231".to_string(),
        email: None,
    }
}

/// Icon fetcher serving canned responses keyed by exact URL.
/// Unknown URLs answer like a 404.
#[derive(Default)]
pub struct StaticIcons {
    responses: HashMap<String, FetchedImage>,
    requested: Mutex<Vec<String>>,
}

impl StaticIcons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, content_type: Option<&str>, body: Vec<u8>) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchedImage {
                content_type: content_type.map(str::to_string),
                bytes: body,
            },
        );
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl IconFetcher for StaticIcons {
    async fn fetch(&self, url: &str) -> anyhow::Result<Option<FetchedImage>> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(self.responses.get(url).cloned())
    }
}

/// A body large enough to pass the placeholder-size check.
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.resize(len.max(8), 0);
    bytes
}
