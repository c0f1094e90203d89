//! Favicon discovery and the batch icon routine.
//!
//! Discovery walks a fixed list of well-known icon locations for a site's host
//! and keeps the first response that looks like a real image. The batch routine
//! runs discovery for every catalog template without an icon and uploads what
//! it finds. It is sequential, has no rollback, and cannot be resumed.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::catalog;
use super::models::{IconShape, Template};
use super::store::ContentStore;
use crate::errors::{GitHubError, IconError};

pub const ICON_USER_AGENT: &str = "Web2App-Studio-Admin/1.0";

/// Bodies smaller than this are treated as placeholders.
pub const MIN_ICON_BYTES: usize = 100;

const DEFAULT_CONTENT_TYPE: &str = "image/png";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A successful (2xx) response from an icon source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Outbound HTTP for icon discovery.
/// Real implementation: [`HttpIconFetcher`]. Test double: `testing::StaticIcons`.
#[async_trait]
pub trait IconFetcher: Send + Sync {
    /// `Ok(None)` for a non-2xx answer; `Err` for transport failures.
    async fn fetch(&self, url: &str) -> anyhow::Result<Option<FetchedImage>>;
}

pub struct HttpIconFetcher {
    http: reqwest::Client,
}

impl HttpIconFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(ICON_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl IconFetcher for HttpIconFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Option<FetchedImage>> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await?.to_vec();
        Ok(Some(FetchedImage {
            content_type,
            bytes,
        }))
    }
}

/// A discovered icon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconData {
    /// `data:<content-type>;base64,<payload>`
    pub data_url: String,
    pub source: String,
}

/// Host (with port, if any) of an absolute URL.
pub fn site_host(url: &str) -> Result<String, IconError> {
    let parsed = reqwest::Url::parse(url.trim()).map_err(|_| IconError::InvalidUrl)?;
    let host = parsed.host_str().ok_or(IconError::InvalidUrl)?;
    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Candidate icon URLs for `host`, best first.
pub fn favicon_sources(host: &str) -> Vec<String> {
    vec![
        format!("https://{}/apple-touch-icon.png", host),
        format!("https://{}/apple-touch-icon-precomposed.png", host),
        format!("https://{}/favicon-192x192.png", host),
        format!("https://{}/favicon-128x128.png", host),
        format!("https://www.google.com/s2/favicons?domain={}&sz=256", host),
        format!("https://icons.duckduckgo.com/ip3/{}.ico", host),
        format!("https://{}/favicon.ico", host),
    ]
}

fn accept(image: FetchedImage) -> Option<(String, Vec<u8>)> {
    let content_type = image
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    if !content_type.contains("image") || image.bytes.len() < MIN_ICON_BYTES {
        return None;
    }
    Some((content_type, image.bytes))
}

/// Try every source for the site behind `url` and return the first usable icon.
pub async fn fetch_icon_from_url(
    fetcher: &dyn IconFetcher,
    url: &str,
) -> Result<IconData, IconError> {
    let host = site_host(url)?;
    for source in favicon_sources(&host) {
        let image = match fetcher.fetch(&source).await {
            Ok(Some(image)) => image,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "icon source unreachable");
                continue;
            }
        };
        if let Some((content_type, bytes)) = accept(image) {
            tracing::debug!(source = %source, "icon found");
            return Ok(IconData {
                data_url: format!("data:{};base64,{}", content_type, STANDARD.encode(bytes)),
                source,
            });
        }
    }
    Err(IconError::NotFound)
}

// ── Batch ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub template_id: String,
    pub name: String,
    pub category: String,
    pub status: BatchStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub results: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn from_results(results: Vec<BatchOutcome>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        let summary = BatchSummary {
            total: results.len(),
            success: count(BatchStatus::Success),
            failed: count(BatchStatus::Failed),
            skipped: count(BatchStatus::Skipped),
        };
        Self { summary, results }
    }
}

/// Fetch and upload icons for every template that lacks one.
///
/// Per-template failures are recorded in the report; only a missing manifest
/// or an unreadable category aborts the run.
pub async fn run_batch(
    store: &dyn ContentStore,
    fetcher: &dyn IconFetcher,
    token: &str,
    dry_run: bool,
) -> Result<BatchReport, GitHubError> {
    let manifest = catalog::require_manifest(store, token).await?;
    let mut results = Vec::new();

    for category in &manifest.categories {
        let templates = catalog::fetch_category_templates(store, token, &category.id).await?;
        for template in templates {
            let (status, message) =
                process_template(store, fetcher, token, &template, dry_run).await;
            tracing::info!(
                template = %template.id,
                category = %category.id,
                ?status,
                %message,
                "batch icon"
            );
            results.push(BatchOutcome {
                template_id: template.id,
                name: template.name,
                category: category.id.clone(),
                status,
                message,
            });
        }
    }

    let report = BatchReport::from_results(results);
    tracing::info!(
        total = report.summary.total,
        success = report.summary.success,
        failed = report.summary.failed,
        skipped = report.summary.skipped,
        dry_run,
        "batch icon run finished"
    );
    Ok(report)
}

async fn process_template(
    store: &dyn ContentStore,
    fetcher: &dyn IconFetcher,
    token: &str,
    template: &Template,
    dry_run: bool,
) -> (BatchStatus, String) {
    if template.icon_url.as_deref().is_some_and(|u| !u.is_empty()) {
        return (BatchStatus::Skipped, "Already has icon".to_string());
    }

    let icon = match fetch_icon_from_url(fetcher, &template.url).await {
        Ok(icon) => icon,
        Err(e) => return (BatchStatus::Failed, e.to_string()),
    };

    if dry_run {
        return (BatchStatus::Success, "Would upload icon (dry run)".to_string());
    }

    let icon_path = match catalog::upload_icon(store, token, &template.id, &icon.data_url).await {
        Ok(path) => path,
        Err(e) => return (BatchStatus::Failed, e.to_string()),
    };

    let updated = Template {
        icon_url: Some(icon_path),
        icon_shape: Some(IconShape::Rounded),
        ..template.clone()
    };
    match catalog::save_template(store, token, &updated, false).await {
        Ok(()) => (
            BatchStatus::Success,
            "Icon uploaded and template updated".to_string(),
        ),
        Err(e) => (BatchStatus::Failed, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::catalog::{MANIFEST_PATH, template_path};
    use crate::dashboard::models::{Category, Manifest, TemplateConfiguration, TemplateMetadata};
    use crate::testing::{MemoryStore, StaticIcons, png_bytes};

    const TOKEN: &str = "gho_admin";

    #[test]
    fn test_site_host() {
        assert_eq!(site_host("https://www.notion.so/workspace").unwrap(), "www.notion.so");
        assert_eq!(site_host("http://localhost:8080/x").unwrap(), "localhost:8080");
        assert_eq!(site_host("notion.so"), Err(IconError::InvalidUrl));
        assert_eq!(site_host(""), Err(IconError::InvalidUrl));
        assert_eq!(site_host("mailto:a@b.c"), Err(IconError::InvalidUrl));
    }

    #[test]
    fn test_favicon_sources_order() {
        let sources = favicon_sources("figma.com");
        assert_eq!(sources.len(), 7);
        assert_eq!(sources[0], "https://figma.com/apple-touch-icon.png");
        assert_eq!(
            sources[4],
            "https://www.google.com/s2/favicons?domain=figma.com&sz=256"
        );
        assert_eq!(sources[5], "https://icons.duckduckgo.com/ip3/figma.com.ico");
        assert_eq!(sources[6], "https://figma.com/favicon.ico");
    }

    #[tokio::test]
    async fn test_first_acceptable_source_wins() {
        let icons = StaticIcons::new()
            // too small
            .with("https://figma.com/apple-touch-icon.png", Some("image/png"), png_bytes(40))
            // not an image
            .with(
                "https://figma.com/apple-touch-icon-precomposed.png",
                Some("text/html; charset=utf-8"),
                vec![b'<'; 500],
            )
            .with("https://figma.com/favicon-128x128.png", Some("image/x-icon"), png_bytes(300))
            .with("https://figma.com/favicon.ico", Some("image/png"), png_bytes(300));

        let icon = fetch_icon_from_url(&icons, "https://figma.com/files").await.unwrap();
        assert_eq!(icon.source, "https://figma.com/favicon-128x128.png");
        assert!(icon.data_url.starts_with("data:image/x-icon;base64,iVBORw0KGg"));
        assert_eq!(icons.requested().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_content_type_defaults_to_png() {
        let icons = StaticIcons::new().with(
            "https://www.google.com/s2/favicons?domain=x.io&sz=256",
            None,
            png_bytes(120),
        );
        let icon = fetch_icon_from_url(&icons, "https://x.io").await.unwrap();
        assert!(icon.data_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_no_source_found() {
        let icons = StaticIcons::new();
        let err = fetch_icon_from_url(&icons, "https://nothing.example").await.unwrap_err();
        assert_eq!(err, IconError::NotFound);
        assert_eq!(icons.requested().len(), 7);
    }

    #[tokio::test]
    async fn test_invalid_url_fetches_nothing() {
        let icons = StaticIcons::new();
        let err = fetch_icon_from_url(&icons, "not a url").await.unwrap_err();
        assert_eq!(err, IconError::InvalidUrl);
        assert!(icons.requested().is_empty());
    }

    fn template(id: &str, url: &str, icon_url: Option<&str>) -> Template {
        Template {
            id: id.into(),
            name: id.to_uppercase(),
            url: url.into(),
            category: "tools".into(),
            icon: "globe".into(),
            icon_color: "#000000".into(),
            icon_background: "#FFFFFF".into(),
            icon_url: icon_url.map(str::to_string),
            icon_shape: None,
            description: String::new(),
            configuration: TemplateConfiguration::default(),
            metadata: TemplateMetadata::default(),
            extra: Default::default(),
        }
    }

    fn batch_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_json(
            MANIFEST_PATH,
            &Manifest {
                version: "1.0.0".into(),
                categories: vec![Category {
                    id: "tools".into(),
                    name: "Tools".into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        store.insert_json(
            &template_path("tools", "done"),
            &template("done", "https://done.io", Some("icons/done.png")),
        );
        store.insert_json(
            &template_path("tools", "found"),
            &template("found", "https://found.io", None),
        );
        store.insert_json(
            &template_path("tools", "lost"),
            &template("lost", "https://lost.io", None),
        );
        store
    }

    fn batch_icons() -> StaticIcons {
        StaticIcons::new().with(
            "https://found.io/apple-touch-icon.png",
            Some("image/png"),
            png_bytes(256),
        )
    }

    fn outcome<'a>(report: &'a BatchReport, id: &str) -> &'a BatchOutcome {
        report.results.iter().find(|r| r.template_id == id).unwrap()
    }

    #[tokio::test]
    async fn test_batch_uploads_and_updates_templates() {
        let store = batch_store();
        let report = run_batch(&store, &batch_icons(), TOKEN, false).await.unwrap();

        assert_eq!(
            report.summary,
            BatchSummary {
                total: 3,
                success: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert_eq!(outcome(&report, "done").message, "Already has icon");
        assert_eq!(outcome(&report, "lost").message, "No icon found");
        let found = outcome(&report, "found");
        assert_eq!(found.status, BatchStatus::Success);
        assert_eq!(found.message, "Icon uploaded and template updated");
        assert_eq!(found.category, "tools");

        assert_eq!(store.get("icons/found.png").unwrap(), png_bytes(256));
        let saved: Template = store.get_json("templates/tools/found.json").unwrap();
        assert_eq!(saved.icon_url.as_deref(), Some("icons/found.png"));
        assert_eq!(saved.icon_shape, Some(IconShape::Rounded));

        let messages: Vec<_> = store.commits().into_iter().map(|c| c.message).collect();
        assert_eq!(
            messages,
            vec!["Add icon for template: found", "Update template: FOUND"]
        );
    }

    #[tokio::test]
    async fn test_batch_dry_run_writes_nothing() {
        let store = batch_store();
        let report = run_batch(&store, &batch_icons(), TOKEN, true).await.unwrap();
        assert_eq!(report.summary.success, 1);
        assert_eq!(outcome(&report, "found").message, "Would upload icon (dry run)");
        assert!(store.commits().is_empty());
    }

    #[tokio::test]
    async fn test_batch_write_failure_is_per_template() {
        let store = batch_store();
        store.fail_writes_with("Resource not accessible by integration");
        let report = run_batch(&store, &batch_icons(), TOKEN, false).await.unwrap();
        let found = outcome(&report, "found");
        assert_eq!(found.status, BatchStatus::Failed);
        assert_eq!(found.message, "Resource not accessible by integration");
        assert_eq!(report.summary.total, 3);
    }

    #[tokio::test]
    async fn test_batch_without_manifest_fails() {
        let store = MemoryStore::new();
        let err = run_batch(&store, &batch_icons(), TOKEN, false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = BatchReport::from_results(vec![BatchOutcome {
            template_id: "a".into(),
            name: "A".into(),
            category: "c".into(),
            status: BatchStatus::Skipped,
            message: "Already has icon".into(),
        }]);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["summary"]["skipped"], 1);
        assert_eq!(v["results"][0]["templateId"], "a");
        assert_eq!(v["results"][0]["status"], "skipped");
    }
}
