//! Catalog operations over the backing repository.
//!
//! Layout:
//!
//! ```text
//! manifest.json                    categories + featured template ids
//! templates/<category>/<id>.json   one Template per file
//! icons/<id>.png                   uploaded template icons
//! ```
//!
//! Every function takes the store and the acting token explicitly; nothing is
//! cached between calls.

use std::sync::LazyLock;

use futures::future::join_all;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::github::encode_content;
use super::models::{Category, Manifest, Template, today};
use super::store::ContentStore;
use crate::errors::GitHubError;

pub const MANIFEST_PATH: &str = "manifest.json";

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

pub fn template_path(category: &str, id: &str) -> String {
    format!("templates/{}/{}.json", category, id)
}

pub fn category_dir(category: &str) -> String {
    format!("templates/{}", category)
}

pub fn icon_path(template_id: &str) -> String {
    format!("icons/{}.png", template_id)
}

/// URL under which this server re-serves a repo icon path.
pub fn icon_api_url(icon_path: &str) -> String {
    format!("/api/icons/{}", icon_path.trim_start_matches('/'))
}

/// Lowercase and replace whitespace runs with `-`.
pub fn normalize_id(id: &str) -> String {
    WHITESPACE.replace_all(id.trim(), "-").to_lowercase()
}

/// A single path segment safe to splice into a repo path and, unescaped,
/// into a Contents API URL.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && !segment.contains("..")
        && !segment.contains(['/', '\\', '?', '#', '%'])
        && !segment.chars().any(char::is_control)
}

/// A relative repo path (several segments) safe to proxy.
pub fn is_valid_repo_path(path: &str) -> bool {
    !path.is_empty() && path.split('/').all(is_valid_segment)
}

/// Drop a `data:<type>;base64,` prefix if present.
pub fn strip_data_url(image_data: &str) -> &str {
    match image_data.split_once(',') {
        Some((_, data)) => data,
        None => image_data,
    }
}

async fn read_json<T: DeserializeOwned>(
    store: &dyn ContentStore,
    token: &str,
    path: &str,
) -> Result<Option<T>, GitHubError> {
    let Some(bytes) = store.read_raw(token, path).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| GitHubError::Decode {
            path: path.to_string(),
            source,
        })
}

async fn write_json<T: Serialize>(
    store: &dyn ContentStore,
    token: &str,
    path: &str,
    value: &T,
    message: &str,
) -> Result<(), GitHubError> {
    let content = serde_json::to_vec_pretty(value).map_err(|source| GitHubError::Decode {
        path: path.to_string(),
        source,
    })?;
    store
        .put_file(token, path, &encode_content(&content), message)
        .await
}

// ── Manifest ──────────────────────────────────────────────────────────

pub async fn fetch_manifest(
    store: &dyn ContentStore,
    token: &str,
) -> Result<Option<Manifest>, GitHubError> {
    read_json(store, token, MANIFEST_PATH).await
}

/// Like [`fetch_manifest`], treating absence as an error.
pub async fn require_manifest(
    store: &dyn ContentStore,
    token: &str,
) -> Result<Manifest, GitHubError> {
    fetch_manifest(store, token)
        .await?
        .ok_or_else(|| GitHubError::NotFound {
            path: MANIFEST_PATH.to_string(),
        })
}

pub async fn update_manifest(
    store: &dyn ContentStore,
    token: &str,
    manifest: &Manifest,
) -> Result<(), GitHubError> {
    write_json(store, token, MANIFEST_PATH, manifest, "Update manifest").await
}

/// Recount every category's templates and stamp `lastUpdated`.
pub async fn update_template_counts(
    store: &dyn ContentStore,
    token: &str,
) -> Result<Manifest, GitHubError> {
    let mut manifest = require_manifest(store, token).await?;
    for category in &mut manifest.categories {
        category.template_count = count_category_templates(store, token, &category.id).await?;
    }
    manifest.last_updated = today();
    update_manifest(store, token, &manifest).await?;
    Ok(manifest)
}

// ── Templates ─────────────────────────────────────────────────────────

/// Number of `.json` files in the category directory. Files are counted
/// whether or not they decode as a [`Template`].
pub async fn count_category_templates(
    store: &dyn ContentStore,
    token: &str,
    category: &str,
) -> Result<u32, GitHubError> {
    let entries = store
        .list_dir(token, &category_dir(category))
        .await?
        .unwrap_or_default();
    Ok(entries.iter().filter(|e| e.is_json_file()).count() as u32)
}

async fn list_category_json<T: DeserializeOwned>(
    store: &dyn ContentStore,
    token: &str,
    category: &str,
) -> Result<Option<Vec<T>>, GitHubError> {
    let Some(entries) = store.list_dir(token, &category_dir(category)).await? else {
        return Ok(None);
    };

    let reads = entries
        .iter()
        .filter(|e| e.is_json_file())
        .map(|e| async move { (e.path.as_str(), read_json::<T>(store, token, &e.path).await) });

    let mut documents = Vec::new();
    for (path, result) in join_all(reads).await {
        match result {
            Ok(Some(doc)) => documents.push(doc),
            Ok(None) => tracing::warn!(path, "template vanished during listing"),
            Err(e) => tracing::warn!(path, error = %e, "skipping unreadable template"),
        }
    }
    Ok(Some(documents))
}

/// Templates in `category`, or `None` when the directory does not exist.
/// Files that fail to load are logged and skipped.
pub async fn list_category_templates(
    store: &dyn ContentStore,
    token: &str,
    category: &str,
) -> Result<Option<Vec<Template>>, GitHubError> {
    list_category_json(store, token, category).await
}

/// Template files in `category` as stored, without applying defaults.
/// Only files that are not JSON at all are skipped.
pub async fn list_category_documents(
    store: &dyn ContentStore,
    token: &str,
    category: &str,
) -> Result<Option<Vec<Value>>, GitHubError> {
    list_category_json(store, token, category).await
}

pub async fn fetch_category_templates(
    store: &dyn ContentStore,
    token: &str,
    category: &str,
) -> Result<Vec<Template>, GitHubError> {
    Ok(list_category_templates(store, token, category)
        .await?
        .unwrap_or_default())
}

/// Every template, walking categories in manifest order.
pub async fn fetch_all_templates(
    store: &dyn ContentStore,
    token: &str,
) -> Result<Vec<Template>, GitHubError> {
    let Some(manifest) = fetch_manifest(store, token).await? else {
        return Ok(Vec::new());
    };
    let mut templates = Vec::new();
    for category in &manifest.categories {
        templates.extend(fetch_category_templates(store, token, &category.id).await?);
    }
    Ok(templates)
}

pub async fn fetch_template(
    store: &dyn ContentStore,
    token: &str,
    category: &str,
    id: &str,
) -> Result<Option<Template>, GitHubError> {
    read_json(store, token, &template_path(category, id)).await
}

pub async fn save_template(
    store: &dyn ContentStore,
    token: &str,
    template: &Template,
    is_new: bool,
) -> Result<(), GitHubError> {
    let path = template_path(&template.category, &template.id);
    let message = if is_new {
        format!("Add template: {}", template.name)
    } else {
        format!("Update template: {}", template.name)
    };
    write_json(store, token, &path, template, &message).await
}

pub async fn delete_template(
    store: &dyn ContentStore,
    token: &str,
    category: &str,
    id: &str,
) -> Result<(), GitHubError> {
    store
        .delete_file(
            token,
            &template_path(category, id),
            &format!("Delete template: {}", id),
        )
        .await
}

// ── Categories ────────────────────────────────────────────────────────

pub async fn fetch_all_categories(
    store: &dyn ContentStore,
    token: &str,
) -> Result<Vec<Category>, GitHubError> {
    Ok(fetch_manifest(store, token)
        .await?
        .map(|m| m.categories)
        .unwrap_or_default())
}

pub async fn fetch_category(
    store: &dyn ContentStore,
    token: &str,
    id: &str,
) -> Result<Option<Category>, GitHubError> {
    Ok(fetch_all_categories(store, token)
        .await?
        .into_iter()
        .find(|c| c.id == id))
}

/// Replace the manifest entry with the same id. Returns `false` when the
/// manifest has no such category. The stored `templateCount` is kept since
/// counts are derived from the template directories.
pub async fn save_category(
    store: &dyn ContentStore,
    token: &str,
    category: &Category,
) -> Result<bool, GitHubError> {
    let mut manifest = require_manifest(store, token).await?;
    let Some(slot) = manifest.categories.iter_mut().find(|c| c.id == category.id) else {
        return Ok(false);
    };
    let template_count = slot.template_count;
    *slot = Category {
        template_count,
        ..category.clone()
    };
    manifest.last_updated = today();
    write_json(
        store,
        token,
        MANIFEST_PATH,
        &manifest,
        &format!("Update category: {}", category.name),
    )
    .await?;
    Ok(true)
}

// ── Icons ─────────────────────────────────────────────────────────────

/// Store an icon (base64, optionally as a data URL) at `icons/<id>.png`.
/// Returns the repo path.
pub async fn upload_icon(
    store: &dyn ContentStore,
    token: &str,
    template_id: &str,
    image_data: &str,
) -> Result<String, GitHubError> {
    let path = icon_path(template_id);
    store
        .put_file(
            token,
            &path,
            strip_data_url(image_data),
            &format!("Add icon for template: {}", template_id),
        )
        .await?;
    Ok(path)
}

pub async fn delete_icon(
    store: &dyn ContentStore,
    token: &str,
    template_id: &str,
) -> Result<(), GitHubError> {
    store
        .delete_file(
            token,
            &icon_path(template_id),
            &format!("Delete icon for template: {}", template_id),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::models::{CategoryConfiguration, TemplateConfiguration, TemplateMetadata};
    use crate::testing::MemoryStore;

    const TOKEN: &str = "gho_admin";

    fn template(id: &str, category: &str) -> Template {
        Template {
            id: id.to_string(),
            name: id.to_uppercase(),
            url: format!("https://{}.com", id),
            category: category.to_string(),
            icon: "globe".into(),
            icon_color: "#6366f1".into(),
            icon_background: "#FFFFFF".into(),
            icon_url: None,
            icon_shape: None,
            description: "desc".into(),
            configuration: TemplateConfiguration::default(),
            metadata: TemplateMetadata::default(),
            extra: Default::default(),
        }
    }

    fn category(id: &str, count: u32) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_uppercase(),
            template_count: count,
            ..Default::default()
        }
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_json(
            MANIFEST_PATH,
            &Manifest {
                version: "1.0.0".into(),
                last_updated: "2024-01-01".into(),
                categories: vec![category("productivity", 0), category("media", 0)],
                featured_templates: vec!["notion".into()],
                extra: Default::default(),
            },
        );
        store.insert_json(&template_path("productivity", "notion"), &template("notion", "productivity"));
        store.insert_json(&template_path("productivity", "todoist"), &template("todoist", "productivity"));
        store.insert_json(&template_path("media", "spotify"), &template("spotify", "media"));
        store
    }

    #[test]
    fn test_paths() {
        assert_eq!(template_path("media", "spotify"), "templates/media/spotify.json");
        assert_eq!(icon_path("spotify"), "icons/spotify.png");
        assert_eq!(icon_api_url("icons/spotify.png"), "/api/icons/icons/spotify.png");
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("Google  Docs"), "google-docs");
        assert_eq!(normalize_id(" Linear\tApp "), "linear-app");
        assert_eq!(normalize_id("already-fine"), "already-fine");
    }

    #[test]
    fn test_segment_validation() {
        assert!(is_valid_segment("notion"));
        assert!(is_valid_segment("google-docs"));
        assert!(!is_valid_segment(""));
        assert!(!is_valid_segment("."));
        assert!(!is_valid_segment(".."));
        assert!(!is_valid_segment("a/b"));
        assert!(!is_valid_segment("a\\b"));
        assert!(!is_valid_segment("x?y"));
        assert!(!is_valid_segment("x#y"));
        assert!(!is_valid_segment("x%2Fy"));
        assert!(!is_valid_segment("x\ny"));
        assert!(!is_valid_repo_path("icons/a.png?ref=main"));
        assert!(is_valid_repo_path("icons/notion.png"));
        assert!(!is_valid_repo_path("icons/../manifest.json"));
        assert!(!is_valid_repo_path("icons//x.png"));
    }

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:image/png;base64,iVBORw0"), "iVBORw0");
        assert_eq!(strip_data_url("iVBORw0"), "iVBORw0");
    }

    #[tokio::test]
    async fn test_fetch_manifest_missing_and_required() {
        let store = MemoryStore::new();
        assert!(fetch_manifest(&store, TOKEN).await.unwrap().is_none());
        let err = require_manifest(&store, TOKEN).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_manifest_corrupt_is_decode_error() {
        let store = MemoryStore::new();
        store.insert(MANIFEST_PATH, b"{not json".to_vec());
        let err = fetch_manifest(&store, TOKEN).await.unwrap_err();
        assert!(matches!(err, GitHubError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_list_category_templates() {
        let store = seeded();
        let mut names: Vec<_> = list_category_templates(&store, TOKEN, "productivity")
            .await
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        names.sort();
        assert_eq!(names, vec!["notion", "todoist"]);

        assert!(list_category_templates(&store, TOKEN, "news").await.unwrap().is_none());
        assert!(fetch_category_templates(&store, TOKEN, "news").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_skips_non_json_and_corrupt_files() {
        let store = seeded();
        store.insert("templates/media/README.md", b"# media".to_vec());
        store.insert("templates/media/broken.json", b"{".to_vec());
        let templates = fetch_category_templates(&store, TOKEN, "media").await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, "spotify");
    }

    #[tokio::test]
    async fn test_fetch_all_templates_follows_manifest_order() {
        let store = seeded();
        store.insert_json(&template_path("orphan", "stray"), &template("stray", "orphan"));
        let all = fetch_all_templates(&store, TOKEN).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().unwrap().id, "spotify");
        assert!(all.iter().all(|t| t.id != "stray"));
    }

    #[tokio::test]
    async fn test_fetch_all_templates_without_manifest_is_empty() {
        let store = MemoryStore::new();
        assert!(fetch_all_templates(&store, TOKEN).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_template_round_trip_and_messages() {
        let store = seeded();
        let mut t = template("figma", "productivity");
        save_template(&store, TOKEN, &t, true).await.unwrap();
        t.description = "Updated".into();
        save_template(&store, TOKEN, &t, false).await.unwrap();

        let loaded = fetch_template(&store, TOKEN, "productivity", "figma")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, t);

        let raw = String::from_utf8(store.get("templates/productivity/figma.json").unwrap()).unwrap();
        assert!(raw.contains("\n  \"id\": \"figma\""), "stored JSON is pretty-printed");

        let messages: Vec<_> = store.commits().into_iter().map(|c| c.message).collect();
        assert_eq!(messages, vec!["Add template: FIGMA", "Update template: FIGMA"]);
    }

    #[tokio::test]
    async fn test_delete_template() {
        let store = seeded();
        delete_template(&store, TOKEN, "media", "spotify").await.unwrap();
        assert!(!store.contains("templates/media/spotify.json"));
        assert_eq!(store.commits()[0].message, "Delete template: spotify");

        let err = delete_template(&store, TOKEN, "media", "spotify").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_template_counts() {
        let store = seeded();
        let manifest = update_template_counts(&store, TOKEN).await.unwrap();
        assert_eq!(manifest.category("productivity").unwrap().template_count, 2);
        assert_eq!(manifest.category("media").unwrap().template_count, 1);
        assert_eq!(manifest.last_updated, today());
        assert_eq!(manifest.featured_templates, vec!["notion"]);

        let stored: Manifest = store.get_json(MANIFEST_PATH).unwrap();
        assert_eq!(stored, manifest);
        assert_eq!(store.commits().last().unwrap().message, "Update manifest");
    }

    #[tokio::test]
    async fn test_update_template_counts_keeps_unknown_keys() {
        let store = MemoryStore::new();
        store.insert(
            MANIFEST_PATH,
            br#"{"version":"1.0.0","schema":3,"categories":[{"id":"media","name":"Media","sortOrder":5}]}"#.to_vec(),
        );
        update_template_counts(&store, TOKEN).await.unwrap();

        let stored: Value = store.get_json(MANIFEST_PATH).unwrap();
        assert_eq!(stored["schema"], 3);
        assert_eq!(stored["categories"][0]["sortOrder"], 5);
        assert_eq!(stored["categories"][0]["templateCount"], 0);
    }

    #[tokio::test]
    async fn test_counts_include_templates_outside_the_model() {
        let store = seeded();
        store.insert(
            "templates/media/odd.json",
            br#"{"id":"odd","category":"media","configuration":{"userAgent":"firefox","windowWidth":1200.5}}"#.to_vec(),
        );
        store.insert("templates/media/notes.txt", b"not a template".to_vec());

        let manifest = update_template_counts(&store, TOKEN).await.unwrap();
        assert_eq!(manifest.category("media").unwrap().template_count, 2);
        assert_eq!(count_category_templates(&store, TOKEN, "news").await.unwrap(), 0);

        let docs = list_category_documents(&store, TOKEN, "media").await.unwrap().unwrap();
        assert_eq!(docs.len(), 2);
        let odd = docs.iter().find(|d| d["id"] == "odd").unwrap();
        assert_eq!(odd["configuration"]["userAgent"], "firefox");
        assert!(odd.get("icon").is_none());
    }

    #[tokio::test]
    async fn test_save_template_keeps_unknown_keys() {
        let store = MemoryStore::new();
        store.insert(
            &template_path("media", "spotify"),
            br#"{"id":"spotify","name":"Spotify","url":"https://open.spotify.com","category":"media","featured":true,"configuration":{"zoom":1.25}}"#.to_vec(),
        );
        let mut t = fetch_template(&store, TOKEN, "media", "spotify").await.unwrap().unwrap();
        t.description = "Music".into();
        save_template(&store, TOKEN, &t, false).await.unwrap();

        let stored: Value = store.get_json("templates/media/spotify.json").unwrap();
        assert_eq!(stored["featured"], true);
        assert_eq!(stored["configuration"]["zoom"], 1.25);
        assert_eq!(stored["description"], "Music");
    }

    #[tokio::test]
    async fn test_fetch_category() {
        let store = seeded();
        assert_eq!(fetch_all_categories(&store, TOKEN).await.unwrap().len(), 2);
        let media = fetch_category(&store, TOKEN, "media").await.unwrap().unwrap();
        assert_eq!(media.name, "MEDIA");
        assert!(fetch_category(&store, TOKEN, "news").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_category_keeps_template_count() {
        let store = seeded();
        update_template_counts(&store, TOKEN).await.unwrap();

        let mut edited = category("productivity", 99);
        edited.name = "Work & Tasks".into();
        edited.configuration = CategoryConfiguration {
            float_on_top: true,
            ..Default::default()
        };
        assert!(save_category(&store, TOKEN, &edited).await.unwrap());

        let stored = fetch_category(&store, TOKEN, "productivity").await.unwrap().unwrap();
        assert_eq!(stored.name, "Work & Tasks");
        assert!(stored.configuration.float_on_top);
        assert_eq!(stored.template_count, 2);
        assert_eq!(
            store.commits().last().unwrap().message,
            "Update category: Work & Tasks"
        );
    }

    #[tokio::test]
    async fn test_save_unknown_category_returns_false() {
        let store = seeded();
        assert!(!save_category(&store, TOKEN, &category("news", 0)).await.unwrap());
        assert!(store.commits().is_empty());
    }

    #[tokio::test]
    async fn test_upload_and_delete_icon() {
        let store = MemoryStore::new();
        let path = upload_icon(&store, TOKEN, "notion", "data:image/png;base64,aGVsbG8=")
            .await
            .unwrap();
        assert_eq!(path, "icons/notion.png");
        assert_eq!(store.get("icons/notion.png").unwrap(), b"hello");
        assert_eq!(store.commits()[0].message, "Add icon for template: notion");

        delete_icon(&store, TOKEN, "notion").await.unwrap();
        assert!(!store.contains("icons/notion.png"));
        assert_eq!(store.commits()[1].message, "Delete icon for template: notion");
    }
}
