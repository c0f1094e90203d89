//! Unauthenticated read API used by the desktop app. Every request reads the
//! repository with the server's own templates token.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;

use super::api::{ApiError, JsonBody, SharedState, ensure_segment};
use super::catalog;
use super::models::{CategoriesResponse, today};

pub const CATEGORIES_VERSION: &str = "2.0.0";

const CATEGORIES_CACHE: &str = "public, s-maxage=300, stale-while-revalidate=3600";
const TEMPLATES_CACHE: &str = "public, s-maxage=300";
const ICONS_CACHE: &str = "public, max-age=3600, s-maxage=3600";

#[derive(Deserialize)]
pub struct TemplatesQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Deserialize)]
pub struct CategoryTemplatesRequest {
    #[serde(default)]
    pub category: String,
}

pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/templates", get(read_catalog_file).post(category_templates))
        .route("/api/icons/{*path}", get(serve_icon))
        .route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "ok"
}

async fn list_categories(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let token = state.templates_token()?;
    let categories = catalog::fetch_all_categories(state.store.as_ref(), token).await?;
    let body = CategoriesResponse {
        version: CATEGORIES_VERSION.to_string(),
        last_updated: today(),
        categories,
    };
    Ok(([(CACHE_CONTROL, CATEGORIES_CACHE)], Json(body)))
}

/// `?path=<file>.json` returns that file, anything else the manifest.
async fn read_catalog_file(
    State(state): State<SharedState>,
    Query(query): Query<TemplatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.templates_token()?;
    let (path, missing) = if query.path.ends_with(".json") {
        if !catalog::is_valid_repo_path(&query.path) {
            return Err(ApiError::BadRequest("Invalid path segment".into()));
        }
        (query.path.as_str(), "Template not found")
    } else {
        (catalog::MANIFEST_PATH, "Manifest not found")
    };

    let bytes = state
        .store
        .read_raw(token, path)
        .await?
        .ok_or_else(|| ApiError::NotFound(missing.into()))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::error!(path, error = %e, "catalog file is not valid JSON");
        ApiError::Internal(format!("Failed to parse {}", path))
    })?;
    Ok(([(CACHE_CONTROL, TEMPLATES_CACHE)], Json(value)))
}

async fn category_templates(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<CategoryTemplatesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.templates_token()?;
    if req.category.is_empty() {
        return Err(ApiError::BadRequest("Category is required".into()));
    }
    ensure_segment(&req.category)?;
    let templates = catalog::list_category_documents(state.store.as_ref(), token, &req.category)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;
    Ok(Json(json!({"templates": templates})))
}

fn icon_content_type(path: &str) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or("image/png")
}

async fn serve_icon(
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.templates_token()?;
    if !catalog::is_valid_repo_path(&path) {
        return Err(ApiError::BadRequest("Invalid path segment".into()));
    }
    let bytes = state
        .store
        .read_raw(token, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound("Icon not found".into()))?;
    Ok((
        [
            (CONTENT_TYPE, icon_content_type(&path)),
            (CACHE_CONTROL, ICONS_CACHE),
        ],
        bytes,
    ))
}
