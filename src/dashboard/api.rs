use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::catalog;
use super::icons::{self, IconFetcher};
use super::models::{Category, Template, today};
use super::session::{AdminSession, clear_session_cookie};
use super::store::{ContentStore, IdentityProvider};
use crate::config::AdminConfig;
use crate::errors::{GitHubError, IconError};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub config: AdminConfig,
    pub store: Arc<dyn ContentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub icons: Arc<dyn IconFetcher>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Cookies are marked `Secure` in production.
    pub fn secure_cookies(&self) -> bool {
        self.config.server.production
    }

    /// The server's own read token for the public endpoints.
    pub fn templates_token(&self) -> Result<&str, ApiError> {
        self.config
            .github
            .templates_token
            .as_deref()
            .ok_or_else(|| {
                tracing::error!("GITHUB_TEMPLATES_TOKEN is not configured");
                ApiError::Internal("Server configuration error".into())
            })
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct FetchIconRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadIconRequest {
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub image_data: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub dry_run: bool,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    /// Unauthorized, and the stale session cookie is cleared.
    SessionExpired { secure: bool },
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::SessionExpired { secure } => {
                return (
                    StatusCode::UNAUTHORIZED,
                    [(SET_COOKIE, clear_session_cookie(secure))],
                    Json(json!({"error": "Unauthorized"})),
                )
                    .into_response();
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

impl From<GitHubError> for ApiError {
    fn from(err: GitHubError) -> Self {
        if err.is_not_found() {
            return ApiError::NotFound(err.to_string());
        }
        tracing::error!(error = %err, "GitHub request failed");
        ApiError::Internal(err.to_string())
    }
}

/// JSON body extractor whose rejections are `{error}` 400s. Content type is
/// not enforced.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
    }
}

/// Reject ids that could escape their directory in the repo.
pub fn ensure_segment(segment: &str) -> Result<(), ApiError> {
    if catalog::is_valid_segment(segment) {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid path segment".into()))
    }
}

fn require_category(query: CategoryQuery) -> Result<String, ApiError> {
    let category = query
        .category
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Category parameter is required".into()))?;
    ensure_segment(&category)?;
    Ok(category)
}

// ── Router ────────────────────────────────────────────────────────────

/// Session-guarded catalog management routes.
pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/admin/templates",
            get(list_templates).post(create_template).put(update_template),
        )
        .route(
            "/api/admin/templates/{id}",
            get(get_template).delete(delete_template),
        )
        .route("/api/admin/categories", get(list_categories))
        .route(
            "/api/admin/categories/{id}",
            get(get_category).put(update_category),
        )
        .route("/api/admin/icon", post(fetch_icon))
        .route("/api/admin/icon/upload", post(upload_icon))
        .route("/api/admin/icon/batch", post(batch_icons))
        .route("/api/admin/icon/{id}", delete(delete_icon))
        .route("/api/admin/counts", put(refresh_counts))
}

// ── Templates ─────────────────────────────────────────────────────────

async fn list_templates(
    State(state): State<SharedState>,
    session: AdminSession,
) -> Result<impl IntoResponse, ApiError> {
    let token = &session.access_token;
    let store = state.store.as_ref();
    let (templates, manifest) = tokio::try_join!(
        catalog::fetch_all_templates(store, token),
        catalog::fetch_manifest(store, token),
    )?;
    let categories = manifest.map(|m| m.categories).unwrap_or_default();
    Ok(Json(json!({"templates": templates, "categories": categories})))
}

fn prepare_template(mut template: Template) -> Result<Template, ApiError> {
    if template.missing_required_fields() {
        return Err(ApiError::BadRequest(
            "Missing required fields: id, name, url, category".into(),
        ));
    }
    template.id = catalog::normalize_id(&template.id);
    ensure_segment(&template.id)?;
    ensure_segment(&template.category)?;
    template.metadata.last_updated = today();
    Ok(template)
}

/// Recount after a create or delete. The write itself already succeeded, so
/// a failure here is only logged.
async fn recount(store: &dyn ContentStore, token: &str) {
    if let Err(e) = catalog::update_template_counts(store, token).await {
        tracing::warn!(error = %e, "failed to update template counts");
    }
}

async fn create_template(
    State(state): State<SharedState>,
    session: AdminSession,
    JsonBody(template): JsonBody<Template>,
) -> Result<impl IntoResponse, ApiError> {
    let template = prepare_template(template)?;
    let store = state.store.as_ref();
    catalog::save_template(store, &session.access_token, &template, true).await?;
    tracing::info!(template = %template.id, user = %session.user.login, "template created");
    recount(store, &session.access_token).await;
    Ok(Json(json!({"success": true, "template": template})))
}

async fn update_template(
    State(state): State<SharedState>,
    session: AdminSession,
    JsonBody(template): JsonBody<Template>,
) -> Result<impl IntoResponse, ApiError> {
    let template = prepare_template(template)?;
    catalog::save_template(state.store.as_ref(), &session.access_token, &template, false).await?;
    tracing::info!(template = %template.id, user = %session.user.login, "template updated");
    Ok(Json(json!({"success": true, "template": template})))
}

async fn get_template(
    State(state): State<SharedState>,
    session: AdminSession,
    Path(id): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = require_category(query)?;
    ensure_segment(&id)?;
    let template =
        catalog::fetch_template(state.store.as_ref(), &session.access_token, &category, &id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Template not found".into()))?;
    Ok(Json(json!({"template": template})))
}

async fn delete_template(
    State(state): State<SharedState>,
    session: AdminSession,
    Path(id): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = require_category(query)?;
    ensure_segment(&id)?;
    let store = state.store.as_ref();
    catalog::delete_template(store, &session.access_token, &category, &id).await?;
    tracing::info!(template = %id, %category, user = %session.user.login, "template deleted");
    recount(store, &session.access_token).await;
    Ok(Json(json!({"success": true})))
}

async fn refresh_counts(
    State(state): State<SharedState>,
    session: AdminSession,
) -> Result<impl IntoResponse, ApiError> {
    let manifest =
        catalog::update_template_counts(state.store.as_ref(), &session.access_token).await?;
    Ok(Json(json!({"success": true, "categories": manifest.categories})))
}

// ── Categories ────────────────────────────────────────────────────────

async fn list_categories(
    State(state): State<SharedState>,
    session: AdminSession,
) -> Result<impl IntoResponse, ApiError> {
    let categories =
        catalog::fetch_all_categories(state.store.as_ref(), &session.access_token).await?;
    Ok(Json(json!({"categories": categories})))
}

async fn get_category(
    State(state): State<SharedState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_segment(&id)?;
    let category = catalog::fetch_category(state.store.as_ref(), &session.access_token, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;
    Ok(Json(json!({"category": category})))
}

async fn update_category(
    State(state): State<SharedState>,
    session: AdminSession,
    Path(id): Path<String>,
    JsonBody(category): JsonBody<Category>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_segment(&id)?;
    if category.id != id {
        return Err(ApiError::BadRequest("Category ID mismatch".into()));
    }
    if category.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing required fields: id, name".into()));
    }
    let saved =
        catalog::save_category(state.store.as_ref(), &session.access_token, &category).await?;
    if !saved {
        return Err(ApiError::NotFound("Category not found".into()));
    }
    tracing::info!(category = %id, user = %session.user.login, "category updated");
    Ok(Json(json!({"success": true, "category": category})))
}

// ── Icons ─────────────────────────────────────────────────────────────

async fn fetch_icon(
    State(state): State<SharedState>,
    _session: AdminSession,
    JsonBody(req): JsonBody<FetchIconRequest>,
) -> Result<Response, ApiError> {
    if req.url.trim().is_empty() {
        return Err(ApiError::BadRequest("URL is required".into()));
    }
    match icons::fetch_icon_from_url(state.icons.as_ref(), &req.url).await {
        Ok(icon) => Ok(Json(json!({
            "success": true,
            "data": icon.data_url,
            "source": icon.source,
        }))
        .into_response()),
        Err(IconError::InvalidUrl) => Err(ApiError::BadRequest("Invalid URL".into())),
        Err(IconError::NotFound) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "No icon found for this website"})),
        )
            .into_response()),
    }
}

async fn upload_icon(
    State(state): State<SharedState>,
    session: AdminSession,
    JsonBody(req): JsonBody<UploadIconRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.template_id.is_empty() {
        return Err(ApiError::BadRequest("Template ID is required".into()));
    }
    if req.image_data.is_empty() {
        return Err(ApiError::BadRequest("Image data is required".into()));
    }
    ensure_segment(&req.template_id)?;
    if STANDARD.decode(catalog::strip_data_url(&req.image_data)).is_err() {
        return Err(ApiError::BadRequest("Image data is not valid base64".into()));
    }
    let icon_url = catalog::upload_icon(
        state.store.as_ref(),
        &session.access_token,
        &req.template_id,
        &req.image_data,
    )
    .await?;
    tracing::info!(template = %req.template_id, user = %session.user.login, "icon uploaded");
    Ok(Json(json!({"success": true, "iconUrl": icon_url})))
}

async fn delete_icon(
    State(state): State<SharedState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_segment(&id)?;
    catalog::delete_icon(state.store.as_ref(), &session.access_token, &id).await?;
    tracing::info!(template = %id, user = %session.user.login, "icon deleted");
    Ok(Json(json!({"success": true})))
}

/// The body is optional; anything unparseable means a real run.
async fn batch_icons(
    State(state): State<SharedState>,
    session: AdminSession,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: BatchRequest = serde_json::from_slice(&body).unwrap_or_default();
    let report = icons::run_batch(
        state.store.as_ref(),
        state.icons.as_ref(),
        &session.access_token,
        req.dry_run,
    )
    .await
    .map_err(|e| {
        if e.is_not_found() {
            ApiError::Internal("Failed to fetch manifest".into())
        } else {
            e.into()
        }
    })?;
    Ok(Json(json!({
        "success": true,
        "summary": report.summary,
        "results": report.results,
    })))
}
