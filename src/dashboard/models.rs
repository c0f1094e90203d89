use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Template ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum WindowStyle {
    #[default]
    Normal,
    MenuBar,
    Sidebar,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InternalLinkBehavior {
    SameWindow,
    NewTab,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ExternalLinkBehavior {
    SystemBrowser,
    NewTab,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CookiePolicy {
    Persistent,
    Session,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TemplateUserAgent {
    Default,
    Chrome,
    Safari,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AdBlocking {
    Disabled,
    Basic,
    Advanced,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IconShape {
    Circular,
    Rounded,
    Square,
}

impl IconShape {
    /// Corner radius for a 256px icon.
    pub fn corner_radius(self) -> u32 {
        match self {
            Self::Circular => 128,
            Self::Rounded => 56,
            Self::Square => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateConfiguration {
    pub window_style: WindowStyle,
    pub window_width: u32,
    pub window_height: u32,
    pub tabbed_browsing: bool,
    pub notifications: bool,
    pub internal_link_behavior: InternalLinkBehavior,
    pub external_link_behavior: ExternalLinkBehavior,
    pub cookie_policy: CookiePolicy,
    pub user_agent: TemplateUserAgent,
    pub ad_blocking: AdBlocking,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TemplateConfiguration {
    fn default() -> Self {
        Self {
            window_style: WindowStyle::Normal,
            window_width: 1200,
            window_height: 800,
            tabbed_browsing: true,
            notifications: true,
            internal_link_behavior: InternalLinkBehavior::NewTab,
            external_link_behavior: ExternalLinkBehavior::SystemBrowser,
            cookie_policy: CookiePolicy::Persistent,
            user_agent: TemplateUserAgent::Default,
            ad_blocking: AdBlocking::Basic,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateMetadata {
    pub version: String,
    pub author: String,
    pub last_updated: String,
    pub tier: u32,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TemplateMetadata {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            author: "Web2App Studio".to_string(),
            last_updated: String::new(),
            tier: 1,
            tags: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// One pre-configured website-wrapping app, stored at
/// `templates/<category>/<id>.json`.
///
/// Required string fields default to empty so a payload missing them reaches
/// [`Template::missing_required_fields`] instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub icon_color: String,
    #[serde(default)]
    pub icon_background: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_shape: Option<IconShape>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub configuration: TemplateConfiguration,
    #[serde(default)]
    pub metadata: TemplateMetadata,
    /// Keys this version does not model, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Template {
    pub fn missing_required_fields(&self) -> bool {
        [&self.id, &self.name, &self.url, &self.category]
            .iter()
            .any(|f| f.trim().is_empty())
    }
}

// ── Category ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WindowPreset {
    Phone,
    Tablet,
    Desktop,
    #[serde(rename = "fullHD")]
    FullHd,
    FourK,
    Custom,
}

impl WindowPreset {
    /// Default `(width, height)` for the preset.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Phone => (375, 667),
            Self::Tablet => (768, 1024),
            Self::Desktop => (1200, 800),
            Self::FullHd => (1920, 1080),
            Self::FourK => (3840, 2160),
            Self::Custom => (1200, 800),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
            Self::FullHd => "fullHD",
            Self::FourK => "fourK",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for WindowPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone" => Ok(Self::Phone),
            "tablet" => Ok(Self::Tablet),
            "desktop" => Ok(Self::Desktop),
            "fullHD" => Ok(Self::FullHd),
            "fourK" => Ok(Self::FourK),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("Invalid window preset: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LinkBehavior {
    SameWindow,
    NewTab,
    SystemBrowser,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CategoryUserAgent {
    Default,
    Chrome,
    Safari,
    Firefox,
    MobileSafari,
    Custom,
}

/// Default app behavior applied to every template in a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryConfiguration {
    // Window
    pub window_style: WindowStyle,
    pub window_preset: WindowPreset,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,

    // Standard features
    pub show_navigation_controls: bool,
    #[serde(rename = "showPageURL")]
    pub show_page_url: bool,
    pub cookie_persistence: bool,
    pub enable_keyboard_shortcuts: bool,
    pub enable_dock_badge: bool,
    pub enable_password_auto_fill: bool,
    pub launch_at_login: bool,
    pub float_on_top: bool,
    pub enable_developer_tools: bool,

    // Pro features
    pub tabbed_browsing: bool,
    pub notifications: bool,
    pub ad_blocking: bool,

    pub internal_link_behavior: LinkBehavior,
    pub external_link_behavior: LinkBehavior,

    pub user_agent: Option<CategoryUserAgent>,
    pub custom_user_agent_string: Option<String>,

    pub use_custom_toolbar_color: bool,
    pub toolbar_color: Option<String>,

    pub allow_microphone: Option<bool>,
    pub allow_camera: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CategoryConfiguration {
    fn default() -> Self {
        Self {
            window_style: WindowStyle::Normal,
            window_preset: WindowPreset::Desktop,
            window_width: None,
            window_height: None,
            show_navigation_controls: true,
            show_page_url: true,
            cookie_persistence: true,
            enable_keyboard_shortcuts: true,
            enable_dock_badge: false,
            enable_password_auto_fill: true,
            launch_at_login: false,
            float_on_top: false,
            enable_developer_tools: false,
            tabbed_browsing: false,
            notifications: false,
            ad_blocking: false,
            internal_link_behavior: LinkBehavior::SameWindow,
            external_link_behavior: LinkBehavior::SystemBrowser,
            user_agent: None,
            custom_user_agent_string: None,
            use_custom_toolbar_color: false,
            toolbar_color: None,
            allow_microphone: None,
            allow_camera: None,
            extra: Map::new(),
        }
    }
}

impl CategoryConfiguration {
    /// Effective window size: explicit dimensions win over the preset.
    pub fn window_size(&self) -> (u32, u32) {
        let (w, h) = self.window_preset.dimensions();
        (self.window_width.unwrap_or(w), self.window_height.unwrap_or(h))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// SF Symbol name, e.g. `chart.bar.fill`.
    pub icon: String,
    pub emoji: String,
    pub short_description: String,
    pub full_description: String,
    /// Legacy field kept for older manifest readers.
    pub description: String,
    pub template_count: u32,
    pub configuration: CategoryConfiguration,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Manifest ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    pub version: String,
    pub last_updated: String,
    pub categories: Vec<Category>,
    pub featured_templates: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }
}

/// Body of the public `GET /api/categories` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoriesResponse {
    pub version: String,
    pub last_updated: String,
    pub categories: Vec<Category>,
}

// ── Auth ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: String,
    pub email: Option<String>,
}

/// Date stamp used for `lastUpdated` fields (`YYYY-MM-DD`, UTC).
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
