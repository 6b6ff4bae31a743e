//! Entity model for Weft applications.
//!
//! An application is a set of pages, each owning a flat list of canvas
//! components, plus shared collections of API endpoints, SQL queries and
//! datasources, and an open global key/value state. Component `props` and
//! `style` are open maps — their per-widget semantics belong to the
//! presentation layer; the core only interprets the handful of virtual
//! properties exposed to binding expressions.

use crate::id::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Open key → value map used for component props, styles and action params.
pub type PropMap = serde_json::Map<String, Value>;

/// The application-wide key/value store mutated by `store` actions.
pub type GlobalState = serde_json::Map<String, Value>;

// ─── Widget kinds ────────────────────────────────────────────────────────

/// The fixed catalog of widget kinds a component can be.
///
/// Defaults, icons and property schemas for each kind live in the
/// presentation layer; the core only branches on kinds that expose virtual
/// binding properties (input, button, select, checkbox, table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Button,
    Input,
    Text,
    Image,
    Table,
    Select,
    Checkbox,
    Radio,
    Switch,
    Slider,
    Datepicker,
    Filepicker,
    Chart,
    List,
    Container,
    Modal,
    Tabs,
    Customfunction,
    Currency,
    Phone,
    Richtext,
    Iconbutton,
    Buttongroup,
    Menu,
    Divider,
    Rating,
    Progress,
    Audio,
    Video,
    Map,
    Iframe,
    Card,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Input => "input",
            Self::Text => "text",
            Self::Image => "image",
            Self::Table => "table",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Switch => "switch",
            Self::Slider => "slider",
            Self::Datepicker => "datepicker",
            Self::Filepicker => "filepicker",
            Self::Chart => "chart",
            Self::List => "list",
            Self::Container => "container",
            Self::Modal => "modal",
            Self::Tabs => "tabs",
            Self::Customfunction => "customfunction",
            Self::Currency => "currency",
            Self::Phone => "phone",
            Self::Richtext => "richtext",
            Self::Iconbutton => "iconbutton",
            Self::Buttongroup => "buttongroup",
            Self::Menu => "menu",
            Self::Divider => "divider",
            Self::Rating => "rating",
            Self::Progress => "progress",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Map => "map",
            Self::Iframe => "iframe",
            Self::Card => "card",
        }
    }
}

// ─── Components ──────────────────────────────────────────────────────────

/// A single component placed on a page's canvas.
///
/// Owned exclusively by its containing page; selection state references it
/// by id, never by a duplicated copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: ComponentKind,

    /// Top-left corner in canvas units.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    /// Open per-widget properties (label, defaultText, tableData, …).
    #[serde(default)]
    pub props: PropMap,
    /// Open CSS-ish style overrides (camelCase keys).
    #[serde(default)]
    pub style: PropMap,

    /// Named binding expressions, e.g. `text → "{{users_api.data}}"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings: Option<BTreeMap<String, String>>,
    /// Event name → action chain (`onClick`, `onTextChanged`, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<BTreeMap<String, ActionConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_js: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_html: Option<String>,
}

impl ComponentNode {
    pub fn new(id: EntityId, kind: ComponentKind, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            width,
            height,
            props: PropMap::new(),
            style: PropMap::new(),
            bindings: None,
            events: None,
            custom_css: None,
            custom_js: None,
            custom_html: None,
        }
    }

    /// Look up a prop value by key.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// Prop coerced to bool; missing or non-bool values return `default`.
    pub fn bool_prop(&self, key: &str, default: bool) -> bool {
        self.props.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Prop coerced to f64; missing or non-numeric values return `default`.
    pub fn num_prop(&self, key: &str, default: f64) -> f64 {
        self.props.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Prop coerced to &str; missing or non-string values return `None`.
    pub fn str_prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }
}

// ─── Actions ─────────────────────────────────────────────────────────────

/// What an action does when triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// No effect. Executing a `none` action is a no-op.
    #[default]
    None,
    /// Run the API or SQL query named by `target`.
    Query,
    /// Evaluate the script snippet in `target` with helper bindings.
    Js,
    /// Navigate to the URL/route in `target`.
    Navigate,
    /// Show an alert with `params.message`.
    Alert,
    /// Ask the presentation layer to open the modal named by `target`.
    Modal,
    /// Write `params.value` into global state under the key in `target`.
    Store,
    /// Copy `params.text` to the clipboard.
    Copy,
    /// Download the file at `params.url` (optionally `params.filename`).
    Download,
    /// Delete the component named by `target` (`self`/empty = the source).
    Remove,
}

/// Optional confirmation prompt shown before an action runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfirmation {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A configured action, possibly chained through success/failure
/// continuations. Chains are interpreted iteratively, so arbitrarily long
/// sequences stay flat on the stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<PropMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ActionConfirmation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Runs only after the primary effect completes without error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Box<ActionConfig>>,
    /// Runs only if the primary effect raises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Box<ActionConfig>>,
}

impl ActionConfig {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// A param value by key, if params are present.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|p| p.get(key))
    }
}

// ─── APIs ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "PATCH")]
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthKind {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "bearer")]
    Bearer,
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "api-key")]
    ApiKey,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(rename = "type")]
    pub kind: AuthKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Header name the key is sent under; defaults to `X-API-Key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_header: Option<String>,
}

/// Captured result of a completed API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    /// Response headers flattened to a string map.
    pub headers: BTreeMap<String, String>,
    /// Body parsed as JSON, falling back to a raw text value.
    pub body: Value,
}

/// An HTTP endpoint definition plus the state of its last run.
///
/// `response` and `error` are mutually exclusive for a given call;
/// `is_loading` is true only while a call is in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    pub id: EntityId,
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub authentication: Authentication,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ApiResponse>,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Advisory request timeout in milliseconds (default 30 000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl ApiEndpoint {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            method: HttpMethod::Get,
            url: String::new(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            body: None,
            authentication: Authentication::default(),
            response: None,
            is_loading: false,
            error: None,
            timeout_ms: None,
            retries: None,
        }
    }
}

// ─── SQL queries ─────────────────────────────────────────────────────────

/// A SQL-like query definition. Execution is simulated — the run lifecycle
/// mirrors `ApiEndpoint` but results come from a mock executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlQuery {
    pub id: EntityId,
    pub name: String,
    pub query: String,
    /// Id of the datasource this query runs against.
    pub datasource: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Value>>,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub parameters: PropMap,
}

impl SqlQuery {
    pub fn new(id: EntityId, name: impl Into<String>, datasource: EntityId) -> Self {
        Self {
            id,
            name: name.into(),
            query: String::new(),
            datasource,
            result: None,
            is_loading: false,
            error: None,
            parameters: PropMap::new(),
        }
    }
}

// ─── Datasources ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DatasourceKind {
    #[default]
    #[serde(rename = "postgresql")]
    Postgresql,
    #[serde(rename = "mysql")]
    Mysql,
    #[serde(rename = "mongodb")]
    Mongodb,
    #[serde(rename = "rest-api")]
    RestApi,
    #[serde(rename = "graphql")]
    Graphql,
    #[serde(rename = "firebase")]
    Firebase,
    #[serde(rename = "supabase")]
    Supabase,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// A configured connection target for SQL queries.
///
/// `is_connected` stays `None` until a connection test has run at least once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DatasourceKind,
    #[serde(default)]
    pub config: DatasourceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tested: Option<DateTime<Utc>>,
}

impl Datasource {
    pub fn new(id: EntityId, name: impl Into<String>, kind: DatasourceKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            config: DatasourceConfig::default(),
            is_connected: None,
            last_tested: None,
        }
    }
}

// ─── Pages ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSeo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub keywords: SmallVec<[String; 4]>,
}

/// One page of the application.
///
/// `components` is the authoritative persisted copy of the page's canvas.
/// While the page is current, the store's working list is the live copy and
/// this vec is stale; every page-switching operation writes the working list
/// back before leaving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPage {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentNode>,
    /// APIs associated with this page (informational membership list).
    #[serde(default)]
    pub apis: Vec<EntityId>,
    /// Queries associated with this page (informational membership list).
    #[serde(default)]
    pub queries: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default)]
    pub is_home_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<PageSeo>,
}

impl AppPage {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            components: Vec::new(),
            apis: Vec::new(),
            queries: Vec::new(),
            route: None,
            is_home_page: false,
            seo: None,
        }
    }

    /// The built-in default page used when no persisted state exists.
    pub fn default_home() -> Self {
        Self {
            id: EntityId::intern("page-1"),
            name: "Home".into(),
            components: Vec::new(),
            apis: Vec::new(),
            queries: Vec::new(),
            route: Some("/".into()),
            is_home_page: true,
            seo: Some(PageSeo {
                title: Some("Home Page".into()),
                description: Some("Welcome to our application".into()),
                keywords: SmallVec::new(),
            }),
        }
    }
}

// ─── Settings & theme ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub surface: String,
    pub text: String,
    pub text_secondary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeFonts {
    pub primary: String,
    pub secondary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeSpacing {
    pub xs: String,
    pub sm: String,
    pub md: String,
    pub lg: String,
    pub xl: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub colors: ThemeColors,
    pub fonts: ThemeFonts,
    pub spacing: ThemeSpacing,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            id: "default".into(),
            name: "Default".into(),
            colors: ThemeColors {
                primary: "#3B82F6".into(),
                secondary: "#6B7280".into(),
                accent: "#10B981".into(),
                background: "#FFFFFF".into(),
                surface: "#F9FAFB".into(),
                text: "#1F2937".into(),
                text_secondary: "#6B7280".into(),
            },
            fonts: ThemeFonts {
                primary: "Inter, sans-serif".into(),
                secondary: "JetBrains Mono, monospace".into(),
            },
            spacing: ThemeSpacing {
                xs: "0.25rem".into(),
                sm: "0.5rem".into(),
                md: "1rem".into(),
                lg: "1.5rem".into(),
                xl: "2rem".into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub theme: Theme,
    pub responsive: bool,
    pub rtl: bool,
    pub animations: bool,
    pub debug_mode: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            responsive: true,
            rtl: false,
            animations: true,
            debug_mode: false,
        }
    }
}

/// Output of the code generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub html: String,
    pub css: String,
    pub javascript: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn component_serde_roundtrip() {
        let mut node = ComponentNode::new(
            EntityId::intern("button-1"),
            ComponentKind::Button,
            100.0,
            40.0,
            120.0,
            40.0,
        );
        node.props
            .insert("label".into(), Value::String("Submit".into()));

        let mut chain = ActionConfig::new(ActionKind::Query);
        chain.target = Some("users_api".into());
        chain.on_success = Some(Box::new(ActionConfig {
            kind: ActionKind::Alert,
            params: Some(
                [("message".to_string(), Value::String("done".into()))]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        }));
        node.events = Some([("onClick".to_string(), chain)].into_iter().collect());

        let json = serde_json::to_string(&node).unwrap();
        let back: ComponentNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, node.id);
        assert_eq!(back.kind, ComponentKind::Button);
        let restored = &back.events.unwrap()["onClick"];
        assert_eq!(restored.kind, ActionKind::Query);
        assert_eq!(restored.on_success.as_ref().unwrap().kind, ActionKind::Alert);
    }

    #[test]
    fn kind_tags_are_lowercase() {
        let json = serde_json::to_string(&ComponentKind::Customfunction).unwrap();
        assert_eq!(json, "\"customfunction\"");
        let json = serde_json::to_string(&AuthKind::ApiKey).unwrap();
        assert_eq!(json, "\"api-key\"");
    }

    #[test]
    fn api_defaults_are_idle() {
        let api = ApiEndpoint::new(EntityId::intern("api-1"), "Users");
        assert!(!api.is_loading);
        assert!(api.response.is_none());
        assert!(api.error.is_none());
        assert_eq!(api.method.as_str(), "GET");
    }

    #[test]
    fn datasource_untested_until_first_check() {
        let ds = Datasource::new(
            EntityId::intern("ds-1"),
            "Main DB",
            DatasourceKind::Postgresql,
        );
        assert_eq!(ds.is_connected, None);
        assert!(ds.last_tested.is_none());
    }
}
