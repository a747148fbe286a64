//! The parsed shape of the operator's configuration document (§3, §6).
//!
//! Loading itself is a thin layer over `figment`, mirroring
//! `runtime::config::AppConfig::load_layered`: defaults, then a YAML file,
//! then `PRETENDO__`-prefixed environment variables, each layer overriding
//! the previous one.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PretendoConfig {
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    #[serde(default)]
    pub options: Options,
    /// Seed data: `resource name -> records`. Overrides any resource-level
    /// `seed` entries for the same resource.
    #[serde(default)]
    pub data: HashMap<String, Vec<Record>>,
    #[serde(default)]
    pub routes: Vec<CustomRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
    #[serde(default)]
    pub access: HashMap<Action, Vec<String>>,
    pub owned_by: Option<String>,
    /// Resource-level seed data, used only if the top-level `data` map has no
    /// entry for this resource's name.
    #[serde(default)]
    pub seed: Vec<Record>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    List,
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(rename = "minLength")]
    pub min_length: Option<usize>,
    #[serde(rename = "maxLength")]
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    #[serde(rename = "enum", default)]
    pub enum_values: Vec<Value>,
    #[serde(rename = "defaultValue")]
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Date,
    Uuid,
}

/// Reserved `defaultValue` tokens recognized by the special-field processor.
pub const SPECIAL_NOW: &str = "$now";
pub const SPECIAL_UUID: &str = "$uuid";
pub const SPECIAL_USER_ID: &str = "$userId";
pub const SPECIAL_INCREMENT: &str = "$increment";
pub const SPECIAL_HASH: &str = "$hash";

pub fn is_special_token(v: &Value) -> bool {
    matches!(
        v.as_str(),
        Some(SPECIAL_NOW)
            | Some(SPECIAL_UUID)
            | Some(SPECIAL_USER_ID)
            | Some(SPECIAL_INCREMENT)
            | Some(SPECIAL_HASH)
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipConfig {
    /// Path segment / field name this relationship is attached under in
    /// expanded responses (e.g. `author`, `posts`).
    pub name: String,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    pub resource: String,
    #[serde(rename = "foreignKey")]
    pub foreign_key: String,
    #[serde(rename = "targetKey")]
    pub target_key: Option<String>,
    pub through: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipType {
    BelongsTo,
    HasOne,
    HasMany,
    ManyToMany,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Legacy single-field shorthand for `database.dbPath`.
    pub db_path: Option<String>,
    pub database: Option<DatabaseOptions>,
    pub auth: Option<AuthOptions>,
    pub latency: Option<LatencyOptions>,
    pub error_simulation: Option<ErrorSimulationOptions>,
    #[serde(default = "default_true")]
    pub log_requests: bool,
    #[serde(default = "default_log_max_entries")]
    pub log_max_entries: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    pub docs: Option<DocsOptions>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_enabled: true,
            db_path: None,
            database: None,
            auth: None,
            latency: None,
            error_simulation: None,
            log_requests: true,
            log_max_entries: default_log_max_entries(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            docs: None,
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_max_entries() -> usize {
    1000
}
fn default_page_size() -> u64 {
    10
}
fn default_max_page_size() -> u64 {
    100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseOptions {
    #[serde(default)]
    pub adapter: AdapterKind,
    #[serde(rename = "dbPath")]
    pub db_path: Option<String>,
    #[serde(rename = "autoSave", default = "default_true")]
    pub auto_save: bool,
    #[serde(rename = "saveInterval", default = "default_save_interval")]
    pub save_interval: u64,
    #[serde(rename = "strictValidation", default = "default_true")]
    pub strict_validation: bool,
}

impl Default for AdapterKind {
    fn default() -> Self {
        AdapterKind::Memory
    }
}

fn default_save_interval() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_login_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_auth_header")]
    pub header_name: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
    /// Name of a configured resource to use as the user source, if any.
    pub user_resource: Option<String>,
    /// Field on the user resource (or inline user) holding the username.
    #[serde(default = "default_username_field")]
    pub username_field: String,
    #[serde(default = "default_password_field")]
    pub password_field: String,
    /// Inline user list, used when `user_resource` is not set.
    #[serde(default)]
    pub users: Vec<Record>,
}

fn default_login_endpoint() -> String {
    "/auth/login".to_string()
}
fn default_auth_header() -> String {
    "Authorization".to_string()
}
fn default_token_ttl() -> u64 {
    3600
}
fn default_username_field() -> String {
    "username".to_string()
}
fn default_password_field() -> String {
    "password".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub fixed: Option<u64>,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSimulationOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub rate: f64,
    #[serde(default = "default_status_codes")]
    pub status_codes: Vec<u16>,
    #[serde(default = "default_query_trigger")]
    pub query_param_trigger: String,
}

fn default_status_codes() -> Vec<u16> {
    vec![500, 502, 503, 504]
}
fn default_query_trigger() -> String {
    "_errorStatus".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub require_auth: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRoute {
    pub method: String,
    pub path: String,
    pub auth: Option<RouteAuth>,
    #[serde(flatten)]
    pub kind: CustomRouteKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteAuth {
    pub enabled: bool,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomRouteKind {
    Script { script: String },
    Json { response: Value },
}

/// Command-line overrides applied after layered config loading.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
}

impl PretendoConfig {
    /// Loads `defaults -> YAML file -> PRETENDO__ env vars`, mirroring the
    /// teacher's `AppConfig::load_layered`.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(PretendoConfig::default()))
            .merge(Yaml::file(config_path.as_ref()))
            .merge(Env::prefixed("PRETENDO__").split("__"));

        figment
            .extract()
            .with_context(|| format!("failed to load config from {:?}", config_path.as_ref()))
    }

    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(port) = overrides.port {
            self.options.port = port;
        }
        if let Some(host) = &overrides.host {
            self.options.host = host.clone();
        }
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Resolves effective seed data for a resource: top-level `data` wins
    /// over the resource's inline `seed`.
    pub fn seed_for(&self, resource: &str) -> Vec<Record> {
        if let Some(rows) = self.data.get(resource) {
            return rows.clone();
        }
        self.resource(resource)
            .map(|r| r.seed.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_spec() {
        let opts = Options::default();
        assert_eq!(opts.port, 3000);
        assert_eq!(opts.host, "localhost");
        assert!(opts.cors_enabled);
        assert_eq!(opts.default_page_size, 10);
        assert_eq!(opts.max_page_size, 100);
        assert_eq!(opts.log_max_entries, 1000);
    }

    #[test]
    fn loads_minimal_yaml() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(
            &path,
            r#"
resources:
  - name: users
    fields:
      - name: id
        type: number
      - name: name
        type: string
        required: true
"#,
        )
        .unwrap();

        let cfg = PretendoConfig::load_layered(&path).unwrap();
        assert_eq!(cfg.resources.len(), 1);
        assert_eq!(cfg.resources[0].name, "users");
        assert_eq!(cfg.options.port, 3000);
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "resources: []\noptions:\n  port: 4000\n").unwrap();
        let mut cfg = PretendoConfig::load_layered(&path).unwrap();
        cfg.apply_cli_overrides(&CliOverrides {
            port: Some(5000),
            host: None,
        });
        assert_eq!(cfg.options.port, 5000);
    }

    #[test]
    fn seed_data_prefers_top_level_over_resource_level() {
        let mut cfg = PretendoConfig {
            resources: vec![ResourceConfig {
                name: "users".into(),
                primary_key: "id".into(),
                fields: vec![],
                relationships: vec![],
                access: HashMap::new(),
                owned_by: None,
                seed: vec![Record::new()],
            }],
            ..Default::default()
        };
        let mut top_level = Record::new();
        top_level.insert("id".into(), Value::from(1));
        cfg.data.insert("users".into(), vec![top_level.clone()]);

        let seed = cfg.seed_for("users");
        assert_eq!(seed, vec![top_level]);
    }
}
