//! Configuration loader
//!
//! Loads the monitor configuration from a JSON or TOML file, then applies
//! environment overrides.
//!
//! ## Environment Variables
//! - `LINKGUARD_CONFIG_PATH`: explicit config file, skips probing
//! - `LINKGUARD_SUPPRESSION_ENABLED`: overrides `alert_suppression.enabled`
//! - `LINKGUARD_GRACE_PERIOD_SECONDS`: overrides the grace period
//! - `LINKGUARD_STATE_TTL_HOURS`: overrides the store's state TTL
//!
//! ## File Locations
//! Without `LINKGUARD_CONFIG_PATH` the loader probes, in order:
//! 1. `./linkguard.{json,toml}` then `./config.{json,toml}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use linkguard_domain::{ConnectionConfig, MonitorConfig, StoreConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ConfigError, ConfigResult};
use super::suppression::parse_suppression_settings;

pub const CONFIG_PATH_ENV: &str = "LINKGUARD_CONFIG_PATH";
pub const SUPPRESSION_ENABLED_ENV: &str = "LINKGUARD_SUPPRESSION_ENABLED";
pub const GRACE_PERIOD_ENV: &str = "LINKGUARD_GRACE_PERIOD_SECONDS";
pub const STATE_TTL_HOURS_ENV: &str = "LINKGUARD_STATE_TTL_HOURS";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["linkguard.json", "linkguard.toml", "config.json", "config.toml"];

/// On-disk configuration format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// # Errors
    /// [`ConfigError::UnsupportedFormat`] for anything but `.json` / `.toml`.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match extension.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Toml => "TOML",
        }
    }
}

/// Entry points for building a validated [`MonitorConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads from `LINKGUARD_CONFIG_PATH`, or the first probed location.
    ///
    /// # Errors
    /// [`ConfigError::NotFound`] when no file exists, otherwise any error
    /// from [`ConfigLoader::load_from_file`].
    pub fn load() -> ConfigResult<MonitorConfig> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(explicit) if !explicit.trim().is_empty() => PathBuf::from(explicit),
            _ => probe_config_paths()
                .ok_or_else(|| ConfigError::NotFound(PathBuf::from(CONFIG_FILE_NAMES[0])))?,
        };
        Self::load_from_file(path)
    }

    /// # Errors
    /// - [`ConfigError::NotFound`] if `path` does not exist
    /// - [`ConfigError::Io`] if it cannot be read
    /// - any parse, validation or environment override error
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<MonitorConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let format = ConfigFormat::from_path(path)?;

        tracing::info!(path = %path.display(), "loading_configuration");
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

        let mut config = Self::parse_str(&contents, format)?;
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Parses and validates file contents without touching the environment.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed input, otherwise validation
    /// errors from [`ConfigLoader::from_value`].
    pub fn parse_str(contents: &str, format: ConfigFormat) -> ConfigResult<MonitorConfig> {
        let value: Value = match format {
            ConfigFormat::Json => serde_json::from_str(contents)
                .map_err(|e| ConfigError::Parse { format: format.name(), message: e.to_string() })?,
            ConfigFormat::Toml => toml::from_str(contents)
                .map_err(|e| ConfigError::Parse { format: format.name(), message: e.to_string() })?,
        };
        Self::from_value(&value)
    }

    /// Builds a config from an already-parsed document.
    ///
    /// `alert_suppression` is required and strictly validated. `store` and
    /// `connections` are optional; omitted fields take their defaults.
    ///
    /// # Errors
    /// Any [`ConfigError`] describing the first invalid section.
    pub fn from_value(value: &Value) -> ConfigResult<MonitorConfig> {
        let root = value
            .as_object()
            .ok_or(ConfigError::InvalidType { field: "configuration", expected: "a mapping" })?;

        let section =
            root.get("alert_suppression").ok_or(ConfigError::MissingSection("alert_suppression"))?;
        let suppression = parse_suppression_settings(section)?;

        let store: StoreConfig = optional_section(root.get("store"), "store")?.unwrap_or_default();
        if store.pool_size == 0 {
            return Err(ConfigError::InvalidSection {
                section: "store",
                message: "pool_size must be at least 1".to_string(),
            });
        }

        let connections: Vec<ConnectionConfig> =
            optional_section(root.get("connections"), "connections")?.unwrap_or_default();
        if let Some(unnamed) = connections.iter().position(|c| c.service_name.trim().is_empty()) {
            return Err(ConfigError::InvalidSection {
                section: "connections",
                message: format!("entry {unnamed} has no service_name"),
            });
        }

        Ok(MonitorConfig { suppression, store, connections })
    }

    /// Applies the process environment on top of `config`.
    ///
    /// # Errors
    /// [`ConfigError::InvalidEnv`] when a numeric override does not parse.
    pub fn apply_env_overrides(config: &mut MonitorConfig) -> ConfigResult<()> {
        apply_overrides(config, |key| std::env::var(key).ok())
    }
}

fn optional_section<T: DeserializeOwned>(
    value: Option<&Value>,
    section: &'static str,
) -> ConfigResult<Option<T>> {
    value
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(|e| ConfigError::InvalidSection { section, message: e.to_string() })
}

fn apply_overrides(
    config: &mut MonitorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<()> {
    if let Some(raw) = lookup(SUPPRESSION_ENABLED_ENV) {
        config.suppression.rule.enabled = parse_bool(&raw);
    }
    if let Some(raw) = lookup(GRACE_PERIOD_ENV) {
        config.suppression.rule.grace_period_seconds = parse_u64(GRACE_PERIOD_ENV, &raw)?;
    }
    if let Some(raw) = lookup(STATE_TTL_HOURS_ENV) {
        config.store.state_ttl_seconds =
            parse_u64(STATE_TTL_HOURS_ENV, &raw)?.saturating_mul(3600);
    }
    Ok(())
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_u64(key: &'static str, raw: &str) -> ConfigResult<u64> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv { key, value: raw.to_string() })
}

/// Returns the first existing config file, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use linkguard_domain::{AlertType, ServiceType};
    use once_cell::sync::Lazy;
    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const JSON_CONFIG: &str = r#"{
        "alert_suppression": {
            "enabled": true,
            "grace_period_seconds": 300,
            "suppression_rules": {
                "during_reconnection": ["error_log", "stale_log", "message_metrics"],
                "service_type_mapping": {"kalshi": "websocket", "weather": "rest"}
            }
        },
        "store": {"state_ttl_seconds": 600},
        "connections": [{"service_name": "kalshi", "max_consecutive_failures": 4}]
    }"#;

    const TOML_CONFIG: &str = r#"
[alert_suppression]
enabled = false
grace_period_seconds = 120
max_suppression_duration_seconds = 900

[alert_suppression.suppression_rules]
during_reconnection = ["connection_error"]

[alert_suppression.suppression_rules.service_type_mapping]
postgres = "database"
"#;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_json_with_optional_sections() {
        let config = ConfigLoader::parse_str(JSON_CONFIG, ConfigFormat::Json).unwrap();

        assert!(config.suppression.rule.suppresses(AlertType::StaleLog));
        assert_eq!(config.suppression.service_type_mapping["kalshi"], ServiceType::Websocket);
        assert_eq!(config.store.state_ttl_seconds, 600);
        assert_eq!(config.store.pool_size, 4);
        assert_eq!(config.connection("kalshi").max_consecutive_failures, 4);
        assert_eq!(config.connection("weather").max_consecutive_failures, 10);
    }

    #[test]
    fn parses_toml() {
        let config = ConfigLoader::parse_str(TOML_CONFIG, ConfigFormat::Toml).unwrap();

        assert!(!config.suppression.rule.enabled);
        assert_eq!(config.suppression.rule.grace_period_seconds, 120);
        assert_eq!(config.suppression.rule.max_suppression_duration_seconds, 900);
        assert!(config.connections.is_empty());
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn missing_suppression_section_is_fatal() {
        let err = ConfigLoader::parse_str(r#"{"store": {}}"#, ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection("alert_suppression")));
        assert!(err.to_string().contains("missing 'alert_suppression' section"));
    }

    #[test]
    fn malformed_documents_are_parse_errors() {
        let err = ConfigLoader::parse_str(r#"{ "this is": "not valid json" "#, ConfigFormat::Json)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "JSON", .. }));

        let err = ConfigLoader::parse_str("[alert_suppression", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "TOML", .. }));
    }

    #[test]
    fn bad_connection_entries_are_rejected() {
        let mut value: Value = serde_json::from_str(JSON_CONFIG).unwrap();
        value["connections"] = serde_json::json!([{"max_consecutive_failures": 2}]);
        let err = ConfigLoader::from_value(&value).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSection { section: "connections", .. }));

        value["connections"] = serde_json::json!({"kalshi": {}});
        let err = ConfigLoader::from_value(&value).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSection { section: "connections", .. }));
    }

    #[test]
    fn load_from_file_detects_format() {
        let dir = TempDir::new().unwrap();
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        let json = write(&dir, "linkguard.json", JSON_CONFIG);
        assert_eq!(ConfigLoader::load_from_file(&json).unwrap().store.state_ttl_seconds, 600);

        let toml = write(&dir, "linkguard.toml", TOML_CONFIG);
        assert_eq!(
            ConfigLoader::load_from_file(&toml).unwrap().suppression.rule.grace_period_seconds,
            120
        );

        let yaml = write(&dir, "linkguard.yaml", "alert_suppression: {}");
        assert!(matches!(
            ConfigLoader::load_from_file(&yaml).unwrap_err(),
            ConfigError::UnsupportedFormat(ext) if ext == "yaml"
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = ConfigLoader::load_from_file("/nonexistent/linkguard.json").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().starts_with("Alert suppression config not found"));
    }

    #[test]
    fn overrides_apply_on_top_of_file_values() {
        let mut config = ConfigLoader::parse_str(JSON_CONFIG, ConfigFormat::Json).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (SUPPRESSION_ENABLED_ENV, "off"),
            (GRACE_PERIOD_ENV, " 45 "),
            (STATE_TTL_HOURS_ENV, "2"),
        ]);

        apply_overrides(&mut config, |key| env.get(key).map(|v| (*v).to_string())).unwrap();

        assert!(!config.suppression.rule.enabled);
        assert_eq!(config.suppression.rule.grace_period_seconds, 45);
        assert_eq!(config.store.state_ttl_seconds, 7200);
    }

    #[test]
    fn non_numeric_override_is_rejected() {
        let mut config = ConfigLoader::parse_str(JSON_CONFIG, ConfigFormat::Json).unwrap();
        let err = apply_overrides(&mut config, |key| {
            (key == GRACE_PERIOD_ENV).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid value for LINKGUARD_GRACE_PERIOD_SECONDS: \"soon\"");
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        for raw in ["1", "true", "YES", "On"] {
            assert!(parse_bool(raw), "{raw} should be true");
        }
        for raw in ["0", "false", "no", "off", "maybe"] {
            assert!(!parse_bool(raw), "{raw} should be false");
        }
    }

    #[test]
    fn load_honours_explicit_path_and_environment() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "custom.json", JSON_CONFIG);
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var(CONFIG_PATH_ENV, &path);
        std::env::set_var(GRACE_PERIOD_ENV, "15");
        let result = ConfigLoader::load();
        std::env::remove_var(CONFIG_PATH_ENV);
        std::env::remove_var(GRACE_PERIOD_ENV);

        assert_eq!(result.unwrap().suppression.rule.grace_period_seconds, 15);
    }
}
