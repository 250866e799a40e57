//! Strict validation of the `alert_suppression` section.

use std::collections::BTreeMap;
use std::str::FromStr;

use linkguard_domain::constants::DEFAULT_MAX_SUPPRESSION_DURATION_SECONDS;
use linkguard_domain::{AlertType, ServiceType, SuppressionRule, SuppressionSettings};
use serde_json::{Map, Value};

use super::error::{ConfigError, ConfigResult};

const ROOT_KEYS: [&str; 3] = ["enabled", "grace_period_seconds", "suppression_rules"];
const RULE_KEYS: [&str; 2] = ["during_reconnection", "service_type_mapping"];

/// Validates the raw `alert_suppression` section.
///
/// Missing keys, wrong shapes and unknown alert or service types are all
/// rejected; nothing falls back to a default except the two optional keys
/// (`max_suppression_duration_seconds`, `require_reconnection_error_pattern`).
///
/// # Errors
/// The first validation failure found, as a [`ConfigError`].
pub fn parse_suppression_settings(section: &Value) -> ConfigResult<SuppressionSettings> {
    let root = section
        .as_object()
        .ok_or(ConfigError::InvalidType { field: "alert_suppression", expected: "a mapping" })?;
    require_keys(root, "alert_suppression", &ROOT_KEYS)?;

    let rules = root["suppression_rules"]
        .as_object()
        .ok_or(ConfigError::InvalidType { field: "suppression_rules", expected: "a mapping" })?;
    require_keys(rules, "suppression_rules", &RULE_KEYS)?;

    let during = rules["during_reconnection"]
        .as_array()
        .ok_or(ConfigError::InvalidType { field: "during_reconnection", expected: "a list" })?;
    if during.is_empty() {
        return Err(ConfigError::InvalidType {
            field: "during_reconnection",
            expected: "a non-empty list",
        });
    }

    let mapping = rules["service_type_mapping"]
        .as_object()
        .ok_or(ConfigError::InvalidType { field: "service_type_mapping", expected: "a mapping" })?;
    if mapping.is_empty() {
        return Err(ConfigError::InvalidType {
            field: "service_type_mapping",
            expected: "a non-empty mapping",
        });
    }

    let enabled = root["enabled"]
        .as_bool()
        .ok_or(ConfigError::InvalidType { field: "enabled", expected: "a boolean" })?;
    let grace_period_seconds = root["grace_period_seconds"].as_u64().ok_or(
        ConfigError::InvalidType {
            field: "grace_period_seconds",
            expected: "a non-negative integer",
        },
    )?;
    let max_suppression_duration_seconds = match root.get("max_suppression_duration_seconds") {
        Some(value) => value.as_u64().ok_or(ConfigError::InvalidType {
            field: "max_suppression_duration_seconds",
            expected: "a non-negative integer",
        })?,
        None => DEFAULT_MAX_SUPPRESSION_DURATION_SECONDS,
    };
    let require_reconnection_error_pattern = match root.get("require_reconnection_error_pattern") {
        Some(value) => value.as_bool().ok_or(ConfigError::InvalidType {
            field: "require_reconnection_error_pattern",
            expected: "a boolean",
        })?,
        None => true,
    };

    Ok(SuppressionSettings {
        rule: SuppressionRule {
            enabled,
            grace_period_seconds,
            suppressed_alert_types: parse_alert_types(during)?.into_iter().collect(),
            require_reconnection_error_pattern,
            max_suppression_duration_seconds,
        },
        service_type_mapping: parse_service_types(mapping)?,
    })
}

fn require_keys(
    object: &Map<String, Value>,
    section: &'static str,
    keys: &[&'static str],
) -> ConfigResult<()> {
    let missing: Vec<&'static str> =
        keys.iter().copied().filter(|key| !object.contains_key(*key)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingKeys { section, keys: missing })
    }
}

/// Every unknown name is reported, not just the first.
fn parse_alert_types(values: &[Value]) -> ConfigResult<Vec<AlertType>> {
    let mut parsed = Vec::with_capacity(values.len());
    let mut unknown = Vec::new();
    for value in values {
        match value.as_str().map(AlertType::from_str) {
            Some(Ok(alert_type)) => parsed.push(alert_type),
            Some(Err(_)) => unknown.push(value.as_str().unwrap_or_default().to_string()),
            None => unknown.push(value.to_string()),
        }
    }
    if unknown.is_empty() {
        Ok(parsed)
    } else {
        Err(ConfigError::UnknownAlertTypes(unknown))
    }
}

fn parse_service_types(mapping: &Map<String, Value>) -> ConfigResult<BTreeMap<String, ServiceType>> {
    let mut parsed = BTreeMap::new();
    let mut unknown = Vec::new();
    for (service, value) in mapping {
        match value.as_str().and_then(ServiceType::parse) {
            Some(service_type) => {
                parsed.insert(service.clone(), service_type);
            }
            None => unknown.push(format!("{service}={value}")),
        }
    }
    if unknown.is_empty() {
        Ok(parsed)
    } else {
        Err(ConfigError::UnknownServiceTypes(unknown))
    }
}
