//! Reconnection error classification
//!
//! Decides whether an error string is routine reconnection churn for the
//! service that raised it, using a per-service-type regex bank, and buckets
//! error strings into coarse categories for alert payloads.

mod category;
mod mapping;
pub mod patterns;

use std::collections::{BTreeMap, HashMap};

use linkguard_domain::{LinkGuardError, Result, ServiceType};
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, info};

pub use category::{classify_error_type, ErrorCategory};
pub use mapping::{ServiceTypeMapping, DEFAULT_SERVICE_TYPES};

use patterns::{compile_pattern, default_patterns, DEFAULT_CATALOGUE};

#[derive(Debug, Clone)]
struct PatternBank {
    sources: Vec<String>,
    compiled: Vec<Regex>,
}

impl PatternBank {
    fn defaults_for(service_type: ServiceType) -> Self {
        let compiled = DEFAULT_CATALOGUE.get(&service_type).cloned().unwrap_or_default();
        // Keep sources aligned with compiled entries if a default failed to build.
        let sources = default_patterns(service_type)
            .iter()
            .filter(|source| compiled.iter().any(|re| re.as_str() == **source))
            .map(|source| (*source).to_string())
            .collect();
        Self { sources, compiled }
    }

    fn first_match(&self, message: &str) -> Option<&str> {
        self.sources
            .iter()
            .zip(&self.compiled)
            .find(|(_, re)| re.is_match(message))
            .map(|(source, _)| source.as_str())
    }
}

/// Classifies error strings as routine reconnection noise per service type.
///
/// The service mapping and pattern banks are runtime-extensible; both sit
/// behind read-write locks so one classifier can be shared across tasks.
#[derive(Debug)]
pub struct ReconnectionErrorClassifier {
    mapping: RwLock<ServiceTypeMapping>,
    banks: RwLock<HashMap<ServiceType, PatternBank>>,
}

impl ReconnectionErrorClassifier {
    /// Classifier using the built-in service mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mapping(ServiceTypeMapping::with_defaults())
    }

    /// Classifier using `mapping` in place of the built-in entries.
    #[must_use]
    pub fn with_mapping(mapping: ServiceTypeMapping) -> Self {
        let banks = ServiceType::ALL
            .into_iter()
            .map(|kind| (kind, PatternBank::defaults_for(kind)))
            .collect();
        Self { mapping: RwLock::new(mapping), banks: RwLock::new(banks) }
    }

    /// Classifier built from a plain name to type map.
    #[must_use]
    pub fn from_entries(entries: BTreeMap<String, ServiceType>) -> Self {
        Self::with_mapping(ServiceTypeMapping::from_entries(entries))
    }

    /// Resolved type for `service_name`; `Unknown` when unmapped.
    #[must_use]
    pub fn get_service_type(&self, service_name: &str) -> ServiceType {
        self.mapping.read().resolve(service_name)
    }

    /// Inserts or replaces a service mapping.
    pub fn add_service_mapping(&self, service_name: &str, service_type: ServiceType) {
        self.mapping.write().add_mapping(service_name, service_type);
        info!(service = service_name, service_type = %service_type, "service_mapping_added");
    }

    #[must_use]
    pub fn service_mapping(&self) -> ServiceTypeMapping {
        self.mapping.read().clone()
    }

    /// Whether `error_message` is routine reconnection churn for `service_name`.
    ///
    /// Always `false` for unmapped services and empty messages.
    #[must_use]
    pub fn is_reconnection_error(&self, service_name: &str, error_message: &str) -> bool {
        let service_type = self.get_service_type(service_name);
        let matched = self.is_reconnection_error_for_type(service_type, error_message);
        if matched {
            debug!(service = service_name, service_type = %service_type, "reconnection_error_matched");
        }
        matched
    }

    /// Pattern check against an explicit service type.
    #[must_use]
    pub fn is_reconnection_error_for_type(
        &self,
        service_type: ServiceType,
        error_message: &str,
    ) -> bool {
        self.first_match(service_type, error_message).is_some()
    }

    /// Source text of the first pattern that matches, if any.
    #[must_use]
    pub fn matching_pattern(&self, service_name: &str, error_message: &str) -> Option<String> {
        self.first_match(self.get_service_type(service_name), error_message)
    }

    fn first_match(&self, service_type: ServiceType, error_message: &str) -> Option<String> {
        if service_type == ServiceType::Unknown || error_message.is_empty() {
            return None;
        }
        let banks = self.banks.read();
        banks.get(&service_type)?.first_match(error_message).map(str::to_string)
    }

    /// Pattern sources for `service_type` in match order.
    #[must_use]
    pub fn get_patterns(&self, service_type: ServiceType) -> Vec<String> {
        self.banks.read().get(&service_type).map(|bank| bank.sources.clone()).unwrap_or_default()
    }

    /// Appends a pattern to the bank for `service_type`.
    ///
    /// # Errors
    /// Returns `InvalidInput` for invalid regex syntax or the `Unknown` type.
    pub fn add_pattern(&self, service_type: ServiceType, pattern: &str) -> Result<()> {
        if service_type == ServiceType::Unknown {
            return Err(LinkGuardError::InvalidInput(
                "cannot add patterns for the unknown service type".to_string(),
            ));
        }
        let compiled = compile_pattern(pattern).map_err(|e| {
            LinkGuardError::InvalidInput(format!("invalid pattern '{pattern}': {e}"))
        })?;

        let mut banks = self.banks.write();
        let bank = banks
            .entry(service_type)
            .or_insert_with(|| PatternBank { sources: Vec::new(), compiled: Vec::new() });
        bank.sources.push(pattern.to_string());
        bank.compiled.push(compiled);
        info!(service_type = %service_type, pattern, "reconnection_pattern_added");
        Ok(())
    }

    /// Keyword category for `error_message`; see [`classify_error_type`].
    #[must_use]
    pub fn classify_error_type(&self, error_message: &str) -> ErrorCategory {
        classify_error_type(error_message)
    }
}

impl Default for ReconnectionErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
