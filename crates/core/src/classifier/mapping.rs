//! Service name to service type mapping.

use std::collections::BTreeMap;

use linkguard_domain::ServiceType;

/// Built-in service assignments.
pub const DEFAULT_SERVICE_TYPES: &[(&str, ServiceType)] = &[
    ("deribit", ServiceType::Websocket),
    ("kalshi", ServiceType::Websocket),
    ("cfb", ServiceType::Scraper),
    ("weather", ServiceType::Rest),
    ("tracker", ServiceType::Rest),
];

/// Mutable lookup from service name to [`ServiceType`].
///
/// Names are matched exactly; unmapped services resolve to
/// [`ServiceType::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTypeMapping {
    entries: BTreeMap<String, ServiceType>,
}

impl ServiceTypeMapping {
    /// Mapping with the built-in entries.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            entries: DEFAULT_SERVICE_TYPES
                .iter()
                .map(|(name, kind)| ((*name).to_string(), *kind))
                .collect(),
        }
    }

    /// Mapping that replaces the built-in entries entirely.
    #[must_use]
    pub fn from_entries(entries: BTreeMap<String, ServiceType>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn resolve(&self, service_name: &str) -> ServiceType {
        self.entries.get(service_name).copied().unwrap_or(ServiceType::Unknown)
    }

    /// Mapped type, or `None` for unmapped services.
    #[must_use]
    pub fn get(&self, service_name: &str) -> Option<ServiceType> {
        self.entries.get(service_name).copied()
    }

    /// Inserts or replaces the mapping for `service_name`.
    pub fn add_mapping(&mut self, service_name: impl Into<String>, service_type: ServiceType) {
        self.entries.insert(service_name.into(), service_type);
    }

    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, ServiceType> {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ServiceTypeMapping {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_known_services() {
        let mapping = ServiceTypeMapping::with_defaults();
        assert_eq!(mapping.resolve("deribit"), ServiceType::Websocket);
        assert_eq!(mapping.resolve("kalshi"), ServiceType::Websocket);
        assert_eq!(mapping.resolve("cfb"), ServiceType::Scraper);
        assert_eq!(mapping.resolve("weather"), ServiceType::Rest);
        assert_eq!(mapping.resolve("tracker"), ServiceType::Rest);
        assert_eq!(mapping.resolve("Kalshi"), ServiceType::Unknown);
        assert_eq!(mapping.len(), 5);
    }

    /// Validates a custom mapping replaces rather than extends the defaults,
    /// and that the defaults are not shared between instances.
    #[test]
    fn custom_mapping_replaces_defaults() {
        let custom = ServiceTypeMapping::from_entries(
            [("pdf".to_string(), ServiceType::Scraper)].into_iter().collect(),
        );
        assert_eq!(custom.resolve("pdf"), ServiceType::Scraper);
        assert_eq!(custom.resolve("kalshi"), ServiceType::Unknown);

        let mut first = ServiceTypeMapping::with_defaults();
        first.add_mapping("kalshi", ServiceType::Rest);
        assert_eq!(ServiceTypeMapping::with_defaults().resolve("kalshi"), ServiceType::Websocket);
    }

    #[test]
    fn add_mapping_upserts() {
        let mut mapping = ServiceTypeMapping::with_defaults();
        mapping.add_mapping("orderbook", ServiceType::Database);
        mapping.add_mapping("weather", ServiceType::Scraper);
        assert_eq!(mapping.get("orderbook"), Some(ServiceType::Database));
        assert_eq!(mapping.resolve("weather"), ServiceType::Scraper);
        assert_eq!(mapping.len(), 6);
    }
}
