//! Routine-reconnection pattern catalogue.
//!
//! Each service type carries its own ordered bank of case-insensitive
//! regular expressions. A match means the error is ordinary connection churn
//! for that transport rather than a real outage.

use std::collections::HashMap;

use linkguard_domain::ServiceType;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Streaming socket clients.
pub const WEBSOCKET_PATTERNS: &[&str] = &[
    r"websocket.*(closed|disconnect|lost|error|timeout)",
    r"connection lost",
    r"connection (closed|reset|dropped|aborted)",
    r"no close frame (received|sent)",
    r"connection reset by peer",
    r"(ping|pong).*time(d)? ?out",
    r"heartbeat.*(timeout|failed|missed)",
    r"keepalive.*(timeout|expired)",
    r"\b(1001|1006|1011|1012)\b",
    r"eof occurred in violation of protocol",
    r"connection timed out",
];

/// Request/response HTTP clients.
pub const REST_PATTERNS: &[&str] = &[
    r"timeout",
    r"timed out",
    r"connection (failed|refused|reset|aborted|error)",
    r"connection.*(closed|lost)",
    r"ssl.*(handshake|error|eof)",
    r"network (error|unreachable|is down)",
    r"server disconnected",
    r"cannot connect to host",
    r"temporarily unavailable",
    r"\b(502|503|504)\b",
];

/// Database clients and pools.
pub const DATABASE_PATTERNS: &[&str] = &[
    r"database.*(connection|lost|unavailable|locked|closed)",
    r"server has gone away",
    r"lost connection to (the )?(mysql |postgres(ql)? )?server",
    r"connection pool (exhausted|timeout|closed)",
    r"too many connections",
    r"connection (refused|reset|closed|timed out)",
    r"could not connect to server",
    r"timeout",
];

/// Scrapers and polled third-party APIs.
pub const SCRAPER_PATTERNS: &[&str] = &[
    r"rate.*limit",
    r"too many requests",
    r"\b429\b",
    r"service unavailable",
    r"\b503\b",
    r"bad gateway",
    r"\b502\b",
    r"gateway timeout",
    r"\b504\b",
    r"timeout",
    r"connection (reset|refused|aborted|error)",
];

/// Source patterns for `service_type`; empty for `Unknown`.
#[must_use]
pub fn default_patterns(service_type: ServiceType) -> &'static [&'static str] {
    match service_type {
        ServiceType::Websocket => WEBSOCKET_PATTERNS,
        ServiceType::Rest => REST_PATTERNS,
        ServiceType::Database => DATABASE_PATTERNS,
        ServiceType::Scraper => SCRAPER_PATTERNS,
        ServiceType::Unknown => &[],
    }
}

/// Compiles `pattern` case-insensitively.
///
/// # Errors
/// Returns the regex error for invalid syntax.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Compiles every pattern in `patterns`, skipping (and logging) invalid ones.
#[must_use]
pub fn compile_all(service_type: ServiceType, patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match compile_pattern(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(service_type = %service_type, pattern, error = %e, "pattern_compile_failed");
                None
            }
        })
        .collect()
}

/// Compiled default catalogue, built once per process.
pub static DEFAULT_CATALOGUE: Lazy<HashMap<ServiceType, Vec<Regex>>> = Lazy::new(|| {
    ServiceType::ALL
        .into_iter()
        .map(|kind| (kind, compile_all(kind, default_patterns(kind))))
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(service_type: ServiceType, message: &str) -> bool {
        DEFAULT_CATALOGUE[&service_type].iter().any(|re| re.is_match(message))
    }

    #[test]
    fn every_default_pattern_compiles() {
        for kind in ServiceType::ALL {
            assert_eq!(DEFAULT_CATALOGUE[&kind].len(), default_patterns(kind).len(), "{kind}");
        }
        assert!(DEFAULT_CATALOGUE[&ServiceType::Unknown].is_empty());
    }

    /// Validates websocket churn is recognised and application errors are not.
    #[test]
    fn websocket_bank() {
        for message in [
            "no close frame received or sent",
            "WebSocket connection lost unexpectedly",
            "connection reset by peer during handshake",
            "WebSocket error: 1006",
            "ping timeout after 30 seconds",
        ] {
            assert!(matches(ServiceType::Websocket, message), "{message}");
        }
        for message in [
            "Invalid JSON syntax in response",
            "User authentication failed",
            "Permission denied for resource",
            "File not found: config.json",
        ] {
            assert!(!matches(ServiceType::Websocket, message), "{message}");
        }
        assert!(WEBSOCKET_PATTERNS.iter().any(|p| p.contains("websocket")));
        assert!(WEBSOCKET_PATTERNS.iter().any(|p| p.contains("connection lost")));
    }

    #[test]
    fn rest_bank() {
        for message in [
            "Connection timeout after 60 seconds",
            "HTTP connection failed: network error",
            "Request timeout waiting for response",
            "SSL handshake failed: certificate error",
            "asyncio.TimeoutError occurred",
        ] {
            assert!(matches(ServiceType::Rest, message), "{message}");
        }
        assert!(!matches(ServiceType::Rest, "Invalid JSON syntax in response"));
        assert!(REST_PATTERNS.iter().any(|p| p.contains("timeout")));
        assert!(REST_PATTERNS.iter().any(|p| p.contains("connection")));
    }

    #[test]
    fn database_bank() {
        for message in [
            "Database connection lost during query",
            "Server has gone away unexpectedly",
            "Database connection failed: auth error",
            "Connection pool exhausted",
        ] {
            assert!(matches(ServiceType::Database, message), "{message}");
        }
        assert!(!matches(ServiceType::Database, "Permission denied for resource"));
        assert!(DATABASE_PATTERNS.iter().any(|p| p.contains("database")));
    }

    #[test]
    fn scraper_bank() {
        for message in [
            "Rate limit exceeded: retry after 60s",
            "Too many requests: 429",
            "Service unavailable: 503",
            "Bad gateway: proxy error",
            "Gateway timeout: 504",
            "Timeout fetching data from API",
        ] {
            assert!(matches(ServiceType::Scraper, message), "{message}");
        }
        assert!(SCRAPER_PATTERNS.contains(&"rate.*limit"));
        assert!(!matches(ServiceType::Scraper, "File not found: config.json"));
    }
}
