//! Coarse error categorisation for alert payloads.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category assigned by [`classify_error_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ConnectionTimeout,
    ConnectionLost,
    ConnectionFailed,
    ConnectionError,
    WebsocketCloseFrame,
    WebsocketHeartbeat,
    WebsocketError,
    NetworkError,
    ServiceLimit,
    GeneralError,
    Unknown,
}

impl ErrorCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionTimeout => "connection_timeout",
            Self::ConnectionLost => "connection_lost",
            Self::ConnectionFailed => "connection_failed",
            Self::ConnectionError => "connection_error",
            Self::WebsocketCloseFrame => "websocket_close_frame",
            Self::WebsocketHeartbeat => "websocket_heartbeat",
            Self::WebsocketError => "websocket_error",
            Self::NetworkError => "network_error",
            Self::ServiceLimit => "service_limit",
            Self::GeneralError => "general_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static WEBSOCKET_SCHEME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\bwss?\b").ok());

fn mentions_websocket(message: &str) -> bool {
    message.contains("websocket")
        || WEBSOCKET_SCHEME.as_ref().is_some_and(|re| re.is_match(message))
}

/// Categorises `error_message` by keyword, independent of service type.
///
/// Rules are checked in order and the first hit wins: connection keywords,
/// then websocket keywords, then network, then service limits.
#[must_use]
pub fn classify_error_type(error_message: &str) -> ErrorCategory {
    let message = error_message.to_lowercase();
    if message.trim().is_empty() {
        return ErrorCategory::Unknown;
    }
    let has = |needle: &str| message.contains(needle);

    if has("connection") || has("connect") {
        return if has("timeout") || has("timed out") {
            ErrorCategory::ConnectionTimeout
        } else if has("reset") || has("closed") || has("lost") {
            ErrorCategory::ConnectionLost
        } else if has("refused") || has("failed") {
            ErrorCategory::ConnectionFailed
        } else {
            ErrorCategory::ConnectionError
        };
    }

    if mentions_websocket(&message) {
        return if has("close frame") {
            ErrorCategory::WebsocketCloseFrame
        } else if has("ping") || has("pong") || has("heartbeat") {
            ErrorCategory::WebsocketHeartbeat
        } else {
            ErrorCategory::WebsocketError
        };
    }

    if has("network") || has("dns") || has("ssl") || has("certificate") {
        return ErrorCategory::NetworkError;
    }

    if has("rate limit") || has("too many requests") || has("service unavailable") {
        return ErrorCategory::ServiceLimit;
    }

    ErrorCategory::GeneralError
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_keywords_take_priority() {
        assert_eq!(classify_error_type("Connection timeout"), ErrorCategory::ConnectionTimeout);
        assert_eq!(classify_error_type("connect timed out"), ErrorCategory::ConnectionTimeout);
        assert_eq!(classify_error_type("Connection reset by peer"), ErrorCategory::ConnectionLost);
        assert_eq!(classify_error_type("WebSocket connection lost"), ErrorCategory::ConnectionLost);
        assert_eq!(classify_error_type("Connection refused"), ErrorCategory::ConnectionFailed);
        assert_eq!(classify_error_type("connection weirdness"), ErrorCategory::ConnectionError);
    }

    #[test]
    fn websocket_keywords() {
        assert_eq!(
            classify_error_type("no close frame received or sent"),
            ErrorCategory::GeneralError
        );
        assert_eq!(
            classify_error_type("WebSocket: no close frame received"),
            ErrorCategory::WebsocketCloseFrame
        );
        assert_eq!(classify_error_type("websocket ping timeout"), ErrorCategory::WebsocketHeartbeat);
        assert_eq!(classify_error_type("wss stream error 1006"), ErrorCategory::WebsocketError);
    }

    #[test]
    fn network_and_limits() {
        assert_eq!(classify_error_type("SSL handshake failed"), ErrorCategory::NetworkError);
        assert_eq!(classify_error_type("DNS lookup failed"), ErrorCategory::NetworkError);
        assert_eq!(classify_error_type("Rate limit exceeded"), ErrorCategory::ServiceLimit);
        assert_eq!(classify_error_type("Service unavailable: 503"), ErrorCategory::ServiceLimit);
    }

    #[test]
    fn fallbacks() {
        assert_eq!(classify_error_type("Invalid JSON syntax"), ErrorCategory::GeneralError);
        assert_eq!(classify_error_type(""), ErrorCategory::Unknown);
        assert_eq!(classify_error_type("   "), ErrorCategory::Unknown);
        assert_eq!(ErrorCategory::ServiceLimit.to_string(), "service_limit");
    }
}
