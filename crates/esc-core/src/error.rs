// ── Core error types ──
//
// User-facing errors from esc-core. Consumers never see HTTP or WebSocket
// details directly; the `From<esc_api::Error>` impl translates
// transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend request timed out")]
    Timeout,

    #[error("Timed out awaiting reply on control channel after {timeout_secs}s")]
    ReplyTimeout { timeout_secs: u64 },

    #[error("Control channel closed: {reason}")]
    ChannelClosed { reason: String },

    // ── Backend payloads ─────────────────────────────────────────────
    /// Not fatal: the payload is shown to the user verbatim.
    #[error("Backend returned: {payload}")]
    Backend { payload: serde_json::Value },

    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Selection errors ─────────────────────────────────────────────
    #[error("No lines selected")]
    SelectionMissing,

    #[error("Entity not found: {entity_type} '{identifier}'")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("'{identifier}' matches {count} {entity_type}s, expected exactly one")]
    Ambiguous {
        entity_type: String,
        identifier: String,
        count: usize,
    },

    #[error("Invalid filter '{expression}': {reason}")]
    FilterParse { expression: String, reason: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<esc_api::Error> for CoreError {
    fn from(err: esc_api::Error) -> Self {
        match err {
            esc_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            esc_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            esc_api::Error::UnsupportedScheme(scheme) => CoreError::Config {
                message: format!("api.url scheme '{scheme}' has no control channel (use http or https)"),
            },
            esc_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            esc_api::Error::Backend { payload } => CoreError::Backend { payload },
            esc_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            esc_api::Error::WebSocketClosed { code, reason } => CoreError::ChannelClosed {
                reason: format!("code {code}: {reason}"),
            },
            esc_api::Error::WebSocket(reason) => CoreError::ChannelClosed { reason },
            esc_api::Error::ReplyTimeout { timeout_secs } => {
                CoreError::ReplyTimeout { timeout_secs }
            }
            esc_api::Error::Encode(e) => CoreError::Internal(format!("Failed to encode message: {e}")),
        }
    }
}
