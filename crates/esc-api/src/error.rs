use thiserror::Error;

/// Top-level error type for the `esc-api` crate.
///
/// Covers every failure mode of both API surfaces: the REST data source
/// and the WebSocket control channel. `esc-core` maps these into
/// domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL scheme has no WebSocket counterpart.
    #[error("Unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    /// TLS or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// The backend answered with something other than the expected
    /// record shape. The payload is kept verbatim for display.
    #[error("Unexpected backend response: {payload}")]
    Backend { payload: serde_json::Value },

    // ── Control channel ─────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed before the expected reply arrived.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// Read or write failure on an open WebSocket.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// No reply within the configured bound.
    #[error("Timed out awaiting reply after {timeout_secs}s")]
    ReplyTimeout { timeout_secs: u64 },

    /// Outgoing message could not be encoded.
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// The raw backend payload, if this error carries one.
    pub fn backend_payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Backend { payload } => Some(payload),
            _ => None,
        }
    }
}
