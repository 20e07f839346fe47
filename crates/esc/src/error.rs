//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use esc_config::ConfigError;
use esc_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code, unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the backend")]
    #[diagnostic(
        code(esc::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             URL: {url}\n\
             Show the configured URL with: esc config get api.url"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Control channel closed before a reply arrived: {reason}")]
    #[diagnostic(
        code(esc::channel_closed),
        help("The backend dropped the session. Check api.ws.auth.token and the backend logs.")
    )]
    ChannelClosed { reason: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(esc::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    #[error("Timed out after {seconds}s awaiting a reply on the control channel")]
    #[diagnostic(
        code(esc::reply_timeout),
        help("The command may still have been applied. Check with: esc ll status")
    )]
    ReplyTimeout { seconds: u64 },

    // ── Selection ────────────────────────────────────────────────────
    #[error("No lines selected")]
    #[diagnostic(
        code(esc::no_selection),
        help("Select lines first with: esc ll list (optionally with --filter / --group)")
    )]
    SelectionMissing,

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(esc::not_found),
        help("Run: esc ll list to refresh the cached lines")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("'{identifier}' matches {count} {resource_type}s")]
    #[diagnostic(
        code(esc::ambiguous),
        help("Use a longer id prefix so that exactly one {resource_type} matches.")
    )]
    Ambiguous {
        resource_type: String,
        identifier: String,
        count: usize,
    },

    #[error("Invalid filter '{expression}': {reason}")]
    #[diagnostic(
        code(esc::filter),
        help("Filters look like id:<substring>, name:<substring>, m:t or m:f")
    )]
    FilterParse { expression: String, reason: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(esc::auth_failed),
        help("Set a valid token with: esc config set api.http.auth.token <token>")
    )]
    AuthFailed,

    #[error("API error: {message}")]
    #[diagnostic(code(esc::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(esc::validation))]
    Validation { field: String, reason: String },

    #[error("Unknown config key '{key}'")]
    #[diagnostic(
        code(esc::unknown_key),
        help("Valid keys: api.url, api.http.auth.token, api.ws.auth.token")
    )]
    UnknownKey { key: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(esc::config),
        help("Fix the file by hand or override it with --config / ESC_CONFIG")
    )]
    Config { message: String },

    #[error("Cache error: {message}")]
    #[diagnostic(
        code(esc::cache),
        help("The cache can be deleted safely; it is rebuilt by the next query.")
    )]
    Cache { message: String },

    #[error("Nothing cached under '{slot}' yet")]
    #[diagnostic(
        code(esc::nothing_cached),
        help("Run the matching command first, e.g. esc ll list")
    )]
    NothingCached { slot: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Control command '{action}' requires confirmation")]
    #[diagnostic(
        code(esc::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Interrupted")]
    #[diagnostic(code(esc::interrupted))]
    Interrupted,

    // ── IO / Internal ────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(esc::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ChannelClosed { .. } => exit_code::CONNECTION,
            Self::Timeout | Self::ReplyTimeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed => exit_code::AUTH,
            Self::NotFound { .. } | Self::NothingCached { .. } | Self::SelectionMissing => {
                exit_code::NOT_FOUND
            }
            Self::Validation { .. }
            | Self::UnknownKey { .. }
            | Self::FilterParse { .. }
            | Self::Ambiguous { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::ReplyTimeout { timeout_secs } => CliError::ReplyTimeout {
                seconds: timeout_secs,
            },

            CoreError::ChannelClosed { reason } => CliError::ChannelClosed { reason },

            // Callers print backend payloads before they get here; this
            // arm only fires when a payload escapes a handler.
            CoreError::Backend { payload } => CliError::ApiError {
                message: payload.to_string(),
                status: None,
            },

            CoreError::Api {
                message,
                status: Some(401 | 403),
            } => {
                tracing::debug!(%message, "backend rejected credentials");
                CliError::AuthFailed
            }

            CoreError::Api { message, status } => CliError::ApiError { message, status },

            CoreError::SelectionMissing => CliError::SelectionMissing,

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type,
                identifier,
            },

            CoreError::Ambiguous {
                entity_type,
                identifier,
                count,
            } => CliError::Ambiguous {
                resource_type: entity_type,
                identifier,
                count,
            },

            CoreError::FilterParse { expression, reason } => {
                CliError::FilterParse { expression, reason }
            }

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Cache { message } => CliError::Cache { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownKey { key } => CliError::UnknownKey { key },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
