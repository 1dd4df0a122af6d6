//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use crossfilter_config::ConfigError;
use crossfilter_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    /// The service answered, but rejected the selection.
    pub const REJECTED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Service ──────────────────────────────────────────────────────

    #[error("Filter service unavailable: {reason}")]
    #[diagnostic(
        code(crossfilter::service_unavailable),
        help(
            "Check that the filter service is running and reachable.\n\
             Point at another instance with --api-url or a profile's api_url."
        )
    )]
    ServiceUnavailable { reason: String, status: Option<u16> },

    #[error("{message}")]
    #[diagnostic(
        code(crossfilter::reconciliation_failed),
        help("Option lists may be stale. Re-run the command to retry.")
    )]
    ReconciliationFailed { message: String },

    #[error("{summary}")]
    #[diagnostic(
        code(crossfilter::rejected),
        help("Adjust the selection; `crossfilter select` shows which options remain valid.")
    )]
    Rejected { summary: String },

    #[error("Operation interrupted: the filter controller shut down")]
    #[diagnostic(code(crossfilter::interrupted))]
    Interrupted,

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(crossfilter::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(crossfilter::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: crossfilter config init --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(crossfilter::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(crossfilter::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(crossfilter::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ServiceUnavailable { .. } | Self::ReconciliationFailed { .. } => {
                exit_code::CONNECTION
            }
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::ConfigExists { .. } => {
                exit_code::USAGE
            }
            Self::Interrupted | Self::Config(_) | Self::Io(_) | Self::Render(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::GatewayUnavailable { reason, status } => {
                CliError::ServiceUnavailable { reason, status }
            }
            CoreError::ControllerTornDown => CliError::Interrupted,
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
