// ── Core error types ──
//
// Consumers never see HTTP status codes or JSON parse failures directly.
// The `From<crossfilter_api::Error>` impl folds every transport-layer
// failure into `GatewayUnavailable`. A rejected validation is not an
// error: it is a `ValidationOutcome` with `valid == false`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("Filter service unavailable: {reason}")]
    GatewayUnavailable {
        reason: String,
        /// HTTP status code, when the service answered at all.
        status: Option<u16>,
    },

    #[error("Filter controller has been torn down")]
    ControllerTornDown,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn gateway(reason: impl Into<String>) -> Self {
        Self::GatewayUnavailable {
            reason: reason.into(),
            status: None,
        }
    }

    pub fn is_gateway_unavailable(&self) -> bool {
        matches!(self, Self::GatewayUnavailable { .. })
    }
}

impl From<crossfilter_api::Error> for CoreError {
    fn from(err: crossfilter_api::Error) -> Self {
        match err {
            crossfilter_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            crossfilter_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            ref e @ (crossfilter_api::Error::Transport(_)
            | crossfilter_api::Error::Http { .. }
            | crossfilter_api::Error::Deserialization { .. }) => CoreError::GatewayUnavailable {
                reason: e.to_string(),
                status: e.status(),
            },
        }
    }
}
