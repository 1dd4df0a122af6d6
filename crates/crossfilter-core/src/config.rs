// ── Runtime configuration ──
//
// These types describe *how* the controller talks to the filter service
// and how it paces reconciliation. They never touch disk: the CLI builds
// them (via `crossfilter-config`) and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Quiescence window before a selection change triggers a refetch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

/// Delay before the loading indicator becomes visible.
pub const DEFAULT_LOADING_DELAY: Duration = Duration::from_millis(500);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

/// Reconciliation pacing for [`Controller`](crate::Controller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Debounce window per dimension.
    pub debounce: Duration,
    /// Loading indicator gate.
    pub loading_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            loading_delay: DEFAULT_LOADING_DELAY,
        }
    }
}

/// Where and how to reach the filter service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Server root, e.g. `http://localhost:3001`.
    pub base_url: Url,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }
}
