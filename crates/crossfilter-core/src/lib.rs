// crossfilter-core: Filter reconciliation between crossfilter-api and consumers (CLI).

pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod gateway;
pub mod model;
pub mod state;

mod schedule;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    ControllerConfig, DEFAULT_DEBOUNCE, DEFAULT_LOADING_DELAY, GatewayConfig, TlsVerification,
};
pub use controller::Controller;
pub use crossfilter_api::DEFAULT_BASE_URL;
pub use error::CoreError;
pub use gateway::{FilterGateway, HttpGateway};
pub use state::{DimensionPhase, FilterState, StatusError, StatusErrorKind};

pub use model::{
    ConstraintContext, Dimension, DimensionMap, FilterOption, OptionId, SelectionSet, Selections,
    ValidationOutcome,
};
