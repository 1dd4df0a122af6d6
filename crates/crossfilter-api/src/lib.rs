//! Async Rust client for the cascading filter REST API.
//!
//! Four stateless operations over `/api/filters`: list modules, list
//! units, list locations (each constrained by the other two dimensions'
//! selected IDs) and validate a full selection.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{DEFAULT_BASE_URL, FilterClient};
pub use error::Error;
pub use models::{
    LocationRecord, ModuleRecord, UnitRecord, ValidateRequest, ValidateResponse,
};
pub use transport::{TlsMode, TransportConfig};
