// Filter API HTTP client
//
// Wraps `reqwest::Client` with URL construction for the `/api/filters`
// endpoints, CSV constraint encoding, status mapping and envelope
// unwrapping. Every list call returns the bare record vector.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    LocationRecord, LocationsEnvelope, ModuleRecord, ModulesEnvelope, UnitRecord, UnitsEnvelope,
    ValidateRequest, ValidateResponse,
};
use crate::transport::TransportConfig;

/// Default API root used by the filter server in development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

const FILTERS_PREFIX: &str = "api/filters";

/// Raw HTTP client for the cascading filter API.
///
/// Stateless: each method is a single request/response. Constraint ID
/// slices are sent as comma-separated query parameters and omitted
/// entirely when empty.
#[derive(Debug, Clone)]
pub struct FilterClient {
    http: reqwest::Client,
    base_url: Url,
}

impl FilterClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://localhost:3001`); the
    /// `/api/filters` prefix is appended per request.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Parse `base_url` and wrap a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self::with_client(http, Url::parse(base_url)?))
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/filters/modules`, constrained by unit and location IDs.
    pub async fn list_modules(
        &self,
        unit_ids: &[i64],
        location_ids: &[i64],
    ) -> Result<Vec<ModuleRecord>, Error> {
        let url = self.filters_url(
            "modules",
            &[("unitIds", unit_ids), ("locationIds", location_ids)],
        )?;
        let envelope: ModulesEnvelope = self.get(url).await?;
        Ok(envelope.modules)
    }

    /// `GET /api/filters/units`, constrained by module and location IDs.
    pub async fn list_units(
        &self,
        module_ids: &[i64],
        location_ids: &[i64],
    ) -> Result<Vec<UnitRecord>, Error> {
        let url = self.filters_url(
            "units",
            &[("moduleIds", module_ids), ("locationIds", location_ids)],
        )?;
        let envelope: UnitsEnvelope = self.get(url).await?;
        Ok(envelope.units)
    }

    /// `GET /api/filters/locations`, constrained by module and unit IDs.
    pub async fn list_locations(
        &self,
        module_ids: &[i64],
        unit_ids: &[i64],
    ) -> Result<Vec<LocationRecord>, Error> {
        let url = self.filters_url(
            "locations",
            &[("moduleIds", module_ids), ("unitIds", unit_ids)],
        )?;
        let envelope: LocationsEnvelope = self.get(url).await?;
        Ok(envelope.locations)
    }

    /// `POST /api/filters/validate` with the full selection.
    ///
    /// A `{ "valid": false }` answer is a normal result, not an error.
    pub async fn validate_selection(
        &self,
        module_ids: &[i64],
        unit_ids: &[i64],
        location_ids: &[i64],
    ) -> Result<ValidateResponse, Error> {
        let url = self.filters_url("validate", &[])?;
        let body = ValidateRequest {
            module_ids: module_ids.to_vec(),
            unit_ids: unit_ids.to_vec(),
            location_ids: location_ids.to_vec(),
        };
        self.post(url, &body).await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/filters/{endpoint}` with CSV constraint params.
    ///
    /// Empty ID slices produce no parameter at all (never `key=`).
    pub(crate) fn filters_url(
        &self,
        endpoint: &str,
        constraints: &[(&str, &[i64])],
    ) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{FILTERS_PREFIX}/{endpoint}"))?;

        let present: Vec<_> = constraints.iter().filter(|(_, ids)| !ids.is_empty()).collect();
        if !present.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, ids) in present {
                pairs.append_pair(key, &join_ids(ids));
            }
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::parse_json(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        Self::parse_json(resp).await
    }

    /// Map non-success statuses to `Error::Http`, then decode the body.
    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message: preview(&body).to_owned(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
