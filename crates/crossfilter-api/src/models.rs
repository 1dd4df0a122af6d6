// Wire types for the filter API.
//
// Field names follow the server's JSON exactly: modules carry a `title`,
// units and locations carry a `name`, and request bodies are camelCase.

use serde::{Deserialize, Serialize};

/// A module as returned by `GET /api/filters/modules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: i64,
    pub title: String,
}

/// A unit as returned by `GET /api/filters/units`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: i64,
    pub name: String,
}

/// A location as returned by `GET /api/filters/locations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModulesEnvelope {
    pub modules: Vec<ModuleRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnitsEnvelope {
    pub units: Vec<UnitRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationsEnvelope {
    pub locations: Vec<LocationRecord>,
}

/// Body of `POST /api/filters/validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub module_ids: Vec<i64>,
    pub unit_ids: Vec<i64>,
    pub location_ids: Vec<i64>,
}

/// Response of `POST /api/filters/validate`.
///
/// `errors` is optional (or `null`) on the wire and decodes to an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}
