// ── Wire → domain conversions ──
//
// Modules carry a `title`, units and locations a `name`; all three
// become a plain `FilterOption` label.

use crossfilter_api::{LocationRecord, ModuleRecord, UnitRecord, ValidateResponse};

use crate::model::{FilterOption, ValidationOutcome};

impl From<ModuleRecord> for FilterOption {
    fn from(record: ModuleRecord) -> Self {
        Self {
            id: record.id,
            label: record.title,
        }
    }
}

impl From<UnitRecord> for FilterOption {
    fn from(record: UnitRecord) -> Self {
        Self {
            id: record.id,
            label: record.name,
        }
    }
}

impl From<LocationRecord> for FilterOption {
    fn from(record: LocationRecord) -> Self {
        Self {
            id: record.id,
            label: record.name,
        }
    }
}

impl From<ValidateResponse> for ValidationOutcome {
    fn from(resp: ValidateResponse) -> Self {
        Self {
            valid: resp.valid,
            errors: resp.errors,
        }
    }
}
