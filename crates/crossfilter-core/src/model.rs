// ── Domain model ──
//
// Filter dimensions, per-dimension maps, options, selections, and the
// constraint context handed to the gateway for a single list call.

use std::collections::BTreeSet;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Identifier of a filter option. Unique within one dimension.
pub type OptionId = i64;

/// Selected option IDs of one dimension. Order is irrelevant.
pub type SelectionSet = BTreeSet<OptionId>;

/// The current selection of every dimension.
pub type Selections = DimensionMap<SelectionSet>;

// ── Dimension ────────────────────────────────────────────────────

/// One of the three filterable facets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Dimension {
    Module,
    Unit,
    Location,
}

impl Dimension {
    pub const ALL: [Self; 3] = [Self::Module, Self::Unit, Self::Location];

    /// The two dimensions that constrain this one.
    pub const fn others(self) -> [Self; 2] {
        match self {
            Self::Module => [Self::Unit, Self::Location],
            Self::Unit => [Self::Module, Self::Location],
            Self::Location => [Self::Module, Self::Unit],
        }
    }

    /// Plural form, as used for endpoint paths and display headers.
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Module => "modules",
            Self::Unit => "units",
            Self::Location => "locations",
        }
    }
}

// ── DimensionMap ─────────────────────────────────────────────────

/// Exactly one `T` per [`Dimension`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionMap<T> {
    pub module: T,
    pub unit: T,
    pub location: T,
}

impl<T> DimensionMap<T> {
    pub fn from_fn(mut f: impl FnMut(Dimension) -> T) -> Self {
        Self {
            module: f(Dimension::Module),
            unit: f(Dimension::Unit),
            location: f(Dimension::Location),
        }
    }

    pub fn get(&self, dimension: Dimension) -> &T {
        match dimension {
            Dimension::Module => &self.module,
            Dimension::Unit => &self.unit,
            Dimension::Location => &self.location,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut T {
        match dimension {
            Dimension::Module => &mut self.module,
            Dimension::Unit => &mut self.unit,
            Dimension::Location => &mut self.location,
        }
    }

    /// Iterate in `Module, Unit, Location` order.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &T)> {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

impl<T> IntoIterator for DimensionMap<T> {
    type Item = (Dimension, T);
    type IntoIter = std::array::IntoIter<(Dimension, T), 3>;

    fn into_iter(self) -> Self::IntoIter {
        [
            (Dimension::Module, self.module),
            (Dimension::Unit, self.unit),
            (Dimension::Location, self.location),
        ]
        .into_iter()
    }
}

impl<T> Index<Dimension> for DimensionMap<T> {
    type Output = T;

    fn index(&self, dimension: Dimension) -> &T {
        self.get(dimension)
    }
}

impl<T> IndexMut<Dimension> for DimensionMap<T> {
    fn index_mut(&mut self, dimension: Dimension) -> &mut T {
        self.get_mut(dimension)
    }
}

// ── Options & outcomes ───────────────────────────────────────────

/// A selectable option of one dimension. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: OptionId,
    pub label: String,
}

impl FilterOption {
    pub fn new(id: OptionId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Result of validating a full selection. Surfaced as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    /// One-line, user-facing summary.
    pub fn summary(&self) -> String {
        if self.valid {
            "Filters applied successfully!".into()
        } else if self.errors.is_empty() {
            "Validation failed: Unknown errors".into()
        } else {
            format!("Validation failed: {}", self.errors.join(", "))
        }
    }
}

// ── ConstraintContext ────────────────────────────────────────────

/// Input to one gateway list call: the target dimension plus the
/// selections of the two other dimensions.
///
/// The target's own selection is never part of its constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintContext {
    target: Dimension,
    constraints: Selections,
}

impl ConstraintContext {
    /// Snapshot the constraints for `target` from the current selections.
    pub fn new(target: Dimension, selections: &Selections) -> Self {
        let constraints = DimensionMap::from_fn(|d| {
            if d == target {
                SelectionSet::new()
            } else {
                selections[d].clone()
            }
        });
        Self {
            target,
            constraints,
        }
    }

    /// No constraints at all (initial load and reset).
    pub fn unconstrained(target: Dimension) -> Self {
        Self {
            target,
            constraints: Selections::default(),
        }
    }

    pub fn target(&self) -> Dimension {
        self.target
    }

    /// Constraint IDs contributed by `dimension` (empty for the target).
    pub fn ids(&self, dimension: Dimension) -> &SelectionSet {
        &self.constraints[dimension]
    }

    /// Constraint IDs as a sorted vector, ready for the wire.
    pub fn id_vec(&self, dimension: Dimension) -> Vec<OptionId> {
        self.ids(dimension).iter().copied().collect()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.constraints.iter().all(|(_, ids)| ids.is_empty())
    }
}
