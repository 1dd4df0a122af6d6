// ── Selection state ──
//
// Option lists, selections and reconciliation bookkeeping for all three
// dimensions. Owned by the controller and published through a `watch`
// channel; consumers only ever see cloned snapshots.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::model::{
    Dimension, DimensionMap, FilterOption, OptionId, SelectionSet, Selections, ValidationOutcome,
};

/// Per-dimension reconciliation phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPhase {
    #[default]
    Idle,
    /// A debounced pass that will refetch this dimension is scheduled.
    FetchPending,
    /// A fetch for the current epoch is outstanding.
    Fetching,
}

/// Which user action produced a [`StatusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusErrorKind {
    /// Loading option lists (initialize, reset, reconciliation).
    Fetch,
    /// Applying (validating) the selection.
    Validate,
}

/// A transient, dismissible error for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusError {
    pub kind: StatusErrorKind,
    pub message: String,
}

impl StatusError {
    pub(crate) fn fetch(dimension: Option<Dimension>) -> Self {
        let what = dimension.map_or("filter data", Dimension::plural);
        Self {
            kind: StatusErrorKind::Fetch,
            message: format!("Failed to load {what}. Please try again later."),
        }
    }

    pub(crate) fn validate() -> Self {
        Self {
            kind: StatusErrorKind::Validate,
            message: "Failed to validate filters. Please try again.".into(),
        }
    }
}

/// Snapshot of everything the presentation layer renders.
///
/// Mutated only by the controller. Build one with the `with_*` methods to
/// inject a starting state at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    options: DimensionMap<Vec<FilterOption>>,
    selections: Selections,
    /// FetchEpoch per dimension.
    epochs: DimensionMap<u64>,
    /// Whether the fetch tagged with the current epoch is outstanding.
    in_flight: DimensionMap<bool>,
    /// Selection changes recorded per dimension.
    change_seq: DimensionMap<u64>,
    /// Highest change sequence already covered by a started pass.
    pass_seq: DimensionMap<u64>,
    loading_holds: u32,
    validation: Option<ValidationOutcome>,
    error: Option<StatusError>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, dimension: Dimension, options: Vec<FilterOption>) -> Self {
        self.options[dimension] = dedupe(dimension, options);
        self
    }

    pub fn with_selection(
        mut self,
        dimension: Dimension,
        ids: impl IntoIterator<Item = OptionId>,
    ) -> Self {
        self.selections[dimension] = ids.into_iter().collect();
        self
    }

    // ── Read accessors ───────────────────────────────────────────────

    pub fn options(&self, dimension: Dimension) -> &[FilterOption] {
        &self.options[dimension]
    }

    pub fn selection(&self, dimension: Dimension) -> &SelectionSet {
        &self.selections[dimension]
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// Current FetchEpoch of `dimension`.
    pub fn epoch(&self, dimension: Dimension) -> u64 {
        self.epochs[dimension]
    }

    /// Changes to `dimension` not yet picked up by a reconciliation pass.
    pub fn pending_changes(&self, dimension: Dimension) -> u64 {
        self.change_seq[dimension].saturating_sub(self.pass_seq[dimension])
    }

    pub fn phase(&self, dimension: Dimension) -> DimensionPhase {
        let awaiting_pass = dimension
            .others()
            .into_iter()
            .any(|d| self.pending_changes(d) > 0);
        if awaiting_pass {
            DimensionPhase::FetchPending
        } else if self.in_flight[dimension] {
            DimensionPhase::Fetching
        } else {
            DimensionPhase::Idle
        }
    }

    /// No pass is scheduled, no current fetch is outstanding and the
    /// loading indicator is down.
    pub fn is_settled(&self) -> bool {
        !self.is_loading()
            && Dimension::ALL
                .into_iter()
                .all(|d| self.phase(d) == DimensionPhase::Idle)
    }

    /// Whether the loading indicator should be shown.
    pub fn is_loading(&self) -> bool {
        self.loading_holds > 0
    }

    pub fn validation(&self) -> Option<&ValidationOutcome> {
        self.validation.as_ref()
    }

    pub fn error(&self) -> Option<&StatusError> {
        self.error.as_ref()
    }

    /// At least one dimension has a non-empty selection.
    pub fn has_selection(&self) -> bool {
        self.selections.iter().any(|(_, ids)| !ids.is_empty())
    }

    /// Selected IDs that are missing from their dimension's option list.
    pub fn dangling_selections(&self) -> DimensionMap<SelectionSet> {
        DimensionMap::from_fn(|d| {
            let known: HashSet<OptionId> = self.options[d].iter().map(|o| o.id).collect();
            self.selections[d]
                .iter()
                .copied()
                .filter(|id| !known.contains(id))
                .collect()
        })
    }

    /// Every selected ID is present in its dimension's option list.
    pub fn is_consistent(&self) -> bool {
        self.dangling_selections().iter().all(|(_, ids)| ids.is_empty())
    }

    // ── Controller-side mutations ────────────────────────────────────

    /// Record a new full selection; returns the change sequence number.
    pub(crate) fn record_change(&mut self, dimension: Dimension, ids: SelectionSet) -> u64 {
        self.selections[dimension] = ids;
        self.change_seq[dimension] += 1;
        self.change_seq[dimension]
    }

    /// Replace a selection without scheduling anything.
    pub(crate) fn replace_selection(&mut self, dimension: Dimension, ids: SelectionSet) {
        self.selections[dimension] = ids;
    }

    /// Mark changes up to `seq` as covered; returns how many were collapsed.
    pub(crate) fn start_pass(&mut self, dimension: Dimension, seq: u64) -> u64 {
        let collapsed = seq.saturating_sub(self.pass_seq[dimension]);
        self.pass_seq[dimension] = self.pass_seq[dimension].max(seq);
        collapsed
    }

    /// Drop every scheduled-but-unstarted pass.
    pub(crate) fn cancel_pending_passes(&mut self) {
        for d in Dimension::ALL {
            self.pass_seq[d] = self.change_seq[d];
        }
    }

    /// Bump the dimension's epoch for a new fetch and return it.
    pub(crate) fn begin_fetch(&mut self, dimension: Dimension) -> u64 {
        self.epochs[dimension] += 1;
        self.in_flight[dimension] = true;
        self.epochs[dimension]
    }

    pub(crate) fn is_current(&self, dimension: Dimension, epoch: u64) -> bool {
        self.epochs[dimension] == epoch
    }

    /// Current fetch resolved without new data.
    pub(crate) fn finish_fetch(&mut self, dimension: Dimension) {
        self.in_flight[dimension] = false;
    }

    /// Replace the option list and prune the selection to it.
    ///
    /// Returns the IDs removed from the selection.
    pub(crate) fn apply_options(
        &mut self,
        dimension: Dimension,
        options: Vec<FilterOption>,
    ) -> SelectionSet {
        self.options[dimension] = dedupe(dimension, options);
        self.in_flight[dimension] = false;
        self.prune_selection(dimension)
    }

    /// Intersect the selection with the current option list.
    ///
    /// Returns the IDs removed from the selection.
    pub(crate) fn prune_selection(&mut self, dimension: Dimension) -> SelectionSet {
        let known: HashSet<OptionId> = self.options[dimension].iter().map(|o| o.id).collect();
        let (kept, pruned): (SelectionSet, SelectionSet) =
            std::mem::take(&mut self.selections[dimension])
                .into_iter()
                .partition(|id| known.contains(id));
        self.selections[dimension] = kept;
        pruned
    }

    pub(crate) fn clear_options(&mut self, dimension: Dimension) {
        self.options[dimension].clear();
    }

    pub(crate) fn clear_selections(&mut self) {
        for d in Dimension::ALL {
            self.selections[d].clear();
        }
    }

    /// Forget every outstanding fetch, queued pass and loading hold.
    ///
    /// Used on teardown, when running passes are dropped mid-flight.
    pub(crate) fn abandon_work(&mut self) {
        self.cancel_pending_passes();
        for d in Dimension::ALL {
            self.in_flight[d] = false;
        }
        self.loading_holds = 0;
    }

    pub(crate) fn hold_loading(&mut self) {
        self.loading_holds += 1;
    }

    pub(crate) fn release_loading(&mut self) {
        self.loading_holds = self.loading_holds.saturating_sub(1);
    }

    pub(crate) fn set_validation(&mut self, outcome: Option<ValidationOutcome>) {
        self.validation = outcome;
    }

    pub(crate) fn set_error(&mut self, error: StatusError) {
        self.error = Some(error);
    }

    /// Clear the current error if it is of `kind`; returns whether it did.
    pub(crate) fn clear_error(&mut self, kind: Option<StatusErrorKind>) -> bool {
        let matches = match (&self.error, kind) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(err), Some(kind)) => err.kind == kind,
        };
        if matches {
            self.error = None;
        }
        matches
    }
}

/// Keep the first occurrence of every ID.
fn dedupe(dimension: Dimension, options: Vec<FilterOption>) -> Vec<FilterOption> {
    let mut seen = HashSet::with_capacity(options.len());
    let total = options.len();
    let unique: Vec<_> = options.into_iter().filter(|o| seen.insert(o.id)).collect();
    if unique.len() != total {
        warn!(
            %dimension,
            duplicates = total - unique.len(),
            "dropping duplicate option ids"
        );
    }
    unique
}
