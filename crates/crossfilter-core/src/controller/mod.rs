// ── Filter reconciliation controller ──
//
// Keeps the three option lists consistent with the current selections
// under the mutual-constraint rule: each dimension's options are filtered
// by the selections of the other two. Selection changes are debounced per
// dimension, every fetch is tagged with a per-dimension epoch so that
// superseded responses are dropped, and selections are pruned only on
// confirmed new data.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::gateway::FilterGateway;
use crate::model::{
    ConstraintContext, Dimension, DimensionMap, FilterOption, OptionId, ValidationOutcome,
};
use crate::schedule::Debouncer;
use crate::state::{FilterState, StatusError, StatusErrorKind};

#[cfg(test)]
mod tests;

/// The main entry point for the presentation layer.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. All state lives in a
/// [`FilterState`] published through a `watch` channel: read it with
/// [`state()`](Self::state) or follow it with [`subscribe()`](Self::subscribe).
pub struct Controller<G> {
    inner: Arc<ControllerInner<G>>,
}

impl<G> Clone for Controller<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<G> {
    gateway: G,
    config: ControllerConfig,
    state: watch::Sender<FilterState>,
    cancel: CancellationToken,
    debouncer: Debouncer<Dimension>,
}

impl<G: FilterGateway> Controller<G> {
    /// Create a controller with empty option lists and selections.
    /// Does NOT fetch -- call [`initialize()`](Self::initialize).
    pub fn new(gateway: G, config: ControllerConfig) -> Self {
        Self::with_state(gateway, config, FilterState::default())
    }

    /// Create a controller around an injected starting state.
    pub fn with_state(gateway: G, config: ControllerConfig, state: FilterState) -> Self {
        let (state, _) = watch::channel(state);
        let cancel = CancellationToken::new();
        let debouncer = Debouncer::new(cancel.clone());

        Self {
            inner: Arc::new(ControllerInner {
                gateway,
                config,
                state,
                cancel,
                debouncer,
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    // ── State observation ────────────────────────────────────────

    /// Snapshot of the current state.
    pub fn state(&self) -> FilterState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.inner.state.subscribe()
    }

    /// Wait until no pass is scheduled and no fetch is outstanding.
    pub async fn settled(&self) -> Result<FilterState, CoreError> {
        self.ensure_live()?;
        let mut rx = self.subscribe();
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Err(CoreError::ControllerTornDown),
            settled = rx.wait_for(FilterState::is_settled) => settled
                .map(|state| state.clone())
                .map_err(|_| CoreError::ControllerTornDown),
        }
    }

    /// Dismiss the transient error message, if any.
    pub fn dismiss_error(&self) {
        self.inner.state.send_if_modified(|s| s.clear_error(None));
    }

    // ── Operations ───────────────────────────────────────────────

    /// Fetch all three dimensions without constraints.
    ///
    /// Fails fast: if any fetch fails, all option lists are left empty
    /// and a fetch error is surfaced.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        self.ensure_live()?;
        info!("loading filter options");

        let epochs = self.modify(|s| {
            s.clear_error(Some(StatusErrorKind::Fetch));
            DimensionMap::from_fn(|d| s.begin_fetch(d))
        });

        let gateway = &self.inner.gateway;
        let fetch = |d: Dimension| async move {
            gateway
                .list_options(&ConstraintContext::unconstrained(d))
                .await
        };
        let (modules, units, locations) = self
            .until_torn_down(self.with_loading_gate(async {
                tokio::join!(
                    fetch(Dimension::Module),
                    fetch(Dimension::Unit),
                    fetch(Dimension::Location)
                )
            }))
            .await?;
        let results = DimensionMap {
            module: modules,
            unit: units,
            location: locations,
        };

        let mut loaded = DimensionMap::<Vec<FilterOption>>::default();
        for (dimension, result) in results {
            match result {
                Ok(options) => loaded[dimension] = options,
                Err(err) => {
                    warn!(%dimension, error = %err, "initial filter load failed");
                    self.inner.state.send_modify(|s| {
                        for d in Dimension::ALL {
                            if s.is_current(d, epochs[d]) {
                                s.clear_options(d);
                                s.finish_fetch(d);
                            }
                        }
                        s.set_error(StatusError::fetch(None));
                    });
                    return Err(err);
                }
            }
        }

        self.inner.state.send_modify(|s| {
            for (d, options) in loaded {
                if s.is_current(d, epochs[d]) {
                    s.apply_options(d, options);
                } else {
                    trace!(dimension = %d, "discarding superseded initial load");
                }
            }
        });
        debug!("filter options loaded");
        Ok(())
    }

    /// Replace `dimension`'s selection and schedule a debounced
    /// reconciliation of the other two dimensions.
    ///
    /// Returns immediately. Membership of `ids` is not checked here; the
    /// pass prunes them against the dimension's current option list.
    pub fn change_selection(
        &self,
        dimension: Dimension,
        ids: impl IntoIterator<Item = OptionId>,
    ) {
        let ids = ids.into_iter().collect();
        if self.inner.cancel.is_cancelled() {
            debug!(%dimension, "selection recorded after teardown; not reconciling");
            self.modify(|s| s.replace_selection(dimension, ids));
            return;
        }

        let seq = self.modify(|s| s.record_change(dimension, ids));

        let controller = self.clone();
        self.inner.debouncer.schedule(
            dimension,
            self.inner.config.debounce,
            async move { controller.reconcile(dimension, seq).await },
        );
    }

    /// Validate the current selection with the gateway.
    ///
    /// Never touches selections or option lists. The outcome (or a
    /// validate error) is recorded for display.
    pub async fn apply_filters(&self) -> Result<ValidationOutcome, CoreError> {
        self.ensure_live()?;
        let selections = self.inner.state.borrow().selections().clone();
        self.modify(|s| s.set_validation(None));

        let result = self
            .until_torn_down(self.inner.gateway.validate_selection(&selections))
            .await
            .and_then(|r| r);

        match result {
            Ok(outcome) => {
                info!(
                    valid = outcome.valid,
                    errors = outcome.errors.len(),
                    "selection validated"
                );
                self.modify(|s| {
                    s.clear_error(Some(StatusErrorKind::Validate));
                    s.set_validation(Some(outcome.clone()));
                });
                Ok(outcome)
            }
            Err(err) => {
                warn!(error = %err, "validation request failed");
                if err.is_gateway_unavailable() {
                    self.modify(|s| s.set_error(StatusError::validate()));
                }
                Err(err)
            }
        }
    }

    /// Clear every selection, then reload like [`initialize()`](Self::initialize).
    pub async fn reset(&self) -> Result<(), CoreError> {
        self.ensure_live()?;
        info!("resetting filters");
        self.inner.debouncer.cancel_pending();
        self.modify(|s| {
            s.cancel_pending_passes();
            s.clear_selections();
            s.set_validation(None);
        });
        self.initialize().await
    }

    /// Cancel all pending and running reconciliation work. Idempotent.
    pub fn teardown(&self) {
        if !self.inner.cancel.is_cancelled() {
            debug!("tearing down filter controller");
        }
        self.inner.debouncer.cancel_pending();
        self.inner.cancel.cancel();
        self.inner.state.send_modify(FilterState::abandon_work);
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// One pass for a change to `changed`: drop IDs of `changed` that are
    /// not among its options, then refetch the other two dimensions
    /// concurrently under the resulting selections.
    async fn reconcile(&self, changed: Dimension, seq: u64) {
        let plan = self.modify(|s| {
            let collapsed = s.start_pass(changed, seq);
            s.clear_error(Some(StatusErrorKind::Fetch));
            trace!(dimension = %changed, collapsed, "reconciliation pass started");
            let unknown = s.prune_selection(changed);
            if !unknown.is_empty() {
                debug!(dimension = %changed, ids = ?unknown, "dropping unknown selected IDs");
            }
            changed.others().map(|target| {
                let context = ConstraintContext::new(target, s.selections());
                let epoch = s.begin_fetch(target);
                (context, epoch)
            })
        });

        let [(first, first_epoch), (second, second_epoch)] = plan;
        debug!(
            dimension = %changed,
            refetch = ?[first.target(), second.target()],
            "reconciling"
        );

        self.with_loading_gate(async {
            tokio::join!(
                self.refetch(first, first_epoch),
                self.refetch(second, second_epoch)
            )
        })
        .await;
    }

    /// Fetch one dimension and apply the result if still current.
    async fn refetch(&self, context: ConstraintContext, epoch: u64) {
        let target = context.target();
        let result = self.inner.gateway.list_options(&context).await;

        self.inner.state.send_if_modified(|s| {
            if !s.is_current(target, epoch) {
                trace!(
                    dimension = %target,
                    epoch,
                    current = s.epoch(target),
                    "discarding stale response"
                );
                return false;
            }
            match result {
                Ok(options) => {
                    let count = options.len();
                    let pruned = s.apply_options(target, options);
                    debug!(
                        dimension = %target,
                        options = count,
                        pruned = ?pruned,
                        "options updated"
                    );
                }
                Err(err) => {
                    warn!(
                        dimension = %target,
                        error = %err,
                        "refetch failed; keeping previous options"
                    );
                    s.finish_fetch(target);
                    s.set_error(StatusError::fetch(Some(target)));
                }
            }
            true
        });
    }

    // ── Helpers ──────────────────────────────────────────────────

    /// Run `work`; show the loading indicator only if it outlasts the
    /// configured delay.
    async fn with_loading_gate<F: Future>(&self, work: F) -> F::Output {
        let delay = tokio::time::sleep(self.inner.config.loading_delay);
        tokio::pin!(work);
        tokio::pin!(delay);

        let mut hold = LoadingHold {
            state: &self.inner.state,
            held: false,
        };
        loop {
            tokio::select! {
                biased;
                output = &mut work => break output,
                () = &mut delay, if !hold.held => hold.raise(),
            }
        }
    }

    async fn until_torn_down<F: Future>(&self, work: F) -> Result<F::Output, CoreError> {
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Err(CoreError::ControllerTornDown),
            output = work => Ok(output),
        }
    }

    fn ensure_live(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            Err(CoreError::ControllerTornDown)
        } else {
            Ok(())
        }
    }

    /// Mutate the state (always notifying) and return the closure's value.
    fn modify<R>(&self, f: impl FnOnce(&mut FilterState) -> R) -> R {
        let mut out = None;
        self.inner.state.send_modify(|s| out = Some(f(s)));
        match out {
            Some(value) => value,
            None => unreachable!("send_modify always runs its closure"),
        }
    }
}

/// A raised loading indicator, lowered again when dropped (including when
/// the surrounding pass is cancelled mid-flight).
struct LoadingHold<'a> {
    state: &'a watch::Sender<FilterState>,
    held: bool,
}

impl LoadingHold<'_> {
    fn raise(&mut self) {
        self.held = true;
        self.state.send_modify(FilterState::hold_loading);
    }
}

impl Drop for LoadingHold<'_> {
    fn drop(&mut self) {
        if self.held {
            self.state.send_modify(FilterState::release_loading);
        }
    }
}
