// ── Keyed debounce scheduler ──
//
// One cancellable delayed task per key. Scheduling again for the same
// key cancels the previous timer; the root token (controller teardown)
// cancels everything, including tasks whose timer already fired.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

pub(crate) struct Debouncer<K> {
    root: CancellationToken,
    timers: Mutex<HashMap<K, CancellationToken>>,
}

impl<K> Debouncer<K>
where
    K: Copy + Eq + Hash + std::fmt::Debug + Send + 'static,
{
    pub(crate) fn new(root: CancellationToken) -> Self {
        Self {
            root,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Run `task` after `delay` unless `key` is rescheduled first.
    ///
    /// Once the timer fires the task runs to completion; only the root
    /// token can stop it from then on. Must be called within a Tokio runtime.
    pub(crate) fn schedule<F>(&self, key: K, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let timer = self.root.child_token();
        if let Some(previous) = self.timers().insert(key, timer.clone()) {
            trace!(?key, "debounce timer restarted");
            previous.cancel();
        }

        let root = self.root.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = timer.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            tokio::select! {
                biased;
                () = root.cancelled() => trace!(?key, "scheduled task cancelled"),
                () = task => {}
            }
        });
    }

    /// Cancel every timer that has not fired yet.
    pub(crate) fn cancel_pending(&self) {
        for (_, timer) in self.timers().drain() {
            timer.cancel();
        }
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<K, CancellationToken>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
