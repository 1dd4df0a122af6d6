#![allow(clippy::unwrap_used)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::model::{SelectionSet, Selections};
use crate::state::DimensionPhase;

// ── Scripted in-memory gateway ──────────────────────────────────────

enum Reply {
    Catalog,
    Fixed(Vec<FilterOption>),
    Fail,
}

struct Script {
    delay: Duration,
    reply: Reply,
}

impl Script {
    fn fixed(options: &[(OptionId, &str)]) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Fixed(
                options
                    .iter()
                    .map(|&(id, label)| FilterOption::new(id, label))
                    .collect(),
            ),
        }
    }

    fn catalog() -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Catalog,
        }
    }

    fn fail() -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Fail,
        }
    }

    fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Answers list calls from a table of compatible (module, unit, location)
/// rows unless a scripted reply is queued for the target dimension.
#[derive(Default)]
struct FakeGateway {
    rows: Vec<DimensionMap<OptionId>>,
    scripts: Mutex<HashMap<Dimension, VecDeque<Script>>>,
    validations: Mutex<VecDeque<Result<ValidationOutcome, CoreError>>>,
    list_calls: Mutex<Vec<ConstraintContext>>,
    validate_calls: Mutex<Vec<Selections>>,
}

impl FakeGateway {
    fn with_rows(rows: &[(OptionId, OptionId, OptionId)]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|&(module, unit, location)| DimensionMap {
                    module,
                    unit,
                    location,
                })
                .collect(),
            ..Self::default()
        }
    }

    fn script(&self, dimension: Dimension, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(dimension)
            .or_default()
            .push_back(script);
    }

    fn answer_validation(&self, result: Result<ValidationOutcome, CoreError>) {
        self.validations.lock().unwrap().push_back(result);
    }

    fn take_calls(&self) -> Vec<ConstraintContext> {
        std::mem::take(&mut *self.list_calls.lock().unwrap())
    }

    fn validate_calls(&self) -> Vec<Selections> {
        self.validate_calls.lock().unwrap().clone()
    }

    fn next_script(&self, dimension: Dimension) -> Script {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&dimension)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(Script::catalog)
    }

    fn lookup(&self, context: &ConstraintContext) -> Vec<FilterOption> {
        let target = context.target();
        let ids: BTreeSet<OptionId> = self
            .rows
            .iter()
            .filter(|row| {
                target.others().into_iter().all(|d| {
                    let allowed = context.ids(d);
                    allowed.is_empty() || allowed.contains(&row[d])
                })
            })
            .map(|row| row[target])
            .collect();
        ids.into_iter()
            .map(|id| FilterOption::new(id, format!("{target} {id}")))
            .collect()
    }
}

impl FilterGateway for FakeGateway {
    async fn list_options(
        &self,
        context: &ConstraintContext,
    ) -> Result<Vec<FilterOption>, CoreError> {
        self.list_calls.lock().unwrap().push(context.clone());
        let script = self.next_script(context.target());
        tokio::time::sleep(script.delay).await;
        match script.reply {
            Reply::Catalog => Ok(self.lookup(context)),
            Reply::Fixed(options) => Ok(options),
            Reply::Fail => Err(CoreError::gateway("connection reset")),
        }
    }

    async fn validate_selection(
        &self,
        selections: &Selections,
    ) -> Result<ValidationOutcome, CoreError> {
        self.validate_calls.lock().unwrap().push(selections.clone());
        let answer = self.validations.lock().unwrap().pop_front();
        answer.unwrap_or(Ok(ValidationOutcome {
            valid: true,
            errors: Vec::new(),
        }))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

const ROWS: &[(OptionId, OptionId, OptionId)] = &[
    (1, 3, 5),
    (1, 4, 6),
    (2, 4, 5),
    (2, 4, 7),
    (3, 8, 9),
];

fn controller(gateway: FakeGateway) -> Controller<FakeGateway> {
    Controller::new(gateway, ControllerConfig::default())
}

fn ids(state: &FilterState, dimension: Dimension) -> Vec<OptionId> {
    state.options(dimension).iter().map(|o| o.id).collect()
}

fn set(ids: &[OptionId]) -> SelectionSet {
    ids.iter().copied().collect()
}

// ── initialize ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn initialize_loads_every_dimension_unconstrained() {
    let controller = controller(FakeGateway::with_rows(ROWS));

    controller.initialize().await.unwrap();

    let state = controller.state();
    assert_eq!(ids(&state, Dimension::Module), vec![1, 2, 3]);
    assert_eq!(ids(&state, Dimension::Unit), vec![3, 4, 8]);
    assert_eq!(ids(&state, Dimension::Location), vec![5, 6, 7, 9]);
    assert!(state.is_settled());
    assert!(state.error().is_none());

    let calls = controller.gateway().take_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(ConstraintContext::is_unconstrained));
}

#[tokio::test(start_paused = true)]
async fn initialize_fails_fast_and_clears_every_list() {
    let gateway = FakeGateway::with_rows(ROWS);
    gateway.script(Dimension::Unit, Script::fail());
    let seeded = FilterState::new()
        .with_options(Dimension::Module, vec![FilterOption::new(9, "stale")])
        .with_selection(Dimension::Module, [9]);
    let controller = Controller::with_state(gateway, ControllerConfig::default(), seeded);

    let err = controller.initialize().await.unwrap_err();

    assert!(err.is_gateway_unavailable());
    let state = controller.state();
    for d in Dimension::ALL {
        assert!(state.options(d).is_empty(), "{d} options should be cleared");
    }
    assert_eq!(state.selection(Dimension::Module), &set(&[9]));
    assert_eq!(
        state.error().map(|e| e.message.as_str()),
        Some("Failed to load filter data. Please try again later.")
    );
    assert!(state.is_settled());
}

// ── reconciliation ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn module_change_prunes_units_and_locations() {
    let gateway = FakeGateway::default();
    gateway.script(Dimension::Unit, Script::fixed(&[(3, "A"), (4, "B")]));
    gateway.script(Dimension::Location, Script::fixed(&[(5, "X")]));
    let seeded = FilterState::new()
        .with_options(
            Dimension::Module,
            vec![FilterOption::new(1, "M1"), FilterOption::new(2, "M2")],
        )
        .with_selection(Dimension::Unit, [4])
        .with_selection(Dimension::Location, [7]);
    let controller = Controller::with_state(gateway, ControllerConfig::default(), seeded);

    controller.change_selection(Dimension::Module, [1, 2]);
    let state = controller.settled().await.unwrap();

    assert_eq!(state.selection(Dimension::Module), &set(&[1, 2]));
    assert_eq!(state.selection(Dimension::Unit), &set(&[4]));
    assert!(state.selection(Dimension::Location).is_empty());
    assert_eq!(ids(&state, Dimension::Unit), vec![3, 4]);
    assert_eq!(ids(&state, Dimension::Location), vec![5]);

    let calls = controller.gateway().take_calls();
    assert_eq!(calls.len(), 2);
    let unit_call = calls
        .iter()
        .find(|c| c.target() == Dimension::Unit)
        .unwrap();
    assert_eq!(unit_call.id_vec(Dimension::Module), vec![1, 2]);
    assert_eq!(unit_call.id_vec(Dimension::Location), vec![7]);
    let location_call = calls
        .iter()
        .find(|c| c.target() == Dimension::Location)
        .unwrap();
    assert_eq!(location_call.id_vec(Dimension::Module), vec![1, 2]);
    assert_eq!(location_call.id_vec(Dimension::Unit), vec![4]);
}

#[tokio::test(start_paused = true)]
async fn rapid_changes_collapse_into_one_pass() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    controller.gateway().take_calls();

    controller.change_selection(Dimension::Module, [1]);
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.change_selection(Dimension::Module, [1, 2]);
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.change_selection(Dimension::Module, [2]);

    let state = controller.settled().await.unwrap();
    let calls = controller.gateway().take_calls();

    assert_eq!(calls.len(), 2, "one refetch per other dimension");
    assert!(calls.iter().all(|c| c.target() != Dimension::Module));
    assert!(calls.iter().all(|c| c.id_vec(Dimension::Module) == vec![2]));
    assert_eq!(ids(&state, Dimension::Unit), vec![4]);
    assert_eq!(ids(&state, Dimension::Location), vec![5, 7]);
}

#[tokio::test(start_paused = true)]
async fn no_refetch_before_debounce_window_elapses() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    controller.gateway().take_calls();

    controller.change_selection(Dimension::Location, [5]);
    tokio::time::sleep(Duration::from_millis(799)).await;

    assert!(controller.gateway().take_calls().is_empty());
    assert_eq!(
        controller.state().phase(Dimension::Module),
        DimensionPhase::FetchPending
    );
    assert_eq!(
        controller.state().phase(Dimension::Location),
        DimensionPhase::Idle
    );

    controller.settled().await.unwrap();
    assert_eq!(controller.gateway().take_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn superseded_response_is_never_applied() {
    let gateway = FakeGateway::with_rows(ROWS);
    let controller = controller(gateway);
    controller.initialize().await.unwrap();
    let slow = Script::fixed(&[(3, "slow")]).after(Duration::from_secs(2));
    controller.gateway().script(Dimension::Unit, slow);
    controller
        .gateway()
        .script(Dimension::Unit, Script::fixed(&[(4, "fast")]));

    controller.change_selection(Dimension::Module, [1]);
    tokio::time::sleep(Duration::from_millis(900)).await;
    controller.change_selection(Dimension::Module, [2]);

    let state = controller.settled().await.unwrap();
    assert_eq!(ids(&state, Dimension::Unit), vec![4]);
    let epoch = state.epoch(Dimension::Unit);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let state = controller.state();
    assert_eq!(ids(&state, Dimension::Unit), vec![4]);
    assert_eq!(state.options(Dimension::Unit)[0].label, "fast");
    assert_eq!(state.epoch(Dimension::Unit), epoch);
}

#[tokio::test(start_paused = true)]
async fn failed_refetch_keeps_previous_options() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    let before = controller.state();
    controller.gateway().script(Dimension::Location, Script::fail());

    controller.change_selection(Dimension::Unit, [4]);
    let state = controller.settled().await.unwrap();

    assert_eq!(
        state.options(Dimension::Location),
        before.options(Dimension::Location)
    );
    assert_eq!(ids(&state, Dimension::Module), vec![1, 2]);
    let error = state.error().unwrap();
    assert_eq!(error.kind, StatusErrorKind::Fetch);
    assert_eq!(error.message, "Failed to load locations. Please try again later.");

    controller.change_selection(Dimension::Unit, [3, 4]);
    let state = controller.settled().await.unwrap();
    assert!(state.error().is_none(), "next pass clears the fetch error");
    assert_eq!(ids(&state, Dimension::Location), vec![5, 6, 7]);
}

#[tokio::test(start_paused = true)]
async fn unknown_ids_of_changed_dimension_are_pruned() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    controller.gateway().take_calls();

    controller.change_selection(Dimension::Unit, [4, 99]);
    assert_eq!(
        controller.state().selection(Dimension::Unit),
        &set(&[4, 99]),
        "recorded as given until the pass runs"
    );
    let state = controller.settled().await.unwrap();

    assert_eq!(state.selection(Dimension::Unit), &set(&[4]));
    assert!(state.is_consistent());
    let calls = controller.gateway().take_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.id_vec(Dimension::Unit) == vec![4]));
}

#[tokio::test(start_paused = true)]
async fn dismiss_error_clears_message() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.gateway().script(Dimension::Module, Script::fail());
    controller.initialize().await.unwrap_err();
    assert!(controller.state().error().is_some());

    controller.dismiss_error();

    assert!(controller.state().error().is_none());
}

#[tokio::test(start_paused = true)]
async fn selections_stay_consistent_across_passes() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();

    let changes: &[(Dimension, &[OptionId])] = &[
        (Dimension::Module, &[1, 2, 42]),
        (Dimension::Location, &[5, 7, 99]),
        (Dimension::Unit, &[4]),
        (Dimension::Module, &[2]),
        (Dimension::Location, &[7, 99]),
        (Dimension::Module, &[]),
    ];

    for &(dimension, selected) in changes {
        controller.change_selection(dimension, selected.iter().copied());
        let state = controller.settled().await.unwrap();
        assert!(
            state.is_consistent(),
            "after {dimension} <- {selected:?}: dangling {:?}",
            state.dangling_selections()
        );
    }

    let state = controller.state();
    assert_eq!(state.selection(Dimension::Unit), &set(&[4]));
    assert_eq!(state.selection(Dimension::Location), &set(&[7]));
}

// ── loading gate ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn fast_fetches_never_show_loading() {
    let gateway = FakeGateway::with_rows(ROWS);
    for d in Dimension::ALL {
        gateway.script(d, Script::catalog().after(Duration::from_millis(100)));
    }
    let controller = controller(gateway);
    let mut rx = controller.subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = false;
        while rx.changed().await.is_ok() {
            seen |= rx.borrow_and_update().is_loading();
        }
        seen
    });

    controller.initialize().await.unwrap();
    drop(controller);

    assert!(!watcher.await.unwrap(), "loading indicator must stay hidden");
}

#[tokio::test(start_paused = true)]
async fn slow_fetches_show_loading_after_delay() {
    let gateway = FakeGateway::with_rows(ROWS);
    for d in Dimension::ALL {
        gateway.script(d, Script::catalog().after(Duration::from_secs(2)));
    }
    let controller = controller(gateway);
    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.initialize().await })
    };

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!controller.state().is_loading());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(controller.state().is_loading());

    task.await.unwrap().unwrap();
    assert!(!controller.state().is_loading());
}

#[tokio::test(start_paused = true)]
async fn slow_pass_shows_loading_after_delay() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    controller
        .gateway()
        .script(Dimension::Unit, Script::catalog().after(Duration::from_secs(2)));

    controller.change_selection(Dimension::Module, [1]);
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(
        !controller.state().is_loading(),
        "pass started at 800 ms; gate opens at 1300 ms"
    );
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(controller.state().is_loading());

    let state = controller.settled().await.unwrap();
    assert!(!state.is_loading());
    assert_eq!(ids(&state, Dimension::Unit), vec![3, 4]);
}

#[tokio::test(start_paused = true)]
async fn fast_pass_never_shows_loading() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    for d in [Dimension::Unit, Dimension::Location] {
        controller
            .gateway()
            .script(d, Script::catalog().after(Duration::from_millis(400)));
    }
    let mut rx = controller.subscribe();
    rx.mark_unchanged();

    controller.change_selection(Dimension::Module, [2]);
    let watcher = tokio::spawn(async move {
        let mut seen = false;
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update();
            seen |= state.is_loading();
            if state.is_settled() {
                break;
            }
        }
        seen
    });

    controller.settled().await.unwrap();
    assert!(!watcher.await.unwrap(), "loading indicator must stay hidden");
}

// ── apply / reset / teardown ────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn apply_filters_records_outcome_without_touching_selection() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    controller.change_selection(Dimension::Module, [2]);
    let before = controller.settled().await.unwrap();
    controller.gateway().answer_validation(Ok(ValidationOutcome {
        valid: false,
        errors: vec!["Module 2 is retired".into()],
    }));

    let outcome = controller.apply_filters().await.unwrap();

    assert!(!outcome.valid);
    assert_eq!(outcome.summary(), "Validation failed: Module 2 is retired");
    let state = controller.state();
    assert_eq!(state.validation(), Some(&outcome));
    assert_eq!(state.selections(), before.selections());
    assert_eq!(
        controller.gateway().validate_calls(),
        vec![before.selections().clone()]
    );
}

#[tokio::test(start_paused = true)]
async fn apply_filters_failure_surfaces_validate_error() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller
        .gateway()
        .answer_validation(Err(CoreError::gateway("timeout")));

    let err = controller.apply_filters().await.unwrap_err();

    assert!(err.is_gateway_unavailable());
    let state = controller.state();
    assert!(state.validation().is_none());
    let error = state.error().unwrap();
    assert_eq!(error.kind, StatusErrorKind::Validate);
    assert_eq!(error.message, "Failed to validate filters. Please try again.");
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_pending_pass_and_reloads() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    controller.change_selection(Dimension::Module, [1]);
    controller.settled().await.unwrap();
    controller.apply_filters().await.unwrap();
    controller.gateway().take_calls();

    controller.change_selection(Dimension::Unit, [3]);
    controller.reset().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let state = controller.state();
    for d in Dimension::ALL {
        assert!(state.selection(d).is_empty());
    }
    assert!(state.validation().is_none());
    assert_eq!(ids(&state, Dimension::Unit), vec![3, 4, 8]);
    assert!(state.is_settled());

    let calls = controller.gateway().take_calls();
    assert_eq!(calls.len(), 3, "only the reload, no debounced pass");
    assert!(calls.iter().all(ConstraintContext::is_unconstrained));
}

#[tokio::test(start_paused = true)]
async fn reset_discards_pass_already_fetching() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    let stale = Script::fixed(&[(8, "stale")]).after(Duration::from_secs(3));
    controller.gateway().script(Dimension::Unit, stale);

    controller.change_selection(Dimension::Module, [3]);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(
        controller.state().phase(Dimension::Unit),
        DimensionPhase::Fetching
    );

    controller.reset().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let state = controller.state();
    for d in Dimension::ALL {
        assert!(state.selection(d).is_empty());
    }
    assert_eq!(ids(&state, Dimension::Unit), vec![3, 4, 8]);
    assert!(state.options(Dimension::Unit).iter().all(|o| o.label != "stale"));
    assert_eq!(ids(&state, Dimension::Location), vec![5, 6, 7, 9]);
    assert!(state.is_settled());
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_pass_lowers_loading_and_settles() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    for d in [Dimension::Unit, Dimension::Location] {
        controller
            .gateway()
            .script(d, Script::catalog().after(Duration::from_secs(5)));
    }

    controller.change_selection(Dimension::Module, [1]);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(controller.state().is_loading());
    assert_eq!(
        controller.state().phase(Dimension::Unit),
        DimensionPhase::Fetching
    );

    controller.teardown();

    let state = controller.state();
    assert!(!state.is_loading());
    assert_eq!(state.phase(Dimension::Unit), DimensionPhase::Idle);
    assert!(state.is_settled());

    tokio::time::sleep(Duration::from_secs(10)).await;
    let state = controller.state();
    assert!(!state.is_loading());
    assert!(state.is_settled());
    assert_eq!(ids(&state, Dimension::Unit), vec![3, 4, 8], "late replies ignored");
}

#[tokio::test(start_paused = true)]
async fn teardown_stops_pending_work() {
    let controller = controller(FakeGateway::with_rows(ROWS));
    controller.initialize().await.unwrap();
    controller.gateway().take_calls();

    controller.change_selection(Dimension::Module, [1]);
    controller.teardown();
    controller.teardown();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(controller.is_torn_down());
    assert!(controller.gateway().take_calls().is_empty());
    assert!(matches!(
        controller.initialize().await,
        Err(CoreError::ControllerTornDown)
    ));
    assert!(matches!(
        controller.settled().await,
        Err(CoreError::ControllerTornDown)
    ));

    controller.change_selection(Dimension::Unit, [4]);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(controller.state().selection(Dimension::Unit), &set(&[4]));
    assert!(controller.gateway().take_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_interrupts_in_flight_load() {
    let gateway = FakeGateway::with_rows(ROWS);
    gateway.script(
        Dimension::Module,
        Script::catalog().after(Duration::from_secs(5)),
    );
    let controller = controller(gateway);
    let task = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.initialize().await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.teardown();

    assert!(matches!(
        task.await.unwrap(),
        Err(CoreError::ControllerTornDown)
    ));
    assert!(controller.state().options(Dimension::Module).is_empty());
}
