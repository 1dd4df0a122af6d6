//! `select` handler: drives a full reconciliation session.
//!
//! Loads every dimension, applies the requested selections one dimension at
//! a time (waiting for each pass to settle), optionally validates a
//! non-empty selection, and prints the reconciled selections alongside the
//! remaining options.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;
use tracing::{info, warn};

use crossfilter_core::{
    Controller, ControllerConfig, Dimension, DimensionMap, FilterOption, FilterState, HttpGateway,
    OptionId, ValidationOutcome,
};

use crate::cli::{GlobalOpts, SelectArgs};
use crate::error::CliError;
use crate::output;

use super::validate;

// ── Report ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SelectReport<'a> {
    selections: DimensionMap<Vec<OptionId>>,
    options: DimensionMap<&'a [FilterOption]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<&'a ValidationOutcome>,
}

impl<'a> SelectReport<'a> {
    fn new(state: &'a FilterState) -> Self {
        Self {
            selections: DimensionMap::from_fn(|d| state.selection(d).iter().copied().collect()),
            options: DimensionMap::from_fn(|d| state.options(d)),
            validation: state.validation(),
        }
    }
}

#[derive(Tabled)]
struct SelectedRow {
    #[tabled(rename = "")]
    selected: &'static str,
    #[tabled(rename = "ID")]
    id: OptionId,
    #[tabled(rename = "Label")]
    label: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    gateway: HttpGateway,
    config: ControllerConfig,
    args: SelectArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = Controller::new(gateway, config);
    let result = reconcile(&controller, &args).await;
    controller.teardown();
    let state = result?;

    let report = SelectReport::new(&state);
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| render_detail(r, color),
        render_plain,
    )?;
    output::print_output(&out, global.quiet);

    match state.validation() {
        Some(outcome) => validate::rejection(outcome),
        None => Ok(()),
    }
}

async fn reconcile(
    controller: &Controller<HttpGateway>,
    args: &SelectArgs,
) -> Result<FilterState, CliError> {
    controller.initialize().await?;

    for dimension in Dimension::ALL {
        let ids = args.selection.ids(dimension);
        if ids.is_empty() {
            continue;
        }
        info!(%dimension, ?ids, "applying selection");
        controller.change_selection(dimension, ids.iter().copied());

        let state = controller.settled().await?;
        if let Some(err) = state.error() {
            return Err(CliError::ReconciliationFailed {
                message: err.message.clone(),
            });
        }
    }

    let state = controller.state();
    for dimension in Dimension::ALL {
        let dropped: Vec<OptionId> = args
            .selection
            .ids(dimension)
            .iter()
            .copied()
            .filter(|id| !state.selection(dimension).contains(id))
            .collect();
        if !dropped.is_empty() {
            warn!(
                %dimension,
                ids = ?dropped,
                "requested IDs were dropped during reconciliation"
            );
        }
    }

    if !args.apply {
        return Ok(state);
    }
    if !state.has_selection() {
        warn!("nothing selected; skipping validation");
        return Ok(state);
    }
    controller.apply_filters().await?;
    Ok(controller.state())
}

// ── Rendering ───────────────────────────────────────────────────────

fn render_detail(report: &SelectReport<'_>, color: bool) -> String {
    let mut out = String::new();
    for dimension in Dimension::ALL {
        let selected = &report.selections[dimension];
        let rows: Vec<SelectedRow> = report.options[dimension]
            .iter()
            .map(|o| SelectedRow {
                selected: if selected.contains(&o.id) { "●" } else { "" },
                id: o.id,
                label: o.label.clone(),
            })
            .collect();

        let title = capitalize(dimension.plural());
        let _ = writeln!(out, "{title} ({} selected)", selected.len());
        let _ = writeln!(out, "{}", output::render_table(&rows));
    }

    if let Some(outcome) = report.validation {
        let _ = write!(
            out,
            "{}",
            output::status_line(outcome.valid, &outcome.summary(), color)
        );
    }
    out.trim_end().to_owned()
}

fn render_plain(report: &SelectReport<'_>) -> String {
    report
        .selections
        .iter()
        .map(|(dimension, ids)| {
            let csv: Vec<String> = ids.iter().map(ToString::to_string).collect();
            format!("{dimension}: {}", csv.join(","))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
