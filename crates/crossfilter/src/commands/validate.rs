//! `validate` handler.

use crossfilter_core::{FilterGateway, HttpGateway, ValidationOutcome};

use crate::cli::{GlobalOpts, SelectionArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    gateway: &HttpGateway,
    args: &SelectionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let outcome = gateway.validate_selection(&args.to_selections()).await?;

    let out = render_outcome(&outcome, global)?;
    output::print_output(&out, global.quiet);
    rejection(&outcome)
}

pub(super) fn render_outcome(
    outcome: &ValidationOutcome,
    global: &GlobalOpts,
) -> Result<String, CliError> {
    let color = output::should_color(&global.color);
    output::render_single(
        &global.output,
        outcome,
        |o| output::status_line(o.valid, &o.summary(), color),
        ValidationOutcome::summary,
    )
}

/// A negative outcome becomes a `Rejected` error so the process exits non-zero.
pub(super) fn rejection(outcome: &ValidationOutcome) -> Result<(), CliError> {
    if outcome.valid {
        Ok(())
    } else {
        Err(CliError::Rejected {
            summary: outcome.summary(),
        })
    }
}
