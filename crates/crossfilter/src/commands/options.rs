//! `options` handler: one constrained list call.

use tabled::Tabled;
use tracing::warn;

use crossfilter_core::{ConstraintContext, FilterGateway, FilterOption, HttpGateway, OptionId};

use crate::cli::{GlobalOpts, OptionsArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(super) struct OptionRow {
    #[tabled(rename = "ID")]
    id: OptionId,
    #[tabled(rename = "Label")]
    label: String,
}

impl From<&FilterOption> for OptionRow {
    fn from(o: &FilterOption) -> Self {
        Self {
            id: o.id,
            label: o.label.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    gateway: &HttpGateway,
    args: OptionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let target = args.dimension;
    if !args.selection.ids(target).is_empty() {
        warn!(dimension = %target, "a dimension never constrains itself; ignoring its IDs");
    }

    let context = ConstraintContext::new(target, &args.selection.to_selections());
    let options = gateway.list_options(&context).await?;

    let out = output::render_list(
        &global.output,
        &options,
        |o| OptionRow::from(o),
        |o| o.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
