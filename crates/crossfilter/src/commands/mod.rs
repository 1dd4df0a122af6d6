//! Command dispatch: bridges CLI args -> gateway / controller -> output formatting.

pub mod config_cmd;
pub mod options;
pub mod select;
pub mod validate;

use crossfilter_core::HttpGateway;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let (gateway_config, controller_config) = config::build_configs(global)?;
    let gateway = HttpGateway::new(&gateway_config)?;

    match cmd {
        Command::Options(args) => options::handle(&gateway, args, global).await,
        Command::Validate(args) => validate::handle(&gateway, &args, global).await,
        Command::Select(args) => select::handle(gateway, controller_config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
