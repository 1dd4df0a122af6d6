//! Clap derive structures for the `crossfilter` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crossfilter_core::{Dimension, OptionId, Selections};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// crossfilter -- browse and validate cascading module/unit/location filters
#[derive(Debug, Parser)]
#[command(
    name = "crossfilter",
    version,
    about = "Browse and validate cascading module, unit and location filters",
    long_about = "Talks to a filter service whose option lists constrain each other:\n\
        selecting modules narrows the available units and locations, and so on.\n\n\
        Use `select` to run a full reconciliation the way an interactive client would.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "CROSSFILTER_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Filter service URL (overrides profile)
    #[arg(long, short = 'u', env = "CROSSFILTER_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CROSSFILTER_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CROSSFILTER_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CROSSFILTER_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the options of one dimension under the given constraints
    #[command(alias = "ls")]
    Options(OptionsArgs),

    /// Validate a full selection with the filter service
    Validate(SelectionArgs),

    /// Load all filters, apply selections, and print the reconciled result
    Select(SelectArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Selection Arguments ───────────────────────────────────────

/// Comma-separated ID lists for each dimension.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// Module IDs (e.g. 1,2)
    #[arg(long, short = 'm', value_delimiter = ',', value_name = "IDS")]
    pub modules: Vec<OptionId>,

    /// Unit IDs
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    pub units: Vec<OptionId>,

    /// Location IDs
    #[arg(long, short = 'l', value_delimiter = ',', value_name = "IDS")]
    pub locations: Vec<OptionId>,
}

impl SelectionArgs {
    pub fn ids(&self, dimension: Dimension) -> &[OptionId] {
        match dimension {
            Dimension::Module => &self.modules,
            Dimension::Unit => &self.units,
            Dimension::Location => &self.locations,
        }
    }

    pub fn to_selections(&self) -> Selections {
        Selections::from_fn(|d| self.ids(d).iter().copied().collect())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OPTIONS / SELECT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct OptionsArgs {
    /// Dimension to list: module, unit or location
    pub dimension: Dimension,

    /// Constraints from the other dimensions; the target's own IDs are ignored
    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Selections, applied one dimension at a time (modules, units, locations)
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Validate the reconciled selection afterwards (skipped when nothing is selected)
    #[arg(long, short = 'a')]
    pub apply: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,

    /// Write a starter config file
    Init {
        /// Profile name to create
        #[arg(long, default_value = "default")]
        name: String,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
