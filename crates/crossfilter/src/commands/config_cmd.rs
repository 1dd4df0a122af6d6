//! Config subcommand handlers.

use crossfilter_config::{Config, Profile, parse_api_url};
use tracing::debug;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let toml_text =
                toml::to_string_pretty(&cfg).map_err(|e| CliError::Render(e.to_string()))?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |_| toml_text.trim_end().to_owned(),
                profile_names,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { name, force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut profile = Profile::default();
            if let Some(ref url) = global.api_url {
                parse_api_url(url)?;
                profile.api_url.clone_from(url);
            }
            if global.insecure {
                profile.insecure = Some(true);
            }
            profile.timeout = global.timeout;

            let mut cfg = Config {
                default_profile: Some(name.clone()),
                ..Config::default()
            };
            cfg.profiles.insert(name, profile);

            config::save_config_to(&cfg, &path)?;
            debug!(path = %path.display(), "config written");
            if !global.quiet {
                eprintln!("Config written to {}", path.display());
            }
            Ok(())
        }
    }
}

fn profile_names(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    names.join("\n")
}
