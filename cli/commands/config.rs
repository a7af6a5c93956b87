use crate::cli_args::ConfigArgs;
use crate::output::write_to_stdout;
use anyhow::{Context, Result, bail};
use colored::*;
use shout_core::Config;
use shout_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};
use std::fs;

pub fn handle_config_command(args: ConfigArgs, quiet: bool) -> Result<()> {
    let content = Config::default()
        .to_toml()
        .context("Failed to serialize default configuration")?;

    if !args.save {
        return write_to_stdout(&content);
    }

    let working_dir = Config::determine_working_dir(args.project_config.working_dir.as_ref())
        .context("Failed to determine working directory")?;
    let config_dir = working_dir.join(DEFAULT_CONFIG_DIR);
    let config_path = config_dir.join(DEFAULT_CONFIG_FILENAME);

    if config_path.exists() && !args.force {
        bail!(
            "Config file already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create directory {}", config_dir.display()))?;
    fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config file {}", config_path.display()))?;

    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            config_path.display().to_string().blue()
        );
    }
    Ok(())
}
