mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use log;
use std::env;
use std::path::Path;
use std::process;

use cli_args::{Cli, Commands, GenerateArgs, ProjectConfigOpts, ScanOpts};
use shout_core::config::{DEFAULT_CONFIG_FILENAME, HistoryConfig};
use shout_core::{AppError, Config};

fn main() {
    // Recorded before parsing so the meta document shows the exact invocation.
    let invocation = env::args().collect::<Vec<_>>().join(" ");
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;
    let verbose = cli_args.verbose;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, invocation, quiet, verbose) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let core_err = e.downcast_ref::<AppError>();
            let exit_code = match core_err {
                Some(AppError::Config(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::TomlSerialize(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::RootNotFound(_)) => 2,
                Some(AppError::WalkDir(_)) => 2,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, invocation: String, quiet: bool, verbose: u8) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            log::debug!("Executing 'generate' command...");
            commands::generate::handle_generate_command(args, invocation, quiet, verbose)?;
        }
        Commands::Tree(args) => {
            log::debug!("Executing 'tree' command...");
            commands::tree::handle_tree_command(args)?;
        }
        Commands::Tokens(args) => {
            log::debug!("Executing 'tokens' command...");
            commands::tokens::handle_tokens_command(args, quiet)?;
        }
        Commands::Config(args) => {
            log::debug!("Executing 'config' command...");
            commands::config::handle_config_command(args, quiet)?;
        }
    }
    Ok(())
}

fn merge_scan_overrides(config: &mut Config, scan: &ScanOpts) {
    if !scan.directories.is_empty() {
        config.scan.directories = scan.directories.clone();
    }
    if !scan.extensions.is_empty() {
        config.scan.extensions = scan.extensions.clone();
    }
    // CLI skip patterns come first, config patterns after them.
    if !scan.skip.is_empty() {
        let mut skip = scan.skip.clone();
        skip.extend(config.scan.skip.drain(..));
        config.scan.skip = skip;
    }
    if scan.disable_gitignore {
        config.general.use_gitignore = false;
    }
    if scan.enable_gitignore {
        config.general.use_gitignore = true;
    }
}

fn merge_config_with_cli_overrides(mut config: Config, args: &GenerateArgs) -> Config {
    log::trace!("Applying generate command CLI overrides to config...");
    merge_scan_overrides(&mut config, &args.scan);

    if let Some(output) = &args.output {
        config.output.file = output.clone();
    }
    if args.meta {
        config.output.meta = true;
    }
    if let Some(depth) = args.history {
        config.history = HistoryConfig {
            enabled: true,
            depth: depth.unwrap_or(config.history.depth),
        };
    }
    if args.tree_command {
        config.tree.use_tree_command = true;
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

/// Loads the project config (or the user-level one when the project has
/// none) and applies the options shared by every command.
pub fn load_config_for_command(
    working_dir: &Path,
    project_opts: &ProjectConfigOpts,
) -> Result<Config> {
    let mut config_path = Config::resolve_config_path(
        working_dir,
        project_opts.config_file.as_ref(),
        project_opts.disable_config,
    )
    .context("Failed to resolve configuration path")?;

    if config_path.is_none() && !project_opts.disable_config {
        config_path = dirs::config_dir()
            .map(|dir| dir.join("shout").join(DEFAULT_CONFIG_FILENAME))
            .filter(|path| path.exists());
        if let Some(path) = &config_path {
            log::debug!("Using user config file: {}", path.display());
        }
    }

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(name) = &project_opts.project_name {
        config.general.project_name = Some(name.clone());
    }
    Ok(config)
}
