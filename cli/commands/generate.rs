use crate::cli_args::GenerateArgs;
use crate::output;
use crate::{load_config_for_command, merge_config_with_cli_overrides};
use anyhow::{Context, Result};
use log;
use shout_core::{self as core, Config, SystemTools};

pub fn handle_generate_command(
    args: GenerateArgs,
    invocation: String,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    let working_dir = Config::determine_working_dir(args.project_config.working_dir.as_ref())
        .context("Failed to determine working directory")?;
    log::info!("Working directory determined: {}", working_dir.display());

    let config = load_config_for_command(&working_dir, &args.project_config)
        .context("Failed to load configuration")?;
    let config = merge_config_with_cli_overrides(config, &args);

    let options = config.into_options(&working_dir, invocation)?;
    log::debug!("Generation options: {:?}", options);

    let stats = core::generate(&options, &SystemTools)
        .context("Failed to generate project document")?;

    output::print_generation_summary(&options, &stats, quiet, verbose)
}
