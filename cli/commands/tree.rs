use crate::cli_args::TreeArgs;
use crate::load_config_for_command;
use crate::output::write_to_stdout;
use anyhow::{Context, Result};
use log;
use shout_core::{Config, SystemTools, render_structure};

pub fn handle_tree_command(args: TreeArgs) -> Result<()> {
    let working_dir = Config::determine_working_dir(args.project_config.working_dir.as_ref())
        .context("Failed to determine working directory")?;

    let mut config = load_config_for_command(&working_dir, &args.project_config)
        .context("Failed to load configuration for tree command")?;
    if !args.directories.is_empty() {
        config.scan.directories = args.directories.clone();
    }
    if args.tree_command {
        config.tree.use_tree_command = true;
    }

    // Root validation and resolution are shared with `generate`.
    let options = config.into_options(&working_dir, String::new())?;
    log::debug!("Rendering tree for roots: {:?}", options.roots);

    let structure = render_structure(
        &options.roots,
        &options.working_dir,
        &SystemTools,
        options.use_tree_command,
    );
    write_to_stdout(&structure)
}
