use crate::cli_args::TokensArgs;
use crate::output::{TokenRow, print_token_table};
use anyhow::{Context, Result};
use colored::*;
use log;
use shout_core::walker::display_path;
use shout_core::{self as core, Config};
use std::fs;

pub fn handle_tokens_command(args: TokensArgs, quiet: bool) -> Result<()> {
    let working_dir =
        Config::determine_working_dir(None).context("Failed to determine working directory")?;

    let mut rows = Vec::with_capacity(args.files.len());
    let mut failures = 0;
    for path in &args.files {
        let absolute = working_dir.join(path);
        let measured = fs::metadata(&absolute)
            .map_err(|e| core::AppError::FileRead {
                path: absolute.clone(),
                source: e,
            })
            .and_then(|meta| Ok((meta.len(), core::count_file_tokens(&absolute)?)));

        match measured {
            Ok((bytes, tokens)) => rows.push(TokenRow {
                path: display_path(&absolute, &working_dir),
                bytes,
                tokens,
            }),
            Err(e) => {
                failures += 1;
                log::debug!("Token estimation failed: {:?}", e);
                if !quiet {
                    eprintln!("{} {}", "Warning:".yellow(), e);
                }
            }
        }
    }

    if rows.is_empty() && failures > 0 {
        return Err(core::AppError::InvalidArgument(format!(
            "None of the {} given files could be read",
            failures
        )))
        .context("Failed to estimate tokens");
    }

    print_token_table(&rows);
    Ok(())
}
