use crate::error::{AppError, Result};
use log;
use std::path::Path;
use std::process::Command;

/// Capability interface over external helper programs (`git`, `tree`).
///
/// Callers treat every failure as soft: an unavailable tool or a failed
/// run degrades to an empty or fallback result.
pub trait ToolRunner {
    fn is_available(&self, program: &str) -> bool;

    /// Runs `program` with `args` in `dir`, returning its standard output.
    /// A non-zero exit status is an error.
    fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<String>;
}

/// Runs real binaries resolved from `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTools;

impl ToolRunner for SystemTools {
    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<String> {
        log::trace!("Running {} {:?} in {}", program, args, dir.display());
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| AppError::Tool(format!("failed to execute {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(AppError::Tool(format!(
                "{} {} exited with {}: {}",
                program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
