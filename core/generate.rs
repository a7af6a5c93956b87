use crate::config::GenerateOptions;
use crate::error::{AppError, Result};
use crate::filter::SkipFilter;
use crate::history::{collect_history, format_history};
use crate::stats::{Stats, format_duration};
use crate::tools::ToolRunner;
use crate::tree::{PathTrie, render_structure};
use crate::walker::{KeptFile, PathWalker};
use log;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const MIN_FENCE_LEN: usize = 3;

/// Runs one aggregation pass and writes the document to `options.output`.
///
/// The output file is created before anything else; failing to create or
/// write it (or the meta document) aborts the pass. Everything else, from
/// unreadable files to a missing `git`, degrades without failing.
pub fn generate(options: &GenerateOptions, tools: &dyn ToolRunner) -> Result<Stats> {
    let start = Instant::now();
    log::info!(
        "Starting generation for {} into {}",
        options.project_name,
        options.output.display()
    );
    let mut stats = Stats::new(options.invocation.clone());

    let file = create_output_file(&options.output)?;
    let mut writer = BufWriter::new(file);
    write_document(&mut writer, options, tools, &mut stats)?;
    writer
        .flush()
        .map_err(|e| write_error(&options.output, e))?;
    drop(writer);

    stats.duration = start.elapsed();
    log::info!(
        "Processed {} files, skipped {} in {}",
        stats.files_processed,
        stats.files_skipped,
        format_duration(stats.duration)
    );

    if options.meta {
        let meta_path = meta_path_for(&options.output);
        let meta = render_meta(options, &stats);
        create_parent_dir(&meta_path)?;
        fs::write(&meta_path, meta).map_err(|e| write_error(&meta_path, e))?;
        log::info!("Meta information written to {}", meta_path.display());
        stats.meta_file = Some(meta_path);
    }
    Ok(stats)
}

fn write_document<W: Write>(
    writer: &mut W,
    options: &GenerateOptions,
    tools: &dyn ToolRunner,
    stats: &mut Stats,
) -> Result<()> {
    let output = options.output.as_path();

    let mut header = format!("# Project: {}\n\n", options.project_name);
    log::debug!("Rendering project structure...");
    let structure = render_structure(
        &options.roots,
        &options.working_dir,
        tools,
        options.use_tree_command,
    );
    let fence = fence_for(structure.as_bytes());
    let _ = write!(header, "## Project Structure\n{fence}\n{structure}{fence}\n");

    if let Some(depth) = options.history_depth {
        log::debug!("Collecting up to {} commits of history...", depth);
        let commits = collect_history(tools, &options.working_dir, depth);
        let section = format_history(&commits);
        if !section.is_empty() {
            header.push('\n');
            header.push_str(&section);
        }
    }
    writer
        .write_all(header.as_bytes())
        .map_err(|e| write_error(output, e))?;

    let filter = SkipFilter::new(
        &options.skip_patterns,
        &options.extensions,
        &options.working_dir,
        Some(output),
    );
    PathWalker::new(&filter).walk(&options.roots, stats, |file| {
        write_file_section(writer, file).map_err(|e| write_error(output, e))
    })
}

fn write_file_section<W: Write>(writer: &mut W, file: &KeptFile<'_>) -> std::io::Result<()> {
    let fence = fence_for(file.content);
    write!(
        writer,
        "\n## File: {}\n{}{}\n",
        file.display_path, fence, file.extension
    )?;
    writer.write_all(file.content)?;
    if !file.content.ends_with(b"\n") {
        writer.write_all(b"\n")?;
    }
    writeln!(writer, "{}", fence)
}

/// Backtick fence strictly longer than any backtick run in `content`.
pub fn fence_for(content: &[u8]) -> String {
    let mut longest = 0;
    let mut run = 0;
    for &byte in content {
        if byte == b'`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(MIN_FENCE_LEN.max(longest + 1))
}

/// `<dir>/<stem>.meta.md` next to the main output.
pub fn meta_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}.meta.md", stem))
}

/// Renders the summary document from the finished pass.
pub fn render_meta(options: &GenerateOptions, stats: &Stats) -> String {
    let mut out = String::new();
    let _ = write!(out, "# {} - Meta Information\n\n", options.project_name);
    let _ = write!(out, "## Command\n```bash\n{}\n```\n\n", stats.invocation);

    let tree = PathTrie::from_paths(&stats.processed_paths).render();
    let fence = fence_for(tree.as_bytes());
    let _ = write!(out, "## Processed Files\n{fence}\n{tree}{fence}\n\n");

    let _ = write!(
        out,
        "## Statistics\n- Files processed: {}\n- Files skipped: {}\n- Estimated tokens: {}\n- Generation time: {}\n",
        stats.files_processed,
        stats.files_skipped,
        stats.total_tokens,
        format_duration(stats.duration)
    );
    if !stats.failed.is_empty() {
        let _ = writeln!(out, "- Files unreadable: {}", stats.failed.len());
    }
    out.push('\n');

    out.push_str("## File Extensions\n| Extension | Count |\n|-----------|-------|\n");
    for (ext, count) in stats.sorted_extensions() {
        let _ = writeln!(out, "| {:<9} | {:<5} |", ext, count);
    }

    if !options.skip_patterns.is_empty() {
        out.push_str("\n## Skip Patterns Used\n");
        for pattern in &options.skip_patterns {
            let _ = writeln!(out, "- `{}`", pattern);
        }
    }

    if !stats.failed.is_empty() {
        out.push_str("\n## Unreadable Files\n");
        for (path, message) in &stats.failed {
            let _ = writeln!(out, "- {}: {}", path.display(), message);
        }
    }
    out
}

fn create_output_file(path: &Path) -> Result<File> {
    create_parent_dir(path)?;
    File::create(path).map_err(|e| write_error(path, e))
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::FileWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn write_error(path: &Path, source: std::io::Error) -> AppError {
    AppError::FileWrite {
        path: path.to_path_buf(),
        source,
    }
}
