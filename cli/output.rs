use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use shout_core::{GenerateOptions, Stats, format_duration};
use std::io::{self, Write};

pub struct TokenRow {
    pub path: String,
    pub bytes: u64,
    pub tokens: usize,
}

pub fn print_generation_summary(
    options: &GenerateOptions,
    stats: &Stats,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    if quiet {
        return Ok(());
    }

    println!(
        "{} Generated: {}",
        "✅".green(),
        options.output.display().to_string().blue()
    );
    println!(
        "{:<12} {} processed, {} skipped",
        "Files:".green(),
        stats.files_processed.to_string().cyan(),
        stats.files_skipped.to_string().cyan()
    );
    println!(
        "{:<12} ~{} (est.)",
        "Tokens:".green(),
        stats.total_tokens.to_string().cyan()
    );
    println!(
        "{:<12} {}",
        "Size:".green(),
        readable_size(stats.total_bytes).cyan()
    );
    println!(
        "{:<12} {}",
        "Time:".green(),
        format_duration(stats.duration).cyan()
    );
    if let Some(meta) = &stats.meta_file {
        println!(
            "{:<12} {}",
            "Meta File:".green(),
            meta.display().to_string().dimmed()
        );
    }

    if !stats.failed.is_empty() {
        println!(
            "{} {} file(s) could not be read:",
            "Warning:".yellow(),
            stats.failed.len()
        );
        for (path, message) in &stats.failed {
            println!("  {} {}", path.display().to_string().yellow(), message.dimmed());
        }
    }

    if verbose > 0 && !stats.extension_counts.is_empty() {
        println!("\n{}", " File Extensions ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Extension").fg(Color::Green),
            Cell::new("Count").fg(Color::Green),
        ]);
        for (ext, count) in stats.sorted_extensions() {
            table.add_row(vec![
                Cell::new(ext).fg(Color::Cyan),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }
    Ok(())
}

pub fn print_token_table(rows: &[TokenRow]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Path").fg(Color::Green),
        Cell::new("Size").fg(Color::Green),
        Cell::new("Tokens").fg(Color::Green),
    ]);

    let mut total_bytes: u64 = 0;
    let mut total_tokens = 0;
    for row in rows {
        total_bytes = total_bytes.saturating_add(row.bytes);
        total_tokens += row.tokens;
        table.add_row(vec![
            Cell::new(&row.path).fg(Color::Cyan),
            Cell::new(readable_size(row.bytes))
                .set_alignment(CellAlignment::Right)
                .fg(Color::DarkGrey),
            Cell::new(row.tokens).set_alignment(CellAlignment::Right),
        ]);
    }
    if rows.len() > 1 {
        table.add_row(vec![
            Cell::new("Total").fg(Color::Green),
            Cell::new(readable_size(total_bytes)).set_alignment(CellAlignment::Right),
            Cell::new(total_tokens)
                .set_alignment(CellAlignment::Right)
                .fg(Color::Green),
        ]);
    }
    println!("{table}");
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn readable_size(bytes: u64) -> String {
    let byte = Byte::from_u128(bytes as u128).unwrap_or_default();
    byte.get_appropriate_unit(UnitType::Binary).to_string()
}
