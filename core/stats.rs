use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Label shown in place of an empty extension.
pub const NO_EXTENSION_LABEL: &str = "(none)";

/// Counters accumulated during a single generation pass.
///
/// Only the walker writes to this while the pass runs; callers receive it
/// once the pass has finished and treat it as read-only.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub extension_counts: HashMap<String, usize>,
    pub processed_paths: Vec<String>,
    pub total_tokens: usize,
    pub total_bytes: u64,
    pub failed: Vec<(PathBuf, String)>,
    pub duration: Duration,
    pub invocation: String,
    pub meta_file: Option<PathBuf>,
}

impl Stats {
    pub fn new(invocation: impl Into<String>) -> Self {
        Self {
            invocation: invocation.into(),
            ..Self::default()
        }
    }

    pub(crate) fn record_processed(
        &mut self,
        display_path: String,
        extension: &str,
        tokens: usize,
        bytes: u64,
    ) {
        self.files_processed += 1;
        *self
            .extension_counts
            .entry(extension.to_string())
            .or_insert(0) += 1;
        self.processed_paths.push(display_path);
        self.total_tokens += tokens;
        self.total_bytes += bytes;
    }

    pub(crate) fn record_skipped(&mut self) {
        self.files_skipped += 1;
    }

    pub(crate) fn record_failed(&mut self, path: PathBuf, message: String) {
        self.failed.push((path, message));
    }

    /// Extension counts ordered by extension name, empty extension labelled.
    pub fn sorted_extensions(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = self
            .extension_counts
            .iter()
            .map(|(ext, count)| {
                let label = if ext.is_empty() {
                    NO_EXTENSION_LABEL
                } else {
                    ext.as_str()
                };
                (label, *count)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Formats a duration rounded to the unit that fits it: microseconds below
/// one millisecond, milliseconds below one second, seconds otherwise.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if duration < Duration::from_millis(1) {
        format!("{}µs", round_div(nanos, 1_000))
    } else if duration < Duration::from_secs(1) {
        format!("{}ms", round_div(nanos, 1_000_000))
    } else {
        format!("{}s", round_div(nanos, 1_000_000_000))
    }
}

fn round_div(value: u128, unit: u128) -> u128 {
    (value + unit / 2) / unit
}
