use crate::error::{AppError, Result};
use globset::{GlobBuilder, GlobMatcher};
use log;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Why a candidate path was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    OutputFile,
    Pattern(String),
    Extension(String),
}

impl SkipReason {
    /// Hidden entries and the output file are structural exclusions; only
    /// pattern and allowlist rejections show up in the skipped count.
    pub fn is_counted(&self) -> bool {
        matches!(self, SkipReason::Pattern(_) | SkipReason::Extension(_))
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Hidden => write!(f, "hidden entry"),
            SkipReason::OutputFile => write!(f, "output file"),
            SkipReason::Pattern(p) => write!(f, "matched skip pattern '{}'", p),
            SkipReason::Extension(e) => write!(f, "extension '{}' not allowed", e),
        }
    }
}

#[derive(Debug)]
struct SkipPattern {
    source: String,
    matcher: Option<GlobMatcher>,
    dir_prefix: PathBuf,
}

impl SkipPattern {
    fn matches(&self, basename: &str, relative: Option<&Path>, absolute: &Path) -> bool {
        if let Some(matcher) = &self.matcher {
            if matcher.is_match(basename)
                || relative.is_some_and(|rel| matcher.is_match(rel))
                || matcher.is_match(absolute)
            {
                return true;
            }
        }
        absolute.starts_with(&self.dir_prefix) && absolute != self.dir_prefix
    }
}

/// Skip/keep predicate over absolute candidate paths.
///
/// Every pattern is checked against the basename, the path relative to the
/// working directory and the absolute path, and additionally treated as a
/// directory prefix. The decision depends only on the path and the values
/// given to [`SkipFilter::new`].
#[derive(Debug)]
pub struct SkipFilter {
    patterns: Vec<SkipPattern>,
    allowlist: Vec<String>,
    working_dir: PathBuf,
    output: Option<PathBuf>,
}

impl SkipFilter {
    pub fn new(
        patterns: &[String],
        allowlist: &[String],
        working_dir: &Path,
        output: Option<&Path>,
    ) -> Self {
        let compiled = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| {
                let matcher = match compile_pattern(p) {
                    Ok(m) => Some(m),
                    Err(e) => {
                        log::warn!("Ignoring malformed skip pattern \"{}\": {}", p, e);
                        None
                    }
                };
                SkipPattern {
                    source: p.to_string(),
                    matcher,
                    dir_prefix: working_dir.join(p).components().collect(),
                }
            })
            .collect();

        let output = output.map(|o| fs::canonicalize(o).unwrap_or_else(|_| o.to_path_buf()));

        Self {
            patterns: compiled,
            allowlist: normalize_extensions(allowlist),
            working_dir: working_dir.to_path_buf(),
            output,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    #[cfg(test)]
    fn should_skip(&self, path: &Path) -> bool {
        self.skip_reason(path).is_some()
    }

    /// True when `path` is the output document itself.
    pub(crate) fn is_output(&self, path: &Path) -> bool {
        self.output.as_deref() == Some(path)
    }

    /// Returns the first rule rejecting `path`, or `None` to keep it.
    pub fn skip_reason(&self, path: &Path) -> Option<SkipReason> {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if basename.starts_with('.') {
            return Some(SkipReason::Hidden);
        }
        if self.is_output(path) {
            return Some(SkipReason::OutputFile);
        }

        let relative = pathdiff::diff_paths(path, &self.working_dir);
        for pattern in &self.patterns {
            if pattern.matches(&basename, relative.as_deref(), path) {
                log::trace!(
                    "Pattern '{}' matched {}",
                    pattern.source,
                    path.display()
                );
                return Some(SkipReason::Pattern(pattern.source.clone()));
            }
        }

        if !self.allowlist.is_empty() {
            let ext = file_extension(path);
            if !self.allowlist.contains(&ext) {
                return Some(SkipReason::Extension(ext));
            }
        }
        None
    }
}

/// Lower-cased extension without the leading dot, empty when there is none.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Normalises allowlist entries: trimmed, lower-cased, no leading dot,
/// duplicates and blanks removed, order preserved.
pub fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(extensions.len());
    for ext in extensions {
        let ext = ext.trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && !normalized.contains(&ext) {
            normalized.push(ext);
        }
    }
    normalized
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(AppError::from)?;
    Ok(glob.compile_matcher())
}
