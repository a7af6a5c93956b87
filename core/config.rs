use crate::error::{AppError, Result};
use crate::filter::normalize_extensions;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".xtools/shout";
pub const DEFAULT_CONFIG_FILENAME: &str = "shout.toml";
pub const DEFAULT_OUTPUT_FILE: &str = "llm.md";
pub const DEFAULT_HISTORY_DEPTH: usize = 10;
pub const IGNORE_FILE: &str = ".gitignore";
/// Always appended to the skip patterns so dot-entries never leak through.
pub const HIDDEN_ENTRY_PATTERN: &str = ".*";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub tree: TreeConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default = "default_directories")]
    pub directories: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub skip: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_file")]
    pub file: String,
    #[serde(default)]
    pub meta: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_history_depth")]
    pub depth: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    #[serde(default)]
    pub use_tree_command: bool,
}

fn default_true() -> bool {
    true
}
fn default_directories() -> Vec<String> {
    vec![".".to_string()]
}
fn default_output_file() -> String {
    DEFAULT_OUTPUT_FILE.to_string()
}
fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            use_gitignore: default_true(),
        }
    }
}
impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            extensions: Vec::new(),
            skip: Vec::new(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
            meta: false,
        }
    }
}
impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            depth: default_history_depth(),
        }
    }
}

/// Everything a generation pass needs, resolved and validated up front.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub project_name: String,
    pub working_dir: PathBuf,
    pub roots: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub skip_patterns: Vec<String>,
    pub output: PathBuf,
    pub meta: bool,
    /// Number of commits to include, `None` when history is disabled.
    pub history_depth: Option<usize>,
    pub use_tree_command: bool,
    /// How the pass was invoked, recorded verbatim in the meta document.
    pub invocation: String,
}

impl Config {
    pub fn determine_working_dir(cli_working_dir: Option<&PathBuf>) -> Result<PathBuf> {
        let path_to_resolve = match cli_working_dir {
            Some(p) => expand_path(&p.to_string_lossy()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize working directory '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })
    }

    pub fn resolve_config_path(
        working_dir: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let Some(p_str) = cli_config_file else {
            let default_path = working_dir
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME);
            if default_path.exists() {
                log::debug!("Using default config file path: {}", default_path.display());
                return Ok(Some(default_path));
            }
            log::debug!(
                "No config file specified and default not found at: {}",
                default_path.display()
            );
            return Ok(None);
        };

        let path = expand_path(p_str);
        let looks_like_path =
            path.is_absolute() || path.components().count() > 1 || p_str.contains(['/', '\\']);

        if looks_like_path {
            let mut path = working_dir.join(path);
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        let filename = if path.extension().is_none_or(|e| e != "toml") {
            format!("{}.toml", path.to_string_lossy())
        } else {
            path.to_string_lossy().to_string()
        };
        let full_path = working_dir.join(DEFAULT_CONFIG_DIR).join(filename);
        if !full_path.exists() {
            return Err(AppError::Config(format!(
                "Specified config file '{}' not found in default directory: {}",
                p_str,
                working_dir.join(DEFAULT_CONFIG_DIR).display()
            )));
        }
        log::debug!(
            "Using specified config filename in default directory: {}",
            full_path.display()
        );
        Ok(Some(full_path))
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        toml::from_str::<Config>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn get_effective_project_name(&self, working_dir: &Path) -> String {
        self.general.project_name.clone().unwrap_or_else(|| {
            working_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "UnknownProject".to_string())
        })
    }

    /// Validates this configuration against `working_dir` and produces the
    /// options for one pass.
    ///
    /// Fails when a configured root does not exist. Skip patterns are the
    /// explicit ones, then the ignore-file entries, then the hidden-entry
    /// rule.
    pub fn into_options(self, working_dir: &Path, invocation: String) -> Result<GenerateOptions> {
        let directories = if self.scan.directories.is_empty() {
            default_directories()
        } else {
            self.scan.directories.clone()
        };

        let mut roots = Vec::with_capacity(directories.len());
        for dir in &directories {
            let expanded = expand_path(dir);
            let absolute = working_dir.join(&expanded);
            if !absolute.exists() {
                return Err(AppError::RootNotFound(expanded));
            }
            roots.push(expanded);
        }

        let mut skip_patterns: Vec<String> = self
            .scan
            .skip
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.general.use_gitignore {
            skip_patterns.extend(read_ignore_file(&working_dir.join(IGNORE_FILE)));
        }
        skip_patterns.push(HIDDEN_ENTRY_PATTERN.to_string());

        let output_path = expand_path(&self.output.file);
        if output_path.as_os_str().is_empty() {
            return Err(AppError::InvalidArgument(
                "Output file path must not be empty".to_string(),
            ));
        }
        let output = working_dir.join(output_path);

        let history_depth = if self.history.enabled && self.history.depth > 0 {
            Some(self.history.depth)
        } else {
            None
        };

        Ok(GenerateOptions {
            project_name: self.get_effective_project_name(working_dir),
            working_dir: working_dir.to_path_buf(),
            roots,
            extensions: normalize_extensions(&self.scan.extensions),
            skip_patterns,
            output,
            meta: self.output.meta,
            history_depth,
            use_tree_command: self.tree.use_tree_command,
            invocation,
        })
    }
}

/// Reads skip patterns from an ignore file, one per line.
///
/// Blank lines, comments and negations are dropped, and a leading `/`
/// anchor is removed so the entry resolves against the working directory.
/// A missing or unreadable file yields no patterns.
pub fn read_ignore_file(path: &Path) -> Vec<String> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("No ignore patterns from {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let patterns: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            if line.starts_with('!') {
                log::debug!("Ignoring negated pattern '{}' from {}", line, path.display());
                return false;
            }
            true
        })
        .map(|line| line.strip_prefix('/').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    log::debug!(
        "Imported {} skip patterns from {}",
        patterns.len(),
        path.display()
    );
    patterns
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}
