use crate::error::{AppError, Result};
use crate::filter::{SkipFilter, file_extension};
use crate::stats::Stats;
use crate::tokens::estimate_tokens;
use crate::tree::is_hidden;
use log;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file that survived filtering, handed to the caller before the walk
/// moves on.
#[derive(Debug)]
pub struct KeptFile<'a> {
    pub path: &'a Path,
    pub display_path: &'a str,
    pub extension: &'a str,
    pub content: &'a [u8],
}

/// Sequential walker over the configured roots.
///
/// Files are visited in file-name order within each directory and each
/// canonical path is considered at most once per walker, so overlapping
/// or nested roots never produce duplicates.
pub struct PathWalker<'f> {
    filter: &'f SkipFilter,
    seen: HashSet<PathBuf>,
}

impl<'f> PathWalker<'f> {
    pub fn new(filter: &'f SkipFilter) -> Self {
        Self {
            filter,
            seen: HashSet::new(),
        }
    }

    /// Walks `roots`, calling `on_file` for every kept file and recording
    /// the outcome in `stats`. Only an error returned by `on_file` aborts
    /// the walk; unreadable entries are logged and recorded as failures.
    pub fn walk<F>(&mut self, roots: &[PathBuf], stats: &mut Stats, mut on_file: F) -> Result<()>
    where
        F: FnMut(&KeptFile<'_>) -> Result<()>,
    {
        let working_dir = self.filter.working_dir().to_path_buf();
        for root in roots {
            let root_path = working_dir.join(root);
            log::debug!("Walking root: {}", root_path.display());

            let walker = WalkDir::new(&root_path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e
                            .path()
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|| root_path.clone());
                        let err = AppError::from(e);
                        log::warn!("Skipping unreadable entry: {}", err);
                        stats.record_failed(path, err.to_string());
                        continue;
                    }
                };
                if entry.file_type().is_dir() {
                    continue;
                }

                let located = match located_path(entry.path()) {
                    Ok(p) => p,
                    Err(e) => {
                        log::warn!("Cannot resolve {}: {}", entry.path().display(), e);
                        stats.record_failed(entry.path().to_path_buf(), e.to_string());
                        continue;
                    }
                };
                // Dangling links have no target; they are keyed by their own location.
                let target = fs::canonicalize(entry.path()).ok();
                if entry.path_is_symlink() && target.as_deref().is_some_and(Path::is_dir) {
                    log::trace!("Not following directory link {}", entry.path().display());
                    continue;
                }
                let key = target.clone().unwrap_or_else(|| located.clone());
                if !self.seen.insert(key) {
                    log::trace!("Already visited {}", located.display());
                    continue;
                }
                if target.as_deref().is_some_and(|t| self.filter.is_output(t)) {
                    log::trace!("Not reading the output through {}", located.display());
                    continue;
                }

                self.visit(&located, &working_dir, stats, &mut on_file)?;
            }
        }
        Ok(())
    }

    fn visit<F>(
        &self,
        located: &Path,
        working_dir: &Path,
        stats: &mut Stats,
        on_file: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&KeptFile<'_>) -> Result<()>,
    {
        if let Some(reason) = self.filter.skip_reason(located) {
            log::trace!("Skipping {}: {}", located.display(), reason);
            if reason.is_counted() {
                stats.record_skipped();
            }
            return Ok(());
        }

        let content = match fs::read(located) {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = AppError::FileRead {
                    path: located.to_path_buf(),
                    source: e,
                };
                log::warn!("Skipping unreadable file: {}", err);
                stats.record_failed(located.to_path_buf(), err.to_string());
                return Ok(());
            }
        };

        let display_path = display_path(located, working_dir);
        let extension = file_extension(located);
        on_file(&KeptFile {
            path: located,
            display_path: &display_path,
            extension: &extension,
            content: &content,
        })?;

        let tokens = estimate_tokens(&content);
        log::trace!("Processed {} ({} tokens)", display_path, tokens);
        stats.record_processed(display_path, &extension, tokens, content.len() as u64);
        Ok(())
    }
}

/// The entry's own name under its canonical parent directory. Patterns and
/// display paths see a link by its name, not by its target.
fn located_path(path: &Path) -> std::io::Result<PathBuf> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok(fs::canonicalize(parent)?.join(name)),
        _ => fs::canonicalize(path),
    }
}

/// Path shown in documents: relative to the working directory when possible.
pub fn display_path(path: &Path, working_dir: &Path) -> String {
    pathdiff::diff_paths(path, working_dir)
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("a.go"), "package a").unwrap();
        fs::write(root.join("x.txt"), "hello").unwrap();
        fs::write(root.join("sub/b.go"), "package b").unwrap();
        fs::write(root.join("sub/deeper/c.md"), "# c").unwrap();
        fs::write(root.join(".cache/d.go"), "package d").unwrap();
        Fixture { _dir: dir, root }
    }

    fn run(
        root: &Path,
        roots: &[&str],
        patterns: &[&str],
        allow: &[&str],
        output: Option<&Path>,
    ) -> (Stats, Vec<String>) {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        let allow: Vec<String> = allow.iter().map(|s| s.to_string()).collect();
        let roots: Vec<PathBuf> = roots.iter().map(PathBuf::from).collect();
        let filter = SkipFilter::new(&patterns, &allow, root, output);
        let mut stats = Stats::default();
        let mut seen = Vec::new();
        PathWalker::new(&filter)
            .walk(&roots, &mut stats, |file| {
                seen.push(file.display_path.to_string());
                Ok(())
            })
            .unwrap();
        (stats, seen)
    }

    #[test]
    fn walks_in_stable_name_order_and_prunes_hidden() {
        let f = fixture();
        let (stats, seen) = run(&f.root, &["."], &[], &[], None);
        assert_eq!(seen, vec!["a.go", "sub/b.go", "sub/deeper/c.md", "x.txt"]);
        assert_eq!(stats.processed_paths, seen);
        assert_eq!(stats.files_processed, 4);
        assert_eq!(stats.files_skipped, 0);
    }

    #[test]
    fn nested_roots_emit_each_file_once() {
        let f = fixture();
        let (stats, seen) = run(&f.root, &[".", "./sub", "sub/deeper"], &[], &[], None);
        assert_eq!(seen.len(), 4);
        let unique: HashSet<&String> = seen.iter().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(stats.files_processed, 4);
    }

    #[test]
    fn allowlist_counts_skips() {
        let f = fixture();
        let (stats, seen) = run(&f.root, &["."], &[], &["go", "md"], None);
        assert!(!seen.contains(&"x.txt".to_string()));
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.extension_counts.get("go"), Some(&2));
        assert_eq!(stats.extension_counts.get("md"), Some(&1));
    }

    #[test]
    fn duplicate_skips_are_counted_once() {
        let f = fixture();
        let (stats, _) = run(&f.root, &[".", "sub"], &["*.go"], &[], None);
        assert_eq!(stats.files_skipped, 2);
        assert_eq!(stats.files_processed, 2);
    }

    #[test]
    fn directory_pattern_prunes_subtree() {
        let f = fixture();
        let (_, seen) = run(&f.root, &["."], &["sub"], &[], None);
        assert_eq!(seen, vec!["a.go", "x.txt"]);
    }

    #[test]
    fn output_file_is_never_included() {
        let f = fixture();
        let out = f.root.join("sub/llm.md");
        fs::write(&out, "previous run").unwrap();
        let (stats, seen) = run(&f.root, &["."], &[], &[], Some(&out));
        assert!(!seen.iter().any(|p| p.ends_with("llm.md")));
        assert_eq!(stats.files_skipped, 0);
    }

    #[test]
    fn file_root_is_walked_directly() {
        let f = fixture();
        let (_, seen) = run(&f.root, &["sub/b.go"], &[], &[], None);
        assert_eq!(seen, vec!["sub/b.go"]);
    }

    #[test]
    fn callback_error_aborts_walk() {
        let f = fixture();
        let filter = SkipFilter::new(&[], &[], &f.root, None);
        let mut stats = Stats::default();
        let result = PathWalker::new(&filter).walk(&[PathBuf::from(".")], &mut stats, |_| {
            Err(AppError::InvalidArgument("stop".into()))
        });
        assert!(result.is_err());
        assert_eq!(stats.files_processed, 0);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_links_are_recorded_as_failures() {
        let f = fixture();
        std::os::unix::fs::symlink(f.root.join("missing.go"), f.root.join("broken.go")).unwrap();
        let (stats, seen) = run(&f.root, &["."], &[], &[], None);
        assert_eq!(stats.files_processed, 4);
        assert_eq!(stats.files_skipped, 0);
        assert!(!seen.contains(&"broken.go".to_string()));
        assert_eq!(stats.failed.len(), 1);
        assert_eq!(stats.failed[0].0, f.root.join("broken.go"));
    }

    #[cfg(unix)]
    #[test]
    fn skipped_dangling_link_is_not_a_failure() {
        let f = fixture();
        std::os::unix::fs::symlink(f.root.join("missing.tmp"), f.root.join("broken.tmp")).unwrap();
        let (stats, _) = run(&f.root, &["."], &["*.tmp"], &[], None);
        assert!(stats.failed.is_empty());
        assert_eq!(stats.files_skipped, 1);
    }

    #[cfg(unix)]
    #[test]
    fn links_are_matched_by_their_own_name() {
        let f = fixture();
        fs::create_dir_all(f.root.join("data")).unwrap();
        fs::write(f.root.join("data/payload.txt"), "payload").unwrap();
        fs::create_dir_all(f.root.join("links")).unwrap();
        std::os::unix::fs::symlink(f.root.join("data/payload.txt"), f.root.join("links/out.tmp"))
            .unwrap();

        let (stats, seen) = run(&f.root, &["links"], &["*.tmp"], &[], None);
        assert!(seen.is_empty());
        assert_eq!(stats.files_skipped, 1);

        let (_, seen) = run(&f.root, &["links"], &[], &[], None);
        assert_eq!(seen, vec!["links/out.tmp"]);
    }

    #[cfg(unix)]
    #[test]
    fn link_and_target_are_emitted_once() {
        let f = fixture();
        std::os::unix::fs::symlink(f.root.join("a.go"), f.root.join("z.go")).unwrap();
        let (stats, seen) = run(&f.root, &["."], &[], &[], None);
        assert!(seen.contains(&"a.go".to_string()));
        assert!(!seen.contains(&"z.go".to_string()));
        assert_eq!(stats.files_processed, 4);
    }

    #[cfg(unix)]
    #[test]
    fn link_to_output_is_not_read() {
        let f = fixture();
        let out = f.root.join("llm.md");
        fs::write(&out, "previous run").unwrap();
        std::os::unix::fs::symlink(&out, f.root.join("copy.md")).unwrap();
        let (stats, seen) = run(&f.root, &["."], &[], &[], Some(&out));
        assert!(!seen.contains(&"copy.md".to_string()));
        assert_eq!(stats.files_skipped, 0);
    }

    #[test]
    fn display_path_is_relative_when_inside() {
        assert_eq!(
            display_path(Path::new("/work/src/a.rs"), Path::new("/work")),
            "src/a.rs"
        );
        assert_eq!(display_path(Path::new("/work"), Path::new("/work")), "/work");
    }
}
