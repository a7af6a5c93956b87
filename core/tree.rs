use crate::tools::ToolRunner;
use log;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE_INDENT: &str = "│   ";
const SPACE_INDENT: &str = "    ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrieNode {
    name: String,
    children: BTreeMap<String, TrieNode>,
}

impl TrieNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Prefix tree keyed by path segment.
///
/// Siblings are kept in a name-ordered map, so rendering order never
/// depends on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTrie {
    root: TrieNode,
}

impl PathTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Inserts a path given as segments, sharing every existing prefix.
    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S]) {
        let mut current = &mut self.root;
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty() {
                continue;
            }
            current = current
                .children
                .entry(segment.to_string())
                .or_insert_with(|| TrieNode::new(segment));
        }
    }

    /// Builds a trie from an already-filtered list of relative paths.
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut trie = Self::new();
        for path in paths {
            let segments = path_segments(Path::new(path.as_ref()));
            if !segments.is_empty() {
                trie.insert(&segments);
            }
        }
        trie
    }

    /// Builds a trie from the live filesystem under `roots`, pruning hidden
    /// subtrees but applying no other filtering.
    ///
    /// A root inside `working_dir` contributes its relative segments, so
    /// nested roots merge into one tree; any other root appears under its
    /// own name.
    pub fn from_roots(roots: &[PathBuf], working_dir: &Path) -> Self {
        let mut trie = Self::new();
        for root in roots {
            let canonical = match fs::canonicalize(working_dir.join(root)) {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("Cannot resolve root {}: {}", root.display(), e);
                    continue;
                }
            };
            let base = root_segments(&canonical, working_dir);
            log::trace!("Adding root {} as {:?}", canonical.display(), base);

            let walker = WalkDir::new(&canonical)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("Error walking {}: {}", canonical.display(), e);
                        continue;
                    }
                };
                let mut segments = base.clone();
                if let Ok(rel) = entry.path().strip_prefix(&canonical) {
                    segments.extend(path_segments(rel));
                }
                if !segments.is_empty() {
                    trie.insert(&segments);
                }
            }
        }
        trie
    }

    /// Renders every node below the implicit root, one line per node.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_children(&self.root, "", &mut out);
        out
    }
}

fn render_children(node: &TrieNode, prefix: &str, out: &mut String) {
    let count = node.children.len();
    for (i, child) in node.children.values().enumerate() {
        let is_last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if is_last { LAST_BRANCH } else { BRANCH });
        out.push_str(&child.name);
        out.push('\n');

        let child_prefix = format!(
            "{}{}",
            prefix,
            if is_last { SPACE_INDENT } else { PIPE_INDENT }
        );
        render_children(child, &child_prefix, out);
    }
}

/// Renders the project structure for `roots`.
///
/// With `use_tree_command` and a single root, the external `tree` program
/// is tried first; its absence or failure falls back to the trie.
pub fn render_structure(
    roots: &[PathBuf],
    working_dir: &Path,
    tools: &dyn ToolRunner,
    use_tree_command: bool,
) -> String {
    if use_tree_command {
        if let Some(rendered) = render_with_tree_command(roots, working_dir, tools) {
            return rendered;
        }
        log::debug!("Falling back to built-in tree rendering.");
    }
    PathTrie::from_roots(roots, working_dir).render()
}

fn render_with_tree_command(
    roots: &[PathBuf],
    working_dir: &Path,
    tools: &dyn ToolRunner,
) -> Option<String> {
    let [root] = roots else {
        log::debug!("tree command only used for a single root.");
        return None;
    };
    if !tools.is_available("tree") {
        log::debug!("tree command not found.");
        return None;
    }
    let root_arg = root.to_string_lossy();
    match tools.run(
        "tree",
        &["--noreport", "--charset=utf-8", "-n", &*root_arg],
        working_dir,
    ) {
        Ok(output) => {
            // First line is the root itself.
            let mut rendered = String::new();
            for line in output.lines().skip(1) {
                rendered.push_str(line);
                rendered.push('\n');
            }
            Some(rendered)
        }
        Err(e) => {
            log::debug!("tree command failed: {}", e);
            None
        }
    }
}

pub(crate) fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect()
}

fn root_segments(canonical_root: &Path, working_dir: &Path) -> Vec<String> {
    if let Some(rel) = pathdiff::diff_paths(canonical_root, working_dir) {
        if !rel.components().any(|c| c == Component::ParentDir) {
            return path_segments(&rel);
        }
    }
    canonical_root
        .file_name()
        .map(|n| vec![n.to_string_lossy().into_owned()])
        .unwrap_or_default()
}
