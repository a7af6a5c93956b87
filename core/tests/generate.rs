use shout_core::{AppError, Config, GenerateOptions, ToolRunner, generate};
use std::fs;
use std::path::{Path, PathBuf};

/// Runner for a machine with neither `git` nor `tree` installed.
struct NoTools;

impl ToolRunner for NoTools {
    fn is_available(&self, _program: &str) -> bool {
        false
    }

    fn run(&self, program: &str, _args: &[&str], _dir: &Path) -> shout_core::Result<String> {
        Err(AppError::Tool(format!("{} is not installed", program)))
    }
}

fn project() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir_all(root.join("src/nested")).unwrap();
    fs::create_dir_all(root.join("build")).unwrap();
    fs::create_dir_all(root.join(".secret")).unwrap();
    fs::write(root.join("src/main.go"), "package main\n\nfunc main() {}\n").unwrap();
    fs::write(root.join("src/nested/util.go"), "package nested\n").unwrap();
    fs::write(root.join("build/out.tmp"), "junk").unwrap();
    fs::write(root.join("README.md"), "# Demo\n\n```sh\nrun it\n```\n").unwrap();
    fs::write(root.join("notes.txt"), "some notes").unwrap();
    fs::write(root.join(".secret/key"), "hunter2").unwrap();
    (dir, root)
}

fn options(root: &Path, configure: impl FnOnce(&mut Config)) -> GenerateOptions {
    let mut config = Config::default();
    config.general.project_name = Some("demo".into());
    configure(&mut config);
    config
        .into_options(root, "shout generate".into())
        .unwrap()
}

fn file_sections(doc: &str) -> Vec<&str> {
    doc.lines()
        .filter_map(|l| l.strip_prefix("## File: "))
        .collect()
}

#[test]
fn document_sections_appear_in_contract_order() {
    let (_guard, root) = project();
    let opts = options(&root, |_| {});
    generate(&opts, &NoTools).unwrap();

    let doc = fs::read_to_string(&opts.output).unwrap();
    assert!(doc.starts_with("# Project: demo\n\n## Project Structure\n```\n"));
    let structure_at = doc.find("## Project Structure").unwrap();
    let first_file_at = doc.find("## File: ").unwrap();
    assert!(structure_at < first_file_at);
    assert!(!doc.contains("hunter2"));
    assert!(!doc.contains(".secret"));
    assert_eq!(
        file_sections(&doc),
        vec![
            "README.md",
            "build/out.tmp",
            "notes.txt",
            "src/main.go",
            "src/nested/util.go"
        ]
    );
}

#[test]
fn repeated_passes_are_byte_identical() {
    let (_guard, root) = project();
    let opts = options(&root, |_| {});
    generate(&opts, &NoTools).unwrap();
    let first = fs::read(&opts.output).unwrap();
    generate(&opts, &NoTools).unwrap();
    let second = fs::read(&opts.output).unwrap();
    assert_eq!(first, second);
}

#[test]
fn nested_roots_do_not_duplicate_files() {
    let (_guard, root) = project();
    let opts = options(&root, |c| {
        c.scan.directories = vec![".".into(), "./src".into(), "src/nested".into()];
    });
    let stats = generate(&opts, &NoTools).unwrap();

    let mut paths = stats.processed_paths.clone();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), stats.processed_paths.len());
    assert_eq!(stats.files_processed, 5);

    let doc = fs::read_to_string(&opts.output).unwrap();
    assert_eq!(
        doc.matches("## File: src/nested/util.go").count(),
        1
    );
}

#[test]
fn each_pattern_form_skips_the_file() {
    let (_guard, root) = project();
    let absolute = format!("{}/build/*.tmp", root.display());
    for pattern in ["*.tmp", "build/*.tmp", absolute.as_str(), "build"] {
        let opts = options(&root, |c| c.scan.skip = vec![pattern.to_string()]);
        let stats = generate(&opts, &NoTools).unwrap();
        assert!(
            !stats.processed_paths.iter().any(|p| p.ends_with("out.tmp")),
            "pattern {} did not skip",
            pattern
        );
        assert_eq!(stats.files_skipped, 1, "pattern {}", pattern);
    }
}

#[test]
fn allowlist_counts_processed_and_skipped() {
    let (_guard, root) = project();
    let opts = options(&root, |c| c.scan.extensions = vec!["go".into(), "md".into()]);
    let stats = generate(&opts, &NoTools).unwrap();
    assert_eq!(stats.files_processed, 3);
    // notes.txt and build/out.tmp
    assert_eq!(stats.files_skipped, 2);
    assert_eq!(stats.extension_counts.get("go"), Some(&2));
}

#[test]
fn gitignore_entries_are_applied() {
    let (_guard, root) = project();
    fs::write(root.join(".gitignore"), "# generated\n/build\n*.txt\n").unwrap();
    let opts = options(&root, |_| {});
    let stats = generate(&opts, &NoTools).unwrap();
    assert_eq!(
        stats.processed_paths,
        vec!["README.md", "src/main.go", "src/nested/util.go"]
    );
}

#[test]
fn history_without_git_is_omitted() {
    let (_guard, root) = project();
    let opts = options(&root, |c| c.history.enabled = true);
    assert!(opts.history_depth.is_some());
    generate(&opts, &NoTools).unwrap();
    let doc = fs::read_to_string(&opts.output).unwrap();
    assert!(!doc.contains("## Version History"));
}

#[test]
fn embedded_fences_are_outgrown() {
    let (_guard, root) = project();
    let opts = options(&root, |_| {});
    generate(&opts, &NoTools).unwrap();
    let doc = fs::read_to_string(&opts.output).unwrap();
    assert!(doc.contains("## File: README.md\n````md\n# Demo\n\n```sh\nrun it\n```\n````\n"));
}

#[test]
fn meta_document_summarises_the_pass() {
    let (_guard, root) = project();
    let opts = options(&root, |c| {
        c.output.meta = true;
        c.scan.skip = vec!["build".into()];
    });
    let stats = generate(&opts, &NoTools).unwrap();

    let meta_path = stats.meta_file.clone().unwrap();
    assert_eq!(meta_path, root.join("llm.meta.md"));
    let meta = fs::read_to_string(meta_path).unwrap();
    assert!(meta.starts_with("# demo - Meta Information\n\n## Command\n```bash\nshout generate\n```\n"));
    assert!(meta.contains("├── README.md\n├── notes.txt\n└── src\n    ├── main.go\n    └── nested\n        └── util.go\n"));
    assert!(meta.contains("- Files processed: 4\n- Files skipped: 1\n"));
    assert!(meta.contains("| go        | 2     |\n| md        | 1     |\n| txt       | 1     |\n"));
    assert!(meta.contains("## Skip Patterns Used\n- `build`\n- `.*`\n"));
}

#[test]
fn missing_root_fails_before_writing() {
    let (_guard, root) = project();
    let mut config = Config::default();
    config.scan.directories = vec!["nope".into()];
    assert!(matches!(
        config.into_options(&root, String::new()),
        Err(AppError::RootNotFound(_))
    ));
    assert!(!root.join("llm.md").exists());
}

#[cfg(unix)]
#[test]
fn unreadable_files_are_listed_in_meta() {
    let (_guard, root) = project();
    std::os::unix::fs::symlink(root.join("gone.go"), root.join("src/broken.go")).unwrap();
    let opts = options(&root, |c| c.output.meta = true);
    let stats = generate(&opts, &NoTools).unwrap();

    assert_eq!(stats.failed.len(), 1);
    assert_eq!(stats.files_processed, 5);
    let doc = fs::read_to_string(&opts.output).unwrap();
    assert!(!doc.contains("## File: src/broken.go"));

    let meta = fs::read_to_string(stats.meta_file.unwrap()).unwrap();
    assert!(meta.contains("- Files unreadable: 1\n"));
    let section = meta.split("## Unreadable Files\n").nth(1).unwrap();
    assert!(section.starts_with(&format!("- {}: ", root.join("src/broken.go").display())));
}
