use crate::tools::ToolRunner;
use chrono::{DateTime, FixedOffset};
use log;
use std::fmt::Write as _;
use std::path::Path;

const GIT: &str = "git";
const FIELD_SEPARATOR: char = '\u{1f}';
const LOG_FORMAT: &str = "--pretty=format:%H%x1f%an%x1f%ad%x1f%s";

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub date: DateTime<FixedOffset>,
    pub subject: String,
    pub files: Vec<String>,
}

impl CommitRecord {
    pub fn short_hash(&self) -> &str {
        match self.hash.char_indices().nth(7) {
            Some((idx, _)) => &self.hash[..idx],
            None => &self.hash,
        }
    }
}

/// Collects up to `limit` most recent commits of the repository at `dir`.
///
/// Never fails: a missing `git`, a directory outside any repository or a
/// failed log lookup yield an empty list, and a commit whose changed-file
/// lookup fails is dropped on its own.
pub fn collect_history(tools: &dyn ToolRunner, dir: &Path, limit: usize) -> Vec<CommitRecord> {
    if limit == 0 {
        return Vec::new();
    }
    if !tools.is_available(GIT) {
        log::debug!("git not found on PATH, skipping version history.");
        return Vec::new();
    }
    if let Err(e) = tools.run(GIT, &["rev-parse", "--git-dir"], dir) {
        log::debug!("{} is not a git repository: {}", dir.display(), e);
        return Vec::new();
    }

    let limit_arg = limit.to_string();
    let log_output = match tools.run(
        GIT,
        &["log", LOG_FORMAT, "--date=iso-strict", "-n", limit_arg.as_str()],
        dir,
    ) {
        Ok(out) => out,
        Err(e) => {
            log::debug!("Failed to read git log: {}", e);
            return Vec::new();
        }
    };

    let mut commits = Vec::new();
    for line in log_output.lines().filter(|l| !l.trim().is_empty()) {
        let Some((hash, author, date, subject)) = parse_log_line(line) else {
            log::debug!("Dropping unparseable git log line: {}", line);
            continue;
        };

        let files = match tools.run(
            GIT,
            &["diff-tree", "--root", "--no-commit-id", "--name-only", "-r", hash.as_str()],
            dir,
        ) {
            Ok(out) => out
                .lines()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect(),
            Err(e) => {
                log::debug!("Dropping commit {}: {}", hash, e);
                continue;
            }
        };

        commits.push(CommitRecord {
            hash,
            author,
            date,
            subject,
            files,
        });
    }
    log::info!("Collected {} commits of version history.", commits.len());
    commits
}

fn parse_log_line(line: &str) -> Option<(String, String, DateTime<FixedOffset>, String)> {
    let mut parts = line.splitn(4, FIELD_SEPARATOR);
    let hash = parts.next()?.trim();
    let author = parts.next()?;
    let date = DateTime::parse_from_rfc3339(parts.next()?.trim()).ok()?;
    let subject = parts.next()?;
    if hash.is_empty() {
        return None;
    }
    Some((
        hash.to_string(),
        author.to_string(),
        date,
        subject.to_string(),
    ))
}

/// Renders the `## Version History` section, or nothing for no commits.
pub fn format_history(commits: &[CommitRecord]) -> String {
    if commits.is_empty() {
        return String::new();
    }

    let mut buf = String::from("## Version History\n\n");
    for commit in commits {
        let _ = writeln!(
            buf,
            "### {} ({})",
            commit.short_hash(),
            commit.date.format("%Y-%m-%d")
        );
        let _ = writeln!(buf, "**Author:** {}", commit.author);
        let _ = writeln!(buf, "**Message:** {}", commit.subject);
        if !commit.files.is_empty() {
            buf.push_str("**Files changed:**\n");
            for file in &commit.files {
                let _ = writeln!(buf, "- {}", file);
            }
        }
        buf.push('\n');
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake::FakeTools;

    const LOG_CMD: &str = "git log --pretty=format:%H%x1f%an%x1f%ad%x1f%s --date=iso-strict -n 5";

    fn log_line(hash: &str, author: &str, date: &str, subject: &str) -> String {
        format!("{hash}\u{1f}{author}\u{1f}{date}\u{1f}{subject}")
    }

    fn repo_tools() -> FakeTools {
        FakeTools::default()
            .with_program("git")
            .respond("git rev-parse --git-dir", ".git\n")
    }

    #[test]
    fn missing_git_yields_empty() {
        let tools = FakeTools::default();
        assert!(collect_history(&tools, Path::new("."), 5).is_empty());
    }

    #[test]
    fn non_repository_yields_empty() {
        let tools = FakeTools::default()
            .with_program("git")
            .fail("git rev-parse --git-dir");
        assert!(collect_history(&tools, Path::new("."), 5).is_empty());
    }

    #[test]
    fn zero_limit_does_not_touch_git() {
        let tools = repo_tools();
        assert!(collect_history(&tools, Path::new("."), 0).is_empty());
    }

    #[test]
    fn collects_commits_with_changed_files() {
        let hash_a = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";
        let hash_b = "ffeeddccbbaa99887766554433221100ffeeddcc";
        let log = [
            log_line(hash_a, "Ada", "2024-03-05T10:20:30+01:00", "Add parser | lexer"),
            log_line(hash_b, "Bob", "2024-03-01T08:00:00Z", "Initial commit"),
        ]
        .join("\n");
        let tools = repo_tools()
            .respond(LOG_CMD, &log)
            .respond(
                &format!("git diff-tree --root --no-commit-id --name-only -r {hash_a}"),
                "src/parser.rs\nsrc/lexer.rs\n",
            )
            .respond(
                &format!("git diff-tree --root --no-commit-id --name-only -r {hash_b}"),
                "",
            );

        let commits = collect_history(&tools, Path::new("."), 5);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].short_hash(), "a1b2c3d");
        assert_eq!(commits[0].subject, "Add parser | lexer");
        assert_eq!(commits[0].files, vec!["src/parser.rs", "src/lexer.rs"]);
        assert_eq!(commits[1].author, "Bob");
        assert!(commits[1].files.is_empty());
    }

    #[test]
    fn failing_commit_lookup_drops_only_that_commit() {
        let good = "1111111aaaaaaa";
        let bad = "2222222bbbbbbb";
        let log = [
            log_line(bad, "X", "2024-01-02T00:00:00Z", "broken"),
            log_line(good, "Y", "2024-01-01T00:00:00Z", "fine"),
            "garbage line".to_string(),
        ]
        .join("\n");
        let tools = repo_tools()
            .respond(LOG_CMD, &log)
            .fail(&format!("git diff-tree --root --no-commit-id --name-only -r {bad}"))
            .respond(
                &format!("git diff-tree --root --no-commit-id --name-only -r {good}"),
                "README.md\n",
            );

        let commits = collect_history(&tools, Path::new("."), 5);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, good);
    }

    #[test]
    fn format_is_empty_without_commits() {
        assert_eq!(format_history(&[]), "");
    }

    #[test]
    fn format_renders_one_subsection_per_commit() {
        let commit = CommitRecord {
            hash: "0123456789abcdef".into(),
            author: "Ada".into(),
            date: DateTime::parse_from_rfc3339("2024-03-05T10:20:30+01:00").unwrap(),
            subject: "Add parser".into(),
            files: vec!["src/parser.rs".into()],
        };
        let quiet = CommitRecord {
            files: Vec::new(),
            ..commit.clone()
        };

        let text = format_history(&[commit, quiet]);
        let expected = "## Version History\n\n\
            ### 0123456 (2024-03-05)\n**Author:** Ada\n**Message:** Add parser\n\
            **Files changed:**\n- src/parser.rs\n\n\
            ### 0123456 (2024-03-05)\n**Author:** Ada\n**Message:** Add parser\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn short_hash_handles_short_input() {
        let commit = CommitRecord {
            hash: "abc".into(),
            author: String::new(),
            date: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            subject: String::new(),
            files: Vec::new(),
        };
        assert_eq!(commit.short_hash(), "abc");
    }
}
