//! Per-file commit metadata extraction via git2.
//!
//! Finds the most recent commit touching a file and mines its message for
//! pull-request references.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use git2::{DiffOptions, Repository, Sort};
use regex::Regex;
use vigil_core::{CommitInfo, VigilError};

/// PR reference patterns, in priority order; the first match wins.
fn pr_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"Merge pull request #(\d+)",
            r"(?:^|\s)\(#(\d+)\)",
            r"(?:^|\s)#(\d+)",
            r"PR[:\s-]#?(\d+)",
            r"pull[/-](\d+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid PR pattern"))
        .collect()
    })
}

/// Extract a pull-request number from a commit message.
///
/// # Examples
///
/// ```
/// use vigil_repo::commit::extract_pr_number;
///
/// assert_eq!(extract_pr_number("Fix bug (#42)").as_deref(), Some("42"));
/// assert_eq!(
///     extract_pr_number("Merge pull request #7 from org/feature").as_deref(),
///     Some("7")
/// );
/// assert_eq!(extract_pr_number("routine cleanup"), None);
/// ```
pub fn extract_pr_number(message: &str) -> Option<String> {
    for pattern in pr_patterns() {
        if let Some(captures) = pattern.captures(message) {
            if let Some(number) = captures.get(1) {
                return Some(number.as_str().to_string());
            }
        }
    }
    None
}

/// Find the most recent commit touching `rel_path` and build its metadata.
///
/// Walks history newest-first and diffs each commit against its first
/// parent, limited to the file's pathspec. Returns `None` for files with
/// no history (e.g. untracked files in a dirty checkout).
///
/// # Errors
///
/// Returns [`VigilError::Git`] if the walk itself fails.
pub fn last_commit_for(
    repo: &Repository,
    rel_path: &Path,
    repo_url: &str,
) -> Result<Option<CommitInfo>, VigilError> {
    let mut revwalk = repo
        .revwalk()
        .map_err(|e| VigilError::Git(format!("failed to create revwalk: {}", e.message())))?;
    revwalk.set_sorting(Sort::TIME).ok();
    revwalk
        .push_head()
        .map_err(|e| VigilError::Git(format!("failed to push HEAD: {}", e.message())))?;

    for oid_result in revwalk {
        let oid = oid_result.map_err(|e| VigilError::Git(format!("revwalk error: {}", e.message())))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| VigilError::Git(format!("failed to find commit: {}", e.message())))?;

        if commit_touches(repo, &commit, rel_path)? {
            let committer = commit.committer();
            let message = commit.message().unwrap_or("").trim().to_string();
            let timestamp = Utc
                .timestamp_opt(commit.time().seconds(), 0)
                .single()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            return Ok(Some(CommitInfo {
                committer: committer.name().unwrap_or("unknown").to_string(),
                hash: oid.to_string(),
                pr_number: extract_pr_number(&message),
                message,
                timestamp,
                repo_url: repo_url.to_string(),
            }));
        }
    }

    Ok(None)
}

fn commit_touches(
    repo: &Repository,
    commit: &git2::Commit,
    rel_path: &Path,
) -> Result<bool, VigilError> {
    let tree = commit
        .tree()
        .map_err(|e| VigilError::Git(format!("failed to get commit tree: {}", e.message())))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| VigilError::Git(format!("failed to get parent: {}", e.message())))?;
        Some(
            parent
                .tree()
                .map_err(|e| VigilError::Git(format!("failed to get parent tree: {}", e.message())))?,
        )
    } else {
        None
    };

    let mut opts = DiffOptions::new();
    opts.pathspec(rel_path);
    opts.disable_pathspec_match(true);
    let diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))
        .map_err(|e| VigilError::Git(format!("failed to compute diff: {}", e.message())))?;

    Ok(diff.deltas().len() > 0)
}
