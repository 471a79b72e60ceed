//! Issue cleanup between the model and the report: deduplication,
//! ordering, and content enrichment.

use vigil_core::Issue;

/// Deduplicate issues by (line, first 100 chars of message).
///
/// The first occurrence wins. This is a heuristic key, not semantic
/// equality: messages that only diverge after the 100th character
/// collapse into one, and near-duplicates that differ earlier survive.
///
/// # Examples
///
/// ```
/// use vigil_core::{Issue, IssueType, Suggestion};
/// use vigil_review::postprocess::dedup_issues;
///
/// let mk = |msg: &str| Issue {
///     issue_type: IssueType::BestPractice,
///     line: 4,
///     message: msg.into(),
///     code: None,
///     suggestion: Suggestion::default(),
///     impact: None,
///     effort: None,
///     commit: None,
///     pr: None,
///     original_code: None,
/// };
/// let kept = dedup_issues(vec![mk("Unused variable x"), mk("Unused variable x")]);
/// assert_eq!(kept.len(), 1);
/// ```
pub fn dedup_issues(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen: std::collections::HashSet<(u32, String)> = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(issues.len());

    for issue in issues {
        let prefix: String = issue.message.chars().take(100).collect();
        if seen.insert((issue.line, prefix)) {
            unique.push(issue);
        }
    }
    unique
}

/// Sort ascending by line number. The sort is stable, so issues on the
/// same line keep their arrival order.
pub fn sort_by_line(issues: &mut [Issue]) {
    issues.sort_by_key(|i| i.line);
}

/// Ensure every issue carries the full reviewed file text so the
/// presentation layer never needs the file handle again.
pub fn attach_original_code(issues: &mut [Issue], source: &str) {
    for issue in issues {
        if issue.original_code.is_none() {
            issue.original_code = Some(source.to_string());
        }
    }
}

/// Full post-processing pass: dedup, sort, enrich.
pub fn finalize(issues: Vec<Issue>, source: &str) -> Vec<Issue> {
    let mut issues = dedup_issues(issues);
    sort_by_line(&mut issues);
    attach_original_code(&mut issues, source);
    issues
}
