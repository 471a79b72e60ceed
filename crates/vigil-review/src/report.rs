use std::fmt;

use serde::Serialize;

use vigil_core::{FileReviewResult, Issue, IssueBreakdown, IssueType};

/// Aggregate of a whole review run, ready for rendering.
///
/// # Examples
///
/// ```
/// use vigil_review::report::ReviewReport;
///
/// let report = ReviewReport::new(vec![]);
/// assert_eq!(report.totals().total(), 0);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    /// Per-file results in completion order.
    pub results: Vec<FileReviewResult>,
}

impl ReviewReport {
    /// Wrap per-file results into a report.
    pub fn new(results: Vec<FileReviewResult>) -> Self {
        Self { results }
    }

    /// Issue counts across all files.
    pub fn totals(&self) -> IssueBreakdown {
        let mut totals = IssueBreakdown::default();
        for result in &self.results {
            totals.merge(&result.breakdown);
        }
        totals
    }

    /// Render the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Repository Review\n\n");

        for result in &self.results {
            out.push_str(&format!("## `{}`\n\n", result.path.display()));

            if let Some(error) = &result.error {
                out.push_str(&format!("**Error:** {error}\n\n"));
                continue;
            }

            if let Some(commit) = &result.commit {
                out.push_str(&format!(
                    "Last modified by **{}** at {} (`{}`)\n\n",
                    commit.committer,
                    commit.timestamp.to_rfc3339(),
                    &commit.hash[..commit.hash.len().min(8)],
                ));
            }

            if result.issues.is_empty() {
                out.push_str("No issues found.\n\n");
                continue;
            }

            for issue_type in IssueType::ALL {
                let group: Vec<&Issue> = result
                    .issues
                    .iter()
                    .filter(|i| i.issue_type == issue_type)
                    .collect();
                if group.is_empty() {
                    continue;
                }
                out.push_str(&format!("### {issue_type} ({})\n\n", group.len()));
                for issue in group {
                    out.push_str(&format!("- **Line {}**: {}\n", issue.line, issue.message));
                    if let Some(pr) = &issue.pr {
                        match &pr.url {
                            Some(url) => {
                                out.push_str(&format!("  - PR [#{}]({url})\n", pr.number))
                            }
                            None => out.push_str(&format!("  - PR #{}\n", pr.number)),
                        }
                    }
                    if !issue.suggestion.text.is_empty() {
                        out.push_str(&format!("  - {}\n", issue.suggestion.text));
                    }
                }
                out.push('\n');
            }
        }

        let totals = self.totals();
        out.push_str("## Summary\n\n");
        out.push_str(&format!(
            "**Files:** {} | **Issues:** {}\n\n",
            self.results.len(),
            totals.total(),
        ));
        for issue_type in IssueType::ALL {
            let count = totals.count(issue_type);
            if count > 0 {
                out.push_str(&format!("- {issue_type}: {count}\n"));
            }
        }
        out
    }
}

impl fmt::Display for ReviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            writeln!(f, "\nReview Results for {}", result.path.display())?;
            writeln!(f, "{}", "=".repeat(80))?;

            if let Some(error) = &result.error {
                writeln!(f, "Error: {error}")?;
                continue;
            }

            if let Some(commit) = &result.commit {
                writeln!(f, "Last modified by: {}", commit.committer)?;
                writeln!(f, "Commit date: {}", commit.timestamp.to_rfc3339())?;
                writeln!(
                    f,
                    "Commit: {}",
                    &commit.hash[..commit.hash.len().min(8)]
                )?;
                match &commit.pr_number {
                    Some(number) => writeln!(f, "PR: #{number}")?,
                    None => writeln!(f, "PR: None")?,
                }
            }

            if result.issues.is_empty() {
                writeln!(f, "No issues found in the code!")?;
                continue;
            }

            for issue_type in IssueType::ALL {
                let group: Vec<&Issue> = result
                    .issues
                    .iter()
                    .filter(|i| i.issue_type == issue_type)
                    .collect();
                if group.is_empty() {
                    continue;
                }
                writeln!(f, "\n{issue_type} ({})", group.len())?;
                writeln!(f, "{}", "-".repeat(40))?;

                for issue in group {
                    writeln!(f, "\nLine {}: {}", issue.line, issue.message)?;
                    if let Some(impact) = &issue.impact {
                        writeln!(f, "Impact Level: {impact}")?;
                    }
                    if let Some(effort) = &issue.effort {
                        writeln!(f, "Effort Estimate: {effort}")?;
                    }
                    if let Some(pr) = &issue.pr {
                        writeln!(f, "PR Number: #{}", pr.number)?;
                        if let Some(url) = &pr.url {
                            writeln!(f, "PR URL: {url}")?;
                        }
                    }
                    match issue.code.as_deref() {
                        Some("Full file") => {
                            // Fallback issues reference the whole file; show
                            // the snapshot the model actually saw.
                            if let Some(original) = &issue.original_code {
                                writeln!(f, "\nOriginal Code:\n{original}")?;
                            }
                        }
                        Some(snippet) => writeln!(f, "\nOriginal Code:\n{snippet}")?,
                        None => {}
                    }
                    if !issue.suggestion.text.is_empty() {
                        writeln!(f, "\nExplanation:\n{}", issue.suggestion.text)?;
                    }
                    if let Some(fix) = &issue.suggestion.code {
                        writeln!(f, "\nSuggested Fix:\n{fix}")?;
                    }
                    writeln!(f, "{}", "-".repeat(40))?;
                }
            }
        }

        let totals = self.totals();
        writeln!(f, "\nRepository Review Summary")?;
        writeln!(f, "{}", "=".repeat(80))?;
        for result in &self.results {
            writeln!(
                f,
                "{}: {} issue(s){}",
                result.path.display(),
                result.issue_count(),
                result
                    .error
                    .as_deref()
                    .map(|e| format!(" [error: {e}]"))
                    .unwrap_or_default(),
            )?;
        }
        writeln!(f, "\nTotal issues: {}", totals.total())?;
        for issue_type in IssueType::ALL {
            let count = totals.count(issue_type);
            if count > 0 {
                writeln!(f, "- {issue_type}: {count}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use vigil_core::{CommitInfo, PrLink, Suggestion};

    fn sample_report() -> ReviewReport {
        let commit = CommitInfo {
            committer: "alice".into(),
            hash: "0123456789abcdef".into(),
            message: "Fix bug (#42)".into(),
            timestamp: Utc::now(),
            pr_number: Some("42".into()),
            repo_url: "https://github.com/org/repo".into(),
        };
        let issue = Issue {
            issue_type: IssueType::SecurityConcern,
            line: 12,
            message: "Input is not sanitized".into(),
            code: Some("eval(user_input)".into()),
            suggestion: Suggestion {
                text: "Avoid eval on user input".into(),
                code: Some("ast.literal_eval(user_input)".into()),
            },
            impact: Some("high".into()),
            effort: Some("small".into()),
            commit: Some(commit.clone()),
            pr: Some(PrLink {
                number: "42".into(),
                url: Some("https://github.com/org/repo/pull/42".into()),
            }),
            original_code: Some("code".into()),
        };
        ReviewReport::new(vec![
            FileReviewResult::reviewed(
                PathBuf::from("src/app.py"),
                Some(commit),
                vec![issue],
                "code".into(),
            ),
            FileReviewResult::failed(PathBuf::from("src/broken.py"), "read error"),
        ])
    }

    #[test]
    fn totals_span_all_files() {
        let report = sample_report();
        let totals = report.totals();
        assert_eq!(totals.security_concern, 1);
        assert_eq!(totals.total(), 1);
    }

    #[test]
    fn display_groups_by_category_and_shows_linkage() {
        let text = format!("{}", sample_report());
        assert!(text.contains("Security Concern (1)"));
        assert!(text.contains("Line 12: Input is not sanitized"));
        assert!(text.contains("PR URL: https://github.com/org/repo/pull/42"));
        assert!(text.contains("Last modified by: alice"));
        assert!(text.contains("Error: read error"));
        assert!(text.contains("Total issues: 1"));
    }

    #[test]
    fn markdown_lists_files_and_summary() {
        let md = sample_report().to_markdown();
        assert!(md.contains("# Repository Review"));
        assert!(md.contains("## `src/app.py`"));
        assert!(md.contains("**Error:** read error"));
        assert!(md.contains("[#42](https://github.com/org/repo/pull/42)"));
        assert!(md.contains("## Summary"));
    }

    #[test]
    fn empty_report_renders() {
        let report = ReviewReport::new(vec![]);
        let text = format!("{report}");
        assert!(text.contains("Total issues: 0"));
        assert!(report.to_markdown().contains("**Files:** 0"));
    }
}
