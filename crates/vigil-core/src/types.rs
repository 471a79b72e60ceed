use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a review finding.
///
/// Fixed, closed set. Display labels match what the reviewer prompt asks
/// the model to use.
///
/// # Examples
///
/// ```
/// use vigil_core::IssueType;
///
/// assert_eq!(IssueType::Critical.to_string(), "Critical Issue");
/// let t: IssueType = "security concern".parse().unwrap();
/// assert_eq!(t, IssueType::SecurityConcern);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    /// Severe bugs, incorrect logic, or major security vulnerabilities.
    Critical,
    /// Code quality issues that should be addressed.
    ImprovementNeeded,
    /// Style and maintainability suggestions.
    BestPractice,
    /// Potential security risks.
    SecurityConcern,
    /// Performance optimization opportunities.
    PerformanceImpact,
}

impl IssueType {
    /// All categories, in reporting order.
    pub const ALL: [IssueType; 5] = [
        IssueType::Critical,
        IssueType::ImprovementNeeded,
        IssueType::BestPractice,
        IssueType::SecurityConcern,
        IssueType::PerformanceImpact,
    ];
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueType::Critical => write!(f, "Critical Issue"),
            IssueType::ImprovementNeeded => write!(f, "Improvement Needed"),
            IssueType::BestPractice => write!(f, "Best Practice"),
            IssueType::SecurityConcern => write!(f, "Security Concern"),
            IssueType::PerformanceImpact => write!(f, "Performance Impact"),
        }
    }
}

impl FromStr for IssueType {
    type Err = String;

    /// Parse a category tag as the model writes it. Matching is lenient:
    /// case-insensitive, with or without the trailing noun.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "critical issue" => Ok(IssueType::Critical),
            "improvement" | "improvement needed" => Ok(IssueType::ImprovementNeeded),
            "best practice" | "best-practice" => Ok(IssueType::BestPractice),
            "security" | "security concern" => Ok(IssueType::SecurityConcern),
            "performance" | "performance impact" => Ok(IssueType::PerformanceImpact),
            other => Err(format!("unknown issue type: {other}")),
        }
    }
}

/// Last-commit metadata for a reviewed file.
///
/// Produced once per file by the repository adapter before the parallel
/// phase begins; immutable after creation.
///
/// # Examples
///
/// ```
/// use vigil_core::CommitInfo;
/// use chrono::Utc;
///
/// let info = CommitInfo {
///     committer: "alice".into(),
///     hash: "a1b2c3d4".into(),
///     message: "Fix bug (#42)".into(),
///     timestamp: Utc::now(),
///     pr_number: Some("42".into()),
///     repo_url: "https://github.com/org/repo".into(),
/// };
/// assert_eq!(info.pr_number.as_deref(), Some("42"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    /// Committer name.
    pub committer: String,
    /// Full commit hash.
    pub hash: String,
    /// Commit message, trimmed.
    pub message: String,
    /// Commit time, serialized as ISO-8601.
    pub timestamp: DateTime<Utc>,
    /// Pull-request number extracted from the commit message, if any.
    pub pr_number: Option<String>,
    /// URL of the repository this commit came from.
    pub repo_url: String,
}

/// Pull-request linkage derived from commit metadata.
///
/// # Examples
///
/// ```
/// use vigil_core::PrLink;
///
/// let pr = PrLink {
///     number: "42".into(),
///     url: Some("https://github.com/org/repo/pull/42".into()),
/// };
/// assert!(pr.url.as_deref().unwrap().ends_with("/pull/42"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrLink {
    /// PR number as it appeared in the commit message.
    pub number: String,
    /// Provider-specific web URL, when the provider is recognized.
    pub url: Option<String>,
}

/// The model's suggested remedy for an issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Explanation of the fix.
    pub text: String,
    /// Replacement code, when the model provided one.
    pub code: Option<String>,
}

/// A single review finding.
///
/// Created by the review client from the model's structured output, or
/// synthesized as a fallback on parse or transport failure. After creation
/// it is only touched to attach commit/PR linkage, normalize the line
/// number, and backfill `original_code`.
///
/// # Examples
///
/// ```
/// use vigil_core::{Issue, IssueType, Suggestion};
///
/// let issue = Issue {
///     issue_type: IssueType::PerformanceImpact,
///     line: 17,
///     message: "Repeated allocation inside the loop".into(),
///     code: Some("let v = Vec::new();".into()),
///     suggestion: Suggestion { text: "Hoist the allocation".into(), code: None },
///     impact: Some("medium".into()),
///     effort: Some("small".into()),
///     commit: None,
///     pr: None,
///     original_code: None,
/// };
/// assert_eq!(issue.line, 17);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Category of the finding.
    pub issue_type: IssueType,
    /// 1-based line number in file-absolute coordinates.
    pub line: u32,
    /// Human-readable description.
    pub message: String,
    /// Offending code snippet, when the model quoted one.
    pub code: Option<String>,
    /// Suggested fix.
    pub suggestion: Suggestion,
    /// Impact level (high/medium/low, free-form if the model strayed).
    pub impact: Option<String>,
    /// Effort estimate (small/medium/large).
    pub effort: Option<String>,
    /// Commit that last touched the reviewed file.
    pub commit: Option<CommitInfo>,
    /// Derived pull-request linkage.
    pub pr: Option<PrLink>,
    /// Full reviewed file text, filled by the post-processor so the
    /// presentation layer never needs the file handle again.
    pub original_code: Option<String>,
}

/// Per-category issue counts for one reviewed file.
///
/// # Examples
///
/// ```
/// use vigil_core::{IssueBreakdown, IssueType};
///
/// let breakdown = IssueBreakdown::default();
/// assert_eq!(breakdown.count(IssueType::Critical), 0);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueBreakdown {
    pub critical: usize,
    pub improvement_needed: usize,
    pub best_practice: usize,
    pub security_concern: usize,
    pub performance_impact: usize,
}

impl IssueBreakdown {
    /// Tally a slice of issues by category.
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut breakdown = Self::default();
        for issue in issues {
            match issue.issue_type {
                IssueType::Critical => breakdown.critical += 1,
                IssueType::ImprovementNeeded => breakdown.improvement_needed += 1,
                IssueType::BestPractice => breakdown.best_practice += 1,
                IssueType::SecurityConcern => breakdown.security_concern += 1,
                IssueType::PerformanceImpact => breakdown.performance_impact += 1,
            }
        }
        breakdown
    }

    /// Count for a single category.
    pub fn count(&self, issue_type: IssueType) -> usize {
        match issue_type {
            IssueType::Critical => self.critical,
            IssueType::ImprovementNeeded => self.improvement_needed,
            IssueType::BestPractice => self.best_practice,
            IssueType::SecurityConcern => self.security_concern,
            IssueType::PerformanceImpact => self.performance_impact,
        }
    }

    /// Sum across all categories.
    pub fn total(&self) -> usize {
        self.critical
            + self.improvement_needed
            + self.best_practice
            + self.security_concern
            + self.performance_impact
    }

    /// Merge another breakdown into this one.
    pub fn merge(&mut self, other: &IssueBreakdown) {
        self.critical += other.critical;
        self.improvement_needed += other.improvement_needed;
        self.best_practice += other.best_practice;
        self.security_concern += other.security_concern;
        self.performance_impact += other.performance_impact;
    }
}

/// Outcome of reviewing one file.
///
/// Exactly one record exists per submitted file, whether the review
/// succeeded or the task failed. Error-flagged records carry `Some(error)`
/// and zero issues.
///
/// # Examples
///
/// ```
/// use vigil_core::FileReviewResult;
/// use std::path::PathBuf;
///
/// let failed = FileReviewResult::failed(PathBuf::from("src/a.py"), "read error");
/// assert!(failed.error.is_some());
/// assert_eq!(failed.issue_count(), 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReviewResult {
    /// Path relative to the repository root.
    pub path: PathBuf,
    /// Last-commit metadata, when available.
    pub commit: Option<CommitInfo>,
    /// Findings, deduplicated and sorted by line.
    pub issues: Vec<Issue>,
    /// Snapshot of the reviewed file text.
    pub source: String,
    /// Per-category counts.
    pub breakdown: IssueBreakdown,
    /// Why the review could not run, for error-flagged records.
    pub error: Option<String>,
}

impl FileReviewResult {
    /// Build a record for a completed review.
    pub fn reviewed(
        path: PathBuf,
        commit: Option<CommitInfo>,
        issues: Vec<Issue>,
        source: String,
    ) -> Self {
        let breakdown = IssueBreakdown::from_issues(&issues);
        Self {
            path,
            commit,
            issues,
            source,
            breakdown,
            error: None,
        }
    }

    /// Build an error-flagged record with zero issues.
    pub fn failed(path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            path,
            commit: None,
            issues: Vec::new(),
            source: String::new(),
            breakdown: IssueBreakdown::default(),
            error: Some(error.into()),
        }
    }

    /// Number of findings for this file.
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }
}

/// Output format for CLI results.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument
/// parsing.
///
/// # Examples
///
/// ```
/// use vigil_core::OutputFormat;
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report (default).
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted report.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(issue_type: IssueType, line: u32) -> Issue {
        Issue {
            issue_type,
            line,
            message: "m".into(),
            code: None,
            suggestion: Suggestion::default(),
            impact: None,
            effort: None,
            commit: None,
            pr: None,
            original_code: None,
        }
    }

    #[test]
    fn issue_type_display_labels() {
        assert_eq!(IssueType::Critical.to_string(), "Critical Issue");
        assert_eq!(IssueType::ImprovementNeeded.to_string(), "Improvement Needed");
        assert_eq!(IssueType::BestPractice.to_string(), "Best Practice");
        assert_eq!(IssueType::SecurityConcern.to_string(), "Security Concern");
        assert_eq!(IssueType::PerformanceImpact.to_string(), "Performance Impact");
    }

    #[test]
    fn issue_type_from_str_is_lenient() {
        assert_eq!(
            "CRITICAL ISSUE".parse::<IssueType>().unwrap(),
            IssueType::Critical
        );
        assert_eq!("critical".parse::<IssueType>().unwrap(), IssueType::Critical);
        assert_eq!(
            "  performance impact ".parse::<IssueType>().unwrap(),
            IssueType::PerformanceImpact
        );
        assert!("nitpick".parse::<IssueType>().is_err());
    }

    #[test]
    fn issue_type_roundtrips_through_json() {
        let json = serde_json::to_string(&IssueType::SecurityConcern).unwrap();
        assert_eq!(json, "\"security-concern\"");
        let parsed: IssueType = serde_json::from_str("\"best-practice\"").unwrap();
        assert_eq!(parsed, IssueType::BestPractice);
    }

    #[test]
    fn breakdown_tallies_by_category() {
        let issues = vec![
            issue(IssueType::Critical, 1),
            issue(IssueType::Critical, 2),
            issue(IssueType::BestPractice, 3),
        ];
        let breakdown = IssueBreakdown::from_issues(&issues);
        assert_eq!(breakdown.critical, 2);
        assert_eq!(breakdown.best_practice, 1);
        assert_eq!(breakdown.improvement_needed, 0);
        assert_eq!(breakdown.total(), 3);
    }

    #[test]
    fn breakdown_merge_accumulates() {
        let mut a = IssueBreakdown::from_issues(&[issue(IssueType::Critical, 1)]);
        let b = IssueBreakdown::from_issues(&[
            issue(IssueType::Critical, 2),
            issue(IssueType::SecurityConcern, 3),
        ]);
        a.merge(&b);
        assert_eq!(a.critical, 2);
        assert_eq!(a.security_concern, 1);
    }

    #[test]
    fn reviewed_record_has_no_error() {
        let result = FileReviewResult::reviewed(
            PathBuf::from("a.py"),
            None,
            vec![issue(IssueType::Critical, 1)],
            "code".into(),
        );
        assert!(result.error.is_none());
        assert_eq!(result.issue_count(), 1);
        assert_eq!(result.breakdown.critical, 1);
    }

    #[test]
    fn failed_record_has_zero_issues() {
        let result = FileReviewResult::failed(PathBuf::from("a.py"), "boom");
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(result.issues.is_empty());
        assert_eq!(result.breakdown.total(), 0);
    }

    #[test]
    fn file_review_result_serializes_camel_case() {
        let result = FileReviewResult::failed(PathBuf::from("a.py"), "x");
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("breakdown").is_some());
        assert!(json["breakdown"].get("improvementNeeded").is_some());
        assert!(json["breakdown"].get("improvement_needed").is_none());
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
