use serde::Deserialize;

use vigil_core::{Issue, IssueType, Suggestion};

pub(crate) const SYSTEM_PROMPT: &str =
    "You are a senior software developer providing detailed code reviews.";

/// A contiguous, line-bounded slice of a file sized to fit the model's
/// input budget.
///
/// # Examples
///
/// ```
/// use vigil_review::prompt::chunk_source;
///
/// let chunks = chunk_source("a\nb\nc", 1000);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].start_line, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk text; complete lines only.
    pub text: String,
    /// 1-based line number of the chunk's first line within the file.
    pub start_line: u32,
}

/// Split source into chunks on line boundaries, never inside a line.
///
/// Each chunk records its starting line so issue line numbers can be
/// shifted back to file-absolute coordinates. A single line longer than
/// `max_chunk_bytes` becomes its own oversized chunk; nothing is dropped.
///
/// # Examples
///
/// ```
/// use vigil_review::prompt::chunk_source;
///
/// let code = "line one\nline two\nline three\n";
/// let chunks = chunk_source(code, 18);
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].start_line, 1);
/// assert_eq!(chunks[1].start_line, 3);
/// ```
pub fn chunk_source(code: &str, max_chunk_bytes: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0usize;
    let mut start_line = 1u32;

    for line in code.lines() {
        if current_size + line.len() > max_chunk_bytes && !current.is_empty() {
            chunks.push(Chunk {
                text: current.join("\n"),
                start_line,
            });
            start_line += current.len() as u32;
            current.clear();
            current_size = 0;
        }
        current_size += line.len();
        current.push(line);
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            text: current.join("\n"),
            start_line,
        });
    }

    chunks
}

/// Build the user prompt asking for a consolidated JSON review of `code`.
///
/// # Examples
///
/// ```
/// use vigil_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("x = eval(input())", "Python");
/// assert!(prompt.contains("Python"));
/// assert!(prompt.contains("x = eval(input())"));
/// assert!(prompt.contains("\"issues\""));
/// ```
pub fn build_review_prompt(code: &str, language: &str) -> String {
    format!(
        "Analyze the following {language} code as a senior software developer and provide a \
thorough review. Classify every finding into exactly one of these categories:
1. Critical Issue: severe bugs, incorrect logic, or major security vulnerabilities
2. Improvement Needed: code quality issues that should be addressed
3. Best Practice: suggestions for better coding practices and maintainability
4. Security Concern: potential security risks and vulnerabilities
5. Performance Impact: performance optimization opportunities

Code to review:
{code}

For each issue provide:
- \"type\": the category label
- \"line\": the exact line number
- \"message\": a clear issue description
- \"code\": the problematic code snippet
- \"explanation\": a detailed explanation of the fix
- \"suggested_fix\": example code showing the fix
- \"impact_level\": high, medium, or low
- \"effort_estimate\": small, medium, or large

Do not skip any of the above fields. Respond with a single consolidated JSON \
object of the form {{\"issues\": [...]}} containing all issues."
    )
}

/// Result of decoding the model's response.
///
/// `Parsed` carries the structured issues; `Fallback` carries the raw text
/// when the response is not the expected shape. Callers decide how to
/// degrade — this function never errors.
#[derive(Debug)]
pub enum ParsedReview {
    /// A syntactically valid `{"issues": [...]}` object.
    Parsed(Vec<RawIssue>),
    /// Anything else; the raw response text, for fallback handling.
    Fallback(String),
}

/// One issue entry as the model wrote it, before normalization.
///
/// Every field is optional: models drop fields despite instructions, and
/// `line` sometimes arrives as a string.
#[derive(Debug, Deserialize)]
pub struct RawIssue {
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub line: Option<serde_json::Value>,
    pub message: Option<String>,
    pub code: Option<String>,
    pub explanation: Option<String>,
    pub suggested_fix: Option<String>,
    pub impact_level: Option<String>,
    pub effort_estimate: Option<String>,
}

#[derive(Deserialize)]
struct LlmResponse {
    issues: Vec<RawIssue>,
}

/// Decode the model response into a tagged result.
///
/// Tolerates markdown code fences around the JSON body.
///
/// # Examples
///
/// ```
/// use vigil_review::prompt::{parse_review_response, ParsedReview};
///
/// let parsed = parse_review_response(r#"{"issues": []}"#);
/// assert!(matches!(parsed, ParsedReview::Parsed(ref v) if v.is_empty()));
///
/// let fallback = parse_review_response("The code looks fine to me.");
/// assert!(matches!(fallback, ParsedReview::Fallback(_)));
/// ```
pub fn parse_review_response(response: &str) -> ParsedReview {
    let cleaned = strip_code_fences(response);
    match serde_json::from_str::<LlmResponse>(cleaned) {
        Ok(parsed) => ParsedReview::Parsed(parsed.issues),
        Err(_) => ParsedReview::Fallback(response.to_string()),
    }
}

/// Normalize a raw model entry into an [`Issue`] at file-absolute
/// coordinates.
///
/// The chunk-relative line (default 1 when missing) is shifted by
/// `start_line - 1` — here and only here. Unknown category tags default
/// to Best Practice.
pub fn raw_to_issue(raw: RawIssue, start_line: u32) -> Issue {
    let chunk_line = match &raw.line {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(1).max(1) as u32,
        Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().unwrap_or(1).max(1),
        _ => 1,
    };
    let issue_type = raw
        .issue_type
        .as_deref()
        .and_then(|t| t.parse::<IssueType>().ok())
        .unwrap_or(IssueType::BestPractice);

    Issue {
        issue_type,
        line: chunk_line + start_line - 1,
        message: raw.message.unwrap_or_else(|| "No description provided".into()),
        code: raw.code,
        suggestion: Suggestion {
            text: raw.explanation.unwrap_or_default(),
            code: raw.suggested_fix,
        },
        impact: raw.impact_level,
        effort: raw.effort_estimate,
        commit: None,
        pr: None,
        original_code: None,
    }
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}
