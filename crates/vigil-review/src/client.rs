use std::time::Duration;

use serde::Serialize;
use vigil_core::{CommitInfo, Issue, IssueType, PrLink, ResolvedAzure, ReviewOptions, Suggestion, VigilError};
use vigil_repo::provider::RepoProvider;

use crate::postprocess;
use crate::prompt::{self, ParsedReview};

const API_VERSION: &str = "2024-02-15-preview";
const TEMPERATURE: f64 = 0.3;

/// A message in a chat conversation with the model.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use vigil_review::client::Role;
///
/// assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
}

/// The review surface the coordinator fans work out to.
///
/// The production implementation is [`ReviewClient`]; tests drive the
/// pipeline through stubs.
#[async_trait::async_trait]
pub trait Reviewer: Send + Sync {
    /// Review a whole file and return its cleaned issue list.
    ///
    /// Implementations must not fail: every failure mode degrades to a
    /// well-formed issue list (possibly a single fallback issue).
    async fn review_source(
        &self,
        code: &str,
        language: &str,
        commit: Option<&CommitInfo>,
    ) -> Vec<Issue>;
}

/// Azure OpenAI chat-completions client for code review.
///
/// Requests go to
/// `{endpoint}/openai/deployments/{deployment}/chat/completions` with low
/// sampling temperature and a JSON response format, favoring consistency
/// over creativity.
pub struct ReviewClient {
    http: reqwest::Client,
    azure: ResolvedAzure,
    options: ReviewOptions,
}

impl ReviewClient {
    /// Create a client from resolved Azure settings and review options.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Llm`] if the HTTP client cannot be built.
    pub fn new(azure: ResolvedAzure, options: ReviewOptions) -> Result<Self, VigilError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| VigilError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            azure,
            options,
        })
    }

    /// Deployment identifier used for requests.
    pub fn deployment(&self) -> &str {
        &self.azure.deployment
    }

    /// Send one chat completion request and return the text response.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Llm`] on transport failures, non-success
    /// statuses (auth, quota, timeouts surfaced by the service), and
    /// unexpected response shapes.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, VigilError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={API_VERSION}",
            self.azure.endpoint, self.azure.deployment
        );

        let body = serde_json::json!({
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": self.options.max_output_tokens,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(&url)
            .header("api-key", &self.azure.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| VigilError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(VigilError::Llm(format!(
                "Azure OpenAI error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VigilError::Llm(format!("failed to parse response: {e}")))?;

        let content = response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                VigilError::Llm(format!("unexpected response structure: {response_body}"))
            })?;

        Ok(content.to_string())
    }

    /// Review one chunk of code starting at file-absolute `start_line`.
    ///
    /// Never fails past this boundary: a malformed response yields one
    /// Best Practice fallback issue and a transport/service failure yields
    /// one Critical fallback issue.
    pub async fn review_chunk(
        &self,
        code: &str,
        language: &str,
        start_line: u32,
        commit: Option<&CommitInfo>,
    ) -> Vec<Issue> {
        let messages = vec![
            ChatMessage {
                role: Role::System,
                content: prompt::SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: Role::User,
                content: prompt::build_review_prompt(code, language),
            },
        ];

        let response = match self.chat(messages).await {
            Ok(text) => text,
            Err(e) => return vec![transport_fallback(&e, start_line, commit)],
        };

        match prompt::parse_review_response(&response) {
            ParsedReview::Parsed(raws) => raws
                .into_iter()
                .map(|raw| {
                    let mut issue = prompt::raw_to_issue(raw, start_line);
                    attach_commit(&mut issue, commit);
                    issue
                })
                .collect(),
            ParsedReview::Fallback(raw) => {
                vec![parse_fallback(raw, start_line, code, commit)]
            }
        }
    }

    /// Review a whole file: chunk, request per chunk, shift, post-process.
    ///
    /// Blank content yields an empty list without any model call.
    pub async fn review_file(
        &self,
        code: &str,
        language: &str,
        commit: Option<&CommitInfo>,
    ) -> Vec<Issue> {
        if code.trim().is_empty() {
            return Vec::new();
        }

        let mut issues = Vec::new();
        for chunk in prompt::chunk_source(code, self.options.chunk_size) {
            issues.extend(
                self.review_chunk(&chunk.text, language, chunk.start_line, commit)
                    .await,
            );
        }
        postprocess::finalize(issues, code)
    }
}

#[async_trait::async_trait]
impl Reviewer for ReviewClient {
    async fn review_source(
        &self,
        code: &str,
        language: &str,
        commit: Option<&CommitInfo>,
    ) -> Vec<Issue> {
        self.review_file(code, language, commit).await
    }
}

/// Attach commit metadata and, when a PR number was resolved, the
/// provider-specific PR link.
fn attach_commit(issue: &mut Issue, commit: Option<&CommitInfo>) {
    let Some(info) = commit else {
        return;
    };
    if let Some(number) = &info.pr_number {
        issue.pr = Some(PrLink {
            number: number.clone(),
            url: RepoProvider::detect(&info.repo_url).pr_url(&info.repo_url, number),
        });
    }
    issue.commit = Some(info.clone());
}

/// Single Best Practice issue carrying the unparseable model text.
fn parse_fallback(
    raw_text: String,
    start_line: u32,
    code: &str,
    commit: Option<&CommitInfo>,
) -> Issue {
    let mut issue = Issue {
        issue_type: IssueType::BestPractice,
        line: start_line,
        message: "General Review".into(),
        code: Some("Full file".into()),
        suggestion: Suggestion {
            text: raw_text,
            code: None,
        },
        impact: None,
        effort: None,
        commit: None,
        pr: None,
        original_code: Some(code.to_string()),
    };
    attach_commit(&mut issue, commit);
    issue
}

/// Single Critical issue for a failed request.
fn transport_fallback(error: &VigilError, start_line: u32, commit: Option<&CommitInfo>) -> Issue {
    let mut issue = Issue {
        issue_type: IssueType::Critical,
        line: start_line,
        message: format!("AI review error: {error}"),
        code: None,
        suggestion: Suggestion {
            text: "Manual review recommended".into(),
            code: None,
        },
        impact: None,
        effort: None,
        commit: None,
        pr: None,
        original_code: None,
    };
    attach_commit(&mut issue, commit);
    issue
}
