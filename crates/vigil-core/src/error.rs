/// Errors that can occur across the vigil workspace.
///
/// Each variant wraps a specific failure domain. Library crates use this
/// type directly; the binary converts to `miette` diagnostics at the
/// boundary. Only `Config` and `Git` failures are allowed to terminate a
/// run early — everything downstream of the clone degrades per file.
///
/// # Examples
///
/// ```
/// use vigil_core::VigilError;
///
/// let err = VigilError::Config("AZURE_OPENAI_KEY is not set".into());
/// assert!(err.to_string().contains("AZURE_OPENAI_KEY"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum VigilError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure (clone, revwalk, metadata).
    #[error("git error: {0}")]
    Git(String),

    /// Source content parsing failure (e.g. malformed notebooks).
    #[error("parse error: {0}")]
    Parse(String),

    /// LLM API or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
