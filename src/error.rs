//! Failure kinds, one per pipeline stage.

/// Errors surfaced by the prompt → completion → sandbox pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing {key}. Set it in env, .env or ~/.config/sbxgpt/.sbxgptrc")]
    ConfigurationMissing { key: String },

    #[error("Completion request failed: {0}")]
    CompletionRequestFailed(String),

    #[error("No ```{language} code fence found in the model response")]
    NoCodeFenceFound { language: String },

    #[error("Sandbox execution failed: {0}")]
    ExecutionRequestFailed(String),

    #[error("Sandbox produced no stdout{}", .error.as_deref().map(|e| format!(" ({e})")).unwrap_or_default())]
    EmptyExecutionOutput { error: Option<String> },
}

pub type Result<T> = std::result::Result<T, Error>;
