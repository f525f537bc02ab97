use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("no code to analyze")]
    EmptyInput,

    #[error("AI provider is not configured (set provider, model and API key)")]
    NotConfigured,

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("build LLM: {0}")]
    Build(String),

    #[error("chat: {0}")]
    Request(String),

    #[error("LLM returned no text")]
    EmptyResponse,

    #[error("Invalid response format from AI: {0}")]
    InvalidResponse(String),
}
