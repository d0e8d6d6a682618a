use thiserror::Error;

/// Reflection agent error types
#[derive(Error, Debug)]
pub enum ReflectError {
    #[error("OpenAI API error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tokio runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("No API key found. Set OPENAI_API_KEY environment variable.")]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot run a step on an empty transcript")]
    EmptyTranscript,

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model reply did not call the required tool '{0}'")]
    MissingToolCall(String),

    #[error("Structured output does not match schema: {0}")]
    Schema(String),

    #[error("Round limit reached ({0})")]
    RoundLimitReached(u32),
}

/// Result type alias for reflection agent operations
pub type Result<T> = std::result::Result<T, ReflectError>;
