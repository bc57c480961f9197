use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit retrieval error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

/// Coarse classification of a [`CoreError`], used to decide how a failed
/// invocation is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid configuration. Fatal, never retried.
    Configuration,
    /// Any failure talking to Reddit. The invocation is aborted without partial results.
    Retrieval,
    /// The sentiment model could not be loaded or failed on a batch.
    Classification,
    /// The caller asked for something that does not exist.
    Input,
    Internal,
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CoreError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::RedditApi(_) => ErrorCategory::Retrieval,
            CoreError::Classifier(_) => ErrorCategory::Classification,
            CoreError::Config(_) => ErrorCategory::Configuration,
            CoreError::InvalidInput { .. } => ErrorCategory::Input,
            CoreError::Io(_) | CoreError::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

#[derive(Error, Debug)]
pub enum RedditApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed {
        reason: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Subreddit not found: {subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("Post not found: {post_id}")]
    PostNotFound { post_id: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout {
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid API response: {details}")]
    InvalidResponse {
        details: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Unexpected status: {status_code}")]
    UnexpectedStatus { status_code: u16 },

    #[error("Transport failure: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model not found: {path}")]
    ModelNotFound { path: String },

    #[error("Model loading failed for {model_path}: {reason}")]
    ModelLoadingFailed { model_path: String, reason: String },

    #[error("Invalid label configuration: {details}")]
    InvalidLabelConfig { details: String },

    #[error("Tokenization failed for {text_length} characters: {reason}")]
    TokenizationFailed { text_length: usize, reason: String },

    #[error("Model inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("Classifier returned {actual} results for {expected} inputs")]
    OutputMismatch { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
