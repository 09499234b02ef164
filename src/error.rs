//! Error types for the moodlist pipeline.

/// Top-level error type for emotion analysis and song recommendation.
#[derive(Debug, thiserror::Error)]
pub enum MoodError {
    /// No sentences to analyse (blank diary, or an empty sentence list
    /// handed to the aggregator).
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Tokenizer or model failure while predicting a sentence's emotion
    /// or embedding a keyword.
    #[error("inference error: {0}")]
    Inference(String),

    /// Song catalog could not be read or a row is malformed.
    #[error("catalog load error: {0}")]
    CatalogLoad(String),

    /// Embedding dimensions disagree under the strict alignment policy.
    #[error("dimension mismatch: input has {input} dims, song has {song}")]
    DimensionMismatch { input: usize, song: usize },

    /// Model download or loading error.
    #[error("model error: {0}")]
    Model(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// The request exceeded its inference deadline.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The request was cancelled before a result was assembled.
    #[error("request cancelled")]
    Cancelled,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MoodError {
    /// Stable machine-readable code, for outer layers that map failures onto
    /// response statuses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput(_) => "empty_input",
            Self::Inference(_) => "inference_failed",
            Self::CatalogLoad(_) => "catalog_load_failed",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::Model(_) => "model_unavailable",
            Self::Config(_) => "invalid_config",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io_error",
        }
    }

    /// Whether the failure is attributable to the caller's input rather than
    /// the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyInput(_))
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MoodError>;
