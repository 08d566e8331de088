use std::time::Duration;

use ashfree_memory::MemoryError;

/// Why a completion could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation provider is not configured")]
    NotConfigured,

    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned no usable completion")]
    EmptyCompletion,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported document format: {0:?}")]
    UnsupportedFormat(String),

    #[error("document is empty")]
    Empty,

    #[error("document is not valid UTF-8 text")]
    InvalidText,

    #[error("PDF is password protected")]
    Encrypted,

    #[error("failed to read PDF: {0}")]
    Pdf(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("background task failed: {0}")]
    Task(String),
}

pub type CoachResult<T> = std::result::Result<T, CoachError>;
