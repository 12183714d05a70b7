//! Error types for the CourseScout pipeline.

use thiserror::Error;

/// Main error type covering the scrape/index/retrieve/answer pipeline.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Configuration problems (missing credential, bad paths)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport failures (catalog fetch, Gemini call)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected HTML structure while scraping
    #[error("HTML parse error: {0}")]
    Parse(String),

    /// Embedding model failures
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index failures (dimension mismatch, corrupt artifact)
    #[error("Index error: {0}")]
    Index(String),

    /// Generative answer service failures
    #[error("Generation error: {0}")]
    Generation(String),

    /// Request validation failures, rejected before business logic
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScoutError::Index("expected dimension 384, got 3".to_string());
        assert!(err.to_string().contains("384"));
    }

    #[test]
    fn test_invalid_input_display() {
        let err = ScoutError::InvalidInput("top_k must be between 1 and 20".to_string());
        assert!(err.to_string().contains("top_k"));
    }
}
