//! Sentiment/genre classification of one video from its title and comments.

mod gemini;

pub use gemini::GeminiClassifier;

use crate::model::{ClassificationRecord, VideoRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when interacting with the classification backend.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timeout")]
    Timeout,
}

/// Trait for classification backends.
///
/// A failed call is an error here; the pipeline substitutes
/// [`ClassificationRecord::fallback`] so one bad video never aborts a run.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// The model identifier used, for logging.
    fn model(&self) -> &str;

    async fn classify(
        &self,
        video: &VideoRecord,
    ) -> Result<ClassificationRecord, ClassifierError>;
}
