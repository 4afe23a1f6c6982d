//! Video collection from the source platform.

mod youtube;

pub use youtube::YoutubeCollector;

use crate::model::VideoRecord;
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that can occur while talking to the video platform.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Trait for video sources.
///
/// A collector visits the configured channels and returns one
/// [`VideoRecord`] per video it kept. Per-channel failures are recovered
/// internally (the channel is skipped); only setup-level failures escape.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(
        &self,
        channel_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<VideoRecord>, CollectorError>;
}
