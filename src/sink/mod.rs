//! Persistence of merged analysis rows.

mod supabase;

pub use supabase::SupabaseSink;

use crate::model::MergedRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the analysis store.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Trait for the analysis store.
#[async_trait]
pub trait AnalysisSink: Send + Sync {
    /// Insert a batch of merged rows, returning how many the store
    /// acknowledged. Individually invalid rows are skipped, not fatal.
    async fn insert_batch(&self, rows: &[MergedRecord]) -> Result<usize, SinkError>;

    /// Video ids of stored rows that qualify for audio download:
    /// emotionally flagged and confirmed sega.
    async fn fetch_download_targets(&self) -> Result<Vec<String>, SinkError>;
}
