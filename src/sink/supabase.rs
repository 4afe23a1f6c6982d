//! Supabase REST sink for the `analysis` table.
//!
//! Uses the PostgREST endpoint directly: one bulk POST per run, one filtered
//! GET for the audio download queue. The table column for the popularity
//! flag is `multianalysis_flag`, a leftover from an earlier schema, so the
//! payload renames that one field.

use super::{AnalysisSink, SinkError};
use crate::model::MergedRecord;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct SupabaseSink {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseSink {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/analysis", self.base_url)
    }

    /// One table row as PostgREST expects it. `None` when the record cannot
    /// be represented, so the caller can skip it.
    fn row_payload(record: &MergedRecord) -> Option<Value> {
        if record.video_id.is_empty() {
            return None;
        }
        Some(json!({
            "video_id": record.video_id,
            "title": record.title,
            "video_url": record.video_url,
            "channel_name": record.channel_name,
            "channel_url": record.channel_url,
            "sentiment_flag": record.sentiment_flag,
            "emotional_genre": record.emotional_genre,
            "sega_genre": record.sega_genre,
            "gemini_confidence_score": record.gemini_confidence_score,
            "comment_density_rating": record.comment_density_rating.to_string(),
            "youtube_views": record.youtube_views,
            "streaming_count_used": record.streaming_count_used,
            "streaming_platform_used": record.streaming_platform_used.to_string(),
            "normalized_score": record.normalized_score,
            "multianalysis_flag": record.popularity_flag,
        }))
    }

    fn map_send_error(e: reqwest::Error) -> SinkError {
        if e.is_timeout() {
            SinkError::Timeout
        } else {
            SinkError::Connection(e.to_string())
        }
    }
}

#[async_trait]
impl AnalysisSink for SupabaseSink {
    async fn insert_batch(&self, rows: &[MergedRecord]) -> Result<usize, SinkError> {
        let payload: Vec<Value> = rows
            .iter()
            .filter_map(|record| {
                let row = Self::row_payload(record);
                if row.is_none() {
                    warn!(title = %record.title, "Skipping row without a video id");
                }
                row
            })
            .collect();

        if payload.is_empty() {
            info!("No valid rows to insert");
            return Ok(0);
        }

        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=representation")
            .json(&payload)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let inserted: Vec<Value> = response
            .json()
            .await
            .map_err(|e| SinkError::InvalidResponse(e.to_string()))?;

        if inserted.is_empty() {
            // Row-level security silently swallows inserts instead of
            // erroring, so an empty representation deserves a warning.
            warn!("Insert acknowledged but no rows returned; check table policies");
        }

        Ok(inserted.len())
    }

    async fn fetch_download_targets(&self) -> Result<Vec<String>, SinkError> {
        let response = self
            .client
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(&[
                ("select", "video_id,sentiment_flag,sega_genre"),
                ("sentiment_flag", "eq.1"),
                ("sega_genre", "neq.Not Sega"),
            ])
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let rows: Vec<TargetRow> = response
            .json()
            .await
            .map_err(|e| SinkError::InvalidResponse(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.video_id).collect())
    }
}

#[derive(Debug, Deserialize)]
struct TargetRow {
    video_id: String,
}
