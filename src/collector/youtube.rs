//! YouTube Data API v3 collector.
//!
//! For each channel: resolve the uploads playlist, list its most recent
//! videos, fetch statistics in one batch, then pull top comments per video.
//! Videos without any comments are dropped, since every downstream stage
//! feeds on comment text.

use super::{Collector, CollectorError};
use crate::config::CollectorSettings;
use crate::model::{VideoRecord, COMMENT_SEPARATOR};
use async_trait::async_trait;
use indicatif::ProgressBar;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const CHANNELS_URL: &str = "https://www.googleapis.com/youtube/v3/channels";
const PLAYLIST_ITEMS_URL: &str = "https://www.googleapis.com/youtube/v3/playlistItems";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const COMMENT_THREADS_URL: &str = "https://www.googleapis.com/youtube/v3/commentThreads";

pub struct YoutubeCollector {
    client: Client,
    api_key: String,
    settings: CollectorSettings,
}

impl YoutubeCollector {
    pub fn new(api_key: impl Into<String>, settings: CollectorSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            settings,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, CollectorError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollectorError::Timeout
                } else {
                    CollectorError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CollectorError::InvalidResponse(e.to_string()))
    }

    /// Resolve a channel's uploads playlist ID and display name.
    async fn fetch_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<(String, String)>, CollectorError> {
        let response: ChannelListResponse = self
            .get_json(
                CHANNELS_URL,
                &[
                    ("key", self.api_key.as_str()),
                    ("part", "contentDetails,snippet"),
                    ("id", channel_id),
                ],
            )
            .await?;

        Ok(response.items.into_iter().next().map(|item| {
            (
                item.content_details.related_playlists.uploads,
                item.snippet.title,
            )
        }))
    }

    /// List the most recent video IDs from an uploads playlist.
    async fn fetch_playlist_video_ids(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<String>, CollectorError> {
        let max_results = self.settings.max_videos_per_channel.to_string();
        let response: PlaylistItemsResponse = self
            .get_json(
                PLAYLIST_ITEMS_URL,
                &[
                    ("key", self.api_key.as_str()),
                    ("part", "snippet"),
                    ("playlistId", playlist_id),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| item.snippet.resource_id.video_id)
            .collect())
    }

    /// Fetch snippet and statistics for a batch of video IDs.
    async fn fetch_video_details(
        &self,
        video_ids: &[String],
    ) -> Result<Vec<VideoItem>, CollectorError> {
        let ids = video_ids.join(",");
        let response: VideoListResponse = self
            .get_json(
                VIDEOS_URL,
                &[
                    ("key", self.api_key.as_str()),
                    ("part", "snippet,statistics"),
                    ("id", ids.as_str()),
                ],
            )
            .await?;
        Ok(response.items)
    }

    /// Fetch up to `max_comments` top-level comments for a video, joined
    /// into one string. Any failure here collapses to an empty string: a
    /// comment fetch must never kill the channel scan.
    async fn fetch_comments(&self, video_id: &str) -> String {
        let max_results = self.settings.max_comments.to_string();
        let result: Result<CommentThreadsResponse, CollectorError> = self
            .get_json(
                COMMENT_THREADS_URL,
                &[
                    ("key", self.api_key.as_str()),
                    ("part", "snippet"),
                    ("videoId", video_id),
                    ("maxResults", max_results.as_str()),
                    ("textFormat", "plainText"),
                    ("order", "relevance"),
                ],
            )
            .await;

        match result {
            Ok(response) => {
                let comments: Vec<String> = response
                    .items
                    .iter()
                    .map(|item| {
                        clean_comment_text(&item.snippet.top_level_comment.snippet.text_display)
                    })
                    .collect();
                comments.join(COMMENT_SEPARATOR)
            }
            Err(e) => {
                // Comments can be disabled per video; treat any failure as "none".
                debug!(video_id = %video_id, error = %e, "Comment fetch failed");
                String::new()
            }
        }
    }

    async fn collect_channel(
        &self,
        channel_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<VideoRecord>, CollectorError> {
        let Some((uploads_id, channel_name)) = self.fetch_channel(channel_id).await? else {
            warn!(channel_id = %channel_id, "Channel not found, skipping");
            return Ok(vec![]);
        };
        let channel_url = format!("https://www.youtube.com/channel/{}", channel_id);

        info!("Scraping channel: {}", channel_name);

        let video_ids = self.fetch_playlist_video_ids(&uploads_id).await?;
        if video_ids.is_empty() {
            return Ok(vec![]);
        }
        let details = self.fetch_video_details(&video_ids).await?;

        let mut records = Vec::new();
        let progress = ProgressBar::new(details.len() as u64);
        progress.set_message(channel_name.clone());

        for item in details {
            if cancel.is_cancelled() {
                break;
            }

            let view_count = item
                .statistics
                .view_count
                .unwrap_or_else(|| "0".to_string());
            let comments = self.fetch_comments(&item.id).await;

            if !comments.is_empty() {
                records.push(VideoRecord {
                    video_id: item.id.clone(),
                    title: item.snippet.title,
                    video_url: format!("https://www.youtube.com/watch?v={}", item.id),
                    channel_name: channel_name.clone(),
                    channel_id: channel_id.to_string(),
                    channel_url: channel_url.clone(),
                    youtube_views: view_count.parse().unwrap_or(0),
                    views: view_count,
                    comments,
                });
            }

            progress.inc(1);
            tokio::time::sleep(Duration::from_millis(self.settings.delay_ms)).await;
        }

        progress.finish_and_clear();
        Ok(records)
    }
}

#[async_trait]
impl Collector for YoutubeCollector {
    async fn collect(
        &self,
        channel_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<VideoRecord>, CollectorError> {
        let mut all_videos = Vec::new();

        for channel_id in channel_ids {
            if cancel.is_cancelled() {
                info!("Collection cancelled, returning partial results");
                break;
            }

            match self.collect_channel(channel_id, cancel).await {
                Ok(mut records) => {
                    info!(
                        channel_id = %channel_id,
                        videos = records.len(),
                        "Channel scraped"
                    );
                    all_videos.append(&mut records);
                }
                Err(e) => {
                    warn!(channel_id = %channel_id, error = %e, "Channel scrape failed, skipping");
                }
            }
        }

        Ok(all_videos)
    }
}

fn clean_comment_text(text: &str) -> String {
    text.replace('\n', " ").replace('\r', "")
}

// YouTube API wire types

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    snippet: ChannelSnippet,
    #[serde(rename = "contentDetails")]
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemSnippet {
    #[serde(rename = "resourceId")]
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
}

#[derive(Debug, Deserialize, Default)]
struct VideoStatistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentSnippet {
    #[serde(rename = "textDisplay")]
    text_display: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_comment_text_strips_newlines() {
        assert_eq!(clean_comment_text("line one\nline two"), "line one line two");
        assert_eq!(clean_comment_text("crlf\r\nhere"), "crlf here");
        assert_eq!(clean_comment_text("plain"), "plain");
    }

    #[test]
    fn test_channel_response_parsing() {
        let body = r#"{
            "items": [{
                "snippet": {"title": "Big Frankii"},
                "contentDetails": {"relatedPlaylists": {"uploads": "UUabc"}}
            }]
        }"#;
        let parsed: ChannelListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].snippet.title, "Big Frankii");
        assert_eq!(
            parsed.items[0].content_details.related_playlists.uploads,
            "UUabc"
        );
    }

    #[test]
    fn test_video_response_missing_view_count_defaults() {
        let body = r#"{
            "items": [{
                "id": "v1",
                "snippet": {"title": "Some Song"},
                "statistics": {}
            }]
        }"#;
        let parsed: VideoListResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.items[0].statistics.view_count.is_none());
    }

    #[test]
    fn test_comment_threads_parsing() {
        let body = r#"{
            "items": [{
                "snippet": {
                    "topLevelComment": {
                        "snippet": {"textDisplay": "mo kontan sa sega la"}
                    }
                }
            }]
        }"#;
        let parsed: CommentThreadsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.items[0].snippet.top_level_comment.snippet.text_display,
            "mo kontan sa sega la"
        );
    }

    #[test]
    fn test_empty_items_tolerated() {
        let parsed: PlaylistItemsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
    }
}
