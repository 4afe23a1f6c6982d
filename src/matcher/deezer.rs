//! Deezer matcher.
//!
//! The public search endpoint needs no credentials. One free-text query per
//! video, first hit wins. The rank field is the platform signal.

use super::query::{clean_channel_name_for_search, clean_title_for_search};
use super::{MatcherError, StreamingMatcher};
use crate::config::MatcherSettings;
use crate::model::{StreamingMatch, VideoRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SEARCH_URL: &str = "https://api.deezer.com/search/track";

pub struct DeezerMatcher {
    client: Client,
    settings: MatcherSettings,
}

impl DeezerMatcher {
    pub fn new(settings: MatcherSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn build_query(title: &str, channel_name: &str) -> String {
        let clean_title = clean_title_for_search(title);
        let artist_guess = clean_channel_name_for_search(channel_name);
        if artist_guess.is_empty() {
            clean_title
        } else {
            format!("{} {}", clean_title, artist_guess)
        }
    }
}

#[async_trait]
impl StreamingMatcher for DeezerMatcher {
    fn platform(&self) -> &'static str {
        "Deezer"
    }

    async fn find_track(
        &self,
        video: &VideoRecord,
    ) -> Result<Option<StreamingMatch>, MatcherError> {
        let query = Self::build_query(&video.title, &video.channel_name);
        debug!(query = %query, "Deezer search");

        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query.as_str()), ("limit", "1")])
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MatcherError::Timeout
                } else {
                    MatcherError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MatcherError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|e| MatcherError::InvalidResponse(e.to_string()))?;

        Ok(payload.data.into_iter().next().map(|track| StreamingMatch {
            track_id: track.id.to_string(),
            name: track.title,
            artist: track.artist.name,
            link: track.link,
            signal: track.rank,
        }))
    }
}

// Deezer API wire types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    id: u64,
    title: String,
    link: String,
    rank: u64,
    artist: Artist,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_joins_title_and_channel() {
        assert_eq!(
            DeezerMatcher::build_query("Zoli Fille (Official Video)", "Big Frankii Official"),
            "Zoli Fille Big Frankii"
        );
    }

    #[test]
    fn test_query_title_only_when_channel_is_noise() {
        assert_eq!(
            DeezerMatcher::build_query("Seggae man", "Topic Channel"),
            "Seggae man"
        );
    }

    #[test]
    fn test_search_response_parsing() {
        let body = r#"{
            "data": [{
                "id": 312,
                "title": "Zoli Fille",
                "link": "https://www.deezer.com/track/312",
                "rank": 52000000,
                "artist": {"name": "Big Frankii"}
            }],
            "total": 1
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let track = parsed.data.into_iter().next().unwrap();
        assert_eq!(track.id, 312);
        assert_eq!(track.rank, 52_000_000);
        assert_eq!(track.artist.name, "Big Frankii");
    }

    #[test]
    fn test_empty_search_response_tolerated() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.data.is_empty());
    }
}
