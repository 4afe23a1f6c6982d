//! Spotify matcher.
//!
//! Authenticates with the client-credentials flow, then walks a ladder of
//! increasingly loose search queries until one returns a track. The
//! popularity field (0..=100) is the platform signal.

use super::query::{clean_channel_name_for_search, clean_title_for_search};
use super::{MatcherError, StreamingMatcher};
use crate::config::{MatcherSettings, SpotifyCredentials};
use crate::model::{StreamingMatch, VideoRecord};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

pub struct SpotifyMatcher {
    client: Client,
    access_token: String,
    settings: MatcherSettings,
}

impl SpotifyMatcher {
    /// Authenticate and build the matcher. A failed token exchange is an
    /// error the caller can turn into "Spotify disabled for this run".
    pub async fn connect(
        credentials: &SpotifyCredentials,
        settings: MatcherSettings,
    ) -> Result<Self, MatcherError> {
        let client = Client::new();
        let access_token = fetch_access_token(&client, credentials, &settings).await?;
        Ok(Self {
            client,
            access_token,
            settings,
        })
    }

    /// Query ladder: fielded track/artist search, quoted free text, then
    /// title only as a last resort.
    fn build_queries(title: &str, channel_name: &str) -> Vec<String> {
        let clean_title = clean_title_for_search(title);
        let artist_guess = clean_channel_name_for_search(channel_name);

        let mut queries = Vec::new();
        if !artist_guess.is_empty() {
            queries.push(format!(
                "track:\"{}\" artist:\"{}\"",
                clean_title, artist_guess
            ));
            queries.push(format!("\"{}\" \"{}\"", clean_title, artist_guess));
        }
        queries.push(format!("\"{}\"", clean_title));
        queries
    }

    async fn search(&self, query: &str) -> Result<Option<StreamingMatch>, MatcherError> {
        debug!(query = %query, "Spotify search");

        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
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

        Ok(payload
            .tracks
            .items
            .into_iter()
            .next()
            .map(|track| StreamingMatch {
                track_id: track.id,
                name: track.name,
                artist: track
                    .artists
                    .into_iter()
                    .next()
                    .map(|a| a.name)
                    .unwrap_or_else(|| "Unknown Artist".to_string()),
                link: track.external_urls.spotify,
                signal: track.popularity,
            }))
    }
}

#[async_trait]
impl StreamingMatcher for SpotifyMatcher {
    fn platform(&self) -> &'static str {
        "Spotify"
    }

    async fn find_track(
        &self,
        video: &VideoRecord,
    ) -> Result<Option<StreamingMatch>, MatcherError> {
        for query in Self::build_queries(&video.title, &video.channel_name) {
            match self.search(&query).await {
                Ok(Some(track)) => return Ok(Some(track)),
                Ok(None) => continue,
                Err(e) => {
                    // A failed query falls through to the next rung.
                    debug!(query = %query, error = %e, "Spotify query failed");
                }
            }
        }
        Ok(None)
    }
}

async fn fetch_access_token(
    client: &Client,
    credentials: &SpotifyCredentials,
    settings: &MatcherSettings,
) -> Result<String, MatcherError> {
    let auth = BASE64.encode(format!(
        "{}:{}",
        credentials.client_id, credentials.client_secret
    ));

    let response = client
        .post(TOKEN_URL)
        .header("Authorization", format!("Basic {}", auth))
        .form(&[("grant_type", "client_credentials")])
        .timeout(Duration::from_secs(settings.timeout_secs))
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
        return Err(MatcherError::Auth(format!(
            "token exchange failed (status {}): {}",
            status.as_u16(),
            body
        )));
    }

    let payload: TokenResponse = response
        .json()
        .await
        .map_err(|e| MatcherError::InvalidResponse(e.to_string()))?;

    Ok(payload.access_token)
}

// Spotify API wire types

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: TrackPage,
}

#[derive(Debug, Deserialize, Default)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    id: String,
    name: String,
    popularity: u64,
    #[serde(default)]
    artists: Vec<Artist>,
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_ladder_with_artist() {
        let queries =
            SpotifyMatcher::build_queries("Zoli Fille (Official Video)", "Big Frankii Official");
        assert_eq!(
            queries,
            vec![
                "track:\"Zoli Fille\" artist:\"Big Frankii\"".to_string(),
                "\"Zoli Fille\" \"Big Frankii\"".to_string(),
                "\"Zoli Fille\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_query_ladder_without_artist() {
        // A channel name made entirely of noise words leaves no artist guess.
        let queries = SpotifyMatcher::build_queries("Seggae man", "Topic TV");
        assert_eq!(queries, vec!["\"Seggae man\"".to_string()]);
    }

    #[test]
    fn test_search_response_parsing() {
        let body = r#"{
            "tracks": {
                "items": [{
                    "id": "trk1",
                    "name": "Zoli Fille",
                    "popularity": 47,
                    "artists": [{"name": "Big Frankii"}],
                    "external_urls": {"spotify": "https://open.spotify.com/track/trk1"}
                }]
            }
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let track = parsed.tracks.items.into_iter().next().unwrap();
        assert_eq!(track.popularity, 47);
        assert_eq!(track.artists[0].name, "Big Frankii");
    }

    #[test]
    fn test_empty_search_response_tolerated() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.tracks.items.is_empty());
    }
}
