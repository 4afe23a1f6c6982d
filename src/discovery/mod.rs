//! Channel discovery for seeding the scraper configuration.
//!
//! Given a list of artist names, searches YouTube for their channels, scores
//! the candidates heuristically and writes the winners to a YAML channel
//! list. Also parses channel ids out of pasted URLs or raw channel-page
//! HTML, for the cases where search gets it wrong and a human fixes it by
//! hand.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_CANDIDATES: u32 = 5;

/// Words in a channel title that suggest an aggregator rather than the
/// artist's own channel.
const PENALTY_WORDS: [&str; 6] = ["topic", "tv", "records", "record", "label", "vevo"];

lazy_static! {
    static ref CHANNEL_URL_ID: Regex =
        Regex::new(r"/channel/(UC[0-9A-Za-z_-]{22})").unwrap();
    static ref HTML_CHANNEL_ID: Regex =
        Regex::new(r#""channelId":"(UC[0-9A-Za-z_-]{22})""#).unwrap();
    static ref HTML_BROWSE_ID: Regex =
        Regex::new(r#""browseId":"(UC[0-9A-Za-z_-]{22})""#).unwrap();
    static ref HTML_TITLE: Regex = Regex::new(r"<title>(.*?)</title>").unwrap();
}

/// A scored search hit for one artist.
#[derive(Debug, Clone)]
pub struct FoundChannel {
    pub channel_id: String,
    pub title: String,
    pub score: i32,
}

impl FoundChannel {
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/channel/{}", self.channel_id)
    }
}

/// Read one artist name per line, skipping blanks and `#` comments.
pub fn load_artists(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read artist list {:?}", path))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Score one candidate channel for an artist. Higher is better; a negative
/// score means the candidate is probably an aggregator.
pub fn score_channel_candidate(artist: &str, title: &str, description: &str) -> i32 {
    let artist_lower = artist.to_lowercase();
    let title_lower = title.to_lowercase();
    let description_lower = description.to_lowercase();

    let mut score = 0;
    if title_lower.contains(&artist_lower) {
        score += 4;
    }
    if description_lower.contains(&artist_lower) {
        score += 2;
    }
    if normalize(&title_lower) == normalize(&artist_lower) {
        score += 5;
    }
    if title_lower.contains("official") {
        score += 2;
    }
    for word in PENALTY_WORDS {
        if title_lower.split_whitespace().any(|w| w == word) {
            score -= 2;
        }
    }
    score
}

fn normalize(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

pub struct ChannelFinder {
    client: Client,
    api_key: String,
}

impl ChannelFinder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Search YouTube for the artist and return the best-scoring channel,
    /// or `None` when nothing plausible came back.
    pub async fn find_best_channel(&self, artist: &str) -> Result<Option<FoundChannel>> {
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("type", "channel"),
                ("q", artist),
                ("maxResults", &MAX_CANDIDATES.to_string()),
                ("key", &self.api_key),
            ])
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .with_context(|| format!("Channel search failed for '{}'", artist))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Channel search for '{}' returned status {}: {}",
                artist,
                status.as_u16(),
                body
            );
        }

        let payload: SearchResponse = response
            .json()
            .await
            .context("Failed to parse channel search response")?;

        let best = payload
            .items
            .into_iter()
            .filter_map(|item| {
                let channel_id = item.id.channel_id?;
                let score =
                    score_channel_candidate(artist, &item.snippet.title, &item.snippet.description);
                debug!(artist = %artist, title = %item.snippet.title, score, "Scored candidate");
                Some(FoundChannel {
                    channel_id,
                    title: item.snippet.title,
                    score,
                })
            })
            .max_by_key(|c| c.score);

        match &best {
            Some(channel) if channel.score > 0 => {
                info!(
                    artist = %artist,
                    channel = %channel.title,
                    score = channel.score,
                    "Best channel match"
                );
            }
            Some(channel) => {
                warn!(
                    artist = %artist,
                    channel = %channel.title,
                    score = channel.score,
                    "Best match scored poorly, review it manually"
                );
            }
            None => warn!(artist = %artist, "No channel candidates found"),
        }

        Ok(best)
    }
}

/// Pull a channel id out of a pasted channel URL.
pub fn extract_channel_id_from_url(url: &str) -> Option<String> {
    CHANNEL_URL_ID
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Pull a channel id out of raw channel-page HTML. The canonical
/// `channelId` field is tried first, then the `browseId` the mobile pages
/// carry instead.
pub fn extract_channel_id_from_html(html: &str) -> Option<String> {
    HTML_CHANNEL_ID
        .captures(html)
        .or_else(|| HTML_BROWSE_ID.captures(html))
        .map(|caps| caps[1].to_string())
}

/// Channel name from the page `<title>`, minus the site suffix.
pub fn extract_channel_name_from_html(html: &str) -> Option<String> {
    HTML_TITLE.captures(html).map(|caps| {
        caps[1]
            .trim_end_matches(" - YouTube")
            .trim()
            .to_string()
    })
}

/// Write the discovered channels as the YAML list the scraper config reads.
pub fn write_channels_file(path: &Path, channels: &[(String, String)]) -> Result<()> {
    let mut out = String::from("channels:\n");
    for (url, name) in channels {
        out.push_str(&format!("  - {} # {}\n", url, name));
    }
    std::fs::write(path, out)
        .with_context(|| format!("Failed to write channel list {:?}", path))?;
    info!("Wrote {} channel(s) to {:?}", channels.len(), path);
    Ok(())
}

// YouTube search API wire types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchSnippet {
    title: String,
    #[serde(default)]
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_exact_title_match() {
        // Contains (+4) and normalized-exact (+5).
        assert_eq!(score_channel_candidate("Cassiya", "Cassiya", ""), 9);
    }

    #[test]
    fn test_score_official_bonus() {
        // Contains (+4) and "official" (+2); "Official" breaks exactness.
        assert_eq!(
            score_channel_candidate("Cassiya", "Cassiya Official", ""),
            6
        );
    }

    #[test]
    fn test_score_description_mention() {
        assert_eq!(
            score_channel_candidate("Cassiya", "Some Channel", "Home of Cassiya music"),
            2
        );
    }

    #[test]
    fn test_score_penalty_words() {
        // Contains (+4), "topic" (-2).
        assert_eq!(
            score_channel_candidate("Cassiya", "Cassiya Topic", ""),
            2
        );
        // "records" and "label" both penalized.
        assert_eq!(
            score_channel_candidate("Cassiya", "Cassiya Records Label", ""),
            0
        );
    }

    #[test]
    fn test_score_unrelated_channel_negative() {
        assert_eq!(
            score_channel_candidate("Cassiya", "Sega Vevo", ""),
            -2
        );
    }

    #[test]
    fn test_extract_channel_id_from_url() {
        assert_eq!(
            extract_channel_id_from_url(
                "https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv?view=videos"
            ),
            Some("UCabcdefghijklmnopqrstuv".to_string())
        );
        assert_eq!(
            extract_channel_id_from_url("https://www.youtube.com/@somehandle"),
            None
        );
    }

    #[test]
    fn test_extract_channel_id_from_html_prefers_channel_id() {
        let html = r#"<script>{"browseId":"UC0000000000000000000000","channelId":"UCabcdefghijklmnopqrstuv"}</script>"#;
        assert_eq!(
            extract_channel_id_from_html(html),
            Some("UCabcdefghijklmnopqrstuv".to_string())
        );
    }

    #[test]
    fn test_extract_channel_id_from_html_browse_id_fallback() {
        let html = r#"{"browseId":"UCabcdefghijklmnopqrstuv"}"#;
        assert_eq!(
            extract_channel_id_from_html(html),
            Some("UCabcdefghijklmnopqrstuv".to_string())
        );
        assert_eq!(extract_channel_id_from_html("<html></html>"), None);
    }

    #[test]
    fn test_extract_channel_name_from_html() {
        assert_eq!(
            extract_channel_name_from_html("<title>Cassiya - YouTube</title>"),
            Some("Cassiya".to_string())
        );
        assert_eq!(extract_channel_name_from_html("<body></body>"), None);
    }

    #[test]
    fn test_load_artists_skips_blanks_and_comments() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("artists.txt");
        std::fs::write(&path, "Cassiya\n\n# legacy\n  Big Frankii  \n").unwrap();
        assert_eq!(
            load_artists(&path).unwrap(),
            vec!["Cassiya".to_string(), "Big Frankii".to_string()]
        );
    }

    #[test]
    fn test_write_channels_file_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("channels.yml");
        write_channels_file(
            &path,
            &[(
                "https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv".to_string(),
                "Cassiya".to_string(),
            )],
        )
        .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "channels:\n  - https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv # Cassiya\n"
        );
    }

    #[test]
    fn test_search_response_parsing() {
        let body = r#"{
            "items": [{
                "id": {"kind": "youtube#channel", "channelId": "UCabcdefghijklmnopqrstuv"},
                "snippet": {"title": "Cassiya", "description": "Sega from Mauritius"}
            }]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.items[0].id.channel_id.as_deref(),
            Some("UCabcdefghijklmnopqrstuv")
        );
    }
}
