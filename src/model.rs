//! Typed records exchanged between pipeline stages.
//!
//! Every stage produces its own record type keyed by `video_id`; the merge
//! engine joins them into one [`MergedRecord`] per collected video.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used to flatten a video's comments into a single string.
pub const COMMENT_SEPARATOR: &str = " | ";

/// Raw per-video data produced by the collector.
///
/// Created once per scrape and immutable afterwards. `views` keeps the
/// string form exactly as returned by the platform; `youtube_views` is the
/// parsed copy used for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub video_url: String,
    pub channel_name: String,
    pub channel_id: String,
    pub channel_url: String,
    pub views: String,
    pub youtube_views: u64,
    /// All top-level comments joined by [`COMMENT_SEPARATOR`].
    pub comments: String,
}

/// Comment volume/detail rating assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommentDensity {
    #[default]
    Low,
    Medium,
    High,
}

impl CommentDensity {
    /// Tolerant parse of the label the model returns. Anything
    /// unrecognized collapses to `Low`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "medium" => CommentDensity::Medium,
            "high" => CommentDensity::High,
            _ => CommentDensity::Low,
        }
    }
}

impl fmt::Display for CommentDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommentDensity::Low => "Low",
            CommentDensity::Medium => "Medium",
            CommentDensity::High => "High",
        };
        f.write_str(s)
    }
}

/// The closed set of sega subgenres the classifier may choose from.
pub const SEGA_GENRES: [&str; 4] = [
    "Political Sega",
    "Chagos Sega",
    "Fancy Sega",
    "Roots Sega",
];

/// Sentinel used when the content is not sega music at all.
pub const NOT_SEGA: &str = "Not Sega";

/// Default subgenre forced when the model violates the closed-set contract.
pub const DEFAULT_SEGA_GENRE: &str = "Roots Sega";

/// Sentiment/genre analysis for one video, keyed by `video_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub video_id: String,
    /// 1 when most comments are emotional/story-driven, else 0.
    pub sentiment_flag: u8,
    pub emotional_genre: String,
    /// One of [`SEGA_GENRES`] or [`NOT_SEGA`], never "Unknown".
    pub sega_genre: String,
    /// Model self-confidence in [0, 1].
    pub gemini_confidence_score: f64,
    pub comment_density_rating: CommentDensity,
}

impl ClassificationRecord {
    /// Record returned when the classification call itself failed.
    pub fn fallback(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            sentiment_flag: 0,
            emotional_genre: "Error".to_string(),
            sega_genre: NOT_SEGA.to_string(),
            gemini_confidence_score: 0.0,
            comment_density_rating: CommentDensity::Low,
        }
    }
}

/// Best-guess track match from one streaming catalog.
///
/// `signal` carries the platform-local popularity measure: Spotify
/// popularity (0..=100) or Deezer rank (unbounded). Absence of a match is a
/// valid terminal state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingMatch {
    pub track_id: String,
    pub name: String,
    pub artist: String,
    pub link: String,
    pub signal: u64,
}

/// A matcher's result for one video, carrying the video key alongside the
/// platform data so independently ordered lists can be re-joined later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformMatch {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub track: StreamingMatch,
}

/// Which platform signal(s) backed a popularity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StreamingPlatform {
    Spotify,
    Deezer,
    /// Both platforms had a positive signal; the larger scaled value won.
    Combined,
    #[default]
    None,
}

impl fmt::Display for StreamingPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamingPlatform::Spotify => "Spotify",
            StreamingPlatform::Deezer => "Deezer",
            StreamingPlatform::Combined => "Combined",
            StreamingPlatform::None => "None",
        };
        f.write_str(s)
    }
}

/// Normalized popularity for one video, keyed by `video_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularityRecord {
    pub video_id: String,
    pub youtube_views: u64,
    /// Synthetic stream count derived from whichever signals were present.
    pub streaming_count_used: u64,
    pub streaming_platform_used: StreamingPlatform,
    /// Symmetric views/streams ratio in [0, 1], rounded to 4 decimals.
    pub normalized_score: f64,
    pub popularity_flag: u8,
}

/// Final output row: the union of the three sources for one video.
///
/// Exactly one exists per video the collector returned. Missing
/// classification or popularity data degrades to defaults instead of
/// dropping the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedRecord {
    pub video_id: String,
    pub title: String,
    pub video_url: String,
    pub channel_name: String,
    pub channel_url: String,
    pub sentiment_flag: u8,
    pub emotional_genre: String,
    pub sega_genre: String,
    pub gemini_confidence_score: f64,
    pub comment_density_rating: CommentDensity,
    pub youtube_views: u64,
    pub streaming_count_used: u64,
    pub streaming_platform_used: StreamingPlatform,
    pub normalized_score: f64,
    pub popularity_flag: u8,
}
