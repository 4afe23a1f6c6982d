use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    /// YouTube channel IDs (UC..) to scrape.
    pub channel_ids: Option<Vec<String>>,
    pub out_dir: Option<String>,

    // Feature configs
    pub credentials: Option<CredentialsConfig>,
    pub collector: Option<CollectorConfig>,
    pub classifier: Option<ClassifierConfig>,
    pub matchers: Option<MatchersConfig>,
    pub popularity: Option<PopularityConfig>,
    pub audio: Option<AudioConfig>,
}

/// API credentials. Each value can also be supplied through the
/// environment variable of the same (upper-cased) name, which takes
/// precedence over the file.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CredentialsConfig {
    pub youtube_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CollectorConfig {
    pub max_videos_per_channel: Option<u32>,
    pub max_comments: Option<u32>,
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model: Option<String>,
    pub delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MatchersConfig {
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    /// Dump raw matcher output to JSON files under out_dir for auditing.
    pub dump_json: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PopularityConfig {
    /// Normalized score at or above which popularity_flag becomes 1.
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AudioConfig {
    pub audio_dir: Option<String>,
    pub transcript_dir: Option<String>,
    pub max_downloads_per_run: Option<u32>,
    pub delay_secs: Option<u64>,
    pub ytdlp_path: Option<String>,
    pub whisper_path: Option<String>,
    pub whisper_model: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
