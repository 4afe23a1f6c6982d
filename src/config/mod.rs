mod file_config;

pub use file_config::{
    AudioConfig, ClassifierConfig, CollectorConfig, CredentialsConfig, FileConfig, MatchersConfig,
    PopularityConfig,
};

use crate::popularity::DEFAULT_POPULARITY_THRESHOLD;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// YouTube channel IDs to scrape, in the order they will be visited.
    pub channel_ids: Vec<String>,
    /// Directory for debug dumps and transcripts.
    pub out_dir: PathBuf,

    pub credentials: Credentials,
    pub collector: CollectorSettings,
    pub classifier: ClassifierSettings,
    pub matchers: MatcherSettings,
    pub popularity: PopularitySettings,
    pub audio: AudioSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and the TOML file config.
    /// TOML values override CLI values; environment variables override
    /// TOML for credentials. Missing required credentials or an empty
    /// channel list are fatal here, before any work starts.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        Self::resolve_with_env(cli, file_config, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::resolve`] but with an injectable environment
    /// lookup so tests do not depend on process-global state.
    pub fn resolve_with_env(
        cli: &CliConfig,
        file_config: Option<FileConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let channel_ids = file.channel_ids.unwrap_or_default();
        if channel_ids.is_empty() {
            bail!("No channel_ids configured; nothing to scrape");
        }

        let out_dir = file
            .out_dir
            .map(PathBuf::from)
            .or_else(|| cli.out_dir.clone())
            .unwrap_or_else(|| PathBuf::from("output"));

        let credentials = Credentials::resolve(file.credentials.unwrap_or_default(), &env)?;

        let collector_file = file.collector.unwrap_or_default();
        let collector_defaults = CollectorSettings::default();
        let collector = CollectorSettings {
            max_videos_per_channel: collector_file
                .max_videos_per_channel
                .unwrap_or(collector_defaults.max_videos_per_channel),
            max_comments: collector_file
                .max_comments
                .unwrap_or(collector_defaults.max_comments),
            delay_ms: collector_file
                .delay_ms
                .unwrap_or(collector_defaults.delay_ms),
            timeout_secs: collector_file
                .timeout_secs
                .unwrap_or(collector_defaults.timeout_secs),
        };

        let classifier_file = file.classifier.unwrap_or_default();
        let classifier_defaults = ClassifierSettings::default();
        let classifier = ClassifierSettings {
            model: classifier_file.model.unwrap_or(classifier_defaults.model),
            delay_secs: classifier_file
                .delay_secs
                .unwrap_or(classifier_defaults.delay_secs),
            timeout_secs: classifier_file
                .timeout_secs
                .unwrap_or(classifier_defaults.timeout_secs),
        };

        let matchers_file = file.matchers.unwrap_or_default();
        let matcher_defaults = MatcherSettings::default();
        let matchers = MatcherSettings {
            delay_ms: matchers_file.delay_ms.unwrap_or(matcher_defaults.delay_ms),
            timeout_secs: matchers_file
                .timeout_secs
                .unwrap_or(matcher_defaults.timeout_secs),
            dump_json: matchers_file
                .dump_json
                .unwrap_or(matcher_defaults.dump_json),
        };

        let popularity_file = file.popularity.unwrap_or_default();
        let threshold = popularity_file
            .threshold
            .unwrap_or(DEFAULT_POPULARITY_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            bail!("popularity.threshold must be in [0, 1], got {}", threshold);
        }
        let popularity = PopularitySettings { threshold };

        let audio_file = file.audio.unwrap_or_default();
        let audio_defaults = AudioSettings::default();
        let audio = AudioSettings {
            audio_dir: audio_file
                .audio_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| out_dir.join("audio")),
            transcript_dir: audio_file
                .transcript_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| out_dir.join("transcripts")),
            max_downloads_per_run: audio_file
                .max_downloads_per_run
                .unwrap_or(audio_defaults.max_downloads_per_run),
            delay_secs: audio_file.delay_secs.unwrap_or(audio_defaults.delay_secs),
            ytdlp_path: audio_file.ytdlp_path.unwrap_or(audio_defaults.ytdlp_path),
            whisper_path: audio_file
                .whisper_path
                .unwrap_or(audio_defaults.whisper_path),
            whisper_model: audio_file
                .whisper_model
                .unwrap_or(audio_defaults.whisper_model),
        };

        Ok(Self {
            channel_ids,
            out_dir,
            credentials,
            collector,
            classifier,
            matchers,
            popularity,
            audio,
        })
    }
}

/// Resolved API credentials.
///
/// YouTube, Gemini and Supabase are required for a pipeline run; Spotify is
/// optional and its absence disables that matcher rather than failing.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub youtube_api_key: String,
    pub gemini_api_key: String,
    pub spotify: Option<SpotifyCredentials>,
    pub supabase_url: String,
    pub supabase_key: String,
}

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    fn resolve(file: CredentialsConfig, env: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let youtube_api_key = env("YOUTUBE_API_KEY")
            .or(file.youtube_api_key)
            .filter(|s| !s.is_empty());
        let Some(youtube_api_key) = youtube_api_key else {
            bail!("Missing YOUTUBE_API_KEY (environment or [credentials] in config file)");
        };

        let gemini_api_key = env("GEMINI_API_KEY")
            .or(file.gemini_api_key)
            .filter(|s| !s.is_empty());
        let Some(gemini_api_key) = gemini_api_key else {
            bail!("Missing GEMINI_API_KEY (environment or [credentials] in config file)");
        };

        let supabase_url = env("SUPABASE_URL")
            .or(file.supabase_url)
            .filter(|s| !s.is_empty());
        let supabase_key = env("SUPABASE_KEY")
            .or(file.supabase_key)
            .filter(|s| !s.is_empty());
        let (Some(supabase_url), Some(supabase_key)) = (supabase_url, supabase_key) else {
            bail!("Missing SUPABASE_URL or SUPABASE_KEY (environment or [credentials] in config file)");
        };

        let spotify_client_id = env("SPOTIFY_CLIENT_ID")
            .or(file.spotify_client_id)
            .filter(|s| !s.is_empty());
        let spotify_client_secret = env("SPOTIFY_CLIENT_SECRET")
            .or(file.spotify_client_secret)
            .filter(|s| !s.is_empty());
        let spotify = match (spotify_client_id, spotify_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Self {
            youtube_api_key,
            gemini_api_key,
            spotify,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_key,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub max_videos_per_channel: u32,
    pub max_comments: u32,
    pub delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            max_videos_per_channel: 50,
            max_comments: 100,
            delay_ms: 100,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub model: String,
    /// Sleep between calls; the free tier allows 15 requests per minute.
    pub delay_secs: u64,
    pub timeout_secs: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            delay_secs: 4,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatcherSettings {
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub dump_json: bool,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            timeout_secs: 30,
            dump_json: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PopularitySettings {
    pub threshold: f64,
}

impl Default for PopularitySettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_POPULARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub audio_dir: PathBuf,
    pub transcript_dir: PathBuf,
    pub max_downloads_per_run: u32,
    pub delay_secs: u64,
    pub ytdlp_path: String,
    pub whisper_path: String,
    pub whisper_model: String,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("output/audio"),
            transcript_dir: PathBuf::from("output/transcripts"),
            max_downloads_per_run: 100,
            delay_secs: 5,
            ytdlp_path: "yt-dlp".to_string(),
            whisper_path: "whisper".to_string(),
            whisper_model: "small".to_string(),
        }
    }
}
