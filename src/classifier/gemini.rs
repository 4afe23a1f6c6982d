//! Gemini classification backend.
//!
//! One prompt, one strict-JSON response per video. The remote model is
//! contractually forced to choose from the closed subgenre set, but the
//! parser still repairs the two violations seen in practice: a one-element
//! array wrapping the object, and the forbidden "Unknown" subgenre.

use super::{Classifier, ClassifierError};
use crate::config::ClassifierSettings;
use crate::model::{
    ClassificationRecord, CommentDensity, VideoRecord, DEFAULT_SEGA_GENRE, NOT_SEGA, SEGA_GENRES,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClassifier {
    client: Client,
    api_key: String,
    settings: ClassifierSettings,
}

impl GeminiClassifier {
    pub fn new(api_key: impl Into<String>, settings: ClassifierSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            settings,
        }
    }

    fn build_prompt(video: &VideoRecord) -> String {
        format!(
            r#"You are an expert cultural analyst of Mauritian Sega music.

Video Title: "{title}"
Comments: "{comments}"

Task:
1. Read the comments. If more than half are about how the music made them feel, explaining their emotions, or sharing personal stories (as opposed to just "nice song" or visual comments), set 'sentiment_flag' to 1. Otherwise 0.
2. Identify the specific 'emotional_genre' evoked (e.g., Happiness, Nostalgia, Depression, Party, Sadness).
3. Based on the Video Title and comments:
   a. If the content is clearly not Sega music (irrelevant language, comments about non-Sega genres, unrelated title), set 'sega_genre' to "Not Sega".
   b. If the content is Sega music, you must pick one of: Political Sega, Chagos Sega, Fancy Sega, or Roots Sega. Do NOT use "Unknown". Force a choice based on the best fit.
4. Assess the overall volume and detail of the provided comments. Set 'comment_density_rating' to 'Low' (few, short, generic), 'Medium' (moderate volume, some detail), or 'High' (many, detailed, story-driven).
5. Provide a 'gemini_confidence_score' between 0.0 and 1.0 based on how clear and consistent the title and comments were.

Return pure JSON format:
{{
    "video_id": "{video_id}",
    "sentiment_flag": 0 or 1,
    "emotional_genre": "string",
    "sega_genre": "string",
    "gemini_confidence_score": 0.0 to 1.0,
    "comment_density_rating": "Low", "Medium", or "High"
}}"#,
            title = video.title,
            comments = video.comments,
            video_id = video.video_id,
        )
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn classify(
        &self,
        video: &VideoRecord,
    ) -> Result<ClassificationRecord, ClassifierError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.settings.model, self.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Self::build_prompt(video),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        debug!(
            model = %self.settings.model,
            video_id = %video.video_id,
            "Sending classification request"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout
                } else {
                    ClassifierError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ClassifierError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: GenerateContentResponse = response.json().await.map_err(|e| {
            ClassifierError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                ClassifierError::InvalidResponse("Response carried no candidates".to_string())
            })?;

        parse_classification(&video.video_id, &text)
    }
}

/// Parse the model's JSON text into a record, repairing known violations.
fn parse_classification(
    video_id: &str,
    text: &str,
) -> Result<ClassificationRecord, ClassifierError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ClassifierError::InvalidResponse(format!("Malformed JSON payload: {}", e)))?;

    // The model occasionally wraps the object in a one-element array.
    let object = match value {
        Value::Array(items) => match items.into_iter().next() {
            Some(first) => first,
            None => {
                warn!(video_id = %video_id, "Model returned an empty array");
                return Ok(ClassificationRecord::fallback(video_id));
            }
        },
        other => other,
    };

    let sentiment_flag = match object.get("sentiment_flag").and_then(Value::as_u64) {
        Some(flag) if flag >= 1 => 1,
        _ => 0,
    };

    let emotional_genre = object
        .get("emotional_genre")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();

    let sega_genre = coerce_sega_genre(object.get("sega_genre").and_then(Value::as_str));

    let gemini_confidence_score = object
        .get("gemini_confidence_score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let comment_density_rating = object
        .get("comment_density_rating")
        .and_then(Value::as_str)
        .map(CommentDensity::parse)
        .unwrap_or_default();

    Ok(ClassificationRecord {
        video_id: video_id.to_string(),
        sentiment_flag,
        emotional_genre,
        sega_genre,
        gemini_confidence_score,
        comment_density_rating,
    })
}

/// The subgenre must come from the closed set or be the "Not Sega"
/// sentinel. Anything else, including the forbidden "Unknown", is forced
/// to the default.
fn coerce_sega_genre(genre: Option<&str>) -> String {
    match genre {
        Some(g) if g == NOT_SEGA => g.to_string(),
        Some(g) if SEGA_GENRES.contains(&g) => g.to_string(),
        other => {
            if let Some(g) = other {
                debug!(genre = %g, "Coercing out-of-set subgenre to default");
            }
            DEFAULT_SEGA_GENRE.to_string()
        }
    }
}

// Gemini API wire types

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_object() {
        let text = r#"{
            "video_id": "v1",
            "sentiment_flag": 1,
            "emotional_genre": "Nostalgia",
            "sega_genre": "Roots Sega",
            "gemini_confidence_score": 0.85,
            "comment_density_rating": "High"
        }"#;
        let record = parse_classification("v1", text).unwrap();
        assert_eq!(record.sentiment_flag, 1);
        assert_eq!(record.emotional_genre, "Nostalgia");
        assert_eq!(record.sega_genre, "Roots Sega");
        assert_eq!(record.gemini_confidence_score, 0.85);
        assert_eq!(record.comment_density_rating, CommentDensity::High);
    }

    #[test]
    fn test_parse_array_wrapped_object() {
        let text = r#"[{
            "video_id": "v1",
            "sentiment_flag": 0,
            "emotional_genre": "Party",
            "sega_genre": "Fancy Sega",
            "gemini_confidence_score": 0.6,
            "comment_density_rating": "Medium"
        }]"#;
        let record = parse_classification("v1", text).unwrap();
        assert_eq!(record.sega_genre, "Fancy Sega");
        assert_eq!(record.comment_density_rating, CommentDensity::Medium);
    }

    #[test]
    fn test_parse_empty_array_falls_back() {
        let record = parse_classification("v1", "[]").unwrap();
        assert_eq!(record.emotional_genre, "Error");
        assert_eq!(record.sega_genre, NOT_SEGA);
    }

    #[test]
    fn test_parse_malformed_json_is_error() {
        assert!(matches!(
            parse_classification("v1", "not json at all"),
            Err(ClassifierError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_unknown_genre_coerced_to_default() {
        let text = r#"{
            "video_id": "v1",
            "sentiment_flag": 1,
            "emotional_genre": "Happiness",
            "sega_genre": "Unknown",
            "gemini_confidence_score": 0.4,
            "comment_density_rating": "Low"
        }"#;
        let record = parse_classification("v1", text).unwrap();
        assert_eq!(record.sega_genre, DEFAULT_SEGA_GENRE);
    }

    #[test]
    fn test_missing_genre_coerced_to_default() {
        let text = r#"{"sentiment_flag": 0}"#;
        let record = parse_classification("v1", text).unwrap();
        assert_eq!(record.sega_genre, DEFAULT_SEGA_GENRE);
        assert_eq!(record.emotional_genre, "Unknown");
        assert_eq!(record.gemini_confidence_score, 0.0);
        assert_eq!(record.comment_density_rating, CommentDensity::Low);
    }

    #[test]
    fn test_not_sega_sentinel_kept() {
        let text = r#"{"sega_genre": "Not Sega"}"#;
        let record = parse_classification("v1", text).unwrap();
        assert_eq!(record.sega_genre, NOT_SEGA);
    }

    #[test]
    fn test_confidence_clamped_to_unit_interval() {
        let text = r#"{"sega_genre": "Roots Sega", "gemini_confidence_score": 1.7}"#;
        let record = parse_classification("v1", text).unwrap();
        assert_eq!(record.gemini_confidence_score, 1.0);
    }

    #[test]
    fn test_prompt_embeds_title_and_comments() {
        let video = VideoRecord {
            video_id: "abc".to_string(),
            title: "Zoli Fille".to_string(),
            video_url: String::new(),
            channel_name: String::new(),
            channel_id: String::new(),
            channel_url: String::new(),
            views: "0".to_string(),
            youtube_views: 0,
            comments: "sa fer mwa plore | mo rapel lontan".to_string(),
        };
        let prompt = GeminiClassifier::build_prompt(&video);
        assert!(prompt.contains("Zoli Fille"));
        assert!(prompt.contains("sa fer mwa plore"));
        assert!(prompt.contains("\"abc\""));
    }
}
