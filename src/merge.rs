//! Joins the three independently-collected record sets into one row per
//! video.
//!
//! The collector's output is the authoritative key set: every secondary
//! source is optional per key, and a video never disappears just because
//! the classifier or a matcher had nothing for it. Overlay precedence for
//! colliding fields is Collector < Classification < Popularity.

use crate::model::{
    ClassificationRecord, CommentDensity, MergedRecord, PopularityRecord, StreamingPlatform,
    VideoRecord, NOT_SEGA,
};
use std::collections::HashMap;

/// Produce exactly one [`MergedRecord`] per collected video, in collector
/// order. Running it twice on the same inputs yields identical output.
pub fn merge_records(
    videos: &[VideoRecord],
    classifications: &[ClassificationRecord],
    popularity: &[PopularityRecord],
) -> Vec<MergedRecord> {
    let classification_by_id: HashMap<&str, &ClassificationRecord> = classifications
        .iter()
        .map(|c| (c.video_id.as_str(), c))
        .collect();
    let popularity_by_id: HashMap<&str, &PopularityRecord> = popularity
        .iter()
        .map(|p| (p.video_id.as_str(), p))
        .collect();

    videos
        .iter()
        .map(|video| {
            let classification = classification_by_id.get(video.video_id.as_str()).copied();
            let popularity = popularity_by_id.get(video.video_id.as_str()).copied();
            merge_one(video, classification, popularity)
        })
        .collect()
}

fn merge_one(
    video: &VideoRecord,
    classification: Option<&ClassificationRecord>,
    popularity: Option<&PopularityRecord>,
) -> MergedRecord {
    let (sentiment_flag, emotional_genre, sega_genre, gemini_confidence_score, comment_density) =
        match classification {
            Some(c) => (
                c.sentiment_flag,
                c.emotional_genre.clone(),
                c.sega_genre.clone(),
                c.gemini_confidence_score,
                c.comment_density_rating,
            ),
            None => (
                0,
                "Unknown".to_string(),
                NOT_SEGA.to_string(),
                0.0,
                CommentDensity::Low,
            ),
        };

    // Popularity overlays the collector's parsed view count when present.
    let (youtube_views, streaming_count_used, streaming_platform_used, normalized_score, popularity_flag) =
        match popularity {
            Some(p) => (
                p.youtube_views,
                p.streaming_count_used,
                p.streaming_platform_used,
                p.normalized_score,
                p.popularity_flag,
            ),
            None => (video.youtube_views, 0, StreamingPlatform::None, 0.0, 0),
        };

    MergedRecord {
        video_id: video.video_id.clone(),
        title: video.title.clone(),
        video_url: video.video_url.clone(),
        channel_name: video.channel_name.clone(),
        channel_url: video.channel_url.clone(),
        sentiment_flag,
        emotional_genre,
        sega_genre,
        gemini_confidence_score,
        comment_density_rating: comment_density,
        youtube_views,
        streaming_count_used,
        streaming_platform_used,
        normalized_score,
        popularity_flag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_video(video_id: &str, views: &str) -> VideoRecord {
        VideoRecord {
            video_id: video_id.to_string(),
            title: format!("Title {}", video_id),
            video_url: format!("https://www.youtube.com/watch?v={}", video_id),
            channel_name: "Test Channel".to_string(),
            channel_id: "UCtest".to_string(),
            channel_url: "https://www.youtube.com/channel/UCtest".to_string(),
            views: views.to_string(),
            youtube_views: views.parse().unwrap_or(0),
            comments: "great tune".to_string(),
        }
    }

    fn make_classification(video_id: &str) -> ClassificationRecord {
        ClassificationRecord {
            video_id: video_id.to_string(),
            sentiment_flag: 1,
            emotional_genre: "Nostalgia".to_string(),
            sega_genre: "Roots Sega".to_string(),
            gemini_confidence_score: 0.9,
            comment_density_rating: CommentDensity::High,
        }
    }

    fn make_popularity(video_id: &str, score: f64, flag: u8) -> PopularityRecord {
        PopularityRecord {
            video_id: video_id.to_string(),
            youtube_views: 1_000,
            streaming_count_used: 800,
            streaming_platform_used: StreamingPlatform::Deezer,
            normalized_score: score,
            popularity_flag: flag,
        }
    }

    #[test]
    fn test_one_row_per_collected_video_with_subset_sources() {
        let videos = vec![
            make_video("v1", "100"),
            make_video("v2", "200"),
            make_video("v3", "300"),
        ];
        // Classification covers a strict subset, popularity a different one.
        let classifications = vec![make_classification("v1")];
        let popularity = vec![make_popularity("v2", 0.7, 1)];

        let merged = merge_records(&videos, &classifications, &popularity);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].video_id, "v1");
        assert_eq!(merged[0].sentiment_flag, 1);
        assert_eq!(merged[0].popularity_flag, 0);
        assert_eq!(merged[1].video_id, "v2");
        assert_eq!(merged[1].sega_genre, NOT_SEGA);
        assert_eq!(merged[1].normalized_score, 0.7);
        assert_eq!(merged[2].video_id, "v3");
        assert_eq!(merged[2].emotional_genre, "Unknown");
    }

    #[test]
    fn test_popularity_overlays_view_count() {
        // Collector parsed 999 views but the popularity record says 1000;
        // popularity is the later overlay and wins.
        let videos = vec![make_video("v1", "999")];
        let popularity = vec![make_popularity("v1", 0.8, 1)];
        let merged = merge_records(&videos, &[], &popularity);
        assert_eq!(merged[0].youtube_views, 1_000);
    }

    #[test]
    fn test_absent_popularity_keeps_collector_views() {
        let videos = vec![make_video("v1", "12345")];
        let merged = merge_records(&videos, &[], &[]);
        assert_eq!(merged[0].youtube_views, 12_345);
        assert_eq!(merged[0].streaming_platform_used, StreamingPlatform::None);
    }

    #[test]
    fn test_extra_secondary_keys_are_ignored() {
        let videos = vec![make_video("v1", "100")];
        let classifications = vec![make_classification("v1"), make_classification("ghost")];
        let merged = merge_records(&videos, &classifications, &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].video_id, "v1");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let videos = vec![make_video("v1", "100"), make_video("v2", "0")];
        let classifications = vec![make_classification("v1")];
        let popularity = vec![make_popularity("v1", 0.8, 1), make_popularity("v2", 1.0, 1)];

        let first = merge_records(&videos, &classifications, &popularity);
        let second = merge_records(&videos, &classifications, &popularity);

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_output_order_follows_collector() {
        let videos = vec![
            make_video("z", "1"),
            make_video("a", "2"),
            make_video("m", "3"),
        ];
        let merged = merge_records(&videos, &[], &[]);
        let ids: Vec<&str> = merged.iter().map(|m| m.video_id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_end_to_end_scenario() {
        // Two collected videos, classifier only saw v1, normalizer saw both
        // (v2 is the 0 views / 0 streams case).
        let videos = vec![make_video("v1", "1000"), make_video("v2", "0")];
        let classifications = vec![make_classification("v1")];
        let popularity = vec![
            PopularityRecord {
                video_id: "v1".to_string(),
                youtube_views: 1_000,
                streaming_count_used: 800,
                streaming_platform_used: StreamingPlatform::Combined,
                normalized_score: 0.8,
                popularity_flag: 1,
            },
            PopularityRecord {
                video_id: "v2".to_string(),
                youtube_views: 0,
                streaming_count_used: 0,
                streaming_platform_used: StreamingPlatform::None,
                normalized_score: 1.0,
                popularity_flag: 1,
            },
        ];

        let merged = merge_records(&videos, &classifications, &popularity);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].sega_genre, "Roots Sega");
        assert_eq!(merged[0].normalized_score, 0.8);
        assert_eq!(merged[0].popularity_flag, 1);
        // v2 degrades to classification defaults but keeps its popularity.
        assert_eq!(merged[1].sentiment_flag, 0);
        assert_eq!(merged[1].sega_genre, NOT_SEGA);
        assert_eq!(merged[1].normalized_score, 1.0);
        assert_eq!(merged[1].popularity_flag, 1);
    }
}
