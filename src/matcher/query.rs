//! Search query cleaning shared by the streaming matchers.
//!
//! YouTube titles carry decoration ("(Official Video)", "[Lyrics]") and
//! channel names carry suffixes ("Official", "Records", "Topic") that hurt
//! catalog search relevance. Both cleaners strip the known noise and
//! collapse the leftovers.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TITLE_NOISE: Regex = Regex::new(
        r"(?i)\b(official video|clip officiel|official audio|lyrics|lyric video|video clip|prod\.?|produced by)\b"
    )
    .unwrap();
    static ref CHANNEL_NOISE: Regex =
        Regex::new(r"(?i)\b(official|records?|topic|tv|channel|music|videos?)\b").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Clean a video title so it looks like a catalog track name.
///
/// Keeps only the part before the first `(` or `[`, removes noise phrases,
/// collapses whitespace and trims stray hyphens.
pub fn clean_title_for_search(title: &str) -> String {
    let head = title
        .split(['(', '['])
        .next()
        .unwrap_or(title);
    let stripped = TITLE_NOISE.replace_all(head, "");
    collapse(&stripped)
}

/// Clean a channel name so it looks like a catalog artist name.
pub fn clean_channel_name_for_search(channel_name: &str) -> String {
    if channel_name.is_empty() {
        return String::new();
    }
    let stripped = CHANNEL_NOISE.replace_all(channel_name, "");
    collapse(&stripped)
}

fn collapse(s: &str) -> String {
    WHITESPACE
        .replace_all(s, " ")
        .trim_matches(|c: char| c == ' ' || c == '-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_truncated_at_parenthesis() {
        assert_eq!(
            clean_title_for_search("Zoli Fille - Big Frankii (Official Video)"),
            "Zoli Fille - Big Frankii"
        );
    }

    #[test]
    fn test_title_truncated_at_bracket() {
        assert_eq!(clean_title_for_search("Seggae man [Lyrics]"), "Seggae man");
    }

    #[test]
    fn test_title_noise_phrases_removed() {
        assert_eq!(
            clean_title_for_search("Mo Lamour Official Audio"),
            "Mo Lamour"
        );
        assert_eq!(
            clean_title_for_search("Dan Bor Lamer clip officiel"),
            "Dan Bor Lamer"
        );
    }

    #[test]
    fn test_title_whitespace_collapsed_and_hyphens_trimmed() {
        assert_eq!(clean_title_for_search("  Sega   Nou Leritaz -"), "Sega Nou Leritaz");
    }

    #[test]
    fn test_plain_title_unchanged() {
        assert_eq!(clean_title_for_search("Seggae man"), "Seggae man");
    }

    #[test]
    fn test_channel_noise_words_removed() {
        assert_eq!(
            clean_channel_name_for_search("Ras Natty Baby Official"),
            "Ras Natty Baby"
        );
        assert_eq!(clean_channel_name_for_search("Cassiya - Topic"), "Cassiya");
        assert_eq!(
            clean_channel_name_for_search("Alain Ramanisum Records TV"),
            "Alain Ramanisum"
        );
    }

    #[test]
    fn test_channel_empty_stays_empty() {
        assert_eq!(clean_channel_name_for_search(""), "");
    }

    #[test]
    fn test_channel_name_without_noise_unchanged() {
        assert_eq!(clean_channel_name_for_search("Big Frankii"), "Big Frankii");
    }
}
