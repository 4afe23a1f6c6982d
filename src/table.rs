//! Plain-text summary table printed at the end of a pipeline run.

use crate::model::MergedRecord;

const HEADERS: [&str; 8] = [
    "Video URL",
    "Channel URL",
    "Sentiment Flag",
    "Multiplatform Flag",
    "Sega Genre",
    "Emotional Genre",
    "Comment Density",
    "Gemini Conf.",
];

/// Render the merged rows as an aligned text table.
pub fn render_summary(rows: &[MergedRecord]) -> String {
    let cells: Vec<[String; 8]> = rows
        .iter()
        .map(|row| {
            [
                row.video_url.clone(),
                row.channel_url.clone(),
                row.sentiment_flag.to_string(),
                row.popularity_flag.to_string(),
                row.sega_genre.clone(),
                row.emotional_genre.clone(),
                row.comment_density_rating.to_string(),
                format!("{:.2}", row.gemini_confidence_score),
            ]
        })
        .collect();

    let mut widths: [usize; 8] = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(String::from), &widths);
    push_separator(&mut out, &widths);
    for row in &cells {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 8], widths: &[usize; 8]) {
    for (i, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        if i > 0 {
            out.push_str(" | ");
        }
        out.push_str(&format!("{:<width$}", cell, width = width));
    }
    out.push('\n');
}

fn push_separator(out: &mut String, widths: &[usize; 8]) {
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            out.push_str("-+-");
        }
        out.push_str(&"-".repeat(*width));
    }
    out.push('\n');
}
