// Scoring engine.
//
// Pure functions only. The weight table below is the single source for both
// the Rust-side totals and the SQL `CASE` expression the log store
// aggregates with, so the two can't disagree.

use crate::core::reading_log::{LogEntry, MediaType};
use std::collections::HashMap;

impl MediaType {
    /// Points per unit of this media type.
    pub fn weight(&self) -> f64 {
        match self {
            MediaType::Book => 1.0,
            MediaType::Manga => 0.2,
            MediaType::VisualNovel => 1.0 / 350.0,
            MediaType::Anime => 9.5,
            MediaType::RawReading => 1.0 / 350.0,
            MediaType::ReadTime => 0.45,
            MediaType::Listening => 0.45,
        }
    }
}

/// A user's position on a ranked board.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub user_id: u64,
    pub points: f64,
    pub rank: u32,
}

pub fn points_for(media_type: MediaType, amount: f64) -> f64 {
    amount * media_type.weight()
}

/// Weighted sum of a set of log entries.
pub fn total_points(entries: &[LogEntry]) -> f64 {
    entries
        .iter()
        .map(|e| points_for(e.media_type, e.amount))
        .sum()
}

/// Raw amount and weighted points per media type, in `MediaType::ALL` order.
/// Types with no entries are left out.
pub fn points_by_media(entries: &[LogEntry]) -> Vec<(MediaType, f64, f64)> {
    let mut amounts: HashMap<MediaType, f64> = HashMap::new();
    for entry in entries {
        *amounts.entry(entry.media_type).or_default() += entry.amount;
    }

    MediaType::ALL
        .into_iter()
        .filter_map(|media| {
            amounts
                .get(&media)
                .map(|&amount| (media, amount, points_for(media, amount)))
        })
        .collect()
}

/// Rank per-user totals, highest first.
///
/// Equal totals share a rank and the next distinct total skips the tied
/// positions (1, 1, 3), matching SQL `RANK()`. Ties keep their input order.
pub fn rank_standings(mut totals: Vec<(u64, f64)>) -> Vec<Standing> {
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut standings: Vec<Standing> = Vec::with_capacity(totals.len());
    for (index, (user_id, points)) in totals.into_iter().enumerate() {
        let rank = match standings.last() {
            Some(prev) if prev.points == points => prev.rank,
            _ => index as u32 + 1,
        };
        standings.push(Standing {
            user_id,
            points,
            rank,
        });
    }
    standings
}

/// SQL expression for the weighted points of one `logs` row. Unknown media
/// types score zero.
pub fn weighted_points_sql() -> String {
    let mut sql = String::from("CASE");
    for media in MediaType::ALL {
        sql.push_str(&format!(
            " WHEN media_type = '{}' THEN amount * {:?}",
            media.as_db_str(),
            media.weight()
        ));
    }
    sql.push_str(" ELSE 0.0 END");
    sql
}
