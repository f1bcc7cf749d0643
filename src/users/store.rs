use time::OffsetDateTime;

use super::dto::{HistoryEntry, Movie};

pub const HISTORY_LIMIT: usize = 20;

/// Symmetric toggle on the liked list: remove the movie if one with the
/// same id is already present, append it otherwise. Applying the same
/// movie twice restores the original set.
pub fn toggle_like(liked: &mut Vec<Movie>, movie: Movie) {
    let before = liked.len();
    liked.retain(|m| m.id != movie.id);
    if liked.len() == before {
        liked.push(movie);
    }
}

/// Move-to-front insert: drop any entry matching the query
/// case-insensitively, prepend a fresh entry, and cap the list at
/// `HISTORY_LIMIT` by trimming the tail.
pub fn record_search(history: &mut Vec<HistoryEntry>, query: &str, now: OffsetDateTime) {
    let folded = query.to_lowercase();
    history.retain(|entry| entry.query.to_lowercase() != folded);
    history.insert(
        0,
        HistoryEntry {
            query: query.to_string(),
            timestamp: now,
        },
    );
    history.truncate(HISTORY_LIMIT);
}
