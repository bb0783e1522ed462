//! Live city suggestions for the search box.
//!
//! Plain substring match on folded names, in the index's alphabetical order.
//! No relevance ranking: the first `MAX_SUGGESTIONS` alphabetical hits win.

use crate::text::fold_key;
use crate::types::LocalityEntry;

pub const MAX_SUGGESTIONS: usize = 50;
pub const MIN_QUERY_CHARS: usize = 2;

/// Positions in `entries` whose names contain `query`, accent- and case-insensitively.
pub fn filter_positions(query: &str, entries: &[LocalityEntry]) -> Vec<usize> {
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }

    let needle = fold_key(trimmed);
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| fold_key(&entry.display_name).contains(&needle))
        .map(|(pos, _)| pos)
        .take(MAX_SUGGESTIONS)
        .collect()
}

pub fn filter<'a>(query: &str, entries: &'a [LocalityEntry]) -> Vec<&'a LocalityEntry> {
    filter_positions(query, entries)
        .into_iter()
        .map(|pos| &entries[pos])
        .collect()
}
