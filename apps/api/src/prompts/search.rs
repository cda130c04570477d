//! Literal in-text search over prompt documents, with wrap-around navigation.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One occurrence of the query. `start..end` is a byte range into the
/// searched text; `line` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Next,
    Previous,
}

/// Finds every non-overlapping occurrence of `query` in `text`, in order.
///
/// The query is matched literally. An empty query matches nothing.
pub fn find_matches(text: &str, query: &str, case_sensitive: bool) -> Vec<SearchMatch> {
    if query.is_empty() {
        return Vec::new();
    }

    let regex = match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(regex) => regex,
        Err(e) => {
            warn!("Search query could not be compiled: {e}");
            return Vec::new();
        }
    };

    let mut line = 1;
    let mut scanned = 0;
    regex
        .find_iter(text)
        .map(|m| {
            line += text[scanned..m.start()].matches('\n').count();
            scanned = m.start();
            SearchMatch {
                start: m.start(),
                end: m.end(),
                line,
            }
        })
        .collect()
}

/// Moves the active match one step in `direction`, wrapping at either end.
///
/// With no active match, `Next` lands on the first and `Previous` on the last.
/// `None` when there are no matches.
pub fn step(current: Option<usize>, total: usize, direction: Direction) -> Option<usize> {
    if total == 0 {
        return None;
    }
    let next = match (current, direction) {
        (None, Direction::Next) => 0,
        (None, Direction::Previous) => total - 1,
        (Some(i), Direction::Next) => (i.min(total - 1) + 1) % total,
        (Some(i), Direction::Previous) => (i.min(total - 1) + total - 1) % total,
    };
    Some(next)
}
