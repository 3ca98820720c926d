//! Inclusive population range filtering and the match summary shown next to the map.

use std::collections::HashSet;
use std::fmt::Display;

use serde::Serialize;

use crate::range::NumericRange;
use crate::record::Populated;

/// Keep the items whose population is present and, when a range is given, inside it (both ends
/// inclusive). Input order is preserved and the input is left untouched.
pub fn apply<T: Populated + Clone>(items: &[T], range: Option<&NumericRange>) -> Vec<T> {
    items
        .iter()
        .filter(|item| match (item.population(), range) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(population), Some(range)) => range.contains(population),
        })
        .cloned()
        .collect()
}

/// How many rows survived a filter and how many distinct districts they span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub district_count: usize,
    pub record_count: usize,
}

impl Display for MatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records across {} districts",
            self.record_count, self.district_count
        )
    }
}

pub fn summarize<T: Populated>(filtered: &[T]) -> MatchSummary {
    let districts: HashSet<&str> = filtered.iter().map(|item| item.district()).collect();
    MatchSummary {
        district_count: districts.len(),
        record_count: filtered.len(),
    }
}
