use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::message::CandidateResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateEntry {
    pub target: String,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Most recent unsubscribe target per sender, in first-seen order.
///
/// An entry is only replaced by a candidate with a strictly later date, so
/// for equal dates the first merged candidate stays. Undated candidates sort
/// below every dated one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    index: HashMap<String, usize>,
    entries: Vec<(String, AggregateEntry)>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, sender: &str) -> Option<&AggregateEntry> {
        self.index.get(sender).map(|&i| &self.entries[i].1)
    }

    /// Entries in the order their sender was first seen.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregateEntry)> {
        self.entries
            .iter()
            .map(|(sender, entry)| (sender.as_str(), entry))
    }

    /// Folds one batch of processing results, in list order.
    pub fn merge<I>(&mut self, results: I)
    where
        I: IntoIterator<Item = Option<CandidateResult>>,
    {
        for candidate in results.into_iter().flatten() {
            self.merge_one(candidate);
        }
    }

    pub fn merge_one(&mut self, candidate: CandidateResult) {
        let entry = AggregateEntry {
            target: candidate.target,
            observed_at: candidate.observed_at,
        };

        match self.index.get(&candidate.sender).copied() {
            Some(i) => {
                let stored = &mut self.entries[i].1;
                if entry.observed_at > stored.observed_at {
                    *stored = entry;
                }
            }
            None => {
                self.index.insert(candidate.sender.clone(), self.entries.len());
                self.entries.push((candidate.sender, entry));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2026, 9, day, 12, 0, 0).unwrap())
    }

    fn candidate(sender: &str, target: &str, observed_at: Option<DateTime<Utc>>) -> Option<CandidateResult> {
        Some(CandidateResult {
            sender: sender.to_string(),
            target: target.to_string(),
            observed_at,
        })
    }

    #[test]
    fn later_date_wins_in_either_order() {
        let older = candidate("a@x.com", "https://x.com/old", at(1));
        let newer = candidate("a@x.com", "https://x.com/new", at(5));

        let mut forward = Aggregate::new();
        forward.merge([older.clone(), newer.clone()]);
        let mut backward = Aggregate::new();
        backward.merge([newer, older]);

        assert_eq!(forward.get("a@x.com").unwrap().target, "https://x.com/new");
        assert_eq!(backward.get("a@x.com").unwrap().target, "https://x.com/new");
    }

    #[test]
    fn merging_twice_changes_nothing() {
        let results = vec![
            candidate("a@x.com", "https://x.com/1", at(3)),
            None,
            candidate("b@y.com", "mailto:b@y.com", None),
            candidate("a@x.com", "https://x.com/2", at(2)),
        ];

        let mut once = Aggregate::new();
        once.merge(results.clone());
        let mut twice = Aggregate::new();
        twice.merge(results.clone());
        twice.merge(results);

        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn equal_dates_keep_first_seen() {
        let mut aggregate = Aggregate::new();
        aggregate.merge([
            candidate("a@x.com", "https://x.com/first", at(4)),
            candidate("a@x.com", "https://x.com/second", at(4)),
        ]);
        assert_eq!(aggregate.get("a@x.com").unwrap().target, "https://x.com/first");

        aggregate.merge([
            candidate("u@x.com", "https://x.com/undated-1", None),
            candidate("u@x.com", "https://x.com/undated-2", None),
        ]);
        assert_eq!(aggregate.get("u@x.com").unwrap().target, "https://x.com/undated-1");
    }

    #[test]
    fn dated_candidate_replaces_undated() {
        let mut aggregate = Aggregate::new();
        aggregate.merge([candidate("a@x.com", "https://x.com/undated", None)]);
        aggregate.merge([candidate("a@x.com", "https://x.com/dated", at(1))]);
        aggregate.merge([candidate("a@x.com", "https://x.com/undated-again", None)]);

        let entry = aggregate.get("a@x.com").unwrap();
        assert_eq!(entry.target, "https://x.com/dated");
        assert_eq!(entry.observed_at, at(1));
    }

    #[test]
    fn replacement_keeps_first_seen_position() {
        let mut aggregate = Aggregate::new();
        aggregate.merge([
            candidate("a@x.com", "https://x.com/1", at(1)),
            candidate("b@x.com", "https://x.com/2", at(1)),
            candidate("a@x.com", "https://x.com/3", at(9)),
        ]);

        let senders: Vec<&str> = aggregate.iter().map(|(sender, _)| sender).collect();
        assert_eq!(senders, ["a@x.com", "b@x.com"]);
    }
}
