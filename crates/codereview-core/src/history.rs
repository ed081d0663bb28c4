//! Status change events reconstructed from item history.
//!
//! A [`ChangeEvent`] compares two chronologically adjacent snapshots of an
//! item. [`StatusHistory`] walks a whole history and keeps each distinct
//! event once, in chronological order.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use codereview_models::{HistoricalSnapshot, ItemRevision};

/// Status difference between a snapshot and its predecessor.
///
/// Equality and hashing cover all fields; the snapshot is compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    snapshot: HistoricalSnapshot,
    revision_name: String,
    change_date: Option<NaiveDate>,
    change_author: Option<String>,
    current_status: Option<String>,
    previous_status: Option<String>,
}

impl ChangeEvent {
    /// Creates an event for `newer`, comparing against `older` when given.
    pub fn new(
        newer: HistoricalSnapshot,
        revision_name: impl Into<String>,
        change_date: Option<NaiveDate>,
        change_author: Option<String>,
        older: Option<&HistoricalSnapshot>,
    ) -> Self {
        let current_status = newer.status.clone();
        let previous_status = older.and_then(|s| s.status.clone());
        Self {
            snapshot: newer,
            revision_name: revision_name.into(),
            change_date,
            change_author,
            current_status,
            previous_status,
        }
    }

    pub fn snapshot(&self) -> &HistoricalSnapshot {
        &self.snapshot
    }

    pub fn revision_name(&self) -> &str {
        &self.revision_name
    }

    pub fn change_date(&self) -> Option<NaiveDate> {
        self.change_date
    }

    pub fn change_author(&self) -> Option<&str> {
        self.change_author.as_deref()
    }

    pub fn current_status(&self) -> Option<&str> {
        self.current_status.as_deref()
    }

    /// Status of the older snapshot; absent when none was given.
    pub fn previous_status(&self) -> Option<&str> {
        self.previous_status.as_deref()
    }

    /// Returns true if the change happened on `date`. False without a date.
    pub fn was_changed_on(&self, date: NaiveDate) -> bool {
        self.change_date == Some(date)
    }

    /// Returns true if the change happened strictly before `date`. False
    /// without a date.
    pub fn was_changed_earlier_than(&self, date: NaiveDate) -> bool {
        self.change_date.is_some_and(|changed| changed < date)
    }

    /// Returns true if the status actually moved away from `status`.
    pub fn was_status_changed_from(&self, status: Option<&str>) -> bool {
        self.previous_status.as_deref() == status && self.previous_status != self.current_status
    }

    /// One-line summary. Absent values render as `null`.
    pub fn describe(&self) -> String {
        format!(
            "{} ({}) by {} with status changed from {} to {}",
            self.revision_name,
            or_null(self.change_date.map(|d| d.to_string()).as_deref()),
            or_null(self.change_author.as_deref()),
            or_null(self.previous_status.as_deref()),
            or_null(self.current_status.as_deref()),
        )
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.snapshot.item_id, self.describe())
    }
}

fn or_null(value: Option<&str>) -> &str {
    value.unwrap_or("null")
}

/// One entry of an item's history, oldest first when passed to
/// [`StatusHistory::from_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub revision_name: String,
    pub date: Option<NaiveDate>,
    pub author: Option<String>,
    pub snapshot: HistoricalSnapshot,
}

impl From<&ItemRevision> for HistoryEntry {
    fn from(revision: &ItemRevision) -> Self {
        Self {
            revision_name: revision.revision.to_string(),
            date: Some(revision.date.date_naive()),
            author: revision.author.as_ref().map(|a| a.to_string()),
            snapshot: revision.snapshot(),
        }
    }
}

/// Distinct change events of one item, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusHistory {
    events: Vec<ChangeEvent>,
}

impl StatusHistory {
    /// Builds events from chronologically ordered entries.
    ///
    /// The first entry is compared against nothing; each later entry against
    /// its predecessor. Repeated events are kept once.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = HistoryEntry>,
    {
        let mut seen = HashSet::new();
        let mut events = Vec::new();
        let mut previous: Option<HistoricalSnapshot> = None;

        for entry in entries {
            let event = ChangeEvent::new(
                entry.snapshot.clone(),
                entry.revision_name,
                entry.date,
                entry.author,
                previous.as_ref(),
            );
            previous = Some(entry.snapshot);
            if seen.insert(event.clone()) {
                events.push(event);
            }
        }

        Self { events }
    }

    /// Builds events from stored item revisions.
    pub fn from_revisions(revisions: &[ItemRevision]) -> Self {
        Self::from_entries(revisions.iter().map(HistoryEntry::from))
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// Events where the status actually changed.
    pub fn transitions(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.events
            .iter()
            .filter(|e| e.previous_status() != e.current_status())
    }

    /// Latest event that moved the status away from `status`.
    pub fn last_change_from(&self, status: Option<&str>) -> Option<&ChangeEvent> {
        self.events
            .iter()
            .rev()
            .find(|e| e.was_status_changed_from(status))
    }

    pub fn changes_on(&self, date: NaiveDate) -> Vec<&ChangeEvent> {
        self.events.iter().filter(|e| e.was_changed_on(date)).collect()
    }

    pub fn changes_before(&self, date: NaiveDate) -> Vec<&ChangeEvent> {
        self.events
            .iter()
            .filter(|e| e.was_changed_earlier_than(date))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 3, day).unwrap()
    }

    fn snapshot(revision: &str, status: Option<&str>) -> HistoricalSnapshot {
        HistoricalSnapshot::new("X", revision, status)
    }

    fn entry(revision: &str, day: u32, status: &str) -> HistoryEntry {
        HistoryEntry {
            revision_name: revision.to_string(),
            date: Some(date(day)),
            author: Some("alice".to_string()),
            snapshot: snapshot(revision, Some(status)),
        }
    }

    fn hash_of(event: &ChangeEvent) -> u64 {
        let mut hasher = DefaultHasher::new();
        event.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_describe_and_status_change() {
        let older = snapshot("r4", Some("new"));
        let event = ChangeEvent::new(
            snapshot("r5", Some("inReview")),
            "r5",
            Some(date(14)),
            Some("A".to_string()),
            Some(&older),
        );

        assert_eq!(
            event.describe(),
            "r5 (2016-03-14) by A with status changed from new to inReview"
        );
        assert!(event.was_status_changed_from(Some("new")));
        assert!(!event.was_status_changed_from(Some("inReview")));
    }

    #[test]
    fn test_same_status_is_not_a_change() {
        let older = snapshot("r4", Some("open"));
        let event = ChangeEvent::new(snapshot("r5", Some("open")), "r5", None, None, Some(&older));
        assert!(!event.was_status_changed_from(Some("open")));
    }

    #[test]
    fn test_without_older_snapshot() {
        let event = ChangeEvent::new(snapshot("r1", Some("new")), "r1", None, None, None);
        assert_eq!(event.previous_status(), None);
        assert!(event.was_status_changed_from(None));
        assert_eq!(
            event.describe(),
            "r1 (null) by null with status changed from null to new"
        );
    }

    #[test]
    fn test_date_queries() {
        let event = ChangeEvent::new(snapshot("r2", None), "r2", Some(date(10)), None, None);
        assert!(event.was_changed_on(date(10)));
        assert!(!event.was_changed_on(date(11)));
        assert!(event.was_changed_earlier_than(date(11)));
        assert!(!event.was_changed_earlier_than(date(10)));

        let undated = ChangeEvent::new(snapshot("r2", None), "r2", None, None, None);
        assert!(!undated.was_changed_on(date(10)));
        assert!(!undated.was_changed_earlier_than(date(30)));
    }

    #[test]
    fn test_equal_events_hash_equal() {
        let make = || {
            let older = snapshot("r4", Some("new"));
            ChangeEvent::new(
                snapshot("r5", Some("inReview")),
                "r5",
                Some(date(14)),
                Some("A".to_string()),
                Some(&older),
            )
        };
        let (a, b) = (make(), make());
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let other_author = ChangeEvent::new(
            snapshot("r5", Some("inReview")),
            "r5",
            Some(date(14)),
            Some("B".to_string()),
            None,
        );
        assert_ne!(a, other_author);
    }

    #[test]
    fn test_history_walk() {
        let history = StatusHistory::from_entries(vec![
            entry("1", 1, "new"),
            entry("2", 2, "inReview"),
            entry("3", 2, "inReview"),
            entry("4", 5, "done"),
        ]);

        assert_eq!(history.len(), 4);
        assert_eq!(history.transitions().count(), 3);
        assert_eq!(
            history.last_change_from(Some("inReview")).map(|e| e.revision_name()),
            Some("4")
        );
        assert_eq!(
            history.last_change_from(Some("new")).map(|e| e.revision_name()),
            Some("2")
        );
        assert!(history.last_change_from(Some("done")).is_none());
        assert_eq!(history.changes_on(date(2)).len(), 2);
        assert_eq!(history.changes_before(date(5)).len(), 3);
    }

    #[test]
    fn test_history_drops_repeated_events() {
        let repeated = entry("2", 2, "inReview");
        let history = StatusHistory::from_entries(vec![
            entry("1", 1, "new"),
            repeated.clone(),
            entry("1", 1, "new"),
            repeated,
        ]);

        // The second "2" follows "1" again and repeats the first event.
        assert_eq!(history.len(), 3);
    }
}
