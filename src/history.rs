use crate::person::{PersonLabel, RecognizedPerson};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::trace;

/// Default number of entries kept in the recognition history
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// One recognized person, as remembered by the history log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub person: RecognizedPerson,
    pub label: PersonLabel,
    pub captured_at: DateTime<Local>,
}

impl HistoryEntry {
    pub fn new(person: RecognizedPerson, captured_at: DateTime<Local>) -> Self {
        let label = PersonLabel::of(&person);
        Self {
            person,
            label,
            captured_at,
        }
    }

    /// Wall-clock time of capture as `HH:MM:SS`
    pub fn time_of_day(&self) -> String {
        self.captured_at.format("%H:%M:%S").to_string()
    }
}

/// Bounded, newest-first log of recognition events
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryLog {
    /// Create an empty log holding at most `capacity` entries
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            panic!("History capacity must be greater than 0");
        }

        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert one entry per person at the front, in the order given, evicting
    /// the oldest entry whenever the log grows past capacity.
    pub fn append(&mut self, persons: &[RecognizedPerson], timestamp: DateTime<Local>) {
        for person in persons {
            self.entries
                .push_front(HistoryEntry::new(person.clone(), timestamp));

            while self.entries.len() > self.capacity {
                if let Some(evicted) = self.entries.pop_back() {
                    trace!("Evicted history entry for {}", evicted.person.identity);
                }
            }
        }
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Owned copy of the entries, newest first
    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
