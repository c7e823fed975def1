use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Opaque identifier of the unit of work being timed (usually a question)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The session currently being timed
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub subject_id: SubjectId,
    pub started_at: DateTime<Local>,
    pub elapsed_ms: u64,
}

impl ActiveSession {
    pub fn new(subject_id: SubjectId, started_at: DateTime<Local>) -> Self {
        Self {
            subject_id,
            started_at,
            elapsed_ms: 0,
        }
    }
}

/// A stopped session as recorded in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub subject_id: SubjectId,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub elapsed_ms: u64,
}

impl SessionEntry {
    /// True when the session started on the given local calendar day
    pub fn started_on(&self, day: NaiveDate) -> bool {
        self.started_at.date_naive() == day
    }
}

/// Chronological history of stopped sessions, kept in memory only
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    entries: VecDeque<SessionEntry>,
    max_entries: Option<usize>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that evicts its oldest entry once `max_entries` is reached.
    /// The bound is at least 1 so the newest session is always kept.
    pub fn bounded(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries: Some(max_entries),
        }
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn push(&mut self, entry: SessionEntry) {
        if let Some(max) = self.max_entries {
            while self.entries.len() >= max {
                if let Some(evicted) = self.entries.pop_front() {
                    tracing::debug!(
                        subject = %evicted.subject_id,
                        elapsed_ms = evicted.elapsed_ms,
                        "session log full, evicting oldest entry"
                    );
                }
            }
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&SessionEntry> {
        self.entries.back()
    }

    /// Owned copy of the entries in chronological order
    pub fn entries(&self) -> Vec<SessionEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Sum of `elapsed_ms` for sessions that started within the local day
    pub fn total_for_day(&self, day: NaiveDate) -> u64 {
        self.iter()
            .filter(|e| e.started_on(day))
            .map(|e| e.elapsed_ms)
            .sum()
    }

    pub fn total_all_time(&self) -> u64 {
        self.iter().map(|e| e.elapsed_ms).sum()
    }
}

impl<'a> IntoIterator for &'a SessionLog {
    type Item = &'a SessionEntry;
    type IntoIter = std::collections::vec_deque::Iter<'a, SessionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
