use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::TimeOfDay;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Volume,
    DurationMin,
}

/// A completion record. Derived fields are fixed at creation and never
/// recomputed, even when the owning habit's targets change later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub id: String,
    pub date: NaiveDate,
    pub habit_id: String,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeOfDay>,
    pub duration_min: u32,
    pub volume: u32,
    #[serde(default)]
    pub seq: u64,
}

impl LogEntry {
    pub fn metric(&self, metric: Metric) -> u32 {
        match metric {
            Metric::Volume => self.volume,
            Metric::DurationMin => self.duration_min,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLog {
    pub date: NaiveDate,
    pub habit_id: String,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub start: Option<TimeOfDay>,
    #[serde(default)]
    pub end: Option<TimeOfDay>,
}

impl NewLog {
    pub fn new(habit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            date,
            habit_id: habit_id.into(),
            sets: None,
            reps: None,
            start: None,
            end: None,
        }
    }

    pub fn sets_reps(mut self, sets: u32, reps: u32) -> Self {
        self.sets = Some(sets);
        self.reps = Some(reps);
        self
    }

    pub fn between(mut self, start: TimeOfDay, end: TimeOfDay) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    fn into_entry(self, seq: u64) -> LogEntry {
        let volume = volume_of(self.sets, self.reps);
        let duration_min = duration_of(self.start, self.end);
        LogEntry {
            id: Uuid::new_v4().to_string(),
            date: self.date,
            habit_id: self.habit_id,
            sets: self.sets,
            reps: self.reps,
            start: self.start,
            end: self.end,
            duration_min,
            volume,
            seq,
        }
    }
}

pub fn volume_of(sets: Option<u32>, reps: Option<u32>) -> u32 {
    match (sets, reps) {
        (Some(sets), Some(reps)) if sets > 0 && reps > 0 => sets.saturating_mul(reps),
        _ => 0,
    }
}

pub fn duration_of(start: Option<TimeOfDay>, end: Option<TimeOfDay>) -> u32 {
    match (start, end) {
        (Some(start), Some(end)) => start.minutes_until(end),
        _ => 0,
    }
}

pub trait LogRepository {
    fn add(&mut self, log: NewLog) -> LogEntry;

    fn list_by_date(&self, date: NaiveDate) -> Vec<LogEntry>;

    fn list_all(&self) -> Vec<LogEntry>;

    fn delete_by_habit_and_date(&mut self, habit_id: &str, date: NaiveDate) -> usize;

    fn previous_for_habit(&self, log: &LogEntry) -> Option<LogEntry> {
        self.list_all()
            .into_iter()
            .find(|candidate| {
                candidate.habit_id == log.habit_id && candidate.id != log.id && candidate.seq < log.seq
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "StoredLogs")]
pub struct InMemoryLogRepository {
    entries: Vec<LogEntry>,
    next_seq: u64,
}

#[derive(Deserialize)]
struct StoredLogs {
    #[serde(default)]
    entries: Vec<LogEntry>,
    #[serde(default)]
    next_seq: u64,
}

impl From<StoredLogs> for InMemoryLogRepository {
    fn from(stored: StoredLogs) -> Self {
        let mut repo = Self::from_entries(stored.entries);
        repo.next_seq = repo.next_seq.max(stored.next_seq);
        repo
    }
}

impl InMemoryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(mut entries: Vec<LogEntry>) -> Self {
        entries.sort_by_key(|entry| entry.seq);
        let next_seq = entries.iter().map(|entry| entry.seq + 1).max().unwrap_or(0);
        Self { entries, next_seq }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_log(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.date == date && entry.habit_id == habit_id)
    }
}

impl LogRepository for InMemoryLogRepository {
    fn add(&mut self, log: NewLog) -> LogEntry {
        let seq = self
            .entries
            .iter()
            .map(|entry| entry.seq + 1)
            .max()
            .unwrap_or(0)
            .max(self.next_seq);
        let entry = log.into_entry(seq);
        self.next_seq = seq + 1;
        self.entries.push(entry.clone());
        entry
    }

    fn list_by_date(&self, date: NaiveDate) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.date == date)
            .cloned()
            .collect()
    }

    fn list_all(&self) -> Vec<LogEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    fn delete_by_habit_and_date(&mut self, habit_id: &str, date: NaiveDate) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !(entry.date == date && entry.habit_id == habit_id));
        before - self.entries.len()
    }
}
