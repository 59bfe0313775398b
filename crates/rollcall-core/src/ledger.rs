//! Attendance ledger: at most one record per identity per calendar date.

use crate::types::UNKNOWN;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// One attendance event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub identity: String,
    /// Local wall-clock time of the sighting.
    pub timestamp: NaiveDateTime,
    /// Calendar date of `timestamp`.
    pub date: NaiveDate,
}

impl AttendanceRecord {
    /// `HH:MM:SS`
    pub fn time_of_day(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The face did not match anyone on the roster.
    Unknown,
    /// The identity already has a record for that date.
    AlreadyMarked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(AttendanceRecord),
    Skipped(SkipReason),
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded(_))
    }
}

/// Append-only attendance log with per-(identity, date) deduplication.
///
/// `marked` always holds exactly the (identity, date) pairs present in
/// `records`; both change together inside [`Ledger::record`].
#[derive(Debug, Default)]
pub struct Ledger {
    marked: HashSet<(String, NaiveDate)>,
    records: Vec<AttendanceRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of `identity` at `at`.
    ///
    /// The unknown label is never recorded. A second sighting on the same
    /// calendar date is skipped; a sighting on a later date is recorded again.
    pub fn record(&mut self, identity: &str, at: NaiveDateTime) -> RecordOutcome {
        if identity == UNKNOWN || identity.is_empty() {
            return RecordOutcome::Skipped(SkipReason::Unknown);
        }

        let date = at.date();
        let key = (identity.to_string(), date);
        if self.marked.contains(&key) {
            return RecordOutcome::Skipped(SkipReason::AlreadyMarked);
        }

        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            timestamp: at,
            date,
        };
        self.marked.insert(key);
        self.records.push(record.clone());

        tracing::info!(
            identity,
            time = %record.time_of_day(),
            date = %record.date,
            "attendance marked"
        );

        RecordOutcome::Recorded(record)
    }

    /// Whether `identity` already has a record on `date`.
    pub fn is_marked(&self, identity: &str, date: NaiveDate) -> bool {
        self.marked.contains(&(identity.to_string(), date))
    }

    /// All records for `date`, in the order they were recorded.
    pub fn export(&self, date: NaiveDate) -> Vec<AttendanceRecord> {
        self.records
            .iter()
            .filter(|r| r.date == date)
            .cloned()
            .collect()
    }

    /// Every date that has at least one record, ascending.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Thread-safe ledger handle for multiple concurrent recorders.
///
/// Each `record` runs its check-then-append under one lock, so two workers
/// seeing the same person on the same date cannot both record them.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn record(&self, identity: &str, at: NaiveDateTime) -> RecordOutcome {
        self.lock().record(identity, at)
    }

    pub fn export(&self, date: NaiveDate) -> Vec<AttendanceRecord> {
        self.lock().export(date)
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.lock().dates()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Ledger state is consistent between calls, so a poisoned lock is still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
