//! Attendance output seam.

use crate::ledger::AttendanceRecord;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error("database error: {0}")]
    Database(String),
}

/// Receives the finalized attendance of one calendar date.
///
/// Writing the same date twice must leave the same result as writing it once,
/// so a failed write can simply be retried with a fresh export.
pub trait AttendanceSink {
    fn write(&mut self, date: NaiveDate, records: &[AttendanceRecord])
        -> Result<(), PersistenceError>;
}

impl<S: AttendanceSink + ?Sized> AttendanceSink for Box<S> {
    fn write(
        &mut self,
        date: NaiveDate,
        records: &[AttendanceRecord],
    ) -> Result<(), PersistenceError> {
        (**self).write(date, records)
    }
}
