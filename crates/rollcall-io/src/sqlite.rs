//! SQLite attendance store.
//!
//! Every date lives in one `attendance` table. `UNIQUE(identity, date)`
//! together with `INSERT OR IGNORE` makes repeated writes of the same day
//! harmless, and lets a later process re-export a day that failed to reach
//! its spreadsheet.

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_core::{AttendanceRecord, AttendanceSink, PersistenceError};
use rusqlite::{params, Connection};
use std::path::Path;
use uuid::Uuid;

pub const DEFAULT_DB_FILE: &str = "attendance.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS attendance (
    id        TEXT PRIMARY KEY,
    identity  TEXT NOT NULL,
    date      TEXT NOT NULL,
    time      TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    UNIQUE (identity, date)
);
CREATE INDEX IF NOT EXISTS attendance_date ON attendance (date);
";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub struct SqliteSink {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> PersistenceError {
    PersistenceError::Database(e.to_string())
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Stored records for `date`, in recording order.
    pub fn load(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, PersistenceError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, identity, timestamp FROM attendance
                 WHERE date = ?1 ORDER BY timestamp, rowid",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, identity, timestamp) = row.map_err(db_err)?;
            let id = Uuid::parse_str(&id)
                .map_err(|e| PersistenceError::Database(format!("bad record id {id:?}: {e}")))?;
            let timestamp = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
                .map_err(|e| {
                    PersistenceError::Database(format!("bad timestamp {timestamp:?}: {e}"))
                })?;
            records.push(AttendanceRecord {
                id,
                identity,
                timestamp,
                date: timestamp.date(),
            });
        }
        Ok(records)
    }
}

impl AttendanceSink for SqliteSink {
    fn write(
        &mut self,
        date: NaiveDate,
        records: &[AttendanceRecord],
    ) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction().map_err(db_err)?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO attendance (id, identity, date, time, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(db_err)?;
            for r in records.iter().filter(|r| r.date == date) {
                inserted += stmt
                    .execute(params![
                        r.id.to_string(),
                        r.identity,
                        r.date_string(),
                        r.time_of_day(),
                        r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    ])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;

        tracing::info!(
            date = %date,
            rows = records.len(),
            inserted,
            "attendance stored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(identity: &str, day: u32, h: u32) -> AttendanceRecord {
        let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        AttendanceRecord {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            timestamp: date.and_hms_opt(h, 15, 30).unwrap(),
            date,
        }
    }

    #[test]
    fn test_write_then_load_roundtrips_day() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let records = vec![record("alice", 4, 9), record("bob", 4, 10)];

        sink.write(date, &records).unwrap();
        assert_eq!(sink.load(date).unwrap(), records);
    }

    #[test]
    fn test_repeated_write_is_idempotent() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let records = vec![record("alice", 4, 9)];

        sink.write(date, &records).unwrap();
        sink.write(date, &records).unwrap();
        // A different record for the same person and day is ignored too.
        sink.write(date, &[record("alice", 4, 11)]).unwrap();

        let stored = sink.load(date).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].time_of_day(), "09:15:30");
    }

    #[test]
    fn test_days_are_kept_apart() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let d4 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let d5 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        sink.write(d4, &[record("alice", 4, 9)]).unwrap();
        sink.write(d5, &[record("alice", 5, 9)]).unwrap();

        assert_eq!(sink.load(d4).unwrap().len(), 1);
        assert_eq!(sink.load(d5).unwrap().len(), 1);
        assert!(sink
            .load(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_write_ignores_records_from_other_dates() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let d4 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        sink.write(d4, &[record("alice", 4, 9), record("bob", 5, 9)])
            .unwrap();
        let d5 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(sink.load(d5).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_file_keeps_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_DB_FILE);
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        SqliteSink::open(&path)
            .unwrap()
            .write(date, &[record("alice", 4, 9)])
            .unwrap();

        let reopened = SqliteSink::open(&path).unwrap();
        assert_eq!(reopened.load(date).unwrap().len(), 1);
    }
}
