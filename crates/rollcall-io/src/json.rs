//! JSON attendance files, one array of `{id, name, time, date}` rows per date.

use crate::{dated_path, write_atomic, SheetRow};
use chrono::NaiveDate;
use rollcall_core::{AttendanceRecord, AttendanceSink, PersistenceError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Serialize)]
struct JsonRow {
    id: Uuid,
    #[serde(flatten)]
    row: SheetRow,
}

/// Writes `attendance_<date>.json` under the output directory.
pub struct JsonSink {
    dir: PathBuf,
}

impl JsonSink {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        dated_path(&self.dir, date, "json")
    }
}

impl AttendanceSink for JsonSink {
    fn write(
        &mut self,
        date: NaiveDate,
        records: &[AttendanceRecord],
    ) -> Result<(), PersistenceError> {
        let path = self.path_for(date);
        let rows: Vec<JsonRow> = records
            .iter()
            .map(|r| JsonRow {
                id: r.id,
                row: SheetRow::from(r),
            })
            .collect();
        let body = serde_json::to_vec_pretty(&rows)
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        write_atomic(&path, &body)?;
        tracing::info!(path = %path.display(), rows = records.len(), "attendance JSON written");
        Ok(())
    }
}
