//! Spreadsheet-compatible CSV attendance sheets, one file per date.

use crate::{dated_path, write_atomic, SheetRow, SHEET_HEADER};
use chrono::NaiveDate;
use rollcall_core::{AttendanceRecord, AttendanceSink, PersistenceError};
use std::path::{Path, PathBuf};

/// Writes `attendance_<date>.csv` under the output directory.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        dated_path(&self.dir, date, "csv")
    }
}

impl AttendanceSink for CsvSink {
    fn write(
        &mut self,
        date: NaiveDate,
        records: &[AttendanceRecord],
    ) -> Result<(), PersistenceError> {
        let path = self.path_for(date);
        write_atomic(&path, &render(records)?)?;
        tracing::info!(path = %path.display(), rows = records.len(), "attendance sheet written");
        Ok(())
    }
}

fn csv_err(e: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Serialize(e.to_string())
}

/// Render records as CSV with a header row. Lines end in CRLF.
pub fn render(records: &[AttendanceRecord]) -> Result<Vec<u8>, PersistenceError> {
    let mut wtr = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::CRLF)
        .from_writer(Vec::new());
    wtr.write_record(SHEET_HEADER).map_err(csv_err)?;
    for r in records {
        wtr.write_record(SheetRow::from(r).fields()).map_err(csv_err)?;
    }
    wtr.into_inner().map_err(csv_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record(identity: &str, h: u32, m: u32, s: u32) -> AttendanceRecord {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        AttendanceRecord {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            timestamp: date.and_hms_opt(h, m, s).unwrap(),
            date,
        }
    }

    fn render_str(records: &[AttendanceRecord]) -> String {
        String::from_utf8(render(records).unwrap()).unwrap()
    }

    #[test]
    fn test_render_header_and_rows() {
        let csv = render_str(&[record("alice", 9, 5, 7), record("bob", 13, 0, 0)]);
        assert_eq!(
            csv,
            "Name,Time,Date\r\nalice,09:05:07,2024-03-04\r\nbob,13:00:00,2024-03-04\r\n"
        );
    }

    #[test]
    fn test_render_empty_day_is_header_only() {
        assert_eq!(render_str(&[]), "Name,Time,Date\r\n");
    }

    #[test]
    fn test_render_quotes_special_names() {
        let csv = render_str(&[record("Smith, Jo", 9, 0, 0), record("say \"hi\"", 9, 1, 0)]);
        let lines: Vec<_> = csv.split("\r\n").collect();
        assert_eq!(lines[1], "\"Smith, Jo\",09:00:00,2024-03-04");
        assert_eq!(lines[2], "\"say \"\"hi\"\"\",09:01:00,2024-03-04");
    }

    #[test]
    fn test_rendered_sheet_reads_back() {
        let bytes = render(&[record("Smith, Jo", 9, 0, 0)]).unwrap();
        let mut reader = ::csv::Reader::from_reader(bytes.as_slice());
        assert_eq!(reader.headers().unwrap(), SHEET_HEADER.as_slice());
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "Smith, Jo");
        assert_eq!(&rows[0][1], "09:00:00");
    }

    #[test]
    fn test_write_is_idempotent_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(&tmp.path().join("attendance"));
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let records = vec![record("alice", 9, 0, 0)];

        sink.write(date, &records).unwrap();
        let first = std::fs::read_to_string(sink.path_for(date)).unwrap();
        sink.write(date, &records).unwrap();
        let second = std::fs::read_to_string(sink.path_for(date)).unwrap();

        assert_eq!(first, second);
        assert!(sink.path_for(date).ends_with("attendance_2024-03-04.csv"));
        assert!(!sink.path_for(date).with_extension("tmp").exists());
    }
}
