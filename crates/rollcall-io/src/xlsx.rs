//! Excel workbooks, one `attendance_<date>.xlsx` per date with a single
//! `Attendance` worksheet.

use crate::{dated_path, write_atomic, SheetRow, SHEET_HEADER};
use chrono::NaiveDate;
use rollcall_core::{AttendanceRecord, AttendanceSink, PersistenceError};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};

pub const SHEET_NAME: &str = "Attendance";

pub struct XlsxSink {
    dir: PathBuf,
}

impl XlsxSink {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        dated_path(&self.dir, date, "xlsx")
    }
}

impl AttendanceSink for XlsxSink {
    fn write(
        &mut self,
        date: NaiveDate,
        records: &[AttendanceRecord],
    ) -> Result<(), PersistenceError> {
        let path = self.path_for(date);
        let body = render(records).map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        write_atomic(&path, &body)?;
        tracing::info!(path = %path.display(), rows = records.len(), "attendance workbook written");
        Ok(())
    }
}

/// Build the workbook in memory: a bold header row, then one row per record.
pub fn render(records: &[AttendanceRecord]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, title) in (0u16..).zip(SHEET_HEADER) {
        sheet.write_string_with_format(0, col, title, &bold)?;
    }
    for (row, record) in (1u32..).zip(records) {
        for (col, field) in (0u16..).zip(SheetRow::from(record).fields()) {
            sheet.write_string(row, col, field)?;
        }
    }
    sheet.set_column_width(0, 24)?;
    sheet.set_column_width(1, 10)?;
    sheet.set_column_width(2, 12)?;

    workbook.save_to_buffer()
}
