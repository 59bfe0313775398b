//! rollcall-io: Adapters around the rollcall core.
//!
//! Provides an embedding provider over precomputed frame documents, a
//! JSON-lines frame replay source, and CSV / JSON / XLSX / SQLite attendance
//! sinks.

pub mod csv;
pub mod json;
pub mod precomputed;
pub mod replay;
pub mod sqlite;
pub mod xlsx;

pub use csv::CsvSink;
pub use json::JsonSink;
pub use precomputed::{FaceDocument, FrameDocument, PrecomputedProvider};
pub use replay::ReplaySource;
pub use sqlite::SqliteSink;
pub use xlsx::XlsxSink;

use rollcall_core::{AttendanceRecord, AttendanceSink, PersistenceError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Attendance output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Xlsx,
    Sqlite,
}

#[derive(Error, Debug)]
#[error("unknown output format {0:?} (expected csv, json, xlsx or sqlite)")]
pub struct UnknownFormat(String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Open the sink for `format` rooted at `output_dir`.
///
/// File sinks write one file per date; the SQLite sink keeps every date in
/// `attendance.db`.
pub fn open_sink(
    format: OutputFormat,
    output_dir: &Path,
) -> Result<Box<dyn AttendanceSink + Send>, PersistenceError> {
    Ok(match format {
        OutputFormat::Csv => Box::new(CsvSink::new(output_dir)),
        OutputFormat::Json => Box::new(JsonSink::new(output_dir)),
        OutputFormat::Xlsx => Box::new(XlsxSink::new(output_dir)),
        OutputFormat::Sqlite => {
            std::fs::create_dir_all(output_dir)?;
            Box::new(SqliteSink::open(&output_dir.join(sqlite::DEFAULT_DB_FILE))?)
        }
    })
}

/// Column titles shared by every attendance sheet.
pub const SHEET_HEADER: [&str; 3] = ["Name", "Time", "Date"];

/// One attendance row as it appears in an output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub name: String,
    /// `HH:MM:SS`
    pub time: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

impl From<&AttendanceRecord> for SheetRow {
    fn from(r: &AttendanceRecord) -> Self {
        Self {
            name: r.identity.clone(),
            time: r.time_of_day(),
            date: r.date_string(),
        }
    }
}

impl SheetRow {
    pub fn fields(&self) -> [&str; 3] {
        [self.name.as_str(), self.time.as_str(), self.date.as_str()]
    }
}

/// `<dir>/attendance_<YYYY-MM-DD>.<ext>`
pub(crate) fn dated_path(dir: &Path, date: chrono::NaiveDate, ext: &str) -> PathBuf {
    dir.join(format!("attendance_{}.{ext}", date.format("%Y-%m-%d")))
}

/// Write `contents` to `path` through a sibling temp file and rename, so a
/// failed write never leaves a truncated output behind.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
