use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rollcall_core::{AttendanceSink, EmbeddingProvider, EuclideanMatcher, Matcher, Roster};
use rollcall_io::{CsvSink, JsonSink, PrecomputedProvider, SqliteSink, XlsxSink};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a roster directory and list its identities
    Roster {
        /// Directory of labeled reference images
        #[arg(short, long, default_value = "student_images")]
        dir: PathBuf,
    },
    /// Match every face in a frame document against a roster
    Match {
        #[arg(short, long, default_value = "student_images")]
        dir: PathBuf,
        /// Maximum distance accepted as an identification
        #[arg(short, long, default_value_t = 0.6)]
        threshold: f32,
        /// Frame document (JSON) to classify
        probe: PathBuf,
    },
    /// Re-export one stored day from the SQLite attendance store
    Export {
        /// SQLite attendance database
        #[arg(long, default_value = "attendance/attendance.db")]
        db: PathBuf,
        /// Day to export (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Output directory
        #[arg(short, long, default_value = "attendance")]
        out: PathBuf,
        #[arg(short, long, value_enum, default_value_t = SheetFormat::Csv)]
        format: SheetFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SheetFormat {
    Csv,
    Json,
    Xlsx,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Roster { dir } => {
            let roster = Roster::load(&dir, &mut PrecomputedProvider)?;
            tracing::debug!(dir = %dir.display(), identities = roster.len(), "roster inspected");
            println!("{}", roster_summary(&roster));
        }
        Commands::Match {
            dir,
            threshold,
            probe,
        } => {
            if !threshold.is_finite() || threshold < 0.0 {
                bail!("threshold must be a finite, non-negative distance");
            }
            let roster = Roster::load(&dir, &mut PrecomputedProvider)?;
            let image = std::fs::read(&probe)
                .with_context(|| format!("reading {}", probe.display()))?;
            let results = match_frame(&roster, &image, threshold)?;
            tracing::debug!(probe = %probe.display(), threshold, "frame matched");
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Export {
            db,
            date,
            out,
            format,
        } => {
            let written = export_day(&db, date, &out, format)?;
            println!("{written} record(s) for {date} written to {}", out.display());
        }
    }

    Ok(())
}

fn roster_summary(roster: &Roster) -> serde_json::Value {
    serde_json::json!({
        "identities": roster.labels().collect::<Vec<_>>(),
        "count": roster.len(),
        "dimension": roster.dimension(),
    })
}

fn match_frame(roster: &Roster, image: &[u8], threshold: f32) -> Result<serde_json::Value> {
    let faces = PrecomputedProvider
        .faces(image)
        .context("frame document could not be read")?;
    let matcher = EuclideanMatcher::new(threshold);

    let mut results = Vec::with_capacity(faces.len());
    for (bbox, probe) in faces {
        let result = matcher.compare(&probe, roster)?;
        results.push(serde_json::json!({
            "bbox": bbox,
            "identity": result.label(),
            "distance": result.distance,
        }));
    }
    Ok(serde_json::Value::Array(results))
}

fn export_day(db: &Path, date: NaiveDate, out: &Path, format: SheetFormat) -> Result<usize> {
    if !db.exists() {
        bail!("attendance database not found: {}", db.display());
    }
    let store = SqliteSink::open(db)?;
    let records = store.load(date)?;
    if records.is_empty() {
        tracing::warn!(db = %db.display(), %date, "no stored attendance for this date; writing an empty sheet");
    }

    let mut sink: Box<dyn AttendanceSink> = match format {
        SheetFormat::Csv => Box::new(CsvSink::new(out)),
        SheetFormat::Json => Box::new(JsonSink::new(out)),
        SheetFormat::Xlsx => Box::new(XlsxSink::new(out)),
    };
    sink.write(date, &records)?;
    Ok(records.len())
}
