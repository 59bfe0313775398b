use anyhow::{Context, Result};
use rollcall_core::{EuclideanMatcher, Roster};
use rollcall_io::{PrecomputedProvider, ReplaySource};
use session::{FlushPolicy, LogAnnotator, Session, StopSignal, SystemClock};
use tracing_subscriber::EnvFilter;

mod config;
mod session;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rollcalld starting");

    let config = config::Config::from_env().context("loading configuration")?;
    tracing::info!(
        threshold = config.accept_threshold,
        roster = %config.roster_dir.display(),
        output = %config.output_dir.display(),
        format = ?config.output_format,
        "configuration loaded"
    );

    // Fail fast on anything that would stop us from recording or saving.
    let mut provider = PrecomputedProvider;
    let roster = Roster::load(&config.roster_dir, &mut provider)?;
    if roster.is_empty() {
        tracing::warn!("roster is empty; every face will be reported as unknown");
    }

    let sink = rollcall_io::open_sink(config.output_format, &config.output_dir)
        .context("opening attendance output")?;
    let frames = ReplaySource::open(&config.frames_path)
        .with_context(|| format!("opening frames {}", config.frames_path.display()))?;

    let stop = StopSignal::default();
    let source = session::spawn_reader(frames, stop.clone())?;
    let pipeline = Session::new(
        roster,
        provider,
        EuclideanMatcher::new(config.accept_threshold),
        LogAnnotator,
        SystemClock,
    );
    let policy = FlushPolicy {
        attempts: config.write_attempts,
        ..FlushPolicy::default()
    };
    let mut done = session::spawn_session(pipeline, source, sink, policy, stop.clone())?;

    tracing::info!("rollcalld ready");

    let reply = tokio::select! {
        reply = &mut done => reply,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("stop requested; finishing session");
            stop.raise();
            done.await
        }
    };
    let report = reply.context("session thread exited without reporting")?;

    tracing::info!(end = ?report.end, recorded = report.stats.recorded, "rollcalld shutting down");
    report.flush.context("attendance could not be saved")?;
    tracing::info!("attendance saved");

    Ok(())
}
