use chrono::{Local, NaiveDate, NaiveDateTime};
use rollcall_core::{
    AttendanceSink, BoundingBox, EmbeddingProvider, Frame, FrameSource, Ledger, Matcher,
    PersistenceError, RecordOutcome, Roster, SkipReason, SourceError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Receives every classified face, e.g. to draw a labeled box on the frame.
pub trait Annotator {
    fn annotate(&mut self, frame: &Frame, face: &BoundingBox, label: &str, outcome: &RecordOutcome);
}

/// Emits one debug event per classified face.
pub struct LogAnnotator;

impl Annotator for LogAnnotator {
    fn annotate(&mut self, frame: &Frame, face: &BoundingBox, label: &str, outcome: &RecordOutcome) {
        let outcome = match outcome {
            RecordOutcome::Recorded(_) => "recorded",
            RecordOutcome::Skipped(SkipReason::AlreadyMarked) => "already_marked",
            RecordOutcome::Skipped(SkipReason::Unknown) => "unknown",
        };
        tracing::debug!(
            frame = frame.sequence,
            label,
            outcome,
            x = face.x,
            y = face.y,
            w = face.width,
            h = face.height,
            "face"
        );
    }
}

/// Source of wall-clock time for attendance records.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Shared stop flag, raised once from outside the session thread.
#[derive(Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub faces: u64,
    pub provider_failures: u64,
    pub recorded: u64,
    pub skipped_unknown: u64,
    pub skipped_marked: u64,
}

/// Why the frame loop stopped.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEnd {
    Stopped,
    Exhausted,
    SourceFailed(String),
}

/// Retry policy for the final attendance write.
#[derive(Debug, Clone, Copy)]
pub struct FlushPolicy {
    pub attempts: u32,
    pub retry_delay: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Single-threaded recognition pipeline: frame → faces → match → ledger.
pub struct Session<P, M, A, C> {
    roster: Roster,
    provider: P,
    matcher: M,
    annotator: A,
    clock: C,
    ledger: Ledger,
    stats: SessionStats,
}

impl<P, M, A, C> Session<P, M, A, C>
where
    P: EmbeddingProvider,
    M: Matcher,
    A: Annotator,
    C: Clock,
{
    pub fn new(roster: Roster, provider: P, matcher: M, annotator: A, clock: C) -> Self {
        Self {
            roster,
            provider,
            matcher,
            annotator,
            clock,
            ledger: Ledger::new(),
            stats: SessionStats::default(),
        }
    }

    /// Classify and record every face in one frame.
    ///
    /// Provider failures skip the frame; a probe the matcher rejects skips
    /// that face. Neither is fatal.
    pub fn process_frame(&mut self, frame: &Frame) -> Vec<(String, RecordOutcome)> {
        self.stats.frames += 1;

        let faces = match self.provider.faces(&frame.data) {
            Ok(faces) => faces,
            Err(e) => {
                self.stats.provider_failures += 1;
                tracing::warn!(frame = frame.sequence, error = %e, "embedding provider failed; frame skipped");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(faces.len());
        for (bbox, probe) in faces {
            self.stats.faces += 1;

            let result = match self.matcher.compare(&probe, &self.roster) {
                Ok(result) => result,
                Err(e) => {
                    self.stats.provider_failures += 1;
                    tracing::warn!(frame = frame.sequence, error = %e, "unusable probe embedding; face skipped");
                    continue;
                }
            };

            let label = result.label().to_string();
            let outcome = self.ledger.record(&label, self.clock.now());
            match &outcome {
                RecordOutcome::Recorded(_) => self.stats.recorded += 1,
                RecordOutcome::Skipped(SkipReason::Unknown) => self.stats.skipped_unknown += 1,
                RecordOutcome::Skipped(SkipReason::AlreadyMarked) => self.stats.skipped_marked += 1,
            }
            tracing::debug!(
                frame = frame.sequence,
                label = %label,
                distance = ?result.distance,
                "face classified"
            );

            self.annotator.annotate(frame, &bbox, &label, &outcome);
            outcomes.push((label, outcome));
        }
        outcomes
    }

    /// Pull frames until the source is exhausted or fails, or `stop` is raised.
    pub fn run<S>(&mut self, source: &mut S, stop: &StopSignal) -> SessionEnd
    where
        S: FrameSource + ?Sized,
    {
        loop {
            if stop.is_raised() {
                return SessionEnd::Stopped;
            }
            match source.next_frame() {
                Ok(Some(frame)) => {
                    self.process_frame(&frame);
                }
                Ok(None) if stop.is_raised() => return SessionEnd::Stopped,
                Ok(None) => return SessionEnd::Exhausted,
                Err(e) => {
                    tracing::error!(error = %e, "frame source failed");
                    return SessionEnd::SourceFailed(e.to_string());
                }
            }
        }
    }

    /// Hand each recorded date (and today) to `sink` once.
    ///
    /// A failed write is retried with a fresh export; the ledger is never
    /// modified. Returns the first error if any date could not be written.
    pub fn flush<K>(&self, sink: &mut K, policy: FlushPolicy) -> Result<(), PersistenceError>
    where
        K: AttendanceSink + ?Sized,
    {
        let mut dates = self.ledger.dates();
        dates.insert(self.clock.now().date());

        let mut first_error = None;
        for date in dates {
            if let Err(e) = write_with_retry(&self.ledger, sink, date, policy) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}

fn write_with_retry<K>(
    ledger: &Ledger,
    sink: &mut K,
    date: NaiveDate,
    policy: FlushPolicy,
) -> Result<(), PersistenceError>
where
    K: AttendanceSink + ?Sized,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        let records = ledger.export(date);
        match sink.write(date, &records) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                tracing::error!(%date, attempt, error = %e, "attendance write failed; retrying");
                std::thread::sleep(policy.retry_delay);
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(%date, attempt, error = %e, "attendance write failed");
                return Err(e);
            }
        }
    }
}

/// Frames forwarded from a reader thread, so a blocking read never keeps the
/// session from noticing the stop signal.
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<Frame, SourceError>>,
    stop: StopSignal,
    poll: Duration,
}

impl FrameSource for ChannelSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        loop {
            if self.stop.is_raised() {
                return Ok(None);
            }
            match self.rx.recv_timeout(self.poll) {
                Ok(item) => return item.map(Some),
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

/// Move `source` onto a dedicated reader thread.
pub fn spawn_reader<S>(mut source: S, stop: StopSignal) -> std::io::Result<ChannelSource>
where
    S: FrameSource + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(8);
    std::thread::Builder::new()
        .name("rollcall-frames".into())
        .spawn(move || loop {
            let item = match source.next_frame() {
                Ok(Some(frame)) => Ok(frame),
                Ok(None) => break,
                Err(e) => Err(e),
            };
            let failed = item.is_err();
            if tx.send(item).is_err() || failed {
                break;
            }
        })?;

    Ok(ChannelSource {
        rx,
        stop,
        poll: Duration::from_millis(100),
    })
}

/// Final report sent back from the session thread.
pub struct SessionReport {
    pub end: SessionEnd,
    pub stats: SessionStats,
    pub flush: Result<(), PersistenceError>,
}

/// Run the session and its final flush on a dedicated OS thread.
///
/// The returned receiver resolves once the attendance has been handed to the
/// sink (or the write has failed for good).
pub fn spawn_session<P, M, A, C, S, K>(
    mut session: Session<P, M, A, C>,
    mut source: S,
    mut sink: K,
    policy: FlushPolicy,
    stop: StopSignal,
) -> std::io::Result<oneshot::Receiver<SessionReport>>
where
    P: EmbeddingProvider + Send + 'static,
    M: Matcher + Send + 'static,
    A: Annotator + Send + 'static,
    C: Clock + Send + 'static,
    S: FrameSource + Send + 'static,
    K: AttendanceSink + Send + 'static,
{
    let (reply_tx, reply_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("rollcall-session".into())
        .spawn(move || {
            tracing::info!("session thread started");
            let end = session.run(&mut source, &stop);
            let stats = session.stats();
            tracing::info!(
                ?end,
                frames = stats.frames,
                faces = stats.faces,
                provider_failures = stats.provider_failures,
                recorded = stats.recorded,
                skipped_unknown = stats.skipped_unknown,
                skipped_marked = stats.skipped_marked,
                records = session.ledger().len(),
                "session ended"
            );

            let flush = session.flush(&mut sink, policy);
            let _ = reply_tx.send(SessionReport { end, stats, flush });
            tracing::info!("session thread exiting");
        })?;

    Ok(reply_rx)
}
