//! TelemetryLogger - Synchronized caption track and tabular log for a recording session
//!
//! A session writes two files side by side:
//!
//! - `trip_<stamp>.srt`: one caption block per sample, timed from the session start so the
//!   track lines up with a video recording started at the same moment
//! - `trip_<stamp>.csv`: one row per sample under a fixed header
//!
//! The logger moves through `Idle -> Active -> Closed`. It is not meant to be shared:
//! a single owner (typically one writer task) serializes `start`, `append_sample` and `stop`.

use crate::{ChainageError, ChainageFix, GeoPoint, Result};

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Header row of the tabular log
pub const TABLE_HEADER: &str = "timestamp_ms,lat,lon,br,km,metros,vel_kmh";

/// Highest `_<n>` suffix tried when session file names collide
const MAX_STEM_SUFFIX: u32 = 1000;

/// Default caption duration when it cannot be derived from the sample cadence
pub const DEFAULT_CAPTION_MS: i64 = 1000;

/// Which of the two session outputs an error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkKind {
    /// SRT caption track
    Caption,
    /// CSV table
    Table,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Caption => f.write_str("caption"),
            SinkKind::Table => f.write_str("table"),
        }
    }
}

/// Lifecycle state of a [`TelemetryLogger`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    /// Terminal
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Active => f.write_str("active"),
            SessionState::Closed => f.write_str("closed"),
        }
    }
}

/// How the end time of each caption is chosen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionTiming {
    /// Caption ends at the sample's own timestamp, so consecutive captions cover the real
    /// elapsed time between samples. A sample at or before the cursor gets `fallback_ms`.
    Elapsed { fallback_ms: i64 },
    /// Caption ends a fixed duration after the sample timestamp, regardless of cadence.
    Fixed { duration_ms: i64 },
}

impl Default for CaptionTiming {
    fn default() -> Self {
        CaptionTiming::Elapsed {
            fallback_ms: DEFAULT_CAPTION_MS,
        }
    }
}

impl CaptionTiming {
    /// End time of a caption starting at `cursor_ms` for a sample taken at `now_ms`
    pub fn end_ms(&self, cursor_ms: i64, now_ms: i64) -> i64 {
        match *self {
            CaptionTiming::Elapsed { .. } if now_ms > cursor_ms => now_ms,
            CaptionTiming::Elapsed { fallback_ms } => cursor_ms + fallback_ms,
            CaptionTiming::Fixed { duration_ms } => now_ms + duration_ms,
        }
    }
}

/// One logging tick: where the vehicle was, where that is on the route, and how fast
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetrySample {
    pub timestamp_ms: i64,
    pub position: GeoPoint,
    pub fix: ChainageFix,
    pub speed_kmh: f64,
}

/// Destination for one of the session outputs.
///
/// `finish` flushes buffered data and makes it durable; its error is what `stop` reports.
pub trait LogSink: Write + Send {
    fn finish(&mut self) -> std::io::Result<()>;
}

impl LogSink for BufWriter<File> {
    fn finish(&mut self) -> std::io::Result<()> {
        self.flush()?;
        self.get_ref().sync_all()
    }
}

/// Open sinks plus the caption cursors of an active session
struct ActiveSession {
    caption: Box<dyn LogSink>,
    table: Box<dyn LogSink>,
    /// Session start; caption times are measured from here
    origin_ms: i64,
    /// Sequence number of the next caption block
    next_sequence: u64,
    /// Absolute time where the next caption starts
    cursor_ms: i64,
}

enum Session {
    Idle,
    Active(ActiveSession),
    Closed,
}

/// Writes matched samples of one session into a caption track and a tabular log
pub struct TelemetryLogger {
    output_dir: PathBuf,
    caption_timing: CaptionTiming,
    caption_path: Option<PathBuf>,
    table_path: Option<PathBuf>,
    session: Session,
    samples_written: u64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TelemetryLogger {
    /// Create an idle logger writing into `output_dir` (created on `start` if absent)
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            caption_timing: CaptionTiming::default(),
            caption_path: None,
            table_path: None,
            session: Session::Idle,
            samples_written: 0,
        }
    }

    /// Choose how caption end times are derived
    pub fn with_caption_timing(mut self, caption_timing: CaptionTiming) -> Self {
        self.caption_timing = caption_timing;
        self
    }

    /// Open both files for a session starting at `now_ms` (Unix epoch milliseconds).
    ///
    /// Existing files are never overwritten: if another session already used this second's
    /// stamp, a `_<n>` suffix is appended. On failure nothing stays open and the logger
    /// remains idle, so `start` may be retried.
    pub fn start(&mut self, now_ms: i64) -> Result<()> {
        self.ensure_state(SessionState::Idle, "start")?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| ChainageError::SinkOpen {
            sink: SinkKind::Caption,
            path: self.output_dir.clone(),
            source,
        })?;

        let SessionFiles {
            caption_path,
            caption,
            table_path,
            table,
        } = create_session_files(&self.output_dir, &file_stamp(now_ms))?;

        self.start_with_sinks(now_ms, Box::new(caption), Box::new(table))?;
        tracing::info!(
            caption = %caption_path.display(),
            table = %table_path.display(),
            "Telemetry session started"
        );
        self.caption_path = Some(caption_path);
        self.table_path = Some(table_path);
        Ok(())
    }

    /// Start a session on caller-provided sinks instead of files in the output directory
    pub fn start_with_sinks(
        &mut self,
        now_ms: i64,
        caption: Box<dyn LogSink>,
        mut table: Box<dyn LogSink>,
    ) -> Result<()> {
        self.ensure_state(SessionState::Idle, "start")?;

        writeln!(table, "{TABLE_HEADER}").map_err(|source| ChainageError::SinkWrite {
            sink: SinkKind::Table,
            source,
        })?;

        self.session = Session::Active(ActiveSession {
            caption,
            table,
            origin_ms: now_ms,
            next_sequence: 1,
            cursor_ms: now_ms,
        });
        Ok(())
    }

    /// Record one sample taken at `now_ms`
    #[allow(clippy::too_many_arguments)]
    pub fn append_sample(
        &mut self,
        now_ms: i64,
        lat: f64,
        lon: f64,
        route_id: &str,
        kilometer: u32,
        meter: u16,
        speed_kmh: f64,
    ) -> Result<()> {
        let caption_timing = self.caption_timing;
        let state = self.state();
        let Session::Active(session) = &mut self.session else {
            return Err(ChainageError::InvalidState {
                operation: "append a sample",
                state,
            });
        };

        let start_ms = session.cursor_ms;
        let end_ms = caption_timing.end_ms(start_ms, now_ms);

        write!(
            session.caption,
            "{}\n{} --> {}\n{}  km {}+{:03}  |  {:.1} km/h\n\n",
            session.next_sequence,
            format_timestamp(start_ms - session.origin_ms),
            format_timestamp(end_ms - session.origin_ms),
            route_id,
            kilometer,
            meter,
            speed_kmh
        )
        .map_err(|source| ChainageError::SinkWrite {
            sink: SinkKind::Caption,
            source,
        })?;
        session.next_sequence += 1;
        session.cursor_ms = end_ms;

        writeln!(
            session.table,
            "{now_ms},{lat},{lon},{route_id},{kilometer},{meter},{speed_kmh:.1}"
        )
        .map_err(|source| ChainageError::SinkWrite {
            sink: SinkKind::Table,
            source,
        })?;

        self.samples_written += 1;
        Ok(())
    }

    /// Record a matched sample
    pub fn append(&mut self, sample: &TelemetrySample) -> Result<()> {
        self.append_sample(
            sample.timestamp_ms,
            sample.position.lat,
            sample.position.lon,
            &sample.fix.route_id,
            sample.fix.kilometer,
            sample.fix.meter,
            sample.speed_kmh,
        )
    }

    /// Close both sinks and end the session.
    ///
    /// Both sinks are always closed and the logger ends up `Closed`. Every close failure
    /// is logged; the first one is returned.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_state(SessionState::Active, "stop")?;
        let Session::Active(session) = std::mem::replace(&mut self.session, Session::Closed) else {
            return Ok(());
        };

        let result = close_session(session);
        tracing::info!(samples = self.samples_written, "Telemetry session stopped");
        result
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        match self.session {
            Session::Idle => SessionState::Idle,
            Session::Active(_) => SessionState::Active,
            Session::Closed => SessionState::Closed,
        }
    }

    /// Path of the caption track, once a file session has started
    pub fn caption_path(&self) -> Option<&Path> {
        self.caption_path.as_deref()
    }

    /// Path of the tabular log, once a file session has started
    pub fn table_path(&self) -> Option<&Path> {
        self.table_path.as_deref()
    }

    /// Number of samples appended so far
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    fn ensure_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        let state = self.state();
        if state == expected {
            Ok(())
        } else {
            Err(ChainageError::InvalidState { operation, state })
        }
    }
}

impl Drop for TelemetryLogger {
    fn drop(&mut self) {
        if let Session::Active(session) = std::mem::replace(&mut self.session, Session::Closed) {
            tracing::warn!("Telemetry logger dropped while active; closing sinks");
            // Failures are already logged by close_session
            let _ = close_session(session);
        }
    }
}

impl fmt::Debug for TelemetryLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryLogger")
            .field("output_dir", &self.output_dir)
            .field("caption_timing", &self.caption_timing)
            .field("state", &self.state())
            .field("samples_written", &self.samples_written)
            .finish()
    }
}

/// Both files of a freshly created session
struct SessionFiles {
    caption_path: PathBuf,
    caption: BufWriter<File>,
    table_path: PathBuf,
    table: BufWriter<File>,
}

/// Create `trip_<stamp>.srt` and `.csv` without touching existing files.
///
/// When a previous session already owns the stamp, `trip_<stamp>_1`, `trip_<stamp>_2` and so
/// on are tried. On failure no file created here is left behind.
fn create_session_files(dir: &Path, stamp: &str) -> Result<SessionFiles> {
    for suffix in 0..MAX_STEM_SUFFIX {
        let stem = if suffix == 0 {
            format!("trip_{stamp}")
        } else {
            format!("trip_{stamp}_{suffix}")
        };
        let caption_path = dir.join(format!("{stem}.srt"));
        let table_path = dir.join(format!("{stem}.csv"));

        let caption = match create_new(&caption_path) {
            Ok(caption) => caption,
            Err(source) if source.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(ChainageError::SinkOpen {
                    sink: SinkKind::Caption,
                    path: caption_path,
                    source,
                });
            }
        };

        match create_new(&table_path) {
            Ok(table) => {
                return Ok(SessionFiles {
                    caption_path,
                    caption,
                    table_path,
                    table,
                });
            }
            Err(source) => {
                drop(caption);
                // Only the empty caption file created just above
                if let Err(err) = std::fs::remove_file(&caption_path) {
                    tracing::warn!(
                        path = %caption_path.display(),
                        error = %err,
                        "Failed to remove caption file of an aborted session"
                    );
                }
                if source.kind() == io::ErrorKind::AlreadyExists {
                    continue;
                }
                return Err(ChainageError::SinkOpen {
                    sink: SinkKind::Table,
                    path: table_path,
                    source,
                });
            }
        }
    }

    Err(ChainageError::SinkOpen {
        sink: SinkKind::Caption,
        path: dir.join(format!("trip_{stamp}.srt")),
        source: io::Error::new(
            io::ErrorKind::AlreadyExists,
            "every session file name for this second is taken",
        ),
    })
}

fn create_new(path: &Path) -> io::Result<BufWriter<File>> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(BufWriter::new)
}

/// Finish both sinks, logging every failure and returning the first
fn close_session(mut session: ActiveSession) -> Result<()> {
    let mut first_error = None;

    for (sink, writer) in [
        (SinkKind::Caption, &mut session.caption),
        (SinkKind::Table, &mut session.table),
    ] {
        if let Err(source) = writer.finish() {
            tracing::error!(%sink, error = %source, "Failed to close telemetry sink");
            first_error.get_or_insert(ChainageError::SinkClose { sink, source });
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// `yyyyMMdd_HHmmss` in UTC, used to name session files
fn file_stamp(now_ms: i64) -> String {
    match chrono::DateTime::<chrono::Utc>::from_timestamp_millis(now_ms) {
        Some(time) => time.format("%Y%m%d_%H%M%S").to_string(),
        None => now_ms.to_string(),
    }
}

/// Format a caption offset as `HH:MM:SS,mmm`. Negative offsets clamp to zero.
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}
