//! Recording session: the fixed-rate logging driver and its shutdown ordering.
//!
//! The driver task owns the [`TelemetryLogger`] for the whole session, so appends are
//! serialized by construction. On shutdown the driver is cancelled and joined first; only
//! then is the logger it hands back stopped, which rules out a write after the sinks close.

use chainage_lib::{RouteModel, TelemetryLogger, TelemetrySample, match_point};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::feed::SnapshotReader;
use crate::{Result, now_ms};

/// Driver parameters
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Logging cadence
    pub tick: Duration,
    /// Warn about fixes farther than this from the route
    pub max_offset_m: Option<f64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            max_offset_m: None,
        }
    }
}

/// Counters reported when a session ends
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Samples written to both logs
    pub samples: u64,
    /// Ticks skipped because no fix had been published yet
    pub ticks_without_fix: u64,
    /// Samples whose offset exceeded `max_offset_m` (still recorded)
    pub off_route: u64,
    /// Samples that failed to write
    pub write_errors: u64,
}

/// A running session: logger started, driver ticking.
///
/// Dropping the session without calling [`stop`](Self::stop) still cancels the driver; the
/// logger is then closed when the driver task drops it.
pub struct RecordingSession {
    driver: JoinHandle<(TelemetryLogger, SessionSummary)>,
    cancellation: DropGuard,
}

impl RecordingSession {
    /// Start the logger at the current time and spawn the driver.
    ///
    /// Fails without spawning anything if the logger cannot open its sinks.
    pub fn start(
        mut logger: TelemetryLogger,
        route: Arc<RouteModel>,
        reader: SnapshotReader,
        config: DriverConfig,
    ) -> Result<Self> {
        logger.start(now_ms())?;

        let cancellation = CancellationToken::new();
        let driver = tokio::spawn(drive(
            logger,
            route,
            reader,
            config,
            cancellation.clone(),
        ));

        Ok(Self {
            driver,
            cancellation: cancellation.drop_guard(),
        })
    }

    /// Stop the driver, then close the logger.
    ///
    /// A close failure is returned after the driver has already stopped; whatever was
    /// written stays on disk.
    pub async fn stop(self) -> Result<SessionSummary> {
        let Self {
            driver,
            cancellation,
        } = self;
        cancellation.disarm().cancel();
        let (mut logger, summary) = driver.await?;

        logger.stop()?;
        tracing::info!(
            samples = summary.samples,
            off_route = summary.off_route,
            write_errors = summary.write_errors,
            "Recording session finished"
        );
        Ok(summary)
    }
}

/// Tick loop: read the latest snapshot, match it, append it
async fn drive(
    mut logger: TelemetryLogger,
    route: Arc<RouteModel>,
    reader: SnapshotReader,
    config: DriverConfig,
    cancellation: CancellationToken,
) -> (TelemetryLogger, SessionSummary) {
    let mut summary = SessionSummary::default();

    // First tick one period after start, so the first caption covers a full interval
    let mut ticker = tokio::time::interval_at(Instant::now() + config.tick, config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Copy out so the channel lock is not held while matching and writing
        let snapshot = *reader.borrow();
        let Some(snapshot) = snapshot else {
            summary.ticks_without_fix += 1;
            tracing::debug!("No fix yet; skipping tick");
            continue;
        };

        let fix = match_point(&route, snapshot.position);
        if config
            .max_offset_m
            .is_some_and(|max_offset_m| fix.is_off_route(max_offset_m))
        {
            summary.off_route += 1;
            tracing::warn!(
                lat = snapshot.position.lat,
                lon = snapshot.position.lon,
                offset_m = format!("{:.0}", fix.offset_m),
                %fix,
                "Fix is off route"
            );
        }

        let sample = TelemetrySample {
            timestamp_ms: now_ms(),
            position: snapshot.position,
            fix,
            speed_kmh: snapshot.speed_kmh(),
        };

        match logger.append(&sample) {
            Ok(()) => summary.samples += 1,
            Err(err) => {
                summary.write_errors += 1;
                tracing::error!(error = %err, "Failed to append telemetry sample");
            }
        }
    }

    tracing::debug!(samples = summary.samples, "Logging driver stopped");
    (logger, summary)
}
