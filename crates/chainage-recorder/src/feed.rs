//! Location feed and the snapshot handoff to the logging driver.
//!
//! The feed and the driver run at independent rates. The feed is the single writer of a
//! `tokio::sync::watch` channel holding the latest [`PositionSnapshot`]; every publish
//! swaps the whole value, so a driver tick always reads a consistent
//! `(position, speed)` pair and never a half-updated one.
//!
//! Live device sensors are outside this crate; the feed here replays a recorded GPX track.

use chainage_lib::{GeoPoint, geodesic};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{RecorderError, Result, now_ms};

/// Conversion factor from m/s to km/h
const MPS_TO_KMH: f64 = 3.6;

/// Immutable view of the latest fix, as seen by the logging driver
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSnapshot {
    /// Unix epoch milliseconds at which the fix was published
    pub timestamp_ms: i64,
    pub position: GeoPoint,
    /// Ground speed in m/s, never negative
    pub speed_mps: f64,
}

impl PositionSnapshot {
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps * MPS_TO_KMH
    }
}

/// Write side of the snapshot handoff
#[derive(Debug)]
pub struct SnapshotPublisher {
    sender: watch::Sender<Option<PositionSnapshot>>,
}

/// Read side of the snapshot handoff
pub type SnapshotReader = watch::Receiver<Option<PositionSnapshot>>;

/// Create a handoff channel with no fix yet
pub fn snapshot_channel() -> (SnapshotPublisher, SnapshotReader) {
    let (sender, reader) = watch::channel(None);
    (SnapshotPublisher { sender }, reader)
}

impl SnapshotPublisher {
    /// Replace the current snapshot. Negative speeds are clamped to zero.
    pub fn publish(&self, timestamp_ms: i64, position: GeoPoint, speed_mps: f64) {
        let snapshot = PositionSnapshot {
            timestamp_ms,
            position,
            speed_mps: speed_mps.max(0.0),
        };
        // send_replace keeps the value even when no reader is attached
        self.sender.send_replace(Some(snapshot));
    }

    /// Latest published snapshot
    pub fn latest(&self) -> Option<PositionSnapshot> {
        *self.sender.borrow()
    }
}

/// One point of a recorded track
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackFix {
    pub position: GeoPoint,
    /// Recorded speed in m/s, when the track carries one
    pub speed_mps: Option<f64>,
}

/// Read every track point of a GPX file in order
pub fn load_track<P: AsRef<Path>>(path: P) -> Result<Vec<TrackFix>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(chainage_lib::ChainageError::from)?;
    let gpx = gpx::read(std::io::BufReader::new(file)).map_err(chainage_lib::ChainageError::from)?;

    let fixes: Vec<TrackFix> = gpx
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|segment| &segment.points)
        .map(|waypoint| TrackFix {
            position: GeoPoint::from(waypoint),
            speed_mps: waypoint.speed,
        })
        .collect();

    if fixes.is_empty() {
        return Err(RecorderError::EmptyTrack(path.to_path_buf()));
    }

    tracing::info!(path = %path.display(), fixes = fixes.len(), "Loaded replay track");
    Ok(fixes)
}

/// Speed for every fix: the recorded value, or the distance from the previous fix divided
/// by the replay interval. The first fix without a recorded speed is stationary.
pub fn derive_speeds(fixes: &[TrackFix], interval: Duration) -> Vec<f64> {
    let seconds = interval.as_secs_f64();
    let mut previous: Option<GeoPoint> = None;

    fixes
        .iter()
        .map(|fix| {
            let derived = match previous {
                Some(prev) if seconds > 0.0 => geodesic::distance(prev, fix.position) / seconds,
                _ => 0.0,
            };
            previous = Some(fix.position);
            fix.speed_mps.unwrap_or(derived).max(0.0)
        })
        .collect()
}

/// Publish `fixes` one per `interval` until exhausted or cancelled.
///
/// Returns the number of fixes published. The publisher is consumed, so readers observe the
/// feed ending once this returns.
pub async fn replay_track(
    fixes: Vec<TrackFix>,
    interval: Duration,
    publisher: SnapshotPublisher,
    cancellation: CancellationToken,
) -> usize {
    let speeds = derive_speeds(&fixes, interval);
    let mut published = 0;

    for (fix, speed_mps) in fixes.iter().zip(speeds) {
        publisher.publish(now_ms(), fix.position, speed_mps);
        published += 1;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancellation.cancelled() => {
                tracing::debug!(published, "Replay feed cancelled");
                return published;
            }
        }
    }

    tracing::debug!(published, "Replay feed finished");
    published
}
