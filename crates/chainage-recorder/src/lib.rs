//! Chainage Recorder - Application Library
//!
//! Wires the chainage library into a recording session: a location feed publishes
//! snapshots, a fixed-rate driver matches the latest one against the selected route and
//! appends it to the SRT/CSV logs.

pub mod feed;
pub mod logging;
pub mod session;
pub mod settings;

pub use session::{DriverConfig, RecordingSession, SessionSummary};
pub use settings::Settings;

use chainage_lib::{ChainageError, RouteCatalog, TelemetryLogger};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Error types for the recorder
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error(transparent)]
    Chainage(#[from] ChainageError),

    #[error("Replay track has no points: {}", .0.display())]
    EmptyTrack(PathBuf),

    #[error("Logging driver failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RecorderError>;

/// Current wall-clock time as Unix epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Replay the configured track through a full recording session
pub async fn run(settings: Settings) -> Result<SessionSummary> {
    let catalog = RouteCatalog::load_from_file(&settings.routes)?;
    let route = catalog.get(&settings.route)?;
    tracing::info!(
        route = route.id(),
        length_m = format!("{:.0}", route.total_length()),
        "Selected route"
    );

    let fixes = feed::load_track(&settings.input)?;
    let (publisher, reader) = feed::snapshot_channel();

    let logger = TelemetryLogger::new(&settings.output_dir)
        .with_caption_timing(settings.caption_timing());
    let session = RecordingSession::start(
        logger,
        route,
        reader,
        DriverConfig {
            tick: settings.tick(),
            max_offset_m: settings.max_offset_m,
        },
    )?;

    let feed_cancellation = CancellationToken::new();
    let mut replay = tokio::spawn(feed::replay_track(
        fixes,
        settings.feed_interval(),
        publisher,
        feed_cancellation.clone(),
    ));

    let outcome: Result<()> = tokio::select! {
        published = &mut replay => match published {
            Ok(published) => {
                tracing::info!(published, "Replay complete");
                // Let the driver log the final fix once more before shutting down
                tokio::time::sleep(settings.tick()).await;
                Ok(())
            }
            Err(err) => Err(err.into()),
        },
        signal = tokio::signal::ctrl_c() => {
            feed_cancellation.cancel();
            let replayed = replay.await;
            match signal {
                Ok(()) => {
                    tracing::info!("Interrupted; stopping session");
                    replayed.map(|_| ()).map_err(RecorderError::from)
                }
                Err(err) => Err(err.into()),
            }
        }
    };

    // The driver is always stopped before the logger closes, even when the feed failed;
    // the feed's error takes precedence over a close failure
    let stopped = session.stop().await;
    outcome.and(stopped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_messages() {
        let err = RecorderError::EmptyTrack(PathBuf::from("trip.gpx"));
        assert_eq!(err.to_string(), "Replay track has no points: trip.gpx");

        let err = RecorderError::from(ChainageError::UnknownRoute("BR-101".to_string()));
        assert_eq!(err.to_string(), "Unknown route: BR-101");
    }

    #[test]
    fn test_now_ms_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_ms() > 1_577_836_800_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let routes = dir.path().join("routes.json");
        std::fs::write(
            &routes,
            r#"{"routes": [{"id": "BR-116", "points": [
                {"lat": -22.8698, "lon": -45.3020},
                {"lat": -22.8670, "lon": -45.2900},
                {"lat": -22.8620, "lon": -45.2750},
                {"lat": -22.8560, "lon": -45.2600}
            ]}]}"#,
        )
        .unwrap();

        let track = dir.path().join("trip.gpx");
        std::fs::write(
            &track,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="-22.8698" lon="-45.3020"></trkpt>
    <trkpt lat="-22.8684" lon="-45.2960"></trkpt>
    <trkpt lat="-22.8670" lon="-45.2900"></trkpt>
    <trkpt lat="-22.8645" lon="-45.2825"></trkpt>
  </trkseg></trk>
</gpx>"#,
        )
        .unwrap();

        let output_dir = dir.path().join("logs");
        let settings = Settings {
            routes,
            route: "BR-116".to_string(),
            input: track,
            output_dir: output_dir.clone(),
            tick_ms: 15,
            feed_interval_ms: 20,
            caption_timing: settings::CaptionMode::Elapsed,
            caption_ms: 1000,
            max_offset_m: Some(50.0),
        };

        let summary = tokio::time::timeout(Duration::from_secs(10), run(settings))
            .await
            .expect("session finished")
            .unwrap();
        assert!(summary.samples >= 2);
        assert_eq!(summary.off_route, 0);

        let mut names: Vec<String> = std::fs::read_dir(&output_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("trip_") && names[0].ends_with(".csv"));
        assert!(names[1].starts_with("trip_") && names[1].ends_with(".srt"));

        let captions = std::fs::read_to_string(output_dir.join(&names[1])).unwrap();
        assert!(captions.starts_with("1\n00:00:00,"));
        assert!(captions.contains("BR-116  km "));
    }

    #[tokio::test]
    async fn test_run_unknown_route() {
        let dir = tempfile::tempdir().unwrap();
        let routes = dir.path().join("routes.json");
        std::fs::write(
            &routes,
            r#"{"routes": [{"id": "BR-116", "points": [
                {"lat": -22.8698, "lon": -45.3020},
                {"lat": -22.8670, "lon": -45.2900}
            ]}]}"#,
        )
        .unwrap();

        let settings = Settings {
            routes,
            route: "BR-101".to_string(),
            input: dir.path().join("missing.gpx"),
            output_dir: dir.path().join("logs"),
            tick_ms: 10,
            feed_interval_ms: 10,
            caption_timing: settings::CaptionMode::Fixed,
            caption_ms: 1000,
            max_offset_m: None,
        };

        assert!(matches!(
            run(settings).await,
            Err(RecorderError::Chainage(ChainageError::UnknownRoute(_)))
        ));
        assert!(!dir.path().join("logs").exists());
    }
}
