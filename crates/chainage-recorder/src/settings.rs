use chainage_lib::CaptionTiming;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// How caption end times are chosen
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CaptionMode {
    /// Each caption lasts until the next sample
    Elapsed,
    /// Each caption lasts `--caption-ms` after its sample
    Fixed,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Chainage Recorder - snaps GPS fixes onto a highway route and records SRT/CSV telemetry
pub struct Settings {
    /// Route catalog file (JSON, or GPX with one track per route)
    #[clap(long, value_name = "FILE", default_value = "data/routes.json")]
    pub routes: PathBuf,

    /// Identifier of the route to match against
    #[clap(long, default_value = "BR-116")]
    pub route: String,

    /// GPX track whose points are replayed as the live location feed
    #[clap(short, long, value_name = "GPX")]
    pub input: PathBuf,

    /// Directory receiving the trip_<stamp>.srt and trip_<stamp>.csv files
    #[clap(short, long, value_name = "DIR", default_value = "logs")]
    pub output_dir: PathBuf,

    /// Logging cadence in milliseconds
    #[clap(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Delay between replayed fixes in milliseconds
    #[clap(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub feed_interval_ms: u64,

    /// Caption timing mode
    #[clap(long, value_enum, default_value = "elapsed")]
    pub caption_timing: CaptionMode,

    /// Caption duration in milliseconds (fallback duration in elapsed mode)
    #[clap(long, default_value = "1000")]
    pub caption_ms: i64,

    /// Warn about fixes farther than this from the route, in meters
    #[clap(long, value_name = "METERS")]
    pub max_offset_m: Option<f64>,
}

impl Settings {
    /// Parse the command line, exiting with clap's usage message on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed_interval_ms)
    }

    pub fn caption_timing(&self) -> CaptionTiming {
        match self.caption_timing {
            CaptionMode::Elapsed => CaptionTiming::Elapsed {
                fallback_ms: self.caption_ms,
            },
            CaptionMode::Fixed => CaptionTiming::Fixed {
                duration_ms: self.caption_ms,
            },
        }
    }
}
