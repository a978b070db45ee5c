//! Chainage Library - Linear Referencing of GPS Fixes Along Highway Routes
//!
//! This library snaps a geographic fix onto a reference route polyline and expresses the
//! result as a chainage (kilometer + meter offset from the route origin). Matched fixes
//! are then recorded as two synchronized logs: an SRT caption track meant to accompany a
//! video recording, and a CSV table.
//!
//! # Architecture
//!
//! - **[`geodesic`]**: Haversine great-circle distance
//! - **[`RouteModel`]**: Immutable polyline with a precomputed cumulative distance table
//! - **[`projector`]**: Point-to-segment projection in a local tangent plane
//! - **[`matcher`]**: Nearest-segment search and km/m decomposition into a [`ChainageFix`]
//! - **[`RouteCatalog`]**: Route definitions loaded from JSON or GPX, keyed by route id
//! - **[`TelemetryLogger`]**: Session writer for the caption track and the tabular log
//!
//! # Concurrency
//!
//! Everything except [`TelemetryLogger`] is read-only after construction and can be shared
//! across threads (routes are handed out as `Arc<RouteModel>`). The logger must be driven
//! by a single owner.

mod catalog;
pub mod geodesic;
pub mod matcher;
mod point;
pub mod projector;
mod route;
pub mod telemetry;

// Public API exports
pub use catalog::{RouteCatalog, RouteDefinition};
pub use matcher::{Chainage, ChainageFix, match_batch, match_point};
pub use point::GeoPoint;
pub use projector::Projection;
pub use route::RouteModel;
pub use telemetry::{
    CaptionTiming, LogSink, SessionState, SinkKind, TelemetryLogger, TelemetrySample,
};

use std::path::PathBuf;

/// Error types for the chainage library
#[derive(Debug, thiserror::Error)]
pub enum ChainageError {
    #[error("Invalid route '{route_id}': at least 2 points are required, got {points}")]
    InvalidRoute { route_id: String, points: usize },

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Duplicate route definition: {0}")]
    DuplicateRoute(String),

    #[error("Failed to open {sink} sink at {}: {source}", .path.display())]
    SinkOpen {
        sink: SinkKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {sink} sink: {source}")]
    SinkWrite {
        sink: SinkKind,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to close {sink} sink: {source}")]
    SinkClose {
        sink: SinkKind,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot {operation} while the logger is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Route catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChainageError {
    /// Whether this error belongs to the sink I/O failure class (open, write or close).
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            ChainageError::SinkOpen { .. }
                | ChainageError::SinkWrite { .. }
                | ChainageError::SinkClose { .. }
                | ChainageError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ChainageError>;
