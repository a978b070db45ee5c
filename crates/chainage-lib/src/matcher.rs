//! Nearest-segment search and chainage decomposition
//!
//! Every query scans all segments of the route, so a query is O(segment count). This is
//! fine for hand-digitized highway polylines with tens to hundreds of vertices.

use crate::{GeoPoint, RouteModel, projector};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Kilometer + meter decomposition of an along-route distance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chainage {
    pub kilometer: u32,
    /// Always in [0, 999]
    pub meter: u16,
}

impl Chainage {
    /// Decompose a distance in meters.
    ///
    /// The meter part is rounded, and a rounded value of 1000 carries into the next
    /// kilometer (999.6 m is km 1+000, not km 0+1000). Negative or NaN distances
    /// saturate to km 0+000.
    pub fn from_meters(total_m: f64) -> Self {
        let kilometer = (total_m / 1000.0).floor();
        let meter = (total_m - kilometer * 1000.0).round();

        let (kilometer, meter) = if meter >= 1000.0 {
            (kilometer + 1.0, 0.0)
        } else {
            (kilometer, meter)
        };

        Chainage {
            kilometer: kilometer as u32,
            meter: meter as u16,
        }
    }

    /// Total in whole meters
    #[inline]
    pub fn as_meters(&self) -> u64 {
        u64::from(self.kilometer) * 1000 + u64::from(self.meter)
    }
}

impl fmt::Display for Chainage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "km {}+{:03}", self.kilometer, self.meter)
    }
}

/// A fix snapped onto a route
#[derive(Clone, Debug, PartialEq)]
pub struct ChainageFix {
    /// Identifier of the route the fix was matched against
    pub route_id: Arc<str>,
    pub kilometer: u32,
    /// Always in [0, 999]
    pub meter: u16,
    /// Unrounded along-route distance in meters
    pub total_distance_m: f64,
    /// Index of the closest segment (lowest index on ties)
    pub segment_index: usize,
    /// Perpendicular distance from the fix to the matched segment in meters
    pub offset_m: f64,
}

impl ChainageFix {
    /// The kilometer/meter pair of this fix
    #[inline]
    pub fn chainage(&self) -> Chainage {
        Chainage {
            kilometer: self.kilometer,
            meter: self.meter,
        }
    }

    /// Whether the fix lies farther than `max_offset_m` from the route.
    ///
    /// The matcher never rejects a fix on its own; callers that want an off-route
    /// classification pick the threshold.
    #[inline]
    pub fn is_off_route(&self, max_offset_m: f64) -> bool {
        self.offset_m > max_offset_m
    }
}

impl fmt::Display for ChainageFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.route_id, self.chainage())
    }
}

/// Match a single point against `route`.
///
/// Ties between segments resolve to the first one in scan order, so a point sitting on
/// a shared vertex is attributed to the segment ending there.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn match_point(route: &RouteModel, point: GeoPoint) -> ChainageFix {
    let points = route.points();
    let mut best_index = 0;
    let mut best_fraction = 0.0;
    let mut best_offset = f64::MAX;

    for (index, pair) in points.windows(2).enumerate() {
        let projection = projector::project(point, pair[0], pair[1]);
        if projection.offset_m < best_offset {
            best_offset = projection.offset_m;
            best_index = index;
            best_fraction = projection.fraction;
        }
    }

    // NaN offsets never compare less, so surface NaN instead of a fake match at km 0
    if best_offset == f64::MAX {
        best_offset = f64::NAN;
        best_fraction = f64::NAN;
    }

    let cumulative = route.cumulative();
    let segment_length = cumulative[best_index + 1] - cumulative[best_index];
    let total_distance_m = cumulative[best_index] + best_fraction * segment_length;
    let chainage = Chainage::from_meters(total_distance_m);

    tracing::trace!(
        route = route.id(),
        lat = point.lat,
        lon = point.lon,
        segment = best_index,
        offset_m = best_offset,
        %chainage,
        "Matched fix"
    );

    ChainageFix {
        route_id: route.shared_id(),
        kilometer: chainage.kilometer,
        meter: chainage.meter,
        total_distance_m,
        segment_index: best_index,
        offset_m: best_offset,
    }
}

/// Match many points in parallel; the output order follows `points`
pub fn match_batch(route: &RouteModel, points: &[GeoPoint]) -> Vec<ChainageFix> {
    #[cfg(feature = "profiling")]
    profiling::scope!("matcher::match_batch");

    points
        .par_iter()
        .map(|point| match_point(route, *point))
        .collect()
}
