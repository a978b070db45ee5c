//! Reference route storage
//!
//! This module provides the `RouteModel` struct: an immutable polyline approximating a
//! road centerline, with the cumulative along-route distance precomputed at every vertex.

use crate::{ChainageError, GeoPoint, Result, geodesic};
use std::sync::Arc;

/// A named reference polyline with its cumulative distance table
#[derive(Clone, Debug)]
pub struct RouteModel {
    /// Route identifier, e.g. "BR-116"
    id: Arc<str>,
    /// Ordered reference points (at least 2)
    points: Vec<GeoPoint>,
    /// `cumulative[i]` is the path length from point 0 to point i in meters
    cumulative: Vec<f64>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RouteModel {
    /// Create a new RouteModel from an ordered list of points
    ///
    /// # Arguments
    /// * `id` - Route identifier carried into every fix matched against this route
    /// * `points` - Ordered reference points
    ///
    /// # Returns
    /// The route, or `InvalidRoute` if fewer than 2 points were supplied
    pub fn new(id: impl Into<Arc<str>>, points: Vec<GeoPoint>) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("route::new");
        let id = id.into();

        if points.len() < 2 {
            return Err(ChainageError::InvalidRoute {
                route_id: id.to_string(),
                points: points.len(),
            });
        }

        let cumulative = Self::compute_cumulative(&points);
        tracing::debug!(
            route = %id,
            points = points.len(),
            length_m = format!("{:.1}", cumulative[cumulative.len() - 1]),
            "Route model built"
        );

        Ok(RouteModel {
            id,
            points,
            cumulative,
        })
    }

    /// Cumulative distance table in a single pass over consecutive pairs
    fn compute_cumulative(points: &[GeoPoint]) -> Vec<f64> {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative.push(total);

        for pair in points.windows(2) {
            total += geodesic::distance(pair[0], pair[1]);
            cumulative.push(total);
        }

        cumulative
    }

    /// Route identifier
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared handle to the identifier (cheap to clone into fixes)
    #[inline]
    pub fn shared_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    /// Reference points in route order
    #[inline]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Cumulative distance at every vertex, in meters
    #[inline]
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Number of segments (always at least 1)
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    /// Endpoints of segment `index`, if it exists
    #[inline]
    pub fn segment(&self, index: usize) -> Option<(GeoPoint, GeoPoint)> {
        Some((*self.points.get(index)?, *self.points.get(index + 1)?))
    }

    /// Geodesic length of segment `index` in meters
    #[inline]
    pub fn segment_length(&self, index: usize) -> Option<f64> {
        Some(self.cumulative.get(index + 1)? - self.cumulative.get(index)?)
    }

    /// Total route length in meters
    ///
    /// This is O(1) as the value is the last entry of the cumulative table.
    #[inline]
    pub fn total_length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }
}
