//! Geographic point type shared by every module

use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees (no datum correction is applied anywhere)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new point from latitude and longitude in degrees
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check if the point has finite, in-range coordinates.
    ///
    /// The matcher does not reject invalid points (NaN propagates into the result),
    /// so callers validate upstream with this.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Linear interpolation in degree space, `t` in [0, 1]
    #[inline]
    pub fn lerp(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }
}

/// `geo` stores x = longitude, y = latitude
impl From<geo::Point<f64>> for GeoPoint {
    #[inline]
    fn from(point: geo::Point<f64>) -> Self {
        GeoPoint::new(point.y(), point.x())
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    #[inline]
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.lon, point.lat)
    }
}

impl From<&gpx::Waypoint> for GeoPoint {
    #[inline]
    fn from(waypoint: &gpx::Waypoint) -> Self {
        waypoint.point().into()
    }
}
