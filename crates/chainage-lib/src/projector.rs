//! Point-to-segment projection in a local tangent plane
//!
//! The query point becomes the origin of an equirectangular frame scaled at the segment's
//! mean latitude. This is accurate for segments of a few kilometers and degrades on long or
//! high-latitude segments, which is acceptable for densely sampled road centerlines.

use crate::GeoPoint;

/// Equatorial radius used for the longitude scale (WGS84 semi-major axis)
const WGS84_SEMI_MAJOR_M: f64 = 6_378_137.0;

/// Below this squared segment length (m²) the segment is treated as a single point
const DEGENERATE_SEGMENT_M2: f64 = 1e-6;

/// Result of projecting a point onto one segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Position of the closest point along the segment, clamped to [0, 1]
    pub fraction: f64,
    /// Distance in meters from the query point to the closest point on the segment
    pub offset_m: f64,
}

/// Meters per degree of latitude at `lat_rad`
#[inline]
pub fn meters_per_degree_lat(lat_rad: f64) -> f64 {
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
}

/// Meters per degree of longitude at `lat_rad`
#[inline]
pub fn meters_per_degree_lon(lat_rad: f64) -> f64 {
    (std::f64::consts::PI / 180.0) * WGS84_SEMI_MAJOR_M * lat_rad.cos()
}

/// Project `point` onto the segment `start -> end`.
///
/// The projection never extrapolates past the endpoints. A degenerate (near zero length)
/// segment yields `fraction = 0` and the distance to `start`.
#[inline]
pub fn project(point: GeoPoint, start: GeoPoint, end: GeoPoint) -> Projection {
    let mean_lat = ((start.lat + end.lat) / 2.0).to_radians();
    let m_lat = meters_per_degree_lat(mean_lat);
    let m_lon = meters_per_degree_lon(mean_lat);

    // Local frame with `point` at the origin
    let to_local = |p: GeoPoint| ((p.lon - point.lon) * m_lon, (p.lat - point.lat) * m_lat);
    let (ax, ay) = to_local(start);
    let (bx, by) = to_local(end);

    let (vx, vy) = (bx - ax, by - ay);
    let (wx, wy) = (-ax, -ay);
    let length_sq = vx * vx + vy * vy;

    let fraction = if length_sq < DEGENERATE_SEGMENT_M2 {
        0.0
    } else {
        ((vx * wx + vy * wy) / length_sq).clamp(0.0, 1.0)
    };

    let px = ax + fraction * vx;
    let py = ay + fraction * vy;

    Projection {
        fraction,
        offset_m: px.hypot(py),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesic;

    const A: GeoPoint = GeoPoint::new(-22.8698, -45.3020);
    const B: GeoPoint = GeoPoint::new(-22.8670, -45.2900);

    #[test]
    fn test_midpoint_projects_to_half() {
        let mid = A.lerp(&B, 0.5);
        let projection = project(mid, A, B);

        assert!((projection.fraction - 0.5).abs() < 1e-6);
        assert!(projection.offset_m < 1.0);
    }

    #[test]
    fn test_endpoints() {
        let at_start = project(A, A, B);
        assert_eq!(at_start.fraction, 0.0);
        assert_eq!(at_start.offset_m, 0.0);

        let at_end = project(B, A, B);
        assert_eq!(at_end.fraction, 1.0);
        assert_eq!(at_end.offset_m, 0.0);
    }

    #[test]
    fn test_clamps_before_start_and_past_end() {
        // Extend the segment backwards and forwards along its own direction
        let before = B.lerp(&A, 1.5);
        let projection = project(before, A, B);
        assert_eq!(projection.fraction, 0.0);
        let expected = geodesic::distance(before, A);
        assert!((projection.offset_m - expected).abs() / expected < 0.01);

        let after = A.lerp(&B, 1.5);
        let projection = project(after, A, B);
        assert_eq!(projection.fraction, 1.0);
        let expected = geodesic::distance(after, B);
        assert!((projection.offset_m - expected).abs() / expected < 0.01);
    }

    #[test]
    fn test_perpendicular_offset() {
        // East-west segment on the equator, point 0.001 degrees north of its middle
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 0.01);
        let projection = project(GeoPoint::new(0.001, 0.005), start, end);

        assert!((projection.fraction - 0.5).abs() < 1e-9);
        // 0.001 degrees of latitude at the equator is about 110.57 m
        assert!((projection.offset_m - 110.574).abs() < 0.01, "got {}", projection.offset_m);
    }

    #[test]
    fn test_degenerate_segment() {
        let point = GeoPoint::new(-22.8600, -45.2800);
        let projection = project(point, A, A);

        assert_eq!(projection.fraction, 0.0);
        let expected = geodesic::distance(point, A);
        assert!((projection.offset_m - expected).abs() / expected < 0.01);
    }

    #[test]
    fn test_scale_factors() {
        let equator = 0.0_f64.to_radians();
        assert!((meters_per_degree_lat(equator) - 110_574.3).abs() < 0.1);
        assert!((meters_per_degree_lon(equator) - 111_319.49).abs() < 0.01);

        let high = 60.0_f64.to_radians();
        assert!(meters_per_degree_lon(high) < meters_per_degree_lon(equator) / 1.9);
    }

    #[test]
    fn test_nan_propagates() {
        let projection = project(GeoPoint::new(f64::NAN, -45.29), A, B);
        assert!(projection.offset_m.is_nan());
    }
}
