//! Great-circle surface distance

use crate::GeoPoint;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
///
/// Total, symmetric, and exactly 0 for coincident points. The square root argument
/// is clamped to 1.0 so rounding on near-antipodal inputs cannot push `asin` out of
/// its domain.
#[inline]
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    // Not `f64::min`, which would turn a NaN into 1.0
    let root = h.sqrt();
    let root = if root > 1.0 { 1.0 } else { root };

    2.0 * EARTH_RADIUS_M * root.asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Distance, Haversine};

    #[test]
    fn test_distance_identity() {
        let points = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-22.8698, -45.3020),
            GeoPoint::new(89.9, 179.9),
            GeoPoint::new(-90.0, -180.0),
        ];
        for p in points {
            assert_eq!(distance(p, p), 0.0);
        }
    }

    #[test]
    fn test_distance_symmetric() {
        let a = GeoPoint::new(-22.8698, -45.3020);
        let b = GeoPoint::new(-22.8560, -45.2600);
        assert_eq!(distance(a, b), distance(b, a));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // 2πR / 360
        let d = distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111_194.93).abs() < 0.1, "got {d}");
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let d = distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn test_triangle_inequality() {
        let a = GeoPoint::new(-22.8698, -45.3020);
        let b = GeoPoint::new(-22.8670, -45.2900);
        let c = GeoPoint::new(-22.8560, -45.2600);
        assert!(distance(a, c) <= distance(a, b) + distance(b, c) + 1e-9);
    }

    #[test]
    fn test_agrees_with_geo_haversine() {
        // geo uses a slightly larger mean radius (6371008.8 m), so compare relatively
        let a = GeoPoint::new(-22.8698, -45.3020);
        let b = GeoPoint::new(-22.8620, -45.2750);
        let ours = distance(a, b);
        let reference = Haversine.distance(geo::Point::from(a), geo::Point::from(b));
        assert!(((ours - reference) / reference).abs() < 1e-5);
    }

    #[test]
    fn test_nan_propagates() {
        let d = distance(GeoPoint::new(f64::NAN, 0.0), GeoPoint::new(0.0, 0.0));
        assert!(d.is_nan());
    }
}
