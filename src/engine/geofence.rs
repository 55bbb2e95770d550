//! Great-circle distance check between a reported position and a site.

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance in meters on a spherical earth.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` a hair outside [0, 1] for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Returns the distance, rounded to whole meters, and whether it lies within
/// `radius_meters`. GPS fixes are not finer than a meter, so the comparison is
/// made on the rounded value the user is shown.
pub fn within_radius(
    reported_lat: f64,
    reported_lon: f64,
    site_lat: f64,
    site_lon: f64,
    radius_meters: f64,
) -> (f64, bool) {
    let distance = distance_meters(reported_lat, reported_lon, site_lat, site_lon).round();
    (distance, distance <= radius_meters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(distance_meters(-6.2, 106.8, -6.2, 106.8), 0.0);
        assert_eq!(within_radius(45.0, 7.0, 45.0, 7.0, 0.0), (0.0, true));
    }

    #[test]
    fn distance_is_symmetric_and_non_negative() {
        let pairs = [
            (-6.175392, 106.827153, -6.186486, 106.834091),
            (51.5, -0.12, 48.85, 2.35),
            (0.0, 179.9, 0.0, -179.9),
            (89.0, 0.0, -89.0, 180.0),
        ];
        for (a, b, c, d) in pairs {
            let there = distance_meters(a, b, c, d);
            let back = distance_meters(c, d, a, b);
            assert!(there >= 0.0);
            assert!((there - back).abs() < 1e-6, "{there} vs {back}");
        }
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance_meters(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "{d}");
    }

    #[test]
    fn three_hundred_meter_boundary() {
        let (d, inside) = within_radius(0.0, 0.0027, 0.0, 0.0, 300.0);
        assert_eq!(d, 300.0);
        assert!(inside);

        let (d, inside) = within_radius(0.0, 0.0028, 0.0, 0.0, 300.0);
        assert_eq!(d, 311.0);
        assert!(!inside);
    }
}
