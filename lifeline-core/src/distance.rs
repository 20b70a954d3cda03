//! Great-circle distance on a spherical Earth.

use crate::Coordinate;

/// Mean Earth radius used for every distance in the engine.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates in kilometres.
///
/// The formula is evaluated exactly as
/// `a = sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlon/2)` and
/// `c = 2·atan2(√a, √(1−a))`, with every angle converted to radians first,
/// so results are reproducible for identical IEEE-754 inputs. The function is
/// symmetric and returns zero for identical points.
///
/// # Examples
///
/// ```
/// use lifeline_core::{Coordinate, haversine_km};
///
/// # fn main() -> Result<(), lifeline_core::CoordinateError> {
/// let origin = Coordinate::new(0.0, 0.0)?;
/// let east = Coordinate::new(0.0, 0.08993)?;
/// let distance = haversine_km(origin, east);
/// assert!((distance - 10.0).abs() < 0.1);
/// assert_eq!(haversine_km(origin, origin), 0.0);
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude();
    let lat2 = to.latitude();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let sin_half_lat = (delta_lat / 2.0).sin();
    let sin_half_lon = (delta_lon / 2.0).sin();
    let a = sin_half_lat * sin_half_lat
        + lat1.to_radians().cos() * lat2.to_radians().cos() * sin_half_lon * sin_half_lon;
    // Rounding can push `a` a hair above 1.0 for antipodal points.
    let a = a.min(1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_MEAN_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn coordinate(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).expect("valid coordinate")
    }

    #[rstest]
    #[case(coordinate(0.0, 0.0), coordinate(0.0, 0.08993), 9.999_74)]
    #[case(coordinate(0.0, 0.0), coordinate(0.0, 0.090_000_1), 10.007_55)]
    #[case(coordinate(51.5007, -0.1246), coordinate(40.6892, -74.0445), 5574.84)]
    fn matches_reference_distances(
        #[case] from: Coordinate,
        #[case] to: Coordinate,
        #[case] expected_km: f64,
    ) {
        let distance = haversine_km(from, to);
        assert!(
            (distance - expected_km).abs() < 0.01,
            "expected {expected_km} km, got {distance} km"
        );
    }

    #[rstest]
    fn antipodal_points_are_half_the_circumference() {
        let distance = haversine_km(coordinate(0.0, 0.0), coordinate(0.0, 180.0));
        let half_circumference = std::f64::consts::PI * EARTH_MEAN_RADIUS_KM;
        assert!((distance - half_circumference).abs() < 1e-6);
    }

    #[rstest]
    fn one_degree_of_latitude_is_about_111_km() {
        let distance = haversine_km(coordinate(10.0, 20.0), coordinate(11.0, 20.0));
        assert!((distance - 111.195).abs() < 0.001);
    }
}
