//! ECEF, geodetic and topocentric coordinates
use std::f64::consts::PI;

use nalgebra::{Matrix3, Vector3};

use crate::constants::{EARTH_SEMI_MAJOR_AXIS_WGS84, EARTH_SEMI_MINOR_AXIS_WGS84};

/// Below this horizontal distance, a line of sight is considered vertical
const MIN_HORIZONTAL_DISTANCE_M: f64 = 1.0E-4;

/// First eccentricity squared (WGS84)
fn first_eccentricity_squared() -> f64 {
    let (a, b) = (EARTH_SEMI_MAJOR_AXIS_WGS84, EARTH_SEMI_MINOR_AXIS_WGS84);
    1.0 - (b * b) / (a * a)
}

/// Second eccentricity squared (WGS84)
fn second_eccentricity_squared() -> f64 {
    let (a, b) = (EARTH_SEMI_MAJOR_AXIS_WGS84, EARTH_SEMI_MINOR_AXIS_WGS84);
    (a * a) / (b * b) - 1.0
}

/// WGS84 geodetic coordinates
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GeodeticCoordinates {
    /// Latitude (rad)
    pub latitude_rad: f64,
    /// Longitude (rad), within [-π, π]
    pub longitude_rad: f64,
    /// Altitude above the ellipsoid (m)
    pub altitude_m: f64,
}

/// Line of sight, observed from the user position
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Topocentric {
    /// Elevation above local horizon (rad)
    pub elevation_rad: f64,
    /// Azimuth (rad) clockwise from north, within [0, 2π[
    pub azimuth_rad: f64,
    /// Distance (m)
    pub range_m: f64,
}

/// Local velocity
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct NeuVelocity {
    pub north_m_s: f64,
    pub east_m_s: f64,
    pub up_m_s: f64,
}

/// Closed form ECEF to WGS84 geodetic conversion (Bowring, non iterative).
pub fn ecef_to_geodetic(x_m: f64, y_m: f64, z_m: f64) -> GeodeticCoordinates {
    let (a, b) = (EARTH_SEMI_MAJOR_AXIS_WGS84, EARTH_SEMI_MINOR_AXIS_WGS84);
    let e2 = first_eccentricity_squared();
    let ep2 = second_eccentricity_squared();

    let p = (x_m.powi(2) + y_m.powi(2)).sqrt();
    let theta = (a * z_m).atan2(b * p);
    let (sin_theta, cos_theta) = theta.sin_cos();

    let longitude_rad = y_m.atan2(x_m);
    let latitude_rad =
        (z_m + ep2 * b * sin_theta.powi(3)).atan2(p - e2 * a * cos_theta.powi(3));

    // radius of curvature in the prime vertical
    let n = a / (1.0 - e2 * latitude_rad.sin().powi(2)).sqrt();

    let altitude_m = if x_m.abs() < 1.0 && y_m.abs() < 1.0 {
        // p/cos(lat) is unstable at the poles
        z_m.abs() - b
    } else {
        p / latitude_rad.cos() - n
    };

    GeodeticCoordinates {
        latitude_rad,
        longitude_rad,
        altitude_m,
    }
}

/// WGS84 geodetic to ECEF conversion, returns coordinates in meters.
pub fn geodetic_to_ecef(latitude_rad: f64, longitude_rad: f64, altitude_m: f64) -> Vector3<f64> {
    let e2 = first_eccentricity_squared();
    let (sin_lat, cos_lat) = latitude_rad.sin_cos();
    let (sin_lon, cos_lon) = longitude_rad.sin_cos();

    let n = EARTH_SEMI_MAJOR_AXIS_WGS84 / (1.0 - e2 * sin_lat.powi(2)).sqrt();

    Vector3::new(
        (n + altitude_m) * cos_lat * cos_lon,
        (n + altitude_m) * cos_lat * sin_lon,
        (n * (1.0 - e2) + altitude_m) * sin_lat,
    )
}

/// ECEF to local tangent plane rotation, rows are (north, east, up)
fn neu_rotation(latitude_rad: f64, longitude_rad: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = latitude_rad.sin_cos();
    let (sin_lon, cos_lon) = longitude_rad.sin_cos();

    Matrix3::new(
        -sin_lat * cos_lon,
        -sin_lat * sin_lon,
        cos_lat,
        -sin_lon,
        cos_lon,
        0.0,
        cos_lat * cos_lon,
        cos_lat * sin_lon,
        sin_lat,
    )
}

/// Projects an ECEF velocity into the local tangent plane of the ECEF position.
pub fn ecef_velocity_to_enu(position_m: &Vector3<f64>, velocity_m_s: &Vector3<f64>) -> NeuVelocity {
    let geo = ecef_to_geodetic(position_m[0], position_m[1], position_m[2]);
    let neu = neu_rotation(geo.latitude_rad, geo.longitude_rad) * velocity_m_s;

    NeuVelocity {
        north_m_s: neu[0],
        east_m_s: neu[1],
        up_m_s: neu[2],
    }
}

/// Converts the user to satellite vector (ECEF) into elevation, azimuth
/// and range, as seen from the user position (ECEF).
pub fn ecef_to_topocentric(user_m: &Vector3<f64>, los_m: &Vector3<f64>) -> Topocentric {
    let geo = ecef_to_geodetic(user_m[0], user_m[1], user_m[2]);
    let neu = neu_rotation(geo.latitude_rad, geo.longitude_rad) * los_m;

    let (north, east, up) = (neu[0], neu[1], neu[2]);
    let horizontal = (north.powi(2) + east.powi(2)).sqrt();

    let (elevation_rad, azimuth_rad) = if horizontal < MIN_HORIZONTAL_DISTANCE_M {
        (PI / 2.0, 0.0)
    } else {
        let azimuth = east.atan2(north);
        let azimuth = if azimuth < 0.0 {
            azimuth + 2.0 * PI
        } else {
            azimuth
        };
        (up.atan2(horizontal), azimuth)
    };

    Topocentric {
        elevation_rad,
        azimuth_rad,
        range_m: los_m.norm(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(-80.0)]
    #[case(-45.0)]
    #[case(-10.0)]
    #[case(0.0)]
    #[case(10.0)]
    #[case(37.4)]
    #[case(60.0)]
    #[case(80.0)]
    fn geodetic_round_trip(#[case] latitude_deg: f64) {
        for longitude_deg in [-170.0_f64, -122.1, 0.0, 45.0, 179.0] {
            for altitude_m in [0.0, 10.0, 500.0, 2_500.0, 10_000.0] {
                let ecef = geodetic_to_ecef(
                    latitude_deg.to_radians(),
                    longitude_deg.to_radians(),
                    altitude_m,
                );

                let geo = ecef_to_geodetic(ecef[0], ecef[1], ecef[2]);

                assert!((geo.latitude_rad - latitude_deg.to_radians()).abs() < 1.0E-9);
                assert!((geo.longitude_rad - longitude_deg.to_radians()).abs() < 1.0E-9);
                assert!(
                    (geo.altitude_m - altitude_m).abs() < 1.0E-3,
                    "altitude error {} at lat={}",
                    geo.altitude_m - altitude_m,
                    latitude_deg
                );
            }
        }
    }

    #[test]
    fn equator_and_pole() {
        let geo = ecef_to_geodetic(EARTH_SEMI_MAJOR_AXIS_WGS84, 0.0, 0.0);
        assert!(geo.latitude_rad.abs() < 1.0E-12);
        assert!(geo.longitude_rad.abs() < 1.0E-12);
        assert!(geo.altitude_m.abs() < 1.0E-6);

        let geo = ecef_to_geodetic(0.0, 0.0, EARTH_SEMI_MINOR_AXIS_WGS84 + 100.0);
        assert!((geo.latitude_rad - PI / 2.0).abs() < 1.0E-12);
        assert!((geo.altitude_m - 100.0).abs() < 1.0E-6);
    }

    #[test]
    fn local_velocity() {
        // on the equator, at longitude 0: north=+z, east=+y, up=+x
        let position = Vector3::new(EARTH_SEMI_MAJOR_AXIS_WGS84, 0.0, 0.0);

        let neu = ecef_velocity_to_enu(&position, &Vector3::new(1.0, 2.0, 3.0));
        assert!((neu.north_m_s - 3.0).abs() < 1.0E-12);
        assert!((neu.east_m_s - 2.0).abs() < 1.0E-12);
        assert!((neu.up_m_s - 1.0).abs() < 1.0E-12);

        // on the equator, at longitude 90°: east=-x
        let position = Vector3::new(0.0, EARTH_SEMI_MAJOR_AXIS_WGS84, 0.0);
        let neu = ecef_velocity_to_enu(&position, &Vector3::new(1.0, 0.0, 0.0));
        assert!((neu.east_m_s + 1.0).abs() < 1.0E-12);
        assert!(neu.north_m_s.abs() < 1.0E-12);
        assert!(neu.up_m_s.abs() < 1.0E-12);
    }

    #[test]
    fn topocentric() {
        let user = Vector3::new(EARTH_SEMI_MAJOR_AXIS_WGS84, 0.0, 0.0);

        let zenith = ecef_to_topocentric(&user, &Vector3::new(20.0E6, 0.0, 0.0));
        assert!((zenith.elevation_rad - PI / 2.0).abs() < 1.0E-12);
        assert_eq!(zenith.azimuth_rad, 0.0);
        assert_eq!(zenith.range_m, 20.0E6);

        let east = ecef_to_topocentric(&user, &Vector3::new(0.0, 1000.0, 0.0));
        assert!(east.elevation_rad.abs() < 1.0E-12);
        assert!((east.azimuth_rad - PI / 2.0).abs() < 1.0E-12);

        let south_up = ecef_to_topocentric(&user, &Vector3::new(1000.0, 0.0, -1000.0));
        assert!((south_up.elevation_rad - PI / 4.0).abs() < 1.0E-12);
        assert!((south_up.azimuth_rad - PI).abs() < 1.0E-12);

        let west = ecef_to_topocentric(&user, &Vector3::new(0.0, -1000.0, 0.0));
        assert!((west.azimuth_rad - 3.0 * PI / 2.0).abs() < 1.0E-12);
    }
}
