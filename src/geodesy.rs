/**
 * Great circle computations between two latitude/longitude points.
 */
use num::traits::{Float, FromPrimitive};

pub type Degrees = f64;
pub type Meters = f64;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: Meters = 6_371_000.0;


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub latitude: Degrees,
    pub longitude: Degrees,
}


impl Coordinate {
    pub fn new(latitude: Degrees, longitude: Degrees) -> Coordinate {
        Coordinate {
            latitude,
            longitude,
        }
    }
}


/**
 * Returns the distance in meters between two points using the haversine formula.
 */
pub fn distance_m(p1: &Coordinate, p2: &Coordinate) -> Meters {
    let phi_1 = p1.latitude.to_radians();
    let phi_2 = p2.latitude.to_radians();
    let delta_phi = (p2.latitude - p1.latitude).to_radians();
    let delta_lambda = (p2.longitude - p1.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi_1.cos() * phi_2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push a a hair outside of [0, 1] for nearly antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}


/**
 * Returns the initial compass bearing in [0, 360) to follow from p1 to reach p2 along a great
 * circle.
 */
pub fn initial_bearing_d(p1: &Coordinate, p2: &Coordinate) -> Degrees {
    let phi_1 = p1.latitude.to_radians();
    let phi_2 = p2.latitude.to_radians();
    let delta_lambda = (p2.longitude - p1.longitude).to_radians();

    let y = delta_lambda.sin() * phi_2.cos();
    let x = phi_1.cos() * phi_2.sin() - phi_1.sin() * phi_2.cos() * delta_lambda.cos();
    wrap_degrees(y.atan2(x).to_degrees())
}


/**
 * Wraps an angle into [0, 360).
 */
pub fn wrap_degrees<T: Float + FromPrimitive>(degrees: T) -> T {
    let full = T::from_f64(360.0).unwrap_or_else(T::zero);
    let wrapped = degrees % full;
    let wrapped = if wrapped < T::zero() { wrapped + full } else { wrapped };
    // -1e-20 % 360 + 360 rounds to exactly 360
    if wrapped >= full { T::zero() } else { wrapped }
}


/**
 * Normalizes an angular difference into (-180, 180]. Positive values mean the goal is clockwise
 * (to the right) of the current heading. Infinite or NaN input gives NaN.
 */
pub fn normalize_degrees<T: Float + FromPrimitive>(degrees: T) -> T {
    let half = T::from_f64(180.0).unwrap_or_else(T::zero);
    let full = half + half;
    // Now in (-360, 360), so one correction is enough
    let degrees = degrees % full;
    if degrees > half {
        degrees - full
    } else if degrees <= -half {
        degrees + full
    } else {
        degrees
    }
}


/**
 * Signed difference from the current heading to the goal bearing, in (-180, 180].
 */
pub fn heading_error_d(bearing: Degrees, heading: Degrees) -> Degrees {
    normalize_degrees(bearing - heading)
}
