//! Conversions between the take-off frame and the roll-pitch frame.
//!
//! Take-off angles are `(theta, phi)`: theta from the downward vertical, phi the
//! azimuth from the starboard axis toward the bow. Roll-pitch angles are
//! `(alpha, beta)`: alpha the pitch-like elevation toward the bow, beta the
//! roll-like angle from the starboard axis toward the downward vertical. All
//! angles are in degrees; the frame is x starboard, y forward, z down.

use std::f64::consts::PI;

pub fn takeoff_to_rollpitch(theta: f64, phi: f64) -> (f64, f64) {
    let (theta, phi) = (theta.to_radians(), phi.to_radians());
    let x = theta.sin() * phi.cos();
    let y = theta.sin() * phi.sin();
    let z = theta.cos();

    let alpha = y.clamp(-1.0, 1.0).asin();
    let cos_alpha = alpha.cos();
    let mut beta = if cos_alpha.abs() < f64::EPSILON {
        0.5 * PI
    } else {
        (x / cos_alpha).clamp(-1.0, 1.0).acos()
    };
    if z < 0.0 {
        beta = 2.0 * PI - beta;
    }
    (alpha.to_degrees(), beta.to_degrees())
}

pub fn rollpitch_to_takeoff(alpha: f64, beta: f64) -> (f64, f64) {
    let (alpha, beta) = (alpha.to_radians(), beta.to_radians());
    let x = alpha.cos() * beta.cos();
    let y = alpha.sin();
    let z = alpha.cos() * beta.sin();

    let theta = z.clamp(-1.0, 1.0).acos();
    let phi = if theta == 0.0 { 0.0 } else { y.atan2(x) };
    (theta.to_degrees(), phi.to_degrees())
}

/// Take-off angles of the direction to a point given in the sonar frame.
pub fn xyz_to_takeoff(x: f64, y: f64, z: f64) -> (f64, f64) {
    let range = (x * x + y * y + z * z).sqrt();
    if range <= 0.0 {
        return (0.0, 0.0);
    }
    let theta = (z / range).clamp(-1.0, 1.0).acos();
    let phi = if x == 0.0 && y == 0.0 { 0.0 } else { y.atan2(x) };
    (theta.to_degrees(), phi.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn vertical_beam_maps_to_right_angle_roll() {
        let (alpha, beta) = takeoff_to_rollpitch(0.0, 0.0);
        assert_abs_diff_eq!(alpha, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(beta, 90.0, epsilon = 1e-12);
    }

    #[test]
    fn frames_round_trip() {
        for (theta, phi) in [(30.0, 0.0), (45.0, 180.0), (60.0, 10.0), (5.0, -170.0)] {
            let (alpha, beta) = takeoff_to_rollpitch(theta, phi);
            let (theta_back, phi_back) = rollpitch_to_takeoff(alpha, beta);
            assert_abs_diff_eq!(theta_back, theta, epsilon = 1e-9);
            assert_abs_diff_eq!(phi_back, phi, epsilon = 1e-9);
        }
    }

    #[test]
    fn roll_change_swings_beam_across() {
        let (alpha, beta) = takeoff_to_rollpitch(0.0, 0.0);
        let (theta, phi) = rollpitch_to_takeoff(alpha, beta - 10.0);
        assert_abs_diff_eq!(theta, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(phi, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn xyz_points_below_and_to_port() {
        let (theta, phi) = xyz_to_takeoff(-100.0, 0.0, 100.0);
        assert_abs_diff_eq!(theta, 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(phi, 180.0, epsilon = 1e-9);
    }
}
