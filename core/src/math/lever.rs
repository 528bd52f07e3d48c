use serde::{Deserialize, Serialize};

/// Sensor positions in the vessel frame (x starboard, y forward, z down), metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LeverArm {
    pub vru: [f64; 3],
    pub sonar: [f64; 3],
}

/// Vertical displacement of the sonar relative to the motion sensor caused by
/// `pitch` and `roll` in degrees (bow up and starboard down positive).
/// Positive values push the sonar deeper.
pub fn lever_heave(arm: &LeverArm, pitch: f64, roll: f64) -> f64 {
    let x = arm.sonar[0] - arm.vru[0];
    let y = arm.sonar[1] - arm.vru[1];
    let z = arm.sonar[2] - arm.vru[2];

    let (sin_p, cos_p) = pitch.to_radians().sin_cos();
    let (sin_r, cos_r) = roll.to_radians().sin_cos();

    // pitch about the starboard axis, then roll about the forward axis
    let z_pitched = -y * sin_p + z * cos_p;
    let z_rolled = x * sin_r + z_pitched * cos_r;
    z_rolled - z
}
