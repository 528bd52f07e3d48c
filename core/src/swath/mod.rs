//! In-memory representation of survey records flowing through the pipeline.

use serde::{Deserialize, Serialize};

pub mod state;

pub use state::PingState;

/// Validity state of a single sounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BeamFlag {
    #[default]
    Good,
    Manual,
    Filter,
    Sonar,
    Null,
}

impl BeamFlag {
    pub fn is_valid(self) -> bool {
        self == BeamFlag::Good
    }

    pub fn is_null(self) -> bool {
        self == BeamFlag::Null
    }

    /// Flagged by an editor, filter or the sonar itself but still carrying data.
    pub fn is_flagged(self) -> bool {
        matches!(self, BeamFlag::Manual | BeamFlag::Filter | BeamFlag::Sonar)
    }
}

/// Raw acoustic observables for a beam. Angles are in degrees, times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BeamTravel {
    /// Two-way travel time.
    pub time: f64,
    /// Take-off angle from vertical, positive to starboard.
    pub angle: f64,
    /// Azimuth of the take-off direction measured from the starboard axis.
    pub angle_forward: f64,
    /// Angle of the receive array normal used by the null-angle Snell mode.
    #[serde(default)]
    pub angle_null: f64,
    #[serde(default)]
    pub heave: f64,
    #[serde(default)]
    pub alongtrack_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Beam {
    #[serde(default)]
    pub flag: BeamFlag,
    pub depth: f64,
    pub acrosstrack: f64,
    pub alongtrack: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel: Option<BeamTravel>,
}

impl Beam {
    pub fn new(depth: f64, acrosstrack: f64, alongtrack: f64) -> Self {
        Self {
            depth,
            acrosstrack,
            alongtrack,
            ..Default::default()
        }
    }
}

/// A sidescan sample; `amplitude` is `None` once the pixel has been nulled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SidescanPixel {
    pub amplitude: Option<f64>,
    pub acrosstrack: f64,
    #[serde(default)]
    pub alongtrack: f64,
}

/// Vehicle state attached to a ping or navigation record.
///
/// Speed is in km/h, heading/roll/pitch in degrees, draft and heave in metres
/// positive down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Kinematics {
    pub time: f64,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub draft: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub heave: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Ping {
    pub kinematics: Kinematics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_sound_speed: Option<f64>,
    pub beams: Vec<Beam>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sidescan: Vec<SidescanPixel>,
}

impl Ping {
    pub fn has_travel_times(&self) -> bool {
        !self.beams.is_empty() && self.beams.iter().all(|beam| beam.travel.is_some())
    }
}

/// One entry of a survey record stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SwathRecord {
    Ping(Ping),
    Navigation(Kinematics),
    Comment { text: String },
    /// Records the pipeline does not interpret; passed through verbatim.
    Other { payload: serde_json::Value },
}
