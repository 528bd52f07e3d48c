use super::{BeamTravel, Kinematics, Ping};

/// Working state threaded through the stages for one ping.
///
/// Beam soundings are corrected in place on the ping. Kinematics and the
/// travel-time blocks are worked on as copies: kinematics go back into the
/// ping only through the codec, and heave or travel-time adjustments never
/// leak back into the recorded observables.
pub struct PingState<'a> {
    pub ping: &'a mut Ping,
    /// Kinematics as read from the input stream, before any merge.
    pub recorded: Kinematics,
    /// Corrected kinematics.
    pub kinematics: Kinematics,
    /// Number of earlier pings sharing this ping's timestamp.
    pub multiplicity: u32,
    /// Heave induced by roll and pitch at the sonar's offset from the motion sensor.
    pub lever_heave: f64,
    /// Surface sound speed after defaulting and bias, in m/s.
    pub surface_sound_speed: f64,
    pub travel: Vec<Option<BeamTravel>>,
    pub travel_estimated: bool,
    pub raytrace_nulls: usize,
    pub edits_changed: usize,
}

impl<'a> PingState<'a> {
    pub fn new(
        ping: &'a mut Ping,
        recorded: Kinematics,
        mut travel: Vec<Option<BeamTravel>>,
        multiplicity: u32,
    ) -> Self {
        travel.resize(ping.beams.len(), None);
        let surface_sound_speed = ping.surface_sound_speed.unwrap_or(0.0);
        Self {
            ping,
            recorded,
            kinematics: recorded,
            multiplicity,
            lever_heave: 0.0,
            surface_sound_speed,
            travel,
            travel_estimated: false,
            raytrace_nulls: 0,
            edits_changed: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.recorded.time
    }

    /// Sonar depth before any correction.
    pub fn recorded_draft(&self) -> f64 {
        self.recorded.draft
    }

    /// Depth of the sonar below the surface for a beam with the given heave.
    pub fn sonar_depth(&self, beam_heave: f64) -> f64 {
        beam_heave + self.kinematics.draft + self.lever_heave
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swath::Beam;

    #[test]
    fn missing_travel_blocks_pad_to_beam_count() {
        let mut ping = Ping {
            beams: vec![Beam::new(10.0, 0.0, 0.0); 3],
            ..Default::default()
        };
        let recorded = ping.kinematics;
        let state = PingState::new(&mut ping, recorded, vec![Some(BeamTravel::default())], 0);
        assert_eq!(state.travel.len(), 3);
        assert!(state.travel[0].is_some());
        assert!(state.travel[2].is_none());
    }
}
