use crate::prelude::{ProcessResult, ProcessingStage};
use crate::svp::VelocityProfile;
use crate::swath::PingState;

/// Rescales depths between the 1500 m/s reference and the profile's mean
/// sound speed down to each sounding.
pub struct SoundSpeedStage {
    profile: VelocityProfile,
    corrected: bool,
}

impl SoundSpeedStage {
    pub fn new(profile: VelocityProfile, corrected: bool) -> Self {
        Self { profile, corrected }
    }
}

impl ProcessingStage for SoundSpeedStage {
    fn name(&self) -> &'static str {
        "soundspeed"
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        for index in 0..state.ping.beams.len() {
            if state.ping.beams[index].flag.is_null() {
                continue;
            }
            let heave = state.travel[index].map(|travel| travel.heave).unwrap_or(0.0);
            let offset = state.sonar_depth(heave);
            let beam = &mut state.ping.beams[index];
            beam.depth = self.profile.convert_reference(beam.depth, offset, self.corrected);
        }
        Ok(())
    }
}
