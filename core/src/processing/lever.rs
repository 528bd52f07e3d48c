use crate::config::{CorrectionConfig, RollBias};
use crate::math::{lever_heave, LeverArm};
use crate::prelude::{ProcessResult, ProcessingStage};
use crate::swath::PingState;

/// Heave at the sonar induced by roll and pitch acting on the lever arm from
/// the motion sensor. Consumed as an extra depth offset only.
pub struct LeverStage {
    arm: LeverArm,
    roll_bias: RollBias,
    pitch_bias: f64,
}

impl LeverStage {
    pub fn new(arm: LeverArm, config: &CorrectionConfig) -> Self {
        Self {
            arm,
            roll_bias: config.roll_bias,
            pitch_bias: config.pitch_bias.unwrap_or(0.0),
        }
    }
}

impl ProcessingStage for LeverStage {
    fn name(&self) -> &'static str {
        "lever"
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        let k = &state.kinematics;
        state.lever_heave = lever_heave(
            &self.arm,
            k.pitch + self.pitch_bias,
            k.roll + self.roll_bias.mean(),
        );
        Ok(())
    }
}
