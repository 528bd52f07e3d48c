use log::debug;

use crate::codec::{PingCodec, SidescanSettings};
use crate::prelude::{ProcessResult, ProcessingStage};
use crate::swath::PingState;

/// Writes the corrected kinematics back into the ping through the codec.
pub struct InsertKinematicsStage<C> {
    codec: C,
}

impl<C: PingCodec> InsertKinematicsStage<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

impl<C: PingCodec> ProcessingStage for InsertKinematicsStage<C> {
    fn name(&self) -> &'static str {
        "insert-kinematics"
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        let kinematics = state.kinematics;
        self.codec.insert_kinematics(state.ping, &kinematics);
        Ok(())
    }
}

/// Regenerates the sidescan from the corrected soundings where the codec supports it.
pub struct SidescanStage<C> {
    codec: C,
    settings: SidescanSettings,
}

impl<C: PingCodec> SidescanStage<C> {
    pub fn new(codec: C, settings: SidescanSettings) -> Self {
        Self { codec, settings }
    }
}

impl<C: PingCodec> ProcessingStage for SidescanStage<C> {
    fn name(&self) -> &'static str {
        "sidescan"
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        if !self.codec.rebuild_sidescan(state.ping, &self.settings)? {
            debug!("ping at {:.6}: sidescan left as recorded", state.time());
        }
        Ok(())
    }
}
