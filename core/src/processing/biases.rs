use crate::config::{CorrectionConfig, ScalarAdjust, SurfaceSoundSpeed};
use crate::math::xyz_to_takeoff;
use crate::prelude::{ProcessResult, ProcessingStage};
use crate::svp::profile::REFERENCE_SOUND_SPEED;
use crate::swath::{BeamTravel, PingState};

/// Two-way sound speed used when travel times are estimated from soundings.
const ESTIMATE_TWO_WAY_SPEED: f64 = 750.0;

/// Fills in missing travel times, then applies the heave, travel-time and
/// surface sound speed adjustments to the working copies.
pub struct BiasStage {
    estimate_travel: bool,
    heave: ScalarAdjust,
    travel_time_multiply: Option<f64>,
    surface_sound_speed: SurfaceSoundSpeed,
    last_surface_sound_speed: f64,
}

impl BiasStage {
    /// `default_sound_speed` stands in for the first pings that carry no
    /// surface sound speed of their own.
    pub fn new(config: &CorrectionConfig, default_sound_speed: Option<f64>) -> Self {
        Self {
            estimate_travel: config.recalc_mode().is_some(),
            heave: config.heave,
            travel_time_multiply: config.travel_time_multiply,
            surface_sound_speed: config.surface_sound_speed,
            last_surface_sound_speed: default_sound_speed.unwrap_or(REFERENCE_SOUND_SPEED),
        }
    }
}

/// Travel blocks reconstructed from sounding positions relative to the sonar,
/// for formats that store no raw observables.
pub fn estimate_travel_times(state: &mut PingState<'_>) {
    let sonar_depth = state.recorded.draft + state.recorded.heave;
    for (beam, travel) in state.ping.beams.iter().zip(state.travel.iter_mut()) {
        if beam.flag.is_null() {
            *travel = None;
            continue;
        }
        let z = beam.depth - sonar_depth;
        let range = (z * z + beam.acrosstrack * beam.acrosstrack + beam.alongtrack * beam.alongtrack).sqrt();
        let (angle, angle_forward) = xyz_to_takeoff(beam.acrosstrack, beam.alongtrack, z);
        *travel = Some(BeamTravel {
            time: range / ESTIMATE_TWO_WAY_SPEED,
            angle,
            angle_forward,
            ..Default::default()
        });
    }
    state.surface_sound_speed = REFERENCE_SOUND_SPEED;
    state.travel_estimated = true;
}

impl ProcessingStage for BiasStage {
    fn name(&self) -> &'static str {
        "biases"
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        if self.estimate_travel && state.travel.iter().all(Option::is_none) && !state.ping.beams.is_empty() {
            estimate_travel_times(state);
        }

        for travel in state.travel.iter_mut().flatten() {
            travel.heave = self.heave.apply(travel.heave);
            if let Some(multiply) = self.travel_time_multiply {
                travel.time *= multiply;
            }
        }

        if state.surface_sound_speed <= 0.0 {
            state.surface_sound_speed = self.last_surface_sound_speed;
        } else {
            self.last_surface_sound_speed = state.surface_sound_speed;
        }
        match self.surface_sound_speed {
            SurfaceSoundSpeed::Recorded => {}
            SurfaceSoundSpeed::Set(value) => state.surface_sound_speed = value,
            SurfaceSoundSpeed::Offset(offset) => state.surface_sound_speed += offset,
        }
        Ok(())
    }
}
