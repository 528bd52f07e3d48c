use std::f64::consts::PI;

use crate::config::{AngleMode, CorrectionConfig, RecalcMode, RollBias};
use crate::math::{rollpitch_to_takeoff, takeoff_to_rollpitch};
use crate::prelude::{ProcessError, ProcessResult, ProcessingStage};
use crate::svp::{RayTracer, VelocityProfile};
use crate::swath::{BeamFlag, BeamTravel, PingState};

/// Roll and pitch corrections rotated into every beam.
#[derive(Debug, Clone, Copy)]
struct Rotation {
    merges_attitude: bool,
    roll_bias: RollBias,
    pitch_bias: f64,
}

impl Rotation {
    fn is_active(&self) -> bool {
        self.merges_attitude || self.roll_bias.is_on() || self.pitch_bias != 0.0
    }

    /// Adds the attitude change and biases to roll-pitch angles in degrees.
    fn apply(&self, state: &PingState<'_>, alpha: f64, beta: f64, starboard: bool) -> (f64, f64) {
        let (mut alpha, mut beta) = (alpha, beta);
        if self.merges_attitude {
            beta += state.kinematics.roll - state.recorded.roll;
            alpha += state.kinematics.pitch - state.recorded.pitch;
        }
        alpha += self.pitch_bias;
        beta += self.roll_bias.for_side(starboard);
        (alpha, beta)
    }
}

enum Recalc {
    RayTrace { tracer: RayTracer, angle_mode: AngleMode },
    RigidRotation,
    OffsetOnly,
}

/// Recomputes soundings by one of the three strategies.
pub struct BathymetryStage {
    recalc: Recalc,
    rotation: Rotation,
}

impl BathymetryStage {
    pub fn new(mode: RecalcMode, config: &CorrectionConfig, profile: Option<&VelocityProfile>) -> ProcessResult<Self> {
        let recalc = match mode {
            RecalcMode::RayTrace => {
                let profile = profile.ok_or_else(|| {
                    ProcessError::MissingAuxiliary("ray tracing needs a sound velocity profile".into())
                })?;
                Recalc::RayTrace {
                    tracer: RayTracer::new(profile),
                    angle_mode: config.svp.angle_mode,
                }
            }
            RecalcMode::RigidRotation => Recalc::RigidRotation,
            RecalcMode::OffsetOnly => Recalc::OffsetOnly,
        };
        Ok(Self {
            recalc,
            rotation: Rotation {
                merges_attitude: config.merges_attitude(),
                roll_bias: config.roll_bias,
                pitch_bias: config.pitch_bias.unwrap_or(0.0),
            },
        })
    }

    fn raytrace(&self, tracer: &RayTracer, angle_mode: AngleMode, state: &mut PingState<'_>) {
        let mut nulled = 0;
        for index in 0..state.ping.beams.len() {
            if state.ping.beams[index].flag.is_null() {
                continue;
            }
            let travel = match state.travel[index] {
                Some(travel) if travel.time > 0.0 => travel,
                _ => {
                    state.ping.beams[index].flag = BeamFlag::Null;
                    continue;
                }
            };
            let (angle, azimuth) = self.takeoff_angles(state, &travel);
            let result = tracer.trace(
                state.sonar_depth(travel.heave),
                angle,
                0.5 * travel.time,
                state.surface_sound_speed,
                travel.angle_null,
                angle_mode,
            );
            let beam = &mut state.ping.beams[index];
            if result.is_degenerate() {
                beam.flag = BeamFlag::Null;
                nulled += 1;
                continue;
            }
            let azimuth = azimuth.to_radians();
            beam.acrosstrack = result.range * azimuth.cos();
            beam.alongtrack = result.range * azimuth.sin() + travel.alongtrack_offset;
            beam.depth = result.depth;
        }
        state.raytrace_nulls += nulled;
    }

    fn takeoff_angles(&self, state: &PingState<'_>, travel: &BeamTravel) -> (f64, f64) {
        if !self.rotation.is_active() {
            return (travel.angle, travel.angle_forward);
        }
        let (alpha, beta) = takeoff_to_rollpitch(travel.angle, travel.angle_forward);
        let (alpha, beta) = self.rotation.apply(state, alpha, beta, travel.angle >= 0.0);
        rollpitch_to_takeoff(alpha, beta)
    }

    fn rigid_rotation(&self, state: &mut PingState<'_>) {
        let recorded_draft = state.recorded_draft();
        for index in 0..state.ping.beams.len() {
            if state.ping.beams[index].flag.is_null() {
                continue;
            }
            let heave = state.travel[index].map(|travel| travel.heave).unwrap_or(0.0);
            let offset = state.sonar_depth(heave);
            let beam = &state.ping.beams[index];
            let depth = beam.depth - (heave + recorded_draft);
            let range = (depth * depth + beam.acrosstrack * beam.acrosstrack + beam.alongtrack * beam.alongtrack).sqrt();
            let (alpha, mut beta) = if range < 0.001 {
                (0.0, 0.5 * PI)
            } else {
                let alpha = (beam.alongtrack / range).clamp(-1.0, 1.0).asin();
                let beta = (beam.acrosstrack / range / alpha.cos()).clamp(-1.0, 1.0).acos();
                (alpha, beta)
            };
            if depth < 0.0 {
                beta = 2.0 * PI - beta;
            }
            let starboard = beta <= 0.5 * PI;
            let (alpha, beta) = self.rotation.apply(state, alpha.to_degrees(), beta.to_degrees(), starboard);
            let (alpha, beta) = (alpha.to_radians(), beta.to_radians());

            let beam = &mut state.ping.beams[index];
            beam.depth = range * alpha.cos() * beta.sin() + offset;
            beam.alongtrack = range * alpha.sin();
            beam.acrosstrack = range * alpha.cos() * beta.cos();
        }
    }

    fn offset_only(&self, state: &mut PingState<'_>) {
        let change = state.kinematics.draft - state.recorded_draft() + state.lever_heave;
        for beam in state.ping.beams.iter_mut().filter(|beam| !beam.flag.is_null()) {
            beam.depth += change;
        }
    }
}

impl ProcessingStage for BathymetryStage {
    fn name(&self) -> &'static str {
        "bathymetry"
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        match &self.recalc {
            Recalc::RayTrace { tracer, angle_mode } => self.raytrace(tracer, *angle_mode, state),
            Recalc::RigidRotation => self.rigid_rotation(state),
            Recalc::OffsetOnly => self.offset_only(state),
        }
        Ok(())
    }
}
