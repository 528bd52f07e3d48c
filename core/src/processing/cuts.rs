use crate::config::{CutMode, CutRule, CutTarget};
use crate::prelude::{ProcessResult, ProcessingStage};
use crate::swath::{BeamFlag, PingState};

fn within(value: f64, rule: &CutRule) -> bool {
    value >= rule.min && value <= rule.max
}

/// Applies the cut rules for a set of targets. Ranges are inclusive.
pub struct CutStage {
    name: &'static str,
    rules: Vec<CutRule>,
}

impl CutStage {
    pub fn bathymetry(rules: &[CutRule]) -> Self {
        Self::select("bathymetry-cuts", rules, &[CutTarget::Bathymetry])
    }

    /// Amplitude and sidescan cuts, which run after the sidescan is rebuilt.
    pub fn backscatter(rules: &[CutRule]) -> Self {
        Self::select("backscatter-cuts", rules, &[CutTarget::Amplitude, CutTarget::Sidescan])
    }

    fn select(name: &'static str, rules: &[CutRule], targets: &[CutTarget]) -> Self {
        Self {
            name,
            rules: rules
                .iter()
                .filter(|rule| targets.contains(&rule.target))
                .copied()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn cut_beams(rule: &CutRule, state: &mut PingState<'_>) {
        let speed = state.kinematics.speed;
        let zero_amplitude = rule.target == CutTarget::Amplitude && rule.mode == CutMode::Speed;
        for (index, beam) in state.ping.beams.iter_mut().enumerate() {
            let selected = match rule.mode {
                CutMode::Number => within(index as f64, rule),
                CutMode::Distance => within(beam.acrosstrack, rule),
                CutMode::Speed => !within(speed, rule),
            };
            if !selected {
                continue;
            }
            if zero_amplitude {
                if beam.amplitude.is_some() {
                    beam.amplitude = Some(0.0);
                }
            } else if beam.flag.is_valid() {
                beam.flag = BeamFlag::Manual;
            }
        }
    }

    fn cut_pixels(rule: &CutRule, state: &mut PingState<'_>) {
        let speed = state.kinematics.speed;
        for (index, pixel) in state.ping.sidescan.iter_mut().enumerate() {
            let selected = match rule.mode {
                CutMode::Number => within(index as f64, rule),
                CutMode::Distance => within(pixel.acrosstrack, rule),
                CutMode::Speed => !within(speed, rule),
            };
            if selected {
                pixel.amplitude = None;
            }
        }
    }
}

impl ProcessingStage for CutStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        for rule in &self.rules {
            match rule.target {
                CutTarget::Bathymetry | CutTarget::Amplitude => Self::cut_beams(rule, state),
                CutTarget::Sidescan => Self::cut_pixels(rule, state),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swath::{Beam, Ping, SidescanPixel};

    fn rule(target: CutTarget, mode: CutMode, min: f64, max: f64) -> CutRule {
        CutRule { target, mode, min, max }
    }

    fn ping() -> Ping {
        let beams = (0..5)
            .map(|i| Beam {
                amplitude: Some(20.0),
                ..Beam::new(100.0, -100.0 + 50.0 * i as f64, 0.0)
            })
            .collect();
        let sidescan = (0..4)
            .map(|i| SidescanPixel {
                amplitude: Some(1.0),
                acrosstrack: -75.0 + 50.0 * i as f64,
                alongtrack: 0.0,
            })
            .collect();
        let mut ping = Ping {
            beams,
            sidescan,
            ..Default::default()
        };
        ping.kinematics.speed = 12.0;
        ping
    }

    fn run(stage: &mut CutStage, ping: &mut Ping) {
        let recorded = ping.kinematics;
        let mut state = PingState::new(ping, recorded, Vec::new(), 0);
        stage.execute(&mut state).unwrap();
    }

    #[test]
    fn bathymetry_number_and_distance_ranges_are_inclusive() {
        let rules = [
            rule(CutTarget::Bathymetry, CutMode::Number, 0.0, 1.0),
            rule(CutTarget::Bathymetry, CutMode::Distance, 100.0, 100.0),
            rule(CutTarget::Sidescan, CutMode::Number, 0.0, 3.0),
        ];
        let mut stage = CutStage::bathymetry(&rules);
        let mut ping = ping();
        ping.beams[0].flag = BeamFlag::Null;
        run(&mut stage, &mut ping);
        let flags = ping.beams.iter().map(|beam| beam.flag).collect::<Vec<_>>();
        assert_eq!(
            flags,
            vec![
                BeamFlag::Null,
                BeamFlag::Manual,
                BeamFlag::Good,
                BeamFlag::Good,
                BeamFlag::Manual
            ]
        );
        assert!(ping.sidescan.iter().all(|pixel| pixel.amplitude.is_some()));
    }

    #[test]
    fn speed_cut_flags_everything_outside_range() {
        let rules = [rule(CutTarget::Bathymetry, CutMode::Speed, 0.0, 10.0)];
        let mut ping = ping();
        run(&mut CutStage::bathymetry(&rules), &mut ping);
        assert!(ping.beams.iter().all(|beam| beam.flag == BeamFlag::Manual));

        let rules = [rule(CutTarget::Bathymetry, CutMode::Speed, 0.0, 12.0)];
        let mut ping = self::ping();
        run(&mut CutStage::bathymetry(&rules), &mut ping);
        assert!(ping.beams.iter().all(|beam| beam.flag == BeamFlag::Good));
    }

    #[test]
    fn amplitude_speed_cut_zeroes_and_sidescan_cut_nulls() {
        let rules = [
            rule(CutTarget::Amplitude, CutMode::Speed, 15.0, 20.0),
            rule(CutTarget::Sidescan, CutMode::Distance, -80.0, -20.0),
        ];
        let mut stage = CutStage::backscatter(&rules);
        let mut ping = ping();
        run(&mut stage, &mut ping);
        assert!(ping.beams.iter().all(|beam| beam.amplitude == Some(0.0)));
        assert!(ping.beams.iter().all(|beam| beam.flag == BeamFlag::Good));
        let nulled = ping
            .sidescan
            .iter()
            .map(|pixel| pixel.amplitude.is_none())
            .collect::<Vec<_>>();
        assert_eq!(nulled, vec![true, true, false, false]);
    }
}
