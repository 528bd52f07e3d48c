use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::prelude::{ProcessError, ProcessResult};

/// Deepest depth a profile is extended to, in metres.
pub const PROFILE_FLOOR: f64 = 12_000.0;

/// Reference sound speed of uncorrected depths, in m/s.
pub const REFERENCE_SOUND_SPEED: f64 = 1500.0;

/// Sound speed against depth, starting at the surface and strictly increasing in depth.
#[derive(Debug, Clone)]
pub struct VelocityProfile {
    source: PathBuf,
    depth: Vec<f64>,
    velocity: Vec<f64>,
    /// `velocity_sum[i]` integrates velocity over depth from the surface to `depth[i + 1]`.
    velocity_sum: Vec<f64>,
}

impl VelocityProfile {
    /// Reads `depth velocity` pairs; `#` lines are comments.
    pub fn load<P: AsRef<Path>>(path: P) -> ProcessResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ProcessError::io(path, err))?;
        let samples = text
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let depth = fields.next()?.parse::<f64>().ok()?;
                let velocity = fields.next()?.parse::<f64>().ok()?;
                Some((depth, velocity))
            })
            .collect::<Vec<_>>();
        let profile = Self::from_samples(path, samples)?;
        info!(
            "{}: {} profile nodes, surface speed {:.2} m/s",
            path.display(),
            profile.depth.len(),
            profile.surface_velocity()
        );
        Ok(profile)
    }

    /// Normalises raw samples: the first node is pinned to the surface,
    /// non-increasing depths are dropped and the deepest speed is carried down
    /// to [`PROFILE_FLOOR`].
    pub fn from_samples<P: AsRef<Path>>(source: P, samples: Vec<(f64, f64)>) -> ProcessResult<Self> {
        let source = source.as_ref().to_path_buf();
        let mut depth: Vec<f64> = Vec::with_capacity(samples.len() + 2);
        let mut velocity: Vec<f64> = Vec::with_capacity(samples.len() + 2);

        for (index, (d, v)) in samples.into_iter().enumerate() {
            if index == 0 {
                if d > 0.0 {
                    depth.push(0.0);
                    velocity.push(v);
                    depth.push(d);
                } else {
                    depth.push(0.0);
                }
                velocity.push(v);
                continue;
            }
            match depth.last() {
                Some(&last) if d <= last => {
                    warn!(
                        "{}: ignoring profile node at {:.2} m not below {:.2} m",
                        source.display(),
                        d,
                        last
                    );
                }
                _ => {
                    depth.push(d);
                    velocity.push(v);
                }
            }
        }

        if depth.len() < 2 {
            return Err(ProcessError::insufficient(
                &source,
                "a sound velocity profile needs at least two nodes",
            ));
        }
        if let (Some(&last_depth), Some(&last_velocity)) = (depth.last(), velocity.last()) {
            if last_depth < PROFILE_FLOOR {
                depth.push(PROFILE_FLOOR);
                velocity.push(last_velocity);
            }
        }

        let mut velocity_sum = Vec::with_capacity(depth.len() - 1);
        let mut running = 0.0;
        for i in 0..depth.len() - 1 {
            running += 0.5 * (velocity[i + 1] + velocity[i]) * (depth[i + 1] - depth[i]);
            velocity_sum.push(running);
        }

        Ok(Self {
            source,
            depth,
            velocity,
            velocity_sum,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn depths(&self) -> &[f64] {
        &self.depth
    }

    pub fn velocities(&self) -> &[f64] {
        &self.velocity
    }

    pub fn surface_velocity(&self) -> f64 {
        self.velocity[0]
    }

    /// Depth-averaged sound speed from the surface down to `depth`, or
    /// `None` when `depth` lies outside the profile.
    pub fn mean_velocity(&self, depth: f64) -> Option<f64> {
        let k = (0..self.depth.len() - 1)
            .find(|&j| self.depth[j] < depth && depth <= self.depth[j + 1])?;
        let mut sum = if k > 0 { self.velocity_sum[k - 1] } else { 0.0 };
        let dz = depth - self.depth[k];
        let slope = (self.velocity[k + 1] - self.velocity[k]) / (self.depth[k + 1] - self.depth[k]);
        sum += 0.5 * (2.0 * self.velocity[k] + dz * slope) * dz;
        Some(sum / depth)
    }

    /// Rescales a depth between the 1500 m/s reference and the profile's mean
    /// sound speed. `offset` is the sonar depth the range is measured from.
    pub fn convert_reference(&self, depth: f64, offset: f64, corrected: bool) -> f64 {
        let range = depth - offset;
        let mean = self
            .mean_velocity(range)
            .filter(|mean| *mean > 0.0)
            .unwrap_or(REFERENCE_SOUND_SPEED);
        if corrected {
            range * mean / REFERENCE_SOUND_SPEED + offset
        } else {
            range * REFERENCE_SOUND_SPEED / mean + offset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn shallow_start_is_pinned_to_surface_and_extended() {
        let profile =
            VelocityProfile::from_samples("mem", vec![(5.0, 1490.0), (100.0, 1480.0)]).unwrap();
        assert_eq!(profile.depths(), &[0.0, 5.0, 100.0, PROFILE_FLOOR]);
        assert_eq!(profile.velocities(), &[1490.0, 1490.0, 1480.0, 1480.0]);
        assert_eq!(profile.surface_velocity(), 1490.0);
    }

    #[test]
    fn negative_start_is_reset_and_repeats_dropped() {
        let profile = VelocityProfile::from_samples(
            "mem",
            vec![(-1.0, 1500.0), (10.0, 1495.0), (10.0, 1400.0), (5.0, 1400.0)],
        )
        .unwrap();
        assert_eq!(profile.depths(), &[0.0, 10.0, PROFILE_FLOOR]);
    }

    #[test]
    fn single_node_profile_is_fatal() {
        assert!(VelocityProfile::from_samples("mem", vec![(0.0, 1500.0)]).is_err());
    }

    #[test]
    fn mean_velocity_integrates_linear_layers() {
        let profile = VelocityProfile::from_samples(
            "mem",
            vec![(0.0, 1500.0), (100.0, 1480.0), (200.0, 1480.0)],
        )
        .unwrap();
        assert_abs_diff_eq!(profile.mean_velocity(100.0).unwrap(), 1490.0, epsilon = 1e-9);
        assert_abs_diff_eq!(profile.mean_velocity(200.0).unwrap(), 1485.0, epsilon = 1e-9);
        assert_eq!(profile.mean_velocity(0.0), None);
    }

    #[test]
    fn reference_conversion_round_trips() {
        let profile =
            VelocityProfile::from_samples("mem", vec![(0.0, 1540.0), (500.0, 1480.0)]).unwrap();
        let corrected = profile.convert_reference(300.0, 5.0, true);
        assert!(corrected > 300.0);
        let mean = profile.mean_velocity(295.0).unwrap();
        assert_abs_diff_eq!(corrected, 295.0 * mean / 1500.0 + 5.0, epsilon = 1e-9);
        let back = profile.convert_reference(300.0, 5.0, false);
        assert_abs_diff_eq!(back, 295.0 * 1500.0 / mean + 5.0, epsilon = 1e-9);
    }

    #[test]
    fn load_skips_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# depth velocity").unwrap();
        writeln!(file, "0 1500").unwrap();
        writeln!(file, "50 1490").unwrap();
        let profile = VelocityProfile::load(file.path()).unwrap();
        assert_eq!(profile.depths().len(), 3);
    }
}
