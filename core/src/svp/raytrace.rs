use crate::config::AngleMode;

use super::profile::VelocityProfile;

/// Layers with a smaller speed gradient (1/s) are traced as straight lines.
const HOMOGENEOUS_GRADIENT: f64 = 1e-5;

/// Upper bound on layer crossings for one ray.
const MAX_CROSSINGS: usize = 100_000;

/// Direction of travel when the ray's time ran out, or why tracing stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayStatus {
    Down,
    Up,
    OutOfBottom,
    OutOfTop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayResult {
    /// Signed horizontal distance from the source, positive to starboard.
    pub range: f64,
    pub depth: f64,
    /// One-way time actually traced.
    pub travel_time: f64,
    pub status: RayStatus,
}

impl RayResult {
    /// The ray left the profile before its travel time was spent.
    pub fn is_degenerate(&self) -> bool {
        matches!(self.status, RayStatus::OutOfBottom | RayStatus::OutOfTop)
    }
}

#[derive(Debug, Clone, Copy)]
struct Layer {
    top: f64,
    bottom: f64,
    v_top: f64,
    v_bottom: f64,
    gradient: f64,
}

impl Layer {
    fn velocity_at(&self, depth: f64) -> f64 {
        self.v_top + self.gradient * (depth - self.top)
    }

    fn is_homogeneous(&self) -> bool {
        self.gradient.abs() <= HOMOGENEOUS_GRADIENT
    }
}

/// Where the ray currently is and which way it is heading vertically.
struct RayPosition {
    x: f64,
    z: f64,
    layer: usize,
    down: bool,
}

enum Step {
    /// Time ran out inside the layer.
    Finished,
    /// Crossed into the layer above (`false`) or below (`true`).
    Crossed { elapsed: f64, below: bool },
}

/// Traces rays through a profile of constant-gradient layers using the
/// closed-form circular-arc solution in each layer.
#[derive(Debug, Clone)]
pub struct RayTracer {
    layers: Vec<Layer>,
}

impl RayTracer {
    pub fn new(profile: &VelocityProfile) -> Self {
        let depth = profile.depths();
        let velocity = profile.velocities();
        let layers = depth
            .windows(2)
            .zip(velocity.windows(2))
            .map(|(d, v)| Layer {
                top: d[0],
                bottom: d[1],
                v_top: v[0],
                v_bottom: v[1],
                gradient: (v[1] - v[0]) / (d[1] - d[0]),
            })
            .collect();
        Self { layers }
    }

    /// Traces a ray leaving `source_depth` at `takeoff_angle` degrees from
    /// vertical (positive to starboard) for `travel_time` seconds.
    ///
    /// A source above the top of the profile is traced from the top and the
    /// result shifted back up by the difference. With a positive surface sound
    /// speed the angle is refracted from the transducer face into the water at
    /// the source according to `mode`.
    pub fn trace(
        &self,
        source_depth: f64,
        takeoff_angle: f64,
        travel_time: f64,
        surface_sound_speed: f64,
        null_angle: f64,
        mode: AngleMode,
    ) -> RayResult {
        let top = self.layers.first().map(|layer| layer.top).unwrap_or(0.0);
        let (start, static_shift) = if source_depth < top {
            (top, source_depth - top)
        } else {
            (source_depth, 0.0)
        };

        let Some(layer) = self.layer_containing(start) else {
            return RayResult {
                range: 0.0,
                depth: source_depth,
                travel_time: 0.0,
                status: RayStatus::OutOfBottom,
            };
        };
        let v_source = self.layers[layer].velocity_at(start);

        let angle = refract(takeoff_angle, surface_sound_speed, v_source, null_angle, mode);
        let side = if angle > 0.0 { 1.0 } else { -1.0 };
        let theta = angle.abs().to_radians();
        let p = theta.sin() / v_source;

        let mut ray = RayPosition {
            x: 0.0,
            z: start,
            layer,
            down: angle.abs() < 90.0,
        };
        let mut remaining = travel_time.max(0.0);
        let mut status = None;

        for _ in 0..MAX_CROSSINGS {
            if remaining <= 0.0 {
                break;
            }
            let current = self.layers[ray.layer];
            let step = if p * v_source < 1e-12 {
                vertical_step(&current, &mut ray, remaining)
            } else if current.is_homogeneous() {
                straight_step(&current, &mut ray, p, remaining)
            } else {
                arc_step(&current, &mut ray, p, remaining)
            };
            match step {
                Step::Finished => {
                    remaining = 0.0;
                }
                Step::Crossed { elapsed, below } => {
                    remaining -= elapsed;
                    if below {
                        if ray.layer + 1 >= self.layers.len() {
                            status = Some(RayStatus::OutOfBottom);
                            break;
                        }
                        ray.layer += 1;
                    } else {
                        if ray.layer == 0 {
                            status = Some(RayStatus::OutOfTop);
                            break;
                        }
                        ray.layer -= 1;
                    }
                }
            }
        }

        let status = status.unwrap_or(if ray.down {
            RayStatus::Down
        } else {
            RayStatus::Up
        });
        RayResult {
            range: side * ray.x,
            depth: ray.z + static_shift,
            travel_time: travel_time.max(0.0) - remaining.max(0.0),
            status,
        }
    }

    fn layer_containing(&self, depth: f64) -> Option<usize> {
        let index = self
            .layers
            .iter()
            .position(|layer| layer.top <= depth && depth < layer.bottom);
        index.or_else(|| match self.layers.last() {
            Some(last) if depth == last.bottom => Some(self.layers.len() - 1),
            _ => None,
        })
    }
}

/// Applies the angle correction of `mode`, returning degrees.
fn refract(angle: f64, ssv: f64, v_source: f64, null_angle: f64, mode: AngleMode) -> f64 {
    if ssv <= 0.0 {
        return angle;
    }
    let snell = |a: f64| -> f64 {
        let s = (a.to_radians().sin() / ssv * v_source).clamp(-1.0, 1.0);
        s.asin().to_degrees()
    };
    match mode {
        AngleMode::Unchanged => angle,
        AngleMode::Snell => snell(angle),
        AngleMode::SnellNull => null_angle + snell(angle - null_angle),
    }
}

fn vertical_step(layer: &Layer, ray: &mut RayPosition, remaining: f64) -> Step {
    let v = layer.velocity_at(ray.z);
    let boundary = if ray.down { layer.bottom } else { layer.top };
    let v_boundary = layer.velocity_at(boundary);
    let to_boundary = if layer.is_homogeneous() {
        (boundary - ray.z).abs() / v
    } else {
        (v_boundary / v).ln().abs() / layer.gradient.abs()
    };

    if to_boundary >= remaining {
        ray.z = if layer.is_homogeneous() {
            let dz = v * remaining;
            if ray.down {
                ray.z + dz
            } else {
                ray.z - dz
            }
        } else {
            let growth = if ray.down {
                layer.gradient * remaining
            } else {
                -layer.gradient * remaining
            };
            let v_end = v * growth.exp();
            layer.top + (v_end - layer.v_top) / layer.gradient
        };
        Step::Finished
    } else {
        ray.z = boundary;
        Step::Crossed {
            elapsed: to_boundary,
            below: ray.down,
        }
    }
}

fn straight_step(layer: &Layer, ray: &mut RayPosition, p: f64, remaining: f64) -> Step {
    let v = layer.velocity_at(ray.z);
    let sin_theta = (p * v).min(1.0);
    let cos_abs = (1.0 - sin_theta * sin_theta).max(0.0).sqrt();
    if cos_abs < 1e-12 {
        ray.x += v * remaining;
        return Step::Finished;
    }
    let (boundary, cos_theta) = if ray.down {
        (layer.bottom, cos_abs)
    } else {
        (layer.top, -cos_abs)
    };
    let path = (boundary - ray.z) / cos_theta;
    let to_boundary = path / v;

    if to_boundary >= remaining {
        let path = v * remaining;
        ray.x += path * sin_theta;
        ray.z += path * cos_theta;
        Step::Finished
    } else {
        ray.x += path * sin_theta;
        ray.z = boundary;
        Step::Crossed {
            elapsed: to_boundary,
            below: ray.down,
        }
    }
}

/// One layer of a refracting ray. The angle from the downward vertical obeys
/// `tan(theta / 2) = tan(theta_0 / 2) * exp(g * t)`.
fn arc_step(layer: &Layer, ray: &mut RayPosition, p: f64, remaining: f64) -> Step {
    let g = layer.gradient;
    let sin_now = (p * layer.velocity_at(ray.z)).min(1.0);
    let theta = if ray.down {
        sin_now.asin()
    } else {
        std::f64::consts::PI - sin_now.asin()
    };

    // Exit angle, boundary, and vertical direction after the exit.
    let (theta_exit, below, exit_down) = if ray.down {
        let s = p * layer.v_bottom;
        if s < 1.0 {
            (s.asin(), true, true)
        } else {
            let s_top = (p * layer.v_top).min(1.0);
            (std::f64::consts::PI - s_top.asin(), false, false)
        }
    } else {
        let s = p * layer.v_top;
        if s < 1.0 {
            (std::f64::consts::PI - s.asin(), false, false)
        } else {
            let s_bottom = (p * layer.v_bottom).min(1.0);
            (s_bottom.asin(), true, true)
        }
    };

    let half_tan = (theta / 2.0).tan();
    let to_boundary = ((theta_exit / 2.0).tan() / half_tan).ln().abs() / g.abs();
    let radius = 1.0 / (p * g);

    if to_boundary >= remaining {
        let theta_end = 2.0 * (half_tan * (g * remaining).exp()).atan();
        ray.x += (theta.cos() - theta_end.cos()) * radius;
        ray.z += (theta_end.sin() - theta.sin()) * radius;
        ray.down = theta_end.cos() >= 0.0;
        Step::Finished
    } else {
        ray.x += (theta.cos() - theta_exit.cos()) * radius;
        ray.z = if below { layer.bottom } else { layer.top };
        ray.down = exit_down;
        Step::Crossed {
            elapsed: to_boundary,
            below,
        }
    }
}
