//! Strictly time-ordered auxiliary tables and their interpolation.
//!
//! Every table keeps its sample times plus one value vector per channel.
//! Queries go through a [`SeriesCursor`] that remembers the last bracketing
//! index, so a stream of non-decreasing ping times costs amortised O(1).

use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::math::{normalize_heading, LonFlip};
use crate::prelude::{ProcessError, ProcessResult};

pub mod navfile;
pub mod spline;
pub mod tablefile;
pub mod timefmt;

pub use navfile::{load_adjusted_navigation, load_navigation, AdjustedNavigation, Navigation};
pub use tablefile::{load_attitude, load_tide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InterpMode {
    #[default]
    Linear,
    Spline,
}

/// Angular channels interpolate across their wrap point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    None,
    Longitude(LonFlip),
    Heading,
}

#[derive(Debug, Clone)]
struct Channel {
    values: Vec<f64>,
    wrap: Wrap,
    second_derivatives: Option<Vec<f64>>,
}

/// Remembers the lower bracketing index of the previous query.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesCursor {
    hint: usize,
}

impl SeriesCursor {
    /// Returns `j` in `[0, n-2]` with `times[j] <= t < times[j+1]`, clamped at both ends.
    pub fn bracket(&mut self, times: &[f64], t: f64) -> usize {
        if times.len() < 2 {
            return 0;
        }
        let last = times.len() - 2;
        let mut j = self.hint.min(last);
        if t < times[j] {
            j = times
                .partition_point(|&sample| sample <= t)
                .saturating_sub(1)
                .min(last);
        } else {
            while j < last && times[j + 1] <= t {
                j += 1;
            }
        }
        self.hint = j;
        j
    }

    pub fn hint(&self) -> usize {
        self.hint
    }
}

#[derive(Debug, Clone)]
pub struct TimeSeries {
    source: PathBuf,
    times: Vec<f64>,
    channels: Vec<Channel>,
}

impl TimeSeries {
    /// Builds a table from rows of `(time, channel values)`.
    ///
    /// Rows whose time does not strictly increase are logged and dropped.
    /// Fails when fewer than `min_samples` rows survive.
    pub fn from_rows<P: AsRef<Path>>(
        source: P,
        rows: Vec<(f64, Vec<f64>)>,
        wraps: &[Wrap],
        min_samples: usize,
    ) -> ProcessResult<Self> {
        let source = source.as_ref().to_path_buf();
        let mut times = Vec::with_capacity(rows.len());
        let mut channels = wraps
            .iter()
            .map(|wrap| Channel {
                values: Vec::with_capacity(rows.len()),
                wrap: *wrap,
                second_derivatives: None,
            })
            .collect::<Vec<_>>();

        for (time, values) in rows {
            if values.len() != channels.len() {
                return Err(ProcessError::Internal(format!(
                    "row with {} values for {} channels",
                    values.len(),
                    channels.len()
                )));
            }
            if let Some(&previous) = times.last() {
                if time <= previous {
                    warn!(
                        "{}: dropping sample at {:.6} not after {:.6}",
                        source.display(),
                        time,
                        previous
                    );
                    continue;
                }
            }
            times.push(time);
            for (channel, value) in channels.iter_mut().zip(values) {
                channel.values.push(value);
            }
        }

        if times.len() < min_samples.max(1) {
            return Err(ProcessError::insufficient(
                &source,
                format!("{} usable samples, need {}", times.len(), min_samples.max(1)),
            ));
        }
        Ok(Self {
            source,
            times,
            channels,
        })
    }

    /// Precomputes natural-spline second derivatives for the given channels.
    pub fn with_spline(mut self, channels: &[usize]) -> Self {
        if self.times.len() < 3 {
            return self;
        }
        for &index in channels {
            if let Some(channel) = self.channels.get_mut(index) {
                channel.second_derivatives =
                    Some(spline::second_derivatives(&self.times, &channel.values));
            }
        }
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn value_at(&self, channel: usize, index: usize) -> f64 {
        self.channels[channel].values[index]
    }

    /// Interpolated value of `channel` at `time`, plus the bracketing index used.
    ///
    /// Spline mode applies only strictly inside the sampled span and only to
    /// channels prepared with [`TimeSeries::with_spline`]; everything else is
    /// linear, clamped to the end samples.
    pub fn interpolate(
        &self,
        cursor: &mut SeriesCursor,
        channel: usize,
        time: f64,
        mode: InterpMode,
    ) -> (f64, usize) {
        let data = &self.channels[channel];
        let n = self.times.len();
        if n == 1 {
            return (data.values[0], 0);
        }
        let j = cursor.bracket(&self.times, time);
        if time <= self.times[0] {
            return (data.values[0], j);
        }
        if time >= self.times[n - 1] {
            return (data.values[n - 1], j);
        }

        if let (InterpMode::Spline, Some(second)) = (mode, data.second_derivatives.as_ref()) {
            let value = spline::evaluate(&self.times, &data.values, second, j, time);
            return (self.wrap_result(data.wrap, value), j);
        }

        let (t0, t1) = (self.times[j], self.times[j + 1]);
        let (v0, v1) = (data.values[j], data.values[j + 1]);
        let mut delta = v1 - v0;
        if data.wrap != Wrap::None {
            if delta > 180.0 {
                delta -= 360.0;
            } else if delta < -180.0 {
                delta += 360.0;
            }
        }
        let value = v0 + delta * (time - t0) / (t1 - t0);
        (self.wrap_result(data.wrap, value), j)
    }

    fn wrap_result(&self, wrap: Wrap, value: f64) -> f64 {
        match wrap {
            Wrap::None => value,
            Wrap::Longitude(flip) => flip.apply(value),
            Wrap::Heading => normalize_heading(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn table(rows: Vec<(f64, Vec<f64>)>, wraps: &[Wrap]) -> TimeSeries {
        TimeSeries::from_rows("mem", rows, wraps, 2).unwrap()
    }

    #[test]
    fn linear_midpoint_between_two_fixes() {
        let nav = table(
            vec![(0.0, vec![0.0, 0.0]), (10.0, vec![1.0, 1.0])],
            &[Wrap::Longitude(LonFlip::Centered), Wrap::None],
        );
        let mut cursor = SeriesCursor::default();
        let (lon, j) = nav.interpolate(&mut cursor, 0, 5.0, InterpMode::Linear);
        let (lat, _) = nav.interpolate(&mut cursor, 1, 5.0, InterpMode::Linear);
        assert_abs_diff_eq!(lon, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(lat, 0.5, epsilon = 1e-12);
        assert_eq!(j, 0);
    }

    #[test]
    fn queries_outside_the_table_clamp() {
        let series = table(vec![(0.0, vec![1.0]), (1.0, vec![3.0])], &[Wrap::None]);
        let mut cursor = SeriesCursor::default();
        assert_eq!(series.interpolate(&mut cursor, 0, -5.0, InterpMode::Linear).0, 1.0);
        assert_eq!(series.interpolate(&mut cursor, 0, 50.0, InterpMode::Linear).0, 3.0);
    }

    #[test]
    fn heading_interpolates_across_north() {
        let series = table(vec![(0.0, vec![350.0]), (2.0, vec![10.0])], &[Wrap::Heading]);
        let mut cursor = SeriesCursor::default();
        let (heading, _) = series.interpolate(&mut cursor, 0, 1.5, InterpMode::Linear);
        assert_abs_diff_eq!(heading, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn longitude_interpolates_across_antimeridian() {
        let series = table(
            vec![(0.0, vec![179.0]), (2.0, vec![-179.0])],
            &[Wrap::Longitude(LonFlip::Centered)],
        );
        let mut cursor = SeriesCursor::default();
        let (lon, _) = series.interpolate(&mut cursor, 0, 1.5, InterpMode::Linear);
        assert_abs_diff_eq!(lon, -179.5, epsilon = 1e-12);
    }

    #[test]
    fn spline_and_linear_agree_at_samples() {
        let rows = (0..8)
            .map(|i| (i as f64 * 1.5, vec![(i as f64 * 0.7).sin() * 10.0]))
            .collect::<Vec<_>>();
        let series = table(rows, &[Wrap::None]).with_spline(&[0]);
        let mut linear = SeriesCursor::default();
        let mut spline = SeriesCursor::default();
        for (index, &time) in series.times().to_vec().iter().enumerate() {
            let (a, _) = series.interpolate(&mut linear, 0, time, InterpMode::Linear);
            let (b, _) = series.interpolate(&mut spline, 0, time, InterpMode::Spline);
            assert_eq!(a, b);
            assert_eq!(a, series.value_at(0, index));
        }
    }

    #[test]
    fn spline_reproduces_a_straight_line() {
        let rows = (0..5).map(|i| (i as f64, vec![2.0 * i as f64 + 1.0])).collect();
        let series = table(rows, &[Wrap::None]).with_spline(&[0]);
        let mut cursor = SeriesCursor::default();
        let (value, _) = series.interpolate(&mut cursor, 0, 2.25, InterpMode::Spline);
        assert_abs_diff_eq!(value, 5.5, epsilon = 1e-12);
    }

    #[test]
    fn bracket_index_never_decreases_for_forward_queries() {
        let rows = (0..20).map(|i| (i as f64, vec![i as f64])).collect();
        let series = table(rows, &[Wrap::None]);
        let mut cursor = SeriesCursor::default();
        let mut last = 0;
        for step in 0..80 {
            let (_, j) = series.interpolate(&mut cursor, 0, step as f64 * 0.3 - 1.0, InterpMode::Linear);
            assert!(j >= last);
            last = j;
        }
        assert_eq!(last, 18);
    }

    #[test]
    fn backward_query_falls_back_to_search() {
        let rows = (0..10).map(|i| (i as f64, vec![i as f64])).collect();
        let series = table(rows, &[Wrap::None]);
        let mut cursor = SeriesCursor::default();
        series.interpolate(&mut cursor, 0, 8.5, InterpMode::Linear);
        let (value, j) = series.interpolate(&mut cursor, 0, 2.5, InterpMode::Linear);
        assert_eq!(j, 2);
        assert_abs_diff_eq!(value, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn duplicate_times_are_dropped() {
        let series = table(
            vec![(0.0, vec![0.0]), (0.0, vec![5.0]), (1.0, vec![1.0]), (0.5, vec![9.0])],
            &[Wrap::None],
        );
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn too_few_samples_is_an_error() {
        let result = TimeSeries::from_rows("mem", vec![(0.0, vec![1.0])], &[Wrap::None], 2);
        assert!(matches!(result, Err(ProcessError::InsufficientData { .. })));
    }
}
