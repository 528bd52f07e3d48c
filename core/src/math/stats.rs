use serde::{Deserialize, Serialize};

/// Streaming min/max/mean/rms accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RunningStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    sum: f64,
    sum_sq: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn rms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sum_sq / self.count as f64).sqrt()
    }

    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_yield_zero_rms() {
        let stats = RunningStats::default();
        assert_eq!(stats.rms(), 0.0);
        assert_eq!(stats.mean(), None);
    }

    #[test]
    fn stats_track_extremes() {
        let mut stats = RunningStats::default();
        for value in [4.0, -2.0, f64::NAN, 10.0] {
            stats.push(value);
        }
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 10.0);
        assert_eq!(stats.mean(), Some(4.0));
    }

    #[test]
    fn merge_combines_counts() {
        let mut a = RunningStats::default();
        a.push(4.0);
        let mut b = RunningStats::default();
        b.push(-4.0);
        a.merge(&b);
        assert_eq!(a.count, 2);
        assert_eq!(a.rms(), 4.0);
    }
}
