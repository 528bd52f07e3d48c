use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::codec::StreamNotice;
use crate::swath::{Beam, BeamFlag};

/// Running totals for one input, shareable across threads.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub records_read: usize,
    pub records_written: usize,
    pub pings: usize,
    pub navigation: usize,
    pub comments: usize,
    pub time_gaps: usize,
    pub out_of_bounds: usize,
    pub beams_good: usize,
    pub beams_flagged: usize,
    pub beams_null: usize,
    pub beams_nulled_by_raytrace: usize,
    pub edits_applied: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_read(&self) {
        self.update(|m| m.records_read += 1);
    }

    pub fn record_written(&self) {
        self.update(|m| m.records_written += 1);
    }

    pub fn record_navigation(&self) {
        self.update(|m| m.navigation += 1);
    }

    pub fn record_comment(&self) {
        self.update(|m| m.comments += 1);
    }

    pub fn record_notice(&self, notice: StreamNotice) {
        self.update(|m| match notice {
            StreamNotice::TimeGap => m.time_gaps += 1,
            StreamNotice::OutOfBounds => m.out_of_bounds += 1,
        });
    }

    pub fn record_ping(&self, beams: &[Beam]) {
        self.update(|m| {
            m.pings += 1;
            for beam in beams {
                match beam.flag {
                    BeamFlag::Good => m.beams_good += 1,
                    BeamFlag::Null => m.beams_null += 1,
                    _ => m.beams_flagged += 1,
                }
            }
        });
    }

    pub fn record_raytrace_nulls(&self, count: usize) {
        self.update(|m| m.beams_nulled_by_raytrace += count);
    }

    pub fn record_edits(&self, count: usize) {
        self.update(|m| m.edits_applied += count);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
