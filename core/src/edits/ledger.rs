use log::info;
use std::path::{Path, PathBuf};

use crate::prelude::ProcessResult;
use crate::swath::{Beam, BeamFlag};

use super::esf::{read_edit_file, EditAction, EditFile, EditRecord, LedgerMode};

/// Time window within which an edit matches a ping, in seconds.
pub const MATCH_TOLERANCE: f64 = 0.00011;

/// Counts of what one `apply` call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditOutcome {
    /// Records whose time and multiplicity matched the ping.
    pub matched: usize,
    /// Beams whose flag changed.
    pub changed: usize,
}

/// Time-sorted edit records replayed against pings in stream order.
///
/// The search cursor only ever moves forward, so a stream whose pings are in
/// time order touches each record a bounded number of times.
#[derive(Debug, Clone)]
pub struct EditLedger {
    source: PathBuf,
    mode: LedgerMode,
    tolerance: f64,
    records: Vec<EditRecord>,
    cursor: usize,
}

impl EditLedger {
    pub fn load(path: &Path) -> ProcessResult<Self> {
        let file = read_edit_file(path)?;
        let ledger = Self::from_file(path, file);
        info!(
            "{}: {} saved edits ({:?})",
            path.display(),
            ledger.records.len(),
            ledger.mode
        );
        Ok(ledger)
    }

    pub fn from_file(source: impl Into<PathBuf>, file: EditFile) -> Self {
        let mut records = file.records;
        // Stable, so records sharing a time keep the order they were saved in.
        records.sort_by(|a, b| a.time.total_cmp(&b.time));
        // Early files truncated times to the millisecond.
        let tolerance = if file.version == 1 {
            10.0 * MATCH_TOLERANCE
        } else {
            MATCH_TOLERANCE
        };
        Self {
            source: source.into(),
            mode: file.mode,
            tolerance,
            records,
            cursor: 0,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn apply(&mut self, time: f64, multiplicity: u32, beams: &mut [Beam]) -> EditOutcome {
        while self.cursor < self.records.len() && self.records[self.cursor].time < time - self.tolerance {
            self.cursor += 1;
        }

        let mut outcome = EditOutcome::default();
        let mut touched = vec![false; beams.len()];
        for record in self.records[self.cursor..]
            .iter()
            .take_while(|record| record.time <= time + self.tolerance)
        {
            if record.multiplicity() != multiplicity {
                continue;
            }
            outcome.matched += 1;
            let index = record.beam_index();
            let Some(beam) = beams.get_mut(index) else {
                continue;
            };
            touched[index] = true;
            if apply_action(record.action, beam) {
                outcome.changed += 1;
            }
        }

        if outcome.matched > 0 {
            let implicit = match self.mode {
                LedgerMode::Explicit => None,
                LedgerMode::ImplicitNull => Some(BeamFlag::Null),
                LedgerMode::ImplicitGood => Some(BeamFlag::Good),
            };
            if let Some(flag) = implicit {
                for (beam, _) in beams.iter_mut().zip(&touched).filter(|(_, touched)| !**touched) {
                    if beam.flag != flag {
                        beam.flag = flag;
                        outcome.changed += 1;
                    }
                }
            }
        }
        outcome
    }
}

/// Returns whether the beam's flag changed.
fn apply_action(action: EditAction, beam: &mut Beam) -> bool {
    let next = match action {
        EditAction::Flag if beam.flag.is_valid() => BeamFlag::Manual,
        EditAction::Filter if beam.flag.is_valid() => BeamFlag::Filter,
        EditAction::Sonar if beam.flag.is_valid() => BeamFlag::Sonar,
        EditAction::Unflag if beam.flag.is_flagged() => BeamFlag::Good,
        EditAction::Zero => BeamFlag::Null,
        _ => return false,
    };
    let changed = beam.flag != next;
    beam.flag = next;
    changed
}
