use crate::edits::EditLedger;
use crate::prelude::{ProcessResult, ProcessingStage};
use crate::swath::PingState;

/// Replays saved edits against each ping.
pub struct EditStage {
    ledger: EditLedger,
}

impl EditStage {
    pub fn new(ledger: EditLedger) -> Self {
        Self { ledger }
    }
}

impl ProcessingStage for EditStage {
    fn name(&self) -> &'static str {
        "edits"
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        let time = state.time();
        let outcome = self.ledger.apply(time, state.multiplicity, &mut state.ping.beams);
        state.edits_changed += outcome.changed;
        Ok(())
    }
}
