//! Saved beam edits: the binary edit-save file and the forward-only ledger
//! that replays it against the ping stream.

pub mod esf;
pub mod ledger;

pub use esf::{read_edit_file, write_edit_file, EditAction, EditFile, EditRecord, LedgerMode};
pub use ledger::{EditLedger, EditOutcome};
