use log::{debug, info, warn};

/// Routes status messages for one input to the `log` facade.
///
/// `verbosity` mirrors the command-line `-v` count: 0 keeps only warnings and
/// per-input summaries, 1 adds progress lines, 2 and above add per-ping detail.
pub struct LogManager {
    label: String,
    verbosity: u8,
}

impl LogManager {
    pub fn new(label: impl Into<String>, verbosity: u8) -> Self {
        Self {
            label: label.into(),
            verbosity,
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn record(&self, message: &str) {
        info!("{}: {}", self.label, message);
    }

    pub fn progress(&self, message: &str) {
        if self.verbosity >= 1 {
            info!("{}: {}", self.label, message);
        }
    }

    pub fn detail(&self, message: &str) {
        if self.verbosity >= 2 {
            debug!("{}: {}", self.label, message);
        }
    }

    pub fn warning(&self, message: &str) {
        warn!("{}: {}", self.label, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("swath", 0)
    }
}
