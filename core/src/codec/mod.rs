//! Record stream seams. Vendor byte layouts live behind these traits; the
//! crate ships a JSON-lines stream used by the driver and the tests.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::prelude::{ProcessError, ProcessResult};
use crate::swath::{BeamTravel, Kinematics, Ping, SwathRecord};

pub mod jsonl;

pub use jsonl::{JsonLinesCodec, JsonLinesReader, JsonLinesWriter};

/// Format identifier of the bundled JSON-lines stream.
pub const JSONL_FORMAT: i32 = 0;

/// Non-fatal conditions reported by a reader between records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamNotice {
    TimeGap,
    OutOfBounds,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadStatus {
    Record(SwathRecord),
    Notice(StreamNotice),
    Eof,
}

pub trait SwathReader {
    fn read_record(&mut self) -> ProcessResult<ReadStatus>;
}

pub trait SwathWriter {
    fn write_record(&mut self, record: &SwathRecord) -> ProcessResult<()>;
    fn finish(&mut self) -> ProcessResult<()>;
}

/// Sidescan regeneration parameters. `None` means derive from the data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SidescanSettings {
    pub pixel_size: Option<f64>,
    /// Total swath width in degrees.
    pub swath_width: Option<f64>,
    /// Maximum gap, in pixels, closed by linear interpolation.
    pub interpolate: usize,
}

/// Per-format access to the fields of a ping the pipeline corrects.
pub trait PingCodec {
    fn extract_kinematics(&self, ping: &Ping) -> Kinematics;
    fn insert_kinematics(&self, ping: &mut Ping, kinematics: &Kinematics);
    /// Recorded travel-time block of every beam, `None` where a beam carries none.
    /// Formats that only store soundings return all `None`.
    fn extract_travel_times(&self, ping: &Ping) -> Vec<Option<BeamTravel>>;

    /// Rebuilds the sidescan from corrected soundings. Returns `Ok(false)` when
    /// the format cannot do so.
    fn rebuild_sidescan(&self, _ping: &mut Ping, _settings: &SidescanSettings) -> ProcessResult<bool> {
        Ok(false)
    }
}

pub fn codec_for_format(format: Option<i32>) -> ProcessResult<JsonLinesCodec> {
    match format.unwrap_or(JSONL_FORMAT) {
        JSONL_FORMAT => Ok(JsonLinesCodec),
        other => Err(ProcessError::Codec(format!("unsupported format id {}", other))),
    }
}

pub fn open_reader<P: AsRef<Path>>(path: P) -> ProcessResult<Box<dyn SwathReader + Send>> {
    Ok(Box::new(JsonLinesReader::open(path)?))
}

pub fn create_writer<P: AsRef<Path>>(path: P) -> ProcessResult<Box<dyn SwathWriter + Send>> {
    Ok(Box::new(JsonLinesWriter::create(path)?))
}
