use log::warn;
use std::fs;
use std::path::Path;

use crate::prelude::{ProcessError, ProcessResult};

/// Size of the optional text header at the start of versioned files.
pub const HEADER_SIZE: usize = 1024;
/// Stride separating the beam numbers of pings that share one timestamp.
pub const MULTIPLICITY_FACTOR: i32 = 1_000_000;

const RECORD_SIZE: usize = 16;
const MODE_OFFSET: usize = 13;
/// Records at or beyond this time are placeholders and never applied.
const TIME_SENTINEL: f64 = 4.29497e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Flag,
    Unflag,
    Zero,
    Filter,
    Sonar,
}

impl EditAction {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(EditAction::Flag),
            2 => Some(EditAction::Unflag),
            3 => Some(EditAction::Zero),
            4 => Some(EditAction::Filter),
            5 => Some(EditAction::Sonar),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            EditAction::Flag => 1,
            EditAction::Unflag => 2,
            EditAction::Zero => 3,
            EditAction::Filter => 4,
            EditAction::Sonar => 5,
        }
    }
}

/// How beams of an edited ping that no record mentions are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerMode {
    #[default]
    Explicit,
    ImplicitNull,
    ImplicitGood,
}

impl LedgerMode {
    fn from_code(code: i32) -> Self {
        match code {
            1 => LedgerMode::ImplicitNull,
            2 => LedgerMode::ImplicitGood,
            _ => LedgerMode::Explicit,
        }
    }

    fn code(self) -> i32 {
        match self {
            LedgerMode::Explicit => 0,
            LedgerMode::ImplicitNull => 1,
            LedgerMode::ImplicitGood => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditRecord {
    pub time: f64,
    /// Beam index plus `multiplicity * MULTIPLICITY_FACTOR`.
    pub beam: i32,
    pub action: EditAction,
}

impl EditRecord {
    pub fn beam_index(&self) -> usize {
        (self.beam % MULTIPLICITY_FACTOR) as usize
    }

    pub fn multiplicity(&self) -> u32 {
        (self.beam / MULTIPLICITY_FACTOR) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditFile {
    pub version: u32,
    pub mode: LedgerMode,
    pub records: Vec<EditRecord>,
}

pub fn read_edit_file(path: &Path) -> ProcessResult<EditFile> {
    let bytes = fs::read(path).map_err(|err| ProcessError::io(path, err))?;
    parse_edit_file(&bytes, path)
}

/// Decodes the big-endian `(f64 time, i32 beam, i32 action)` records, after
/// the header when one is present.
pub fn parse_edit_file(bytes: &[u8], source: &Path) -> ProcessResult<EditFile> {
    let (version, mode, body) = match parse_header(bytes) {
        Some((version, mode)) => (version, mode, &bytes[HEADER_SIZE.min(bytes.len())..]),
        None => (1, LedgerMode::Explicit, bytes),
    };

    if body.len() % RECORD_SIZE != 0 {
        warn!(
            "{}: ignoring {} trailing bytes",
            source.display(),
            body.len() % RECORD_SIZE
        );
    }

    let mut records = Vec::with_capacity(body.len() / RECORD_SIZE);
    for chunk in body.chunks_exact(RECORD_SIZE) {
        let time = f64::from_be_bytes(field(&chunk[0..8])?);
        let beam = i32::from_be_bytes(field(&chunk[8..12])?);
        let code = i32::from_be_bytes(field(&chunk[12..16])?);
        if time >= TIME_SENTINEL || beam < 0 {
            continue;
        }
        match EditAction::from_code(code) {
            Some(action) => records.push(EditRecord { time, beam, action }),
            None => warn!("{}: unknown edit action {}", source.display(), code),
        }
    }

    Ok(EditFile {
        version,
        mode,
        records,
    })
}

fn field<const N: usize>(bytes: &[u8]) -> ProcessResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| ProcessError::Internal("edit record slice has the wrong width".into()))
}

fn parse_header(bytes: &[u8]) -> Option<(u32, LedgerMode)> {
    let version = if bytes.starts_with(b"ESFVERSION03") {
        3
    } else if bytes.starts_with(b"ESFVERSION02") {
        2
    } else {
        return None;
    };
    let text_end = bytes.len().min(HEADER_SIZE);
    let text = bytes.get(MODE_OFFSET..text_end).unwrap_or_default();
    let text = String::from_utf8_lossy(text);
    let mode = text
        .trim_start_matches('\0')
        .strip_prefix("ESF Mode:")
        .and_then(|rest| {
            rest.trim_start()
                .split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|digits| digits.parse::<i32>().ok())
        })
        .map(LedgerMode::from_code)
        .unwrap_or_default();
    Some((version, mode))
}

/// Writes a version 3 file with its header.
pub fn write_edit_file(path: &Path, file: &EditFile) -> ProcessResult<()> {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[..12].copy_from_slice(b"ESFVERSION03");
    let mode = format!("ESF Mode: {}", file.mode.code());
    bytes[MODE_OFFSET..MODE_OFFSET + mode.len()].copy_from_slice(mode.as_bytes());
    bytes.reserve(file.records.len() * RECORD_SIZE);
    for record in &file.records {
        bytes.extend_from_slice(&record.time.to_be_bytes());
        bytes.extend_from_slice(&record.beam.to_be_bytes());
        bytes.extend_from_slice(&record.action.code().to_be_bytes());
    }
    fs::write(path, bytes).map_err(|err| ProcessError::io(path, err))
}
