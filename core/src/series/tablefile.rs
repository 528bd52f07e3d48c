//! Tide and attitude tables: a time prefix (layouts 1 to 4) followed by values.

use log::{debug, info};
use std::fs;
use std::path::Path;

use super::timefmt::parse_time_prefix;
use super::{TimeSeries, Wrap};
use crate::prelude::{ProcessError, ProcessResult};

pub const TIDE: usize = 0;

pub const ROLL: usize = 0;
pub const PITCH: usize = 1;
pub const HEAVE: usize = 2;

fn load_table(path: &Path, format: i32, columns: usize, min_samples: usize) -> ProcessResult<TimeSeries> {
    if !(1..=4).contains(&format) {
        return Err(ProcessError::Config(format!(
            "{}: time format {} is not supported",
            path.display(),
            format
        )));
    }
    let text = fs::read_to_string(path).map_err(|err| ProcessError::io(path, err))?;
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let parsed = parse_time_prefix(&fields, format).and_then(|(time, used)| {
            let values = (used..used + columns)
                .map(|i| fields.get(i).and_then(|raw| raw.parse::<f64>().ok()))
                .collect::<Option<Vec<_>>>()?;
            Some((time, values))
        });
        match parsed {
            Some(row) => rows.push(row),
            None => debug!("{}:{} unparseable line", path.display(), index + 1),
        }
    }
    TimeSeries::from_rows(path, rows, &vec![Wrap::None; columns], min_samples)
}

/// A single tide value is enough: it applies to every ping.
pub fn load_tide(path: &Path, format: i32) -> ProcessResult<TimeSeries> {
    let series = load_table(path, format, 1, 1)?;
    info!("{}: {} tide samples", path.display(), series.len());
    Ok(series)
}

pub fn load_attitude(path: &Path, format: i32) -> ProcessResult<TimeSeries> {
    let series = load_table(path, format, 3, 2)?;
    info!("{}: {} attitude samples", path.display(), series.len());
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{InterpMode, SeriesCursor};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn single_tide_sample_is_accepted() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# tide").unwrap();
        writeln!(file, "1000.0 0.35").unwrap();
        let tide = load_tide(file.path(), 1).unwrap();
        let mut cursor = SeriesCursor::default();
        assert_eq!(tide.interpolate(&mut cursor, TIDE, 5000.0, InterpMode::Linear).0, 0.35);
    }

    #[test]
    fn attitude_in_calendar_layout() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2004 02 03 04 05 06.0 1.0 -1.0 0.10").unwrap();
        writeln!(file, "2004 02 03 04 05 08.0 3.0 -3.0 0.30").unwrap();
        writeln!(file, "garbage").unwrap();
        let attitude = load_attitude(file.path(), 2).unwrap();
        assert_eq!(attitude.len(), 2);
        let mut cursor = SeriesCursor::default();
        let t = attitude.times()[0] + 1.0;
        assert_eq!(attitude.interpolate(&mut cursor, ROLL, t, InterpMode::Linear).0, 2.0);
        assert_eq!(attitude.interpolate(&mut cursor, PITCH, t, InterpMode::Linear).0, -2.0);
    }

    #[test]
    fn unsupported_format_is_a_config_error() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(load_tide(file.path(), 7), Err(ProcessError::Config(_))));
    }
}
