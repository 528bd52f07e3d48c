//! Navigation and adjusted-navigation text files.

use log::{debug, info, warn};
use std::fs;
use std::path::Path;

use super::timefmt::{epoch_from_day_of_year, fix_two_digit_year, parse_time_prefix};
use super::{InterpMode, TimeSeries, Wrap};
use crate::math::LonFlip;
use crate::prelude::{ProcessError, ProcessResult};

pub const LON: usize = 0;
pub const LAT: usize = 1;
pub const HEADING: usize = 2;
pub const SPEED: usize = 3;
pub const DRAFT: usize = 4;
pub const ROLL: usize = 5;
pub const PITCH: usize = 6;
pub const HEAVE: usize = 7;

/// Adjusted-navigation depth offset channel.
pub const Z_OFFSET: usize = 2;

/// Edited navigation table. Formats without vessel motion columns leave the
/// matching `has_*` flags false so the merge skips them.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub series: TimeSeries,
    pub has_motion: bool,
    pub has_attitude: bool,
}

#[derive(Debug, Clone)]
pub struct AdjustedNavigation {
    pub series: TimeSeries,
    pub has_depth: bool,
}

fn read_lines(path: &Path) -> ProcessResult<String> {
    fs::read_to_string(path).map_err(|err| ProcessError::io(path, err))
}

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'))
}

/// Fixed-column legacy layout: `YYYY+DDD+HH:MM:SS.sss N DDMM.MMMMM W DDDMM.MMMMM`
/// with an optional two-digit year.
fn parse_fixed_column(line: &str) -> Option<(f64, f64, f64)> {
    let field = |start: usize, len: usize| line.get(start..start + len).map(str::trim);
    let bytes = line.as_bytes();
    let (year, mut offset) = if bytes.get(2) == Some(&b'+') {
        (fix_two_digit_year(field(0, 2)?.parse().ok()?), 3)
    } else {
        (field(0, 4)?.parse().ok()?, 5)
    };
    let day_of_year: u32 = field(offset, 3)?.parse().ok()?;
    offset += 4;
    let hour: f64 = field(offset, 2)?.parse().ok()?;
    offset += 3;
    let minute: f64 = field(offset, 2)?.parse().ok()?;
    offset += 3;
    let second: f64 = field(offset, 2)?.parse().ok()?;
    let time = epoch_from_day_of_year(year, day_of_year, hour, minute, second)?;

    offset += 7;
    let north_south = *bytes.get(offset)?;
    offset += 1;
    let lat_deg: f64 = field(offset, 3)?.parse().ok()?;
    offset += 3;
    let lat_min: f64 = field(offset, 8)?.parse().ok()?;
    offset += 9;
    let east_west = *bytes.get(offset)?;
    offset += 1;
    let lon_deg: f64 = field(offset, 4)?.parse().ok()?;
    offset += 4;
    let lon_min: f64 = field(offset, 8)?.parse().ok()?;

    let mut lat = lat_deg + lat_min / 60.0;
    if north_south == b'S' {
        lat = -lat;
    }
    let mut lon = lon_deg + lon_min / 60.0;
    if east_west == b'W' {
        lon = -lon;
    }
    Some((time, lon, lat))
}

struct NavRow {
    time: f64,
    values: [f64; 8],
    motion: bool,
    attitude: bool,
}

fn parse_nav_line(line: &str, format: i32) -> Option<NavRow> {
    let fields = line.split_whitespace().collect::<Vec<_>>();
    let num = |index: usize| fields.get(index).and_then(|raw| raw.parse::<f64>().ok());
    match format {
        1..=4 => {
            let (time, used) = parse_time_prefix(&fields, format)?;
            let mut values = [0.0; 8];
            values[LON] = num(used)?;
            values[LAT] = num(used + 1)?;
            Some(NavRow {
                time,
                values,
                motion: false,
                attitude: false,
            })
        }
        5 => {
            let (time, lon, lat) = parse_fixed_column(line)?;
            let mut values = [0.0; 8];
            values[LON] = lon;
            values[LAT] = lat;
            Some(NavRow {
                time,
                values,
                motion: false,
                attitude: false,
            })
        }
        9 => {
            if fields.len() < 9 {
                return None;
            }
            let mut values = [0.0; 8];
            values[LON] = num(7)?;
            values[LAT] = num(8)?;
            let motion = fields.len() >= 12;
            if motion {
                values[HEADING] = num(9)?;
                values[SPEED] = num(10)?;
                values[DRAFT] = num(11)?;
            }
            let attitude = fields.len() >= 15;
            if attitude {
                values[ROLL] = num(12)?;
                values[PITCH] = num(13)?;
                values[HEAVE] = num(14)?;
            }
            Some(NavRow {
                time: num(6)?,
                values,
                motion,
                attitude,
            })
        }
        _ => None,
    }
}

/// Loads an edited navigation file.
///
/// `time_shift` is added to every sample time and longitudes are wrapped by
/// `lonflip`. At least two strictly increasing samples must remain.
pub fn load_navigation(
    path: &Path,
    format: i32,
    time_shift: f64,
    lonflip: LonFlip,
    interp: InterpMode,
) -> ProcessResult<Navigation> {
    if !matches!(format, 1..=5 | 9) {
        return Err(ProcessError::Config(format!(
            "navigation format {} is not supported",
            format
        )));
    }
    let text = read_lines(path)?;
    let mut rows = Vec::new();
    let mut has_motion = true;
    let mut has_attitude = true;
    for (number, line) in data_lines(&text) {
        match parse_nav_line(line, format) {
            Some(mut row) => {
                has_motion &= row.motion;
                has_attitude &= row.attitude;
                row.values[LON] = lonflip.apply(row.values[LON]);
                rows.push((row.time + time_shift, row.values.to_vec()));
            }
            None => debug!("{}:{} unparseable navigation line", path.display(), number),
        }
    }
    if rows.is_empty() {
        has_motion = false;
        has_attitude = false;
    }

    let wraps = [
        Wrap::Longitude(lonflip),
        Wrap::None,
        Wrap::Heading,
        Wrap::None,
        Wrap::None,
        Wrap::None,
        Wrap::None,
        Wrap::None,
    ];
    let mut series = TimeSeries::from_rows(path, rows, &wraps, 2)?;
    if interp == InterpMode::Spline {
        series = series.with_spline(&[LON, LAT]);
    }
    if !has_motion {
        warn!(
            "{}: heading, speed and draft columns missing, not merging them",
            path.display()
        );
    }
    if !has_attitude {
        debug!("{}: no attitude columns", path.display());
    }
    info!("{}: {} navigation samples", path.display(), series.len());
    Ok(Navigation {
        series,
        has_motion,
        has_attitude,
    })
}

/// Loads adjusted navigation; `with_depth` requires the sixteenth column (depth offset).
pub fn load_adjusted_navigation(
    path: &Path,
    with_depth: bool,
    lonflip: LonFlip,
    interp: InterpMode,
) -> ProcessResult<AdjustedNavigation> {
    let text = read_lines(path)?;
    let required = if with_depth { 16 } else { 9 };
    let mut rows = Vec::new();
    for (number, line) in data_lines(&text) {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let num = |index: usize| fields.get(index).and_then(|raw| raw.parse::<f64>().ok());
        if fields.len() < required {
            debug!(
                "{}:{} has {} columns, need {}",
                path.display(),
                number,
                fields.len(),
                required
            );
            continue;
        }
        let parsed = (|| {
            let z = if with_depth { num(15)? } else { 0.0 };
            Some((num(6)?, vec![lonflip.apply(num(7)?), num(8)?, z]))
        })();
        match parsed {
            Some(row) => rows.push(row),
            None => debug!("{}:{} unparseable adjusted navigation line", path.display(), number),
        }
    }

    let wraps = [Wrap::Longitude(lonflip), Wrap::None, Wrap::None];
    let mut series = TimeSeries::from_rows(path, rows, &wraps, 2)?;
    if interp == InterpMode::Spline {
        series = series.with_spline(&[LON, LAT, Z_OFFSET]);
    }
    info!("{}: {} adjusted navigation samples", path.display(), series.len());
    Ok(AdjustedNavigation {
        series,
        has_depth: with_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesCursor;
    use approx::assert_abs_diff_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn epoch_format_interpolates_midpoint() {
        let file = file_with("# t lon lat\n0 0 0\n10 1 1\n");
        let nav = load_navigation(file.path(), 1, 0.0, LonFlip::Centered, InterpMode::Linear).unwrap();
        assert!(!nav.has_motion);
        let mut cursor = SeriesCursor::default();
        let (lon, _) = nav.series.interpolate(&mut cursor, LON, 5.0, InterpMode::Linear);
        let (lat, _) = nav.series.interpolate(&mut cursor, LAT, 5.0, InterpMode::Linear);
        assert_abs_diff_eq!(lon, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(lat, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn full_format_carries_motion_columns() {
        let file = file_with(concat!(
            "2004 02 03 04 05 06.0 1075781106.0 -121.5 36.8 45.0 12.0 3.1 0.5 -0.2 0.1\n",
            "2004 02 03 04 05 07.0 1075781107.0 -121.4 36.9 46.0 12.5 3.2 0.6 -0.3 0.2\n",
        ));
        let nav = load_navigation(file.path(), 9, 10.0, LonFlip::East, InterpMode::Linear).unwrap();
        assert!(nav.has_motion);
        assert!(nav.has_attitude);
        assert_eq!(nav.series.times()[0], 1_075_781_116.0);
        assert_abs_diff_eq!(nav.series.value_at(LON, 0), 238.5, epsilon = 1e-9);
        assert_eq!(nav.series.value_at(DRAFT, 1), 3.2);
    }

    #[test]
    fn short_rows_disable_motion_merge() {
        let file = file_with(concat!(
            "2004 02 03 04 05 06.0 100.0 -121.5 36.8 45.0 12.0 3.1\n",
            "2004 02 03 04 05 07.0 101.0 -121.4 36.9\n",
        ));
        let nav = load_navigation(file.path(), 9, 0.0, LonFlip::Centered, InterpMode::Linear).unwrap();
        assert!(!nav.has_motion);
        assert!(!nav.has_attitude);
    }

    #[test]
    fn fixed_column_layout_parses_hemispheres() {
        let (time, lon, lat) =
            parse_fixed_column("1998 123 12:34:56.000 S 4512.34567 W 12345.67890").unwrap();
        assert_abs_diff_eq!(lat, -(45.0 + 12.34567 / 60.0), epsilon = 1e-12);
        assert_abs_diff_eq!(lon, -(123.0 + 45.6789 / 60.0), epsilon = 1e-12);
        assert_eq!(
            time,
            epoch_from_day_of_year(1998, 123, 12.0, 34.0, 56.0).unwrap()
        );
        let (short_year, _, _) =
            parse_fixed_column("98+123+12:34:56.000 N 4512.34567 E 12345.67890").unwrap();
        assert_eq!(short_year, time);
    }

    #[test]
    fn single_sample_navigation_is_fatal() {
        let file = file_with("0 0 0\n");
        let result = load_navigation(file.path(), 1, 0.0, LonFlip::Centered, InterpMode::Linear);
        assert!(matches!(result, Err(ProcessError::InsufficientData { .. })));
    }

    #[test]
    fn adjusted_navigation_depth_needs_sixteen_columns() {
        let row = |t: f64, z: f64| {
            format!(
                "2004 02 03 04 05 06.0 {} -121.5 36.8 45.0 12.0 3.1 0.5 -0.2 0.1 {}\n",
                t, z
            )
        };
        let file = file_with(&format!("{}{}", row(0.0, 0.5), row(10.0, 1.5)));
        let adjusted =
            load_adjusted_navigation(file.path(), true, LonFlip::Centered, InterpMode::Linear).unwrap();
        let mut cursor = SeriesCursor::default();
        let (z, _) = adjusted
            .series
            .interpolate(&mut cursor, Z_OFFSET, 5.0, InterpMode::Linear);
        assert_abs_diff_eq!(z, 1.0, epsilon = 1e-12);

        let short = file_with("2004 02 03 04 05 06.0 0.0 -121.5 36.8\n2004 02 03 04 05 06.0 1.0 -121.5 36.8\n");
        assert!(load_adjusted_navigation(short.path(), true, LonFlip::Centered, InterpMode::Linear).is_err());
        assert!(load_adjusted_navigation(short.path(), false, LonFlip::Centered, InterpMode::Linear).is_ok());
    }
}
