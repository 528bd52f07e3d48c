use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{PingCodec, ReadStatus, SidescanSettings, StreamNotice, SwathReader, SwathWriter};
use crate::prelude::{ProcessError, ProcessResult};
use crate::swath::{BeamTravel, Kinematics, Ping, SidescanPixel, SwathRecord};

/// Upper bound on rebuilt sidescan pixels per ping; finer pixel sizes are widened to fit.
pub const MAX_SIDESCAN_PIXELS: usize = 16384;

/// Reads one JSON object per line. Lines of kind `notice` become stream notices.
pub struct JsonLinesReader<R> {
    reader: R,
    source: PathBuf,
    line_number: usize,
    buffer: String,
}

impl JsonLinesReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> ProcessResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| ProcessError::io(path, err))?;
        Ok(Self::from_reader(BufReader::new(file), path))
    }
}

impl<R: BufRead> JsonLinesReader<R> {
    pub fn from_reader(reader: R, source: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            source: source.into(),
            line_number: 0,
            buffer: String::new(),
        }
    }

    fn parse_line(&self, line: &str) -> ProcessResult<ReadStatus> {
        let value: serde_json::Value = serde_json::from_str(line).map_err(|err| {
            ProcessError::Malformed(format!(
                "{} line {}: {}",
                self.source.display(),
                self.line_number,
                err
            ))
        })?;
        if value.get("kind").and_then(|kind| kind.as_str()) == Some("notice") {
            let notice = value
                .get("notice")
                .cloned()
                .ok_or_else(|| {
                    ProcessError::Malformed(format!("line {}: notice without type", self.line_number))
                })
                .and_then(|raw| {
                    serde_json::from_value::<StreamNotice>(raw).map_err(|err| {
                        ProcessError::Malformed(format!("line {}: {}", self.line_number, err))
                    })
                })?;
            return Ok(ReadStatus::Notice(notice));
        }
        let record = serde_json::from_value::<SwathRecord>(value).map_err(|err| {
            ProcessError::Malformed(format!(
                "{} line {}: {}",
                self.source.display(),
                self.line_number,
                err
            ))
        })?;
        Ok(ReadStatus::Record(record))
    }
}

impl<R: BufRead> SwathReader for JsonLinesReader<R> {
    fn read_record(&mut self) -> ProcessResult<ReadStatus> {
        loop {
            self.buffer.clear();
            let read = self
                .reader
                .read_line(&mut self.buffer)
                .map_err(|err| ProcessError::io(&self.source, err))?;
            if read == 0 {
                return Ok(ReadStatus::Eof);
            }
            self.line_number += 1;
            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }
            let line = line.to_string();
            return self.parse_line(&line);
        }
    }
}

pub struct JsonLinesWriter<W: Write> {
    writer: W,
    target: PathBuf,
}

impl JsonLinesWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> ProcessResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| ProcessError::io(path, err))?;
        Ok(Self::from_writer(BufWriter::new(file), path))
    }
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn from_writer(writer: W, target: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            target: target.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SwathWriter for JsonLinesWriter<W> {
    fn write_record(&mut self, record: &SwathRecord) -> ProcessResult<()> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|err| ProcessError::Codec(format!("encoding record: {}", err)))?;
        self.writer
            .write_all(b"\n")
            .map_err(|err| ProcessError::io(&self.target, err))
    }

    fn finish(&mut self) -> ProcessResult<()> {
        self.writer
            .flush()
            .map_err(|err| ProcessError::io(&self.target, err))
    }
}

/// Field access for pings carried by the JSON-lines stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesCodec;

impl PingCodec for JsonLinesCodec {
    fn extract_kinematics(&self, ping: &Ping) -> Kinematics {
        ping.kinematics
    }

    fn insert_kinematics(&self, ping: &mut Ping, kinematics: &Kinematics) {
        ping.kinematics = *kinematics;
    }

    fn extract_travel_times(&self, ping: &Ping) -> Vec<Option<BeamTravel>> {
        ping.beams.iter().map(|beam| beam.travel).collect()
    }

    /// Bins beam amplitudes onto a regular across-track grid.
    fn rebuild_sidescan(&self, ping: &mut Ping, settings: &SidescanSettings) -> ProcessResult<bool> {
        let usable = ping
            .beams
            .iter()
            .filter(|beam| beam.flag.is_valid())
            .filter_map(|beam| beam.amplitude.map(|amp| (beam.acrosstrack, beam.depth, amp)))
            .collect::<Vec<_>>();
        if usable.len() < 2 {
            return Ok(false);
        }

        let half_width = match settings.swath_width {
            Some(width) if width > 0.0 && width < 180.0 => {
                let mut depths = usable.iter().map(|(_, depth, _)| *depth).collect::<Vec<_>>();
                depths.sort_by(|a, b| a.total_cmp(b));
                let median = depths[depths.len() / 2] - ping.kinematics.draft;
                median.abs() * (0.5 * width).to_radians().tan()
            }
            _ => usable
                .iter()
                .map(|(across, _, _)| across.abs())
                .fold(0.0_f64, f64::max),
        };
        if !half_width.is_finite() || half_width <= 0.0 {
            return Ok(false);
        }

        let pixel_count = if ping.sidescan.is_empty() {
            4 * ping.beams.len()
        } else {
            ping.sidescan.len()
        };
        let mut pixel_size = match settings.pixel_size {
            Some(size) if size > 0.0 => size,
            _ => 2.0 * half_width / (pixel_count.clamp(2, MAX_SIDESCAN_PIXELS) - 1) as f64,
        };
        if !pixel_size.is_finite() || pixel_size <= 0.0 {
            return Ok(false);
        }
        let span = (2.0 * half_width / pixel_size).floor();
        let pixel_count = if span >= (MAX_SIDESCAN_PIXELS - 1) as f64 {
            pixel_size = 2.0 * half_width / (MAX_SIDESCAN_PIXELS - 1) as f64;
            MAX_SIDESCAN_PIXELS
        } else {
            (span as usize + 1).max(2)
        };

        let mut sums = vec![0.0; pixel_count];
        let mut counts = vec![0usize; pixel_count];
        for (across, _, amp) in &usable {
            let index = ((across + half_width) / pixel_size).round();
            if index >= 0.0 && (index as usize) < pixel_count {
                sums[index as usize] += amp;
                counts[index as usize] += 1;
            }
        }

        let mut values = sums
            .iter()
            .zip(&counts)
            .map(|(sum, count)| (*count > 0).then(|| sum / *count as f64))
            .collect::<Vec<_>>();
        fill_gaps(&mut values, settings.interpolate);

        ping.sidescan = values
            .into_iter()
            .enumerate()
            .map(|(i, amplitude)| SidescanPixel {
                amplitude,
                acrosstrack: -half_width + i as f64 * pixel_size,
                alongtrack: 0.0,
            })
            .collect();
        debug!(
            "rebuilt {} sidescan pixels at {:.2} m for ping {:.3}",
            ping.sidescan.len(),
            pixel_size,
            ping.kinematics.time
        );
        Ok(true)
    }
}

/// Linearly fills runs of empty pixels no longer than `max_gap` that are bounded on both sides.
fn fill_gaps(values: &mut [Option<f64>], max_gap: usize) {
    if max_gap == 0 {
        return;
    }
    let mut last_filled: Option<usize> = None;
    for i in 0..values.len() {
        let Some(current) = values[i] else {
            continue;
        };
        if let Some(start) = last_filled {
            let gap = i - start - 1;
            if gap > 0 && gap <= max_gap {
                let Some(left) = values[start] else {
                    continue;
                };
                for (k, slot) in values[start + 1..i].iter_mut().enumerate() {
                    let frac = (k + 1) as f64 / (gap + 1) as f64;
                    *slot = Some(left + frac * (current - left));
                }
            }
        }
        last_filled = Some(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swath::{Beam, BeamFlag};
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    #[test]
    fn reader_yields_records_and_notices() {
        let text = concat!(
            "{\"kind\":\"comment\",\"text\":\"hello\"}\n",
            "\n",
            "{\"kind\":\"notice\",\"notice\":\"time_gap\"}\n",
            "{\"kind\":\"ping\",\"kinematics\":{\"time\":1.0,\"lon\":2.0,\"lat\":3.0},\"beams\":[]}\n",
        );
        let mut reader = JsonLinesReader::from_reader(Cursor::new(text), "mem");
        assert_eq!(
            reader.read_record().unwrap(),
            ReadStatus::Record(SwathRecord::Comment {
                text: "hello".into()
            })
        );
        assert_eq!(
            reader.read_record().unwrap(),
            ReadStatus::Notice(StreamNotice::TimeGap)
        );
        match reader.read_record().unwrap() {
            ReadStatus::Record(SwathRecord::Ping(ping)) => assert_eq!(ping.kinematics.lat, 3.0),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(reader.read_record().unwrap(), ReadStatus::Eof);
    }

    #[test]
    fn malformed_line_is_an_error() {
        let mut reader = JsonLinesReader::from_reader(Cursor::new("{not json}\n"), "mem");
        assert!(matches!(reader.read_record(), Err(ProcessError::Malformed(_))));
    }

    #[test]
    fn writer_emits_one_line_per_record() {
        let mut writer = JsonLinesWriter::from_writer(Vec::new(), "mem");
        writer
            .write_record(&SwathRecord::Comment { text: "a".into() })
            .unwrap();
        writer
            .write_record(&SwathRecord::Comment { text: "b".into() })
            .unwrap();
        writer.finish().unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn sidescan_rebuild_fills_short_gaps() {
        let mut ping = Ping::default();
        for across in [-10.0, -5.0, 5.0, 10.0] {
            let mut beam = Beam::new(50.0, across, 0.0);
            beam.amplitude = Some(across + 20.0);
            ping.beams.push(beam);
        }
        let settings = SidescanSettings {
            pixel_size: Some(5.0),
            swath_width: None,
            interpolate: 1,
        };
        assert!(JsonLinesCodec.rebuild_sidescan(&mut ping, &settings).unwrap());
        assert_eq!(ping.sidescan.len(), 5);
        assert_eq!(ping.sidescan[2].amplitude, Some(20.0));
        assert_eq!(ping.sidescan[0].acrosstrack, -10.0);
    }

    #[test]
    fn sidescan_pixel_count_is_bounded() {
        let mut ping = Ping::default();
        for across in [-5000.0, 0.0, 5000.0] {
            let mut beam = Beam::new(4000.0, across, 0.0);
            beam.amplitude = Some(30.0);
            ping.beams.push(beam);
        }
        let settings = SidescanSettings {
            pixel_size: Some(1e-9),
            swath_width: None,
            interpolate: 0,
        };
        assert!(JsonLinesCodec.rebuild_sidescan(&mut ping, &settings).unwrap());
        assert_eq!(ping.sidescan.len(), MAX_SIDESCAN_PIXELS);
        assert_abs_diff_eq!(ping.sidescan[0].acrosstrack, -5000.0, epsilon = 1e-6);
        let last = ping.sidescan[MAX_SIDESCAN_PIXELS - 1].acrosstrack;
        assert_abs_diff_eq!(last, 5000.0, epsilon = 1e-6);
    }

    #[test]
    fn full_swath_width_falls_back_to_beam_extent() {
        let mut ping = Ping::default();
        for across in [-10.0, 10.0] {
            let mut beam = Beam::new(50.0, across, 0.0);
            beam.amplitude = Some(20.0);
            ping.beams.push(beam);
        }
        let settings = SidescanSettings {
            pixel_size: Some(5.0),
            swath_width: Some(180.0),
            interpolate: 0,
        };
        assert!(JsonLinesCodec.rebuild_sidescan(&mut ping, &settings).unwrap());
        assert_eq!(ping.sidescan.len(), 5);
        assert_eq!(ping.sidescan[0].acrosstrack, -10.0);
    }

    #[test]
    fn beam_without_travel_keeps_the_others() {
        let mut ping = Ping {
            beams: vec![Beam::new(10.0, 0.0, 0.0), Beam::new(10.0, 1.0, 0.0)],
            ..Default::default()
        };
        ping.beams[0].travel = Some(BeamTravel {
            time: 0.5,
            ..Default::default()
        });
        ping.beams[1].flag = BeamFlag::Null;
        let travel = JsonLinesCodec.extract_travel_times(&ping);
        assert_eq!(travel.len(), 2);
        assert_eq!(travel[0].map(|block| block.time), Some(0.5));
        assert!(travel[1].is_none());
    }
}
