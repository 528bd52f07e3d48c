use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use swathcore::codec::{open_reader, ReadStatus};
use swathcore::math::RunningStats;
use swathcore::swath::{BeamFlag, Kinematics, SwathRecord};

/// Produces an index file for a finished output stream.
pub trait SummaryIndexer: Send + Sync {
    /// Returns the path of the index it wrote.
    fn index(&self, output: &Path) -> anyhow::Result<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    fn extend(bounds: &mut Option<Bounds>, value: f64) {
        match bounds {
            Some(b) => {
                b.min = b.min.min(value);
                b.max = b.max.max(value);
            }
            None => *bounds = Some(Bounds { min: value, max: value }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryIndex {
    pub source: PathBuf,
    pub records: usize,
    pub pings: usize,
    pub navigation: usize,
    pub comments: usize,
    pub other: usize,
    pub time: Option<Bounds>,
    pub lon: Option<Bounds>,
    pub lat: Option<Bounds>,
    pub depth: RunningStats,
    pub beams_good: usize,
    pub beams_flagged: usize,
    pub beams_null: usize,
}

impl SummaryIndex {
    fn add_position(&mut self, kinematics: &Kinematics) {
        Bounds::extend(&mut self.time, kinematics.time);
        // Unset fixes are recorded as 0/0 and would stretch the bounds.
        if kinematics.lon != 0.0 || kinematics.lat != 0.0 {
            Bounds::extend(&mut self.lon, kinematics.lon);
            Bounds::extend(&mut self.lat, kinematics.lat);
        }
    }

    fn add(&mut self, record: &SwathRecord) {
        self.records += 1;
        match record {
            SwathRecord::Ping(ping) => {
                self.pings += 1;
                self.add_position(&ping.kinematics);
                for beam in &ping.beams {
                    match beam.flag {
                        BeamFlag::Good => {
                            self.beams_good += 1;
                            self.depth.push(beam.depth);
                        }
                        BeamFlag::Null => self.beams_null += 1,
                        _ => self.beams_flagged += 1,
                    }
                }
            }
            SwathRecord::Navigation(kinematics) => {
                self.navigation += 1;
                self.add_position(kinematics);
            }
            SwathRecord::Comment { .. } => self.comments += 1,
            SwathRecord::Other { .. } => self.other += 1,
        }
    }
}

pub fn index_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".inf");
    PathBuf::from(name)
}

/// Writes `<output>.inf` as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoIndexer;

impl InfoIndexer {
    pub fn summarize(&self, output: &Path) -> anyhow::Result<SummaryIndex> {
        let mut reader = open_reader(output).with_context(|| format!("opening {} for indexing", output.display()))?;
        let mut summary = SummaryIndex {
            source: output.to_path_buf(),
            ..Default::default()
        };
        loop {
            match reader.read_record().context("reading record for summary")? {
                ReadStatus::Record(record) => summary.add(&record),
                ReadStatus::Notice(_) => {}
                ReadStatus::Eof => break,
            }
        }
        Ok(summary)
    }
}

impl SummaryIndexer for InfoIndexer {
    fn index(&self, output: &Path) -> anyhow::Result<PathBuf> {
        let summary = self.summarize(output)?;
        let path = index_path(output);
        let json = serde_json::to_string_pretty(&summary).context("serializing summary index")?;
        fs::write(&path, json).with_context(|| format!("writing summary index {}", path.display()))?;
        info!(
            "{}: {} pings, {} good beams",
            path.display(),
            summary.pings,
            summary.beams_good
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use swathcore::codec::create_writer;
    use swathcore::swath::{Beam, Ping};
    use tempfile::TempDir;

    #[test]
    fn index_tallies_stream_contents() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("line_p.jsonl");
        let mut ping = Ping {
            kinematics: Kinematics {
                time: 10.0,
                lon: -70.5,
                lat: 41.0,
                ..Default::default()
            },
            beams: vec![Beam::new(100.0, -5.0, 0.0), Beam::new(120.0, 5.0, 0.0), Beam::new(1.0, 0.0, 0.0)],
            ..Default::default()
        };
        ping.beams[2].flag = BeamFlag::Manual;
        let mut writer = create_writer(&output).unwrap();
        writer.write_record(&SwathRecord::Comment { text: "start".into() }).unwrap();
        writer.write_record(&SwathRecord::Ping(ping)).unwrap();
        writer
            .write_record(&SwathRecord::Navigation(Kinematics {
                time: 12.0,
                lon: -70.4,
                lat: 41.1,
                ..Default::default()
            }))
            .unwrap();
        writer.finish().unwrap();

        let path = InfoIndexer.index(&output).unwrap();
        assert_eq!(path, dir.path().join("line_p.jsonl.inf"));
        let summary: SummaryIndex = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.pings, 1);
        assert_eq!(summary.comments, 1);
        assert_eq!(summary.beams_good, 2);
        assert_eq!(summary.beams_flagged, 1);
        assert_eq!(summary.time, Some(Bounds { min: 10.0, max: 12.0 }));
        let lon = summary.lon.unwrap();
        assert_abs_diff_eq!(lon.min, -70.5);
        assert_abs_diff_eq!(lon.max, -70.4);
        assert_abs_diff_eq!(summary.depth.mean().unwrap(), 110.0);
    }
}
