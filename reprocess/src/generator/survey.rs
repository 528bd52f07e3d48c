use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use swathcore::codec::create_writer;
use swathcore::edits::{write_edit_file, EditAction, EditFile, EditRecord, LedgerMode};
use swathcore::math::coor_scale;
use swathcore::swath::{Beam, BeamTravel, Kinematics, Ping, SwathRecord};

/// Sound speed the synthetic soundings were computed with.
const NOMINAL_SOUND_SPEED: f64 = 1500.0;

/// Configuration for a synthetic survey line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub name: String,
    pub pings: usize,
    pub beams: usize,
    /// Total swath width in degrees.
    pub swath_width: f64,
    pub depth: f64,
    pub noise: f64,
    pub ping_interval: f64,
    pub start_time: f64,
    pub lon: f64,
    pub lat: f64,
    /// km/h
    pub speed: f64,
    pub heading: f64,
    pub draft: f64,
    /// Offset between the recorded fixes and the edited navigation, in metres east.
    pub nav_offset: f64,
    /// Every n-th ping gets its outermost starboard beam flagged in the edit file.
    pub edit_every: usize,
    pub seed: u64,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            name: "synthetic.jsonl".into(),
            pings: 50,
            beams: 21,
            swath_width: 120.0,
            depth: 800.0,
            noise: 0.5,
            ping_interval: 2.0,
            start_time: 1_262_304_000.0,
            lon: -70.5,
            lat: 41.2,
            speed: 14.8,
            heading: 45.0,
            draft: 3.0,
            nav_offset: 15.0,
            edit_every: 10,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurveyFiles {
    pub stream: PathBuf,
    pub profile: PathBuf,
    pub navigation: PathBuf,
    pub edits: PathBuf,
    pub parameters: PathBuf,
}

fn sibling(stream: &Path, suffix: &str) -> PathBuf {
    let mut name = stream.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Warm surface layer over a cold deep channel.
fn profile_samples() -> Vec<(f64, f64)> {
    vec![
        (0.0, 1525.0),
        (50.0, 1522.0),
        (200.0, 1505.0),
        (600.0, 1488.0),
        (1000.0, 1482.0),
        (2000.0, 1490.0),
        (4000.0, 1515.0),
    ]
}

fn track_position(config: &SurveyConfig, elapsed: f64) -> (f64, f64) {
    let (mtodeglon, mtodeglat) = coor_scale(config.lat);
    let distance = config.speed / 3.6 * elapsed;
    let (sin_h, cos_h) = config.heading.to_radians().sin_cos();
    (
        config.lon + distance * sin_h * mtodeglon,
        config.lat + distance * cos_h * mtodeglat,
    )
}

fn build_ping(config: &SurveyConfig, index: usize, rng: &mut StdRng) -> Ping {
    let elapsed = index as f64 * config.ping_interval;
    let (lon, lat) = track_position(config, elapsed);
    let kinematics = Kinematics {
        time: config.start_time + elapsed,
        lon,
        lat,
        speed: config.speed,
        heading: config.heading,
        draft: config.draft,
        roll: rng.gen_range(-2.0..2.0),
        pitch: rng.gen_range(-1.0..1.0),
        heave: rng.gen_range(-0.3..0.3),
    };

    let beams = config.beams.max(1);
    let half_width = 0.5 * config.swath_width;
    let step = if beams > 1 {
        config.swath_width / (beams - 1) as f64
    } else {
        0.0
    };
    let beams = (0..beams)
        .map(|i| {
            let angle = -half_width + step * i as f64;
            let jitter = if config.noise > 0.0 {
                rng.gen_range(-config.noise..config.noise)
            } else {
                0.0
            };
            let water = config.depth - config.draft + jitter;
            let radians = angle.to_radians();
            let slant = water / radians.cos();
            Beam {
                amplitude: Some(60.0 - 0.2 * angle.abs()),
                travel: Some(BeamTravel {
                    time: 2.0 * slant / NOMINAL_SOUND_SPEED,
                    angle,
                    heave: kinematics.heave,
                    ..Default::default()
                }),
                ..Beam::new(water + config.draft, water * radians.tan(), 0.0)
            }
        })
        .collect();

    Ping {
        kinematics,
        surface_sound_speed: Some(NOMINAL_SOUND_SPEED),
        beams,
        sidescan: Vec::new(),
    }
}

/// Writes a survey line plus its profile, navigation, edits and parameter file into `dir`.
pub fn write_survey(dir: &Path, config: &SurveyConfig) -> anyhow::Result<SurveyFiles> {
    fs::create_dir_all(dir).with_context(|| format!("creating survey directory {}", dir.display()))?;
    let stream = dir.join(&config.name);
    let files = SurveyFiles {
        profile: sibling(&stream, ".svp"),
        navigation: sibling(&stream, ".nav"),
        edits: sibling(&stream, ".esf"),
        parameters: sibling(&stream, ".par"),
        stream,
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut writer = create_writer(&files.stream).context("creating synthetic stream")?;
    writer
        .write_record(&SwathRecord::Comment {
            text: format!("synthetic survey, seed {}", config.seed),
        })
        .context("writing survey comment")?;
    let mut edits = Vec::new();
    for index in 0..config.pings {
        let ping = build_ping(config, index, &mut rng);
        if config.edit_every > 0 && index % config.edit_every == 0 {
            edits.push(EditRecord {
                time: ping.kinematics.time,
                beam: (ping.beams.len() as i32 - 1).max(0),
                action: EditAction::Flag,
            });
        }
        writer
            .write_record(&SwathRecord::Ping(ping))
            .context("writing synthetic ping")?;
    }
    writer.finish().context("flushing synthetic stream")?;

    let profile = profile_samples()
        .iter()
        .map(|(depth, velocity)| format!("{:.1} {:.2}\n", depth, velocity))
        .collect::<String>();
    fs::write(&files.profile, format!("# synthetic sound velocity profile\n{}", profile))
        .context("writing synthetic profile")?;

    let (mtodeglon, _) = coor_scale(config.lat);
    let last = config.pings.saturating_sub(1) as f64 * config.ping_interval;
    let mut navigation = String::new();
    let mut elapsed = -config.ping_interval;
    while elapsed <= last + config.ping_interval {
        let (lon, lat) = track_position(config, elapsed);
        navigation.push_str(&format!(
            "{:.3} {:.9} {:.9}\n",
            config.start_time + elapsed,
            lon + config.nav_offset * mtodeglon,
            lat
        ));
        elapsed += config.ping_interval.max(0.1);
    }
    fs::write(&files.navigation, navigation).context("writing synthetic navigation")?;

    write_edit_file(
        &files.edits,
        &EditFile {
            version: 3,
            mode: LedgerMode::Explicit,
            records: edits,
        },
    )
    .context("writing synthetic edits")?;

    let parameters = format!(
        "# parameters for {name}\nSVPFILE {svp}\nNAVFILE {nav}\nNAVFORMAT 1\nEDITSAVEFILE {esf}\n",
        name = config.name,
        svp = file_name(&files.profile),
        nav = file_name(&files.navigation),
        esf = file_name(&files.edits),
    );
    fs::write(&files.parameters, parameters).context("writing synthetic parameter file")?;
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use swathcore::codec::{open_reader, ReadStatus};
    use swathcore::CorrectionConfig;
    use tempfile::TempDir;

    fn small() -> SurveyConfig {
        SurveyConfig {
            pings: 12,
            beams: 5,
            edit_every: 5,
            seed: 7,
            ..Default::default()
        }
    }

    fn read_pings(path: &Path) -> Vec<Ping> {
        let mut reader = open_reader(path).unwrap();
        let mut pings = Vec::new();
        while let ReadStatus::Record(record) = reader.read_record().unwrap() {
            if let SwathRecord::Ping(ping) = record {
                pings.push(ping);
            }
        }
        pings
    }

    #[test]
    fn survey_writes_every_file() {
        let dir = TempDir::new().unwrap();
        let files = write_survey(dir.path(), &small()).unwrap();
        let pings = read_pings(&files.stream);
        assert_eq!(pings.len(), 12);
        assert!(pings.iter().all(|ping| ping.beams.len() == 5 && ping.has_travel_times()));

        let config = CorrectionConfig::load(&files.stream).unwrap();
        assert!(config.navigation.enabled);
        assert!(config.edits.enabled);
        assert_eq!(config.svp.file.as_deref(), Some(files.profile.as_path()));

        let edits = swathcore::edits::read_edit_file(&files.edits).unwrap();
        assert_eq!(edits.records.len(), 3);
    }

    #[test]
    fn nadir_beam_matches_nominal_sound_speed() {
        let config = SurveyConfig {
            beams: 3,
            noise: 0.0,
            ..small()
        };
        let mut rng = StdRng::seed_from_u64(config.seed);
        let ping = build_ping(&config, 0, &mut rng);
        let nadir = &ping.beams[1];
        let travel = nadir.travel.unwrap();
        assert_abs_diff_eq!(travel.angle, 0.0);
        assert_abs_diff_eq!(travel.time, 2.0 * (config.depth - config.draft) / 1500.0, epsilon = 1e-12);
        assert_abs_diff_eq!(nadir.depth, config.depth, epsilon = 1e-9);
    }

    #[test]
    fn same_seed_same_survey() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let a = write_survey(first.path(), &small()).unwrap();
        let b = write_survey(second.path(), &small()).unwrap();
        assert_eq!(read_pings(&a.stream), read_pings(&b.stream));
    }
}
