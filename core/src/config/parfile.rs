//! `KEY value...` parameter files, one setting per line.

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::{
    AdjustedNavMode, AngleMode, CorrectionConfig, CutMode, CutRule, CutTarget, HeadingMode,
    NavPrecedence, RollBias, ScaleMode, SurfaceSoundSpeed, SvpMode,
};
use crate::math::{LeverArm, LonFlip};
use crate::prelude::{ProcessError, ProcessResult};
use crate::series::InterpMode;

/// Values that only become settings once every line has been read.
#[derive(Default)]
struct Pending {
    ssv_mode: i32,
    ssv: f64,
    tt_mode: i32,
    tt_multiply: Option<f64>,
    lever_mode: i32,
    lever: LeverArm,
    roll_mode: i32,
    roll: f64,
    roll_port: f64,
    roll_stbd: f64,
    pitch_mode: i32,
    pitch: f64,
}

pub fn parameter_file_for(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".par");
    PathBuf::from(name)
}

impl CorrectionConfig {
    /// Reads `<input>.par` when present, otherwise infers settings from sibling files.
    pub fn load<P: AsRef<Path>>(input: P) -> ProcessResult<Self> {
        let input = input.as_ref();
        let parfile = parameter_file_for(input);
        if !parfile.exists() {
            debug!("no parameter file for {}, inferring defaults", input.display());
            return Ok(super::infer_default(input));
        }
        let text = fs::read_to_string(&parfile).map_err(|err| ProcessError::io(&parfile, err))?;
        let mut config = CorrectionConfig::for_input(input);
        let base = input.parent().unwrap_or_else(|| Path::new(""));
        parse_parameters(&text, base, &mut config)
            .map_err(|err| ProcessError::Config(format!("{}: {}", parfile.display(), err)))?;
        config.parameter_file = Some(parfile);
        Ok(config)
    }
}

fn resolve(base: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

struct Line<'a> {
    number: usize,
    key: &'a str,
    values: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn text(&self, index: usize) -> ProcessResult<&'a str> {
        self.values.get(index).copied().ok_or_else(|| {
            ProcessError::Config(format!("line {}: {} is missing a value", self.number, self.key))
        })
    }

    fn int(&self, index: usize) -> ProcessResult<i32> {
        let raw = self.text(index)?;
        raw.parse::<i32>().map_err(|_| {
            ProcessError::Config(format!(
                "line {}: {} expects an integer, got {:?}",
                self.number, self.key, raw
            ))
        })
    }

    fn float(&self, index: usize) -> ProcessResult<f64> {
        let raw = self.text(index)?;
        raw.parse::<f64>().map_err(|_| {
            ProcessError::Config(format!(
                "line {}: {} expects a number, got {:?}",
                self.number, self.key, raw
            ))
        })
    }

    fn flag(&self) -> ProcessResult<bool> {
        Ok(self.int(0)? != 0)
    }
}

fn interp_from_code(code: i32) -> InterpMode {
    if code == 1 {
        InterpMode::Spline
    } else {
        InterpMode::Linear
    }
}

/// Applies every setting in `text` onto `config`. Relative paths resolve against `base`.
pub fn parse_parameters(text: &str, base: &Path, config: &mut CorrectionConfig) -> ProcessResult<()> {
    let lines = text
        .lines()
        .enumerate()
        .filter_map(|(index, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let mut tokens = trimmed.split_whitespace();
            let key = tokens.next()?;
            Some(Line {
                number: index + 1,
                key,
                values: tokens.collect(),
            })
        })
        .collect::<Vec<_>>();

    config.explicit = lines.iter().any(|line| line.key == "EXPLICIT");
    let implicit = !config.explicit;
    let mut pending = Pending::default();

    for line in &lines {
        match line.key {
            "EXPLICIT" => {}
            "INFILE" => config.input = resolve(base, line.text(0)?),
            "OUTFILE" => config.output = resolve(base, line.text(0)?),
            "FORMAT" => config.format = Some(line.int(0)?),
            "VERBOSE" => config.verbose = line.int(0)?.clamp(0, u8::MAX as i32) as u8,
            "LONFLIP" => config.lonflip = LonFlip::from_code(line.int(0)?),

            "NAVMODE" => config.navigation.enabled = line.flag()?,
            "NAVFILE" => {
                config.navigation.file = Some(resolve(base, line.text(0)?));
                if implicit {
                    let nav = &mut config.navigation;
                    nav.enabled = true;
                    nav.heading = true;
                    nav.speed = true;
                    nav.draft = true;
                    nav.attitude = true;
                }
            }
            "NAVFORMAT" => config.navigation.format = line.int(0)?,
            "NAVHEADING" => config.navigation.heading = line.flag()?,
            "NAVSPEED" => config.navigation.speed = line.flag()?,
            "NAVDRAFT" => config.navigation.draft = line.flag()?,
            "NAVATTITUDE" => config.navigation.attitude = line.flag()?,
            "NAVINTERP" => config.navigation.interp = interp_from_code(line.int(0)?),
            "NAVTIMESHIFT" => config.navigation.time_shift = line.float(0)?,
            "NAVSHIFT" => config.position_shift.enabled = line.flag()?,
            "NAVOFFSETX" => config.position_shift.offset_x = line.float(0)?,
            "NAVOFFSETY" => config.position_shift.offset_y = line.float(0)?,
            "NAVOFFSETZ" => debug!("NAVOFFSETZ is informational only"),
            "NAVSHIFTLON" => config.position_shift.shift_lon = line.float(0)?,
            "NAVSHIFTLAT" => config.position_shift.shift_lat = line.float(0)?,
            "NAVSHIFTX" => config.position_shift.shift_x = line.float(0)?,
            "NAVSHIFTY" => config.position_shift.shift_y = line.float(0)?,

            "NAVADJMODE" => {
                config.adjusted_nav.mode = match line.int(0)? {
                    1 => AdjustedNavMode::LonLat,
                    2 => AdjustedNavMode::LonLatDepth,
                    _ => AdjustedNavMode::Off,
                }
            }
            "NAVADJFILE" => {
                config.adjusted_nav.file = Some(resolve(base, line.text(0)?));
                if implicit {
                    config.adjusted_nav.mode = AdjustedNavMode::LonLatDepth;
                }
            }
            "NAVADJINTERP" => config.adjusted_nav.interp = interp_from_code(line.int(0)?),
            "NAVADJPRECEDENCE" => {
                config.nav_precedence = if line.int(0)? == 1 {
                    NavPrecedence::NavigationFirst
                } else {
                    NavPrecedence::AdjustedFirst
                }
            }

            "ATTITUDEMODE" => config.attitude.enabled = line.flag()?,
            "ATTITUDEFILE" => {
                config.attitude.file = Some(resolve(base, line.text(0)?));
                if implicit {
                    config.attitude.enabled = true;
                }
            }
            "ATTITUDEFORMAT" => config.attitude.format = line.int(0)?,

            "TIDEMODE" => config.tide.enabled = line.flag()?,
            "TIDEFILE" => {
                config.tide.file = Some(resolve(base, line.text(0)?));
                if implicit {
                    config.tide.enabled = true;
                }
            }
            "TIDEFORMAT" => config.tide.format = line.int(0)?,

            "DATACUTCLEAR" => config.cuts.clear(),
            "DATACUT" => {
                let target = CutTarget::from_code(line.int(0)?);
                let mode = CutMode::from_code(line.int(1)?);
                match (target, mode) {
                    (Some(target), Some(mode)) => config.cuts.push(CutRule {
                        target,
                        mode,
                        min: line.float(2)?,
                        max: line.float(3)?,
                    }),
                    _ => warn!("line {}: ignoring DATACUT with unknown kind or mode", line.number),
                }
            }
            "BATHCUTNUMBER" | "BATHCUTDISTANCE" | "BATHCUTSPEED" | "AMPCUTNUMBER"
            | "AMPCUTDISTANCE" | "AMPCUTSPEED" | "SSCUTNUMBER" | "SSCUTDISTANCE" | "SSCUTSPEED" => {
                let target = if line.key.starts_with("BATH") {
                    CutTarget::Bathymetry
                } else if line.key.starts_with("AMP") {
                    CutTarget::Amplitude
                } else {
                    CutTarget::Sidescan
                };
                let mode = if line.key.ends_with("NUMBER") {
                    CutMode::Number
                } else if line.key.ends_with("DISTANCE") {
                    CutMode::Distance
                } else {
                    CutMode::Speed
                };
                config.cuts.push(CutRule {
                    target,
                    mode,
                    min: line.float(0)?,
                    max: line.float(1)?,
                });
            }

            "EDITSAVEMODE" => config.edits.enabled = line.flag()?,
            "EDITSAVEFILE" => {
                config.edits.file = Some(resolve(base, line.text(0)?));
                if implicit {
                    config.edits.enabled = true;
                }
            }

            "RAYTRACE" | "SVPMODE" => {
                config.svp.mode = match line.int(0)? {
                    1 => SvpMode::RayTrace,
                    2 => SvpMode::SoundSpeedRef,
                    _ => SvpMode::Off,
                }
            }
            "SVPFILE" | "SVP" => {
                config.svp.file = Some(resolve(base, line.text(0)?));
                if implicit {
                    config.svp.mode = SvpMode::RayTrace;
                }
            }
            "SSVMODE" => pending.ssv_mode = line.int(0)?,
            "SSV" => pending.ssv = line.float(0)?,
            "TTMODE" => pending.tt_mode = line.int(0)?,
            "TTMULTIPLY" => pending.tt_multiply = Some(line.float(0)?),
            "ANGLEMODE" => config.svp.angle_mode = AngleMode::from_code(line.int(0)?),
            "CORRECTED" | "SOUNDSPEEDREF" => config.svp.corrected = line.flag()?,

            "DRAFTMODE" => config.draft.mode = ScaleMode::from_code(line.int(0)?),
            "DRAFTOFFSET" => config.draft.offset = line.float(0)?,
            "DRAFTMULTIPLY" => config.draft.multiply = line.float(0)?,
            "DRAFT" => config.draft.value = line.float(0)?,
            "HEAVEMODE" => {
                config.heave.mode = match ScaleMode::from_code(line.int(0)?) {
                    ScaleMode::Set => ScaleMode::Off,
                    mode => mode,
                }
            }
            "HEAVEOFFSET" => config.heave.offset = line.float(0)?,
            "HEAVEMULTIPLY" => config.heave.multiply = line.float(0)?,

            "LEVERMODE" => pending.lever_mode = line.int(0)?,
            "VRUOFFSETX" => pending.lever.vru[0] = line.float(0)?,
            "VRUOFFSETY" => pending.lever.vru[1] = line.float(0)?,
            "VRUOFFSETZ" => pending.lever.vru[2] = line.float(0)?,
            "SONAROFFSETX" => pending.lever.sonar[0] = line.float(0)?,
            "SONAROFFSETY" => pending.lever.sonar[1] = line.float(0)?,
            "SONAROFFSETZ" => pending.lever.sonar[2] = line.float(0)?,

            "ROLLBIASMODE" => pending.roll_mode = line.int(0)?,
            "ROLLBIAS" => pending.roll = line.float(0)?,
            "ROLLBIASPORT" => pending.roll_port = line.float(0)?,
            "ROLLBIASSTBD" => pending.roll_stbd = line.float(0)?,
            "PITCHBIASMODE" => pending.pitch_mode = line.int(0)?,
            "PITCHBIAS" => pending.pitch = line.float(0)?,

            "HEADINGMODE" => config.heading_mode = HeadingMode::from_code(line.int(0)?),
            "HEADINGOFFSET" => config.heading_offset = line.float(0)?,

            "SSRECALCMODE" => config.sidescan.enabled = line.flag()?,
            "SSPIXELSIZE" => config.sidescan.pixel_size = line.float(0)?,
            "SSSWATHWIDTH" => config.sidescan.swath_width = line.float(0)?,
            "SSINTERPOLATE" => config.sidescan.interpolate = line.int(0)?.max(0) as usize,

            other => warn!("line {}: ignoring unknown parameter {}", line.number, other),
        }
    }

    config.surface_sound_speed = match pending.ssv_mode {
        1 => SurfaceSoundSpeed::Offset(pending.ssv),
        2 => SurfaceSoundSpeed::Set(pending.ssv),
        _ => SurfaceSoundSpeed::Recorded,
    };
    config.travel_time_multiply = if pending.tt_mode == 1 {
        Some(pending.tt_multiply.unwrap_or(1.0))
    } else {
        None
    };
    config.lever = (pending.lever_mode == 1).then_some(pending.lever);
    config.roll_bias = match pending.roll_mode {
        1 => RollBias::Single(pending.roll),
        2 => RollBias::Split {
            port: pending.roll_port,
            starboard: pending.roll_stbd,
        },
        _ => RollBias::Off,
    };
    config.pitch_bias = (pending.pitch_mode == 1).then_some(pending.pitch);

    if config.svp.mode != SvpMode::Off && config.svp.file.is_none() {
        return Err(ProcessError::Config(
            "sound velocity correction enabled without SVPFILE".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecalcMode;
    use std::io::Write;
    use tempfile::TempDir;

    fn parse(text: &str) -> CorrectionConfig {
        let mut config = CorrectionConfig::for_input("/data/line.mb");
        parse_parameters(text, Path::new("/data"), &mut config).unwrap();
        config
    }

    #[test]
    fn naming_a_file_enables_its_correction() {
        let config = parse("NAVFILE line.nve\nSVPFILE line.svp\nTIDEFILE /tides/t.txt\n");
        assert!(config.navigation.enabled);
        assert!(config.navigation.heading);
        assert_eq!(config.navigation.file, Some(PathBuf::from("/data/line.nve")));
        assert_eq!(config.svp.mode, SvpMode::RayTrace);
        assert_eq!(config.tide.file, Some(PathBuf::from("/tides/t.txt")));
        assert_eq!(config.recalc_mode(), Some(RecalcMode::RayTrace));
    }

    #[test]
    fn explicit_mode_keeps_files_disabled() {
        let config = parse("EXPLICIT\nNAVFILE line.nve\nTIDEFILE t.txt\n");
        assert!(config.explicit);
        assert!(!config.navigation.enabled);
        assert!(!config.tide.enabled);
    }

    #[test]
    fn deferred_modes_resolve_after_all_lines() {
        let config = parse(
            "ROLLBIAS 0.4\nROLLBIASMODE 1\nPITCHBIASMODE 1\nPITCHBIAS -0.2\nSSVMODE 2\nSSV 1490\nTTMODE 1\nTTMULTIPLY 1.01\n",
        );
        assert_eq!(config.roll_bias, RollBias::Single(0.4));
        assert_eq!(config.pitch_bias, Some(-0.2));
        assert_eq!(config.surface_sound_speed, SurfaceSoundSpeed::Set(1490.0));
        assert_eq!(config.travel_time_multiply, Some(1.01));
    }

    #[test]
    fn cut_rules_accumulate_and_clear() {
        let config = parse("BATHCUTNUMBER 0 4\nDATACUT 2 3 5.0 20.0\n");
        assert_eq!(config.cuts.len(), 2);
        assert_eq!(config.cuts[1].target, CutTarget::Sidescan);
        assert_eq!(config.cuts[1].mode, CutMode::Speed);
        assert!(config.needs_course_made_good());

        let cleared = parse("BATHCUTNUMBER 0 4\nDATACUTCLEAR\nAMPCUTDISTANCE -10 10\n");
        assert_eq!(cleared.cuts.len(), 1);
        assert_eq!(cleared.cuts[0].target, CutTarget::Amplitude);
    }

    #[test]
    fn precedence_is_configurable() {
        assert_eq!(parse("").nav_precedence, NavPrecedence::AdjustedFirst);
        assert_eq!(
            parse("NAVADJPRECEDENCE 1\n").nav_precedence,
            NavPrecedence::NavigationFirst
        );
    }

    #[test]
    fn bad_values_are_reported() {
        let mut config = CorrectionConfig::for_input("line.mb");
        let err = parse_parameters("DRAFTOFFSET deep\n", Path::new(""), &mut config).unwrap_err();
        assert!(err.to_string().contains("DRAFTOFFSET"));
    }

    #[test]
    fn svp_mode_without_file_is_rejected() {
        let mut config = CorrectionConfig::for_input("line.mb");
        assert!(parse_parameters("SVPMODE 1\n", Path::new(""), &mut config).is_err());
    }

    #[test]
    fn load_reads_parameter_file_next_to_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("line.mb");
        let mut par = fs::File::create(dir.path().join("line.mb.par")).unwrap();
        writeln!(par, "## generated").unwrap();
        writeln!(par, "OUTFILE out.mb").unwrap();
        writeln!(par, "DRAFTMODE 4").unwrap();
        writeln!(par, "DRAFT 3.5").unwrap();
        let config = CorrectionConfig::load(&input).unwrap();
        assert_eq!(config.output, dir.path().join("out.mb"));
        assert_eq!(config.draft.apply(1.0), 3.5);
        assert_eq!(config.parameter_file, Some(dir.path().join("line.mb.par")));
    }
}
