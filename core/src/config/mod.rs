//! Per-input correction settings.
//!
//! A [`CorrectionConfig`] is read once per input (from `<input>.par` or by
//! inference from sibling files) and never mutated by the pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::SidescanSettings;
use crate::math::{LeverArm, LonFlip};
use crate::series::InterpMode;

pub mod infer;
pub mod parfile;

pub use infer::{default_output_path, infer_default};
pub use parfile::parse_parameters;

/// Which table wins when both navigation and adjusted navigation supply a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NavPrecedence {
    #[default]
    AdjustedFirst,
    NavigationFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationSettings {
    pub enabled: bool,
    pub file: Option<PathBuf>,
    pub format: i32,
    pub heading: bool,
    pub speed: bool,
    pub draft: bool,
    pub attitude: bool,
    pub interp: InterpMode,
    pub time_shift: f64,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            file: None,
            format: 9,
            heading: false,
            speed: false,
            draft: false,
            attitude: false,
            interp: InterpMode::Linear,
            time_shift: 0.0,
        }
    }
}

/// Antenna-to-reference offsets (metres, rotated by heading) and absolute shifts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PositionShift {
    pub enabled: bool,
    pub offset_x: f64,
    pub offset_y: f64,
    pub shift_x: f64,
    pub shift_y: f64,
    pub shift_lon: f64,
    pub shift_lat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AdjustedNavMode {
    #[default]
    Off,
    LonLat,
    LonLatDepth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AdjustedNavSettings {
    pub mode: AdjustedNavMode,
    pub file: Option<PathBuf>,
    pub interp: InterpMode,
}

/// Attitude and tide tables share the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    pub enabled: bool,
    pub file: Option<PathBuf>,
    pub format: i32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            file: None,
            format: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SvpMode {
    #[default]
    Off,
    RayTrace,
    SoundSpeedRef,
}

/// How the recorded surface sound speed bends take-off angles before tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AngleMode {
    Unchanged,
    #[default]
    Snell,
    SnellNull,
}

impl AngleMode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => AngleMode::Unchanged,
            2 => AngleMode::SnellNull,
            _ => AngleMode::Snell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundVelocitySettings {
    pub mode: SvpMode,
    pub file: Option<PathBuf>,
    /// Output depths referenced to true (profile) sound speed rather than 1500 m/s.
    pub corrected: bool,
    pub angle_mode: AngleMode,
}

impl Default for SoundVelocitySettings {
    fn default() -> Self {
        Self {
            mode: SvpMode::Off,
            file: None,
            corrected: true,
            angle_mode: AngleMode::Snell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum SurfaceSoundSpeed {
    #[default]
    Recorded,
    Offset(f64),
    Set(f64),
}

/// Shared shape of the draft and heave adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleMode {
    #[default]
    Off,
    Offset,
    Multiply,
    MultiplyOffset,
    /// Draft only: replace the recorded value.
    Set,
}

impl ScaleMode {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => ScaleMode::Offset,
            2 => ScaleMode::Multiply,
            3 => ScaleMode::MultiplyOffset,
            4 => ScaleMode::Set,
            _ => ScaleMode::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarAdjust {
    pub mode: ScaleMode,
    pub offset: f64,
    pub multiply: f64,
    pub value: f64,
}

impl Default for ScalarAdjust {
    fn default() -> Self {
        Self {
            mode: ScaleMode::Off,
            offset: 0.0,
            multiply: 1.0,
            value: 0.0,
        }
    }
}

impl ScalarAdjust {
    pub fn apply(&self, recorded: f64) -> f64 {
        match self.mode {
            ScaleMode::Off => recorded,
            ScaleMode::Offset => recorded + self.offset,
            ScaleMode::Multiply => recorded * self.multiply,
            ScaleMode::MultiplyOffset => recorded * self.multiply + self.offset,
            ScaleMode::Set => self.value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum RollBias {
    #[default]
    Off,
    Single(f64),
    Split { port: f64, starboard: f64 },
}

impl RollBias {
    pub fn is_on(&self) -> bool {
        !matches!(self, RollBias::Off)
    }

    /// Bias applied to a beam on the given side.
    pub fn for_side(&self, starboard: bool) -> f64 {
        match *self {
            RollBias::Off => 0.0,
            RollBias::Single(bias) => bias,
            RollBias::Split { port, starboard: stbd } => {
                if starboard {
                    stbd
                } else {
                    port
                }
            }
        }
    }

    /// Bias applied to whole-vessel quantities such as the lever arm.
    pub fn mean(&self) -> f64 {
        match *self {
            RollBias::Off => 0.0,
            RollBias::Single(bias) => bias,
            RollBias::Split { port, starboard } => 0.5 * (port + starboard),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HeadingMode {
    #[default]
    Recorded,
    CourseMadeGood,
    Offset,
    CourseMadeGoodOffset,
}

impl HeadingMode {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => HeadingMode::CourseMadeGood,
            2 => HeadingMode::Offset,
            3 => HeadingMode::CourseMadeGoodOffset,
            _ => HeadingMode::Recorded,
        }
    }

    pub fn uses_course(self) -> bool {
        matches!(
            self,
            HeadingMode::CourseMadeGood | HeadingMode::CourseMadeGoodOffset
        )
    }

    pub fn uses_offset(self) -> bool {
        matches!(self, HeadingMode::Offset | HeadingMode::CourseMadeGoodOffset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutTarget {
    Bathymetry,
    Amplitude,
    Sidescan,
}

impl CutTarget {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(CutTarget::Bathymetry),
            1 => Some(CutTarget::Amplitude),
            2 => Some(CutTarget::Sidescan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutMode {
    /// Inclusive beam or pixel index range.
    Number,
    /// Inclusive across-track distance range in metres.
    Distance,
    /// Everything is cut when the vessel speed falls outside the range (km/h).
    Speed,
}

impl CutMode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(CutMode::Number),
            2 => Some(CutMode::Distance),
            3 => Some(CutMode::Speed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutRule {
    pub target: CutTarget,
    pub mode: CutMode,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EditSettings {
    pub enabled: bool,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SidescanRecalc {
    pub enabled: bool,
    pub pixel_size: f64,
    pub swath_width: f64,
    pub interpolate: usize,
}

impl SidescanRecalc {
    pub fn settings(&self) -> SidescanSettings {
        SidescanSettings {
            pixel_size: (self.pixel_size > 0.0).then_some(self.pixel_size),
            swath_width: (self.swath_width > 0.0).then_some(self.swath_width),
            interpolate: self.interpolate,
        }
    }
}

/// Bathymetry recomputation strategy selected from the configured corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecalcMode {
    RayTrace,
    RigidRotation,
    OffsetOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CorrectionConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: Option<i32>,
    pub parameter_file: Option<PathBuf>,
    pub explicit: bool,
    pub verbose: u8,
    pub lonflip: LonFlip,

    pub navigation: NavigationSettings,
    pub position_shift: PositionShift,
    pub adjusted_nav: AdjustedNavSettings,
    pub nav_precedence: NavPrecedence,
    pub attitude: TableSettings,
    pub tide: TableSettings,

    pub svp: SoundVelocitySettings,
    pub surface_sound_speed: SurfaceSoundSpeed,
    pub travel_time_multiply: Option<f64>,
    pub draft: ScalarAdjust,
    pub heave: ScalarAdjust,
    pub lever: Option<LeverArm>,
    pub roll_bias: RollBias,
    pub pitch_bias: Option<f64>,
    pub heading_mode: HeadingMode,
    pub heading_offset: f64,

    pub edits: EditSettings,
    pub cuts: Vec<CutRule>,
    pub sidescan: SidescanRecalc,
}

impl CorrectionConfig {
    pub fn for_input<P: AsRef<Path>>(input: P) -> Self {
        let input = input.as_ref().to_path_buf();
        Self {
            output: default_output_path(&input),
            input,
            ..Default::default()
        }
    }

    /// Roll or pitch changes from a merged attitude source.
    pub fn merges_attitude(&self) -> bool {
        (self.navigation.enabled && self.navigation.attitude) || self.attitude.enabled
    }

    pub fn recalc_mode(&self) -> Option<RecalcMode> {
        if self.svp.mode == SvpMode::RayTrace {
            return Some(RecalcMode::RayTrace);
        }
        if self.roll_bias.is_on() || self.pitch_bias.is_some() || self.merges_attitude() {
            return Some(RecalcMode::RigidRotation);
        }
        let draft_changes = self.draft.mode != ScaleMode::Off
            || (self.navigation.enabled && self.navigation.draft)
            || self.lever.is_some()
            || self.tide.enabled
            || self.adjusted_nav.mode == AdjustedNavMode::LonLatDepth
            || self.svp.mode == SvpMode::SoundSpeedRef;
        draft_changes.then_some(RecalcMode::OffsetOnly)
    }

    /// Whether depths are rescaled between 1500 m/s and profile sound speed.
    pub fn converts_sound_speed_reference(&self) -> bool {
        match self.svp.mode {
            SvpMode::SoundSpeedRef => true,
            SvpMode::RayTrace => !self.svp.corrected,
            SvpMode::Off => false,
        }
    }

    pub fn needs_course_made_good(&self) -> bool {
        self.heading_mode.uses_course() || self.cuts.iter().any(|cut| cut.mode == CutMode::Speed)
    }

    /// Every auxiliary file the enabled corrections read.
    pub fn auxiliary_files(&self) -> Vec<&Path> {
        let candidates = [
            (self.navigation.enabled, &self.navigation.file),
            (
                self.adjusted_nav.mode != AdjustedNavMode::Off,
                &self.adjusted_nav.file,
            ),
            (self.attitude.enabled, &self.attitude.file),
            (self.tide.enabled, &self.tide.file),
            (self.edits.enabled, &self.edits.file),
            (self.svp.mode != SvpMode::Off, &self.svp.file),
        ];
        candidates
            .into_iter()
            .filter_map(|(enabled, file)| if enabled { file.as_deref() } else { None })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_recomputes_nothing() {
        let config = CorrectionConfig::for_input("line.mb");
        assert_eq!(config.recalc_mode(), None);
        assert!(config.auxiliary_files().is_empty());
        assert_eq!(config.output, PathBuf::from("line_p.mb"));
    }

    #[test]
    fn raytrace_takes_priority_over_rotation() {
        let mut config = CorrectionConfig::for_input("line.mb");
        config.roll_bias = RollBias::Single(0.5);
        assert_eq!(config.recalc_mode(), Some(RecalcMode::RigidRotation));
        config.svp.mode = SvpMode::RayTrace;
        assert_eq!(config.recalc_mode(), Some(RecalcMode::RayTrace));
    }

    #[test]
    fn tide_alone_selects_offset_mode() {
        let mut config = CorrectionConfig::for_input("line.mb");
        config.tide.enabled = true;
        assert_eq!(config.recalc_mode(), Some(RecalcMode::OffsetOnly));
    }

    #[test]
    fn uncorrected_raytrace_converts_reference() {
        let mut config = CorrectionConfig::for_input("line.mb");
        config.svp.mode = SvpMode::RayTrace;
        assert!(!config.converts_sound_speed_reference());
        config.svp.corrected = false;
        assert!(config.converts_sound_speed_reference());
    }

    #[test]
    fn split_roll_bias_selects_side() {
        let bias = RollBias::Split {
            port: -1.0,
            starboard: 2.0,
        };
        assert_eq!(bias.for_side(true), 2.0);
        assert_eq!(bias.for_side(false), -1.0);
        assert_eq!(bias.mean(), 0.5);
    }

    #[test]
    fn scalar_adjust_modes() {
        let mut adjust = ScalarAdjust {
            offset: 1.0,
            multiply: 2.0,
            value: 7.0,
            ..Default::default()
        };
        assert_eq!(adjust.apply(3.0), 3.0);
        adjust.mode = ScaleMode::MultiplyOffset;
        assert_eq!(adjust.apply(3.0), 7.0);
        adjust.mode = ScaleMode::Set;
        assert_eq!(adjust.apply(3.0), 7.0);
    }
}
