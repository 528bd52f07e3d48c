use log::info;
use std::path::{Path, PathBuf};

use crate::codec::PingCodec;
use crate::config::{AdjustedNavMode, CorrectionConfig, SvpMode};
use crate::edits::EditLedger;
use crate::prelude::{ProcessError, ProcessResult, ProcessingStage};
use crate::series::{
    load_adjusted_navigation, load_attitude, load_navigation, load_tide, AdjustedNavigation,
    Navigation, TimeSeries,
};
use crate::svp::VelocityProfile;
use crate::swath::{Kinematics, Ping, PingState};
use crate::telemetry::{LogManager, MetricsRecorder};

use super::bathymetry::BathymetryStage;
use super::biases::BiasStage;
use super::cuts::CutStage;
use super::edits::EditStage;
use super::kinematics::KinematicsStage;
use super::lever::LeverStage;
use super::sidescan::{InsertKinematicsStage, SidescanStage};
use super::soundspeed::SoundSpeedStage;

/// Pings closer together than this share a timestamp for edit matching.
const SAME_PING_WINDOW: f64 = 0.00011;

/// Every auxiliary table an input's corrections need, loaded up front so a
/// missing or unusable file fails the input before any output is opened.
#[derive(Debug, Default)]
pub struct AuxiliaryData {
    pub navigation: Option<Navigation>,
    pub adjusted_nav: Option<AdjustedNavigation>,
    pub attitude: Option<TimeSeries>,
    pub tide: Option<TimeSeries>,
    pub profile: Option<VelocityProfile>,
    pub edits: Option<EditLedger>,
}

fn required<'a>(enabled: bool, file: &'a Option<PathBuf>, what: &str) -> ProcessResult<Option<&'a Path>> {
    if !enabled {
        return Ok(None);
    }
    match file.as_deref() {
        None => Err(ProcessError::MissingAuxiliary(format!(
            "{} is enabled but no file is configured",
            what
        ))),
        Some(path) if !path.is_file() => Err(ProcessError::MissingAuxiliary(format!(
            "{} file {} does not exist",
            what,
            path.display()
        ))),
        Some(path) => Ok(Some(path)),
    }
}

impl AuxiliaryData {
    pub fn load(config: &CorrectionConfig) -> ProcessResult<Self> {
        let nav = &config.navigation;
        let navigation = required(nav.enabled, &nav.file, "navigation merge")?
            .map(|path| load_navigation(path, nav.format, nav.time_shift, config.lonflip, nav.interp))
            .transpose()?;

        let adjusted = &config.adjusted_nav;
        let adjusted_nav = required(adjusted.mode != AdjustedNavMode::Off, &adjusted.file, "adjusted navigation")?
            .map(|path| {
                load_adjusted_navigation(
                    path,
                    adjusted.mode == AdjustedNavMode::LonLatDepth,
                    config.lonflip,
                    adjusted.interp,
                )
            })
            .transpose()?;

        let attitude = required(config.attitude.enabled, &config.attitude.file, "attitude merge")?
            .map(|path| load_attitude(path, config.attitude.format))
            .transpose()?;
        let tide = required(config.tide.enabled, &config.tide.file, "tide correction")?
            .map(|path| load_tide(path, config.tide.format))
            .transpose()?;
        let profile = required(config.svp.mode != SvpMode::Off, &config.svp.file, "sound velocity correction")?
            .map(VelocityProfile::load)
            .transpose()?;
        let edits = required(config.edits.enabled, &config.edits.file, "saved edits")?
            .map(EditLedger::load)
            .transpose()?;

        Ok(Self {
            navigation,
            adjusted_nav,
            attitude,
            tide,
            profile,
            edits,
        })
    }
}

/// The ordered stage chain for one input.
pub struct PingPipeline<C> {
    codec: C,
    kinematics: KinematicsStage,
    stages: Vec<Box<dyn ProcessingStage + Send>>,
    last_time: Option<f64>,
    multiplicity: u32,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl<C> PingPipeline<C>
where
    C: PingCodec + Clone + Send + 'static,
{
    pub fn new(config: &CorrectionConfig, aux: AuxiliaryData, codec: C) -> ProcessResult<Self> {
        let AuxiliaryData {
            navigation,
            adjusted_nav,
            attitude,
            tide,
            profile,
            edits,
        } = aux;

        let kinematics = KinematicsStage::new(config, navigation, adjusted_nav, attitude, tide);
        let mut stages: Vec<Box<dyn ProcessingStage + Send>> = Vec::new();
        stages.push(Box::new(BiasStage::new(
            config,
            profile.as_ref().map(VelocityProfile::surface_velocity),
        )));
        if let Some(arm) = config.lever {
            stages.push(Box::new(LeverStage::new(arm, config)));
        }
        if let Some(mode) = config.recalc_mode() {
            stages.push(Box::new(BathymetryStage::new(mode, config, profile.as_ref())?));
        }
        if config.converts_sound_speed_reference() {
            let profile = profile.ok_or_else(|| {
                ProcessError::MissingAuxiliary("sound speed reference conversion needs a profile".into())
            })?;
            stages.push(Box::new(SoundSpeedStage::new(profile, config.svp.corrected)));
        }
        if let Some(ledger) = edits {
            stages.push(Box::new(EditStage::new(ledger)));
        }
        let bathymetry_cuts = CutStage::bathymetry(&config.cuts);
        if !bathymetry_cuts.is_empty() {
            stages.push(Box::new(bathymetry_cuts));
        }
        stages.push(Box::new(InsertKinematicsStage::new(codec.clone())));
        if config.sidescan.enabled {
            stages.push(Box::new(SidescanStage::new(codec.clone(), config.sidescan.settings())));
        }
        let backscatter_cuts = CutStage::backscatter(&config.cuts);
        if !backscatter_cuts.is_empty() {
            stages.push(Box::new(backscatter_cuts));
        }

        let label = config
            .input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.input.display().to_string());
        let logger = LogManager::new(label, config.verbose);
        let names = std::iter::once(ProcessingStage::name(&kinematics))
            .chain(stages.iter().map(|stage| stage.name()))
            .collect::<Vec<_>>();
        logger.progress(&format!("stages: {}", names.join(" -> ")));

        Ok(Self {
            codec,
            kinematics,
            stages,
            last_time: None,
            multiplicity: 0,
            logger,
            metrics: MetricsRecorder::new(),
        })
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn logger(&self) -> &LogManager {
        &self.logger
    }

    fn next_multiplicity(&mut self, time: f64) -> u32 {
        self.multiplicity = match self.last_time {
            Some(last) if (time - last).abs() < SAME_PING_WINDOW => self.multiplicity + 1,
            _ => 0,
        };
        self.last_time = Some(time);
        self.multiplicity
    }

    /// Runs every stage over one ping, correcting it in place.
    pub fn process(&mut self, ping: &mut Ping) -> ProcessResult<()> {
        let recorded = self.codec.extract_kinematics(ping);
        let multiplicity = self.next_multiplicity(recorded.time);
        let travel = self.codec.extract_travel_times(ping);
        let mut state = PingState::new(ping, recorded, travel, multiplicity);

        self.kinematics.execute(&mut state)?;
        for stage in self.stages.iter_mut() {
            stage.execute(&mut state)?;
        }

        if state.raytrace_nulls > 0 {
            self.metrics.record_raytrace_nulls(state.raytrace_nulls);
            self.logger.detail(&format!(
                "ping at {:.6}: {} beams left the velocity profile",
                state.time(),
                state.raytrace_nulls
            ));
        }
        self.metrics.record_edits(state.edits_changed);
        self.metrics.record_ping(&state.ping.beams);
        Ok(())
    }

    /// Applies the kinematics merge to a standalone navigation record.
    pub fn process_navigation(&mut self, kinematics: &mut Kinematics) -> ProcessResult<()> {
        let mut carrier = Ping {
            kinematics: *kinematics,
            ..Default::default()
        };
        let mut state = PingState::new(&mut carrier, *kinematics, Vec::new(), 0);
        self.kinematics.execute(&mut state)?;
        *kinematics = state.kinematics;
        self.metrics.record_navigation();
        Ok(())
    }

    /// Logs the per-input totals.
    pub fn finish(&self) {
        let totals = self.metrics.snapshot();
        info!(
            "{} pings: {} good, {} flagged, {} null beams ({} nulled by ray tracing, {} edits)",
            totals.pings,
            totals.beams_good,
            totals.beams_flagged,
            totals.beams_null,
            totals.beams_nulled_by_raytrace,
            totals.edits_applied
        );
    }
}
