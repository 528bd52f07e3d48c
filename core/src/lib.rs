//! Correction core for swath bathymetry reprocessing.
//!
//! A survey stream is read record by record; every ping runs through a fixed
//! chain of stages that merges auxiliary navigation and attitude, applies
//! biases, recomputes soundings (ray tracing, rigid rotation or a depth
//! offset), replays saved edits and applies cut rules before it is written
//! back out.

pub mod codec;
pub mod config;
pub mod edits;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod series;
pub mod svp;
pub mod swath;
pub mod telemetry;

pub use config::CorrectionConfig;
pub use prelude::{ProcessError, ProcessResult, ProcessingStage};
pub use processing::{AuxiliaryData, PingPipeline};
