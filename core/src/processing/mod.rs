//! Per-ping correction stages and the pipeline that chains them.

pub mod bathymetry;
pub mod biases;
pub mod cuts;
pub mod edits;
pub mod kinematics;
pub mod lever;
pub mod pipeline;
pub mod sidescan;
pub mod soundspeed;

pub use bathymetry::BathymetryStage;
pub use biases::BiasStage;
pub use cuts::CutStage;
pub use edits::EditStage;
pub use kinematics::KinematicsStage;
pub use lever::LeverStage;
pub use pipeline::{AuxiliaryData, PingPipeline};
pub use sidescan::{InsertKinematicsStage, SidescanStage};
pub use soundspeed::SoundSpeedStage;
