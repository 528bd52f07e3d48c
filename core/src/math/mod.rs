pub mod angles;
pub mod coords;
pub mod lever;
pub mod stats;

pub use angles::{rollpitch_to_takeoff, takeoff_to_rollpitch, xyz_to_takeoff};
pub use coords::{coor_scale, normalize_heading, LonFlip};
pub use lever::{lever_heave, LeverArm};
pub use stats::RunningStats;
