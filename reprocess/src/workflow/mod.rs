pub mod config;
pub mod datalist;
pub mod runner;
pub mod staleness;
