//! Drive an external GPU test program through a parameter sweep, pull one
//! integer metric out of each run's output, and chart the series. A second
//! path replays a recorded GPU/CPU frame time log.

pub mod chart;
pub mod config;
pub mod display;
pub mod errors;
pub mod extract;
pub mod frametime;
pub mod logging;
pub mod runner;
pub mod sweep;
pub mod types;
