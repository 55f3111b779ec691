//! Periodic trigger for the automatic sweep.

mod runner;

pub use runner::{SweepRunner, SweepRunnerConfig};
