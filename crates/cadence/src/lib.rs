//! cadence - academic workflow orchestration.
//!
//! Single binary that serves the engine API over HTTP and runs the daily
//! automatic sweep, plus one-shot commands for operators.

pub mod cli;
mod runtime;

pub use runtime::{build_engine, Cadence, CadenceBuilder};
