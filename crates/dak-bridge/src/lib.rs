//! # dak-bridge
//!
//! The evaluation bridge: turns optimizer-emitted parameter files into
//! objective evaluations and results files.
//!
//! Two interchangeable strategies, fixed at setup time: direct-driver mode
//! (the optimizer forks a generated re-entry script per evaluation) and
//! watcher mode (a long-lived [`ParamsWatcher`] polls the parameter path and
//! evaluates in place).

mod driver;
mod exchange;
mod watcher;

pub use driver::{run_driver, write_driver_script, write_placeholder_script};
pub use exchange::{ParamVariable, ParamsFile, ResultsFile};
pub use watcher::{
    ParamsWatcher, StopHandle, WatchEvent, WatchState, DEFAULT_POLL_INTERVAL,
};
