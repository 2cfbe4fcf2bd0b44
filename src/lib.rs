//! Periodic "progress" reporting: a background thread that calls a task at a fixed interval
//! while the owning thread updates the task's named arguments under a lock.
//!
//! The crate also carries the small filters that ship alongside the reporter: a Python source
//! colorizer ([`colorize`]) and the stdin/stdout aliasing it uses ([`inout`]).

pub mod args;
pub mod colorize;
pub mod config;
pub mod error;
pub mod inout;
mod lock;
pub mod logger;
pub mod runner;
pub mod task;

pub use args::{ArgumentSet, FillFrom};
pub use error::ProgressError;
pub use logger::{Diagnostics, Logger};
pub use runner::{ArgsGuard, PeriodicRunner, RunnerOptions, RunnerState};
pub use task::{RestParam, Task, TaskError};
