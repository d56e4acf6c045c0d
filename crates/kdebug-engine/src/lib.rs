//! Runs the proof engine subprocess and grows a proof tree from its
//! output: [`bus`] is the lock-free queue every worker thread posts
//! through, [`scheduler`] is the single-threaded state machine that
//! decides what to select, step, or fetch next, and [`process`] wires a
//! spawned subprocess's stdout/stderr/stdin into both.

pub mod bus;
pub mod process;
pub mod scheduler;

#[cfg(test)]
mod scenario_tests;

pub use process::{read_debug_log, EngineProcess, ProcessError};
pub use scheduler::{Event, Scheduler, SchedulerError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
