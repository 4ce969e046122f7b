//! Runner notifications.
//!
//! The orchestrator reports progress through these events over an unbounded
//! channel. Sends are best-effort; a dropped receiver never stalls a run.

use retest_core::pipeline::{CompileError, PassStats};

/// One notification from the runner to the reporter.
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    /// A compile pass began. `pass` is 1-based.
    PassStarted { pass: u64 },

    /// A compile pass finished, with or without errors.
    PassFinished {
        stats: PassStats,
        errors: Vec<CompileError>,
    },

    /// A worker process was spawned. `selected` is the number of test
    /// modules picked; meaningful only when `full` is false.
    RunStarted { run: u64, selected: usize, full: bool },

    /// The in-flight worker was killed before it could finish.
    RunAborted,

    /// Nothing rebuilt affects any test module; no worker was spawned.
    RunSkipped,

    /// The worker exited on its own with `code`.
    RunCompleted { run: u64, code: i32 },

    /// Manual mode: the shell command to run in place of an automatic worker.
    ManualInstructions(String),
}
