//! Run orchestration for retest.
//!
//! Glues the compile pipeline to worker processes: the [`Runner`] state
//! machine decides what to run after each pass, [`RunHandle`] owns one worker
//! process, [`ChangeStream`] feeds watch mode, and [`RunnerEvent`]s report
//! progress to the caller. [`run_once`] and [`run_watch`] are the two entry
//! points.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod events;
pub mod orchestrator;
pub mod run_handle;
pub mod watch;

pub use events::RunnerEvent;
pub use orchestrator::Runner;
pub use run_handle::RunHandle;
pub use watch::ChangeStream;

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitStatus;

use retest_core::{Error, Pipeline, ProjectConfig, Settings};
use tokio::sync::mpsc;
use tracing::debug;

/// One iteration of the watch loop.
enum Tick {
    Shutdown,
    RunExited(std::io::Result<ExitStatus>),
    Changed(Option<HashSet<PathBuf>>),
}

/// Single-shot mode: one pass, one run, then the exit code.
pub async fn run_once(
    settings: &Settings,
    config: &ProjectConfig,
    events: mpsc::UnboundedSender<RunnerEvent>,
) -> Result<i32, Error> {
    let mut pipeline = Pipeline::new(settings.cwd.clone(), config.entries.clone());
    let mut runner = Runner::new(settings, config, events)?;

    runner.pass_started(1).await;
    let comp = pipeline.run_pass()?;
    if let Some(code) = runner.pass_finished(&comp).await? {
        return Ok(code);
    }

    let status = runner.wait_current().await;
    Ok(runner.run_completed(status).unwrap_or(0))
}

/// Watch mode: an initial pass, then one pass per change batch, until ctrl-c.
pub async fn run_watch(
    settings: &Settings,
    config: &ProjectConfig,
    events: mpsc::UnboundedSender<RunnerEvent>,
) -> Result<i32, Error> {
    let mut pipeline = Pipeline::new(settings.cwd.clone(), config.entries.clone());
    let mut runner = Runner::new(settings, config, events)?;
    let mut changes = ChangeStream::new(&settings.cwd)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    runner.pass_started(1).await;
    let comp = pipeline.run_pass()?;
    if let Some(code) = runner.pass_finished(&comp).await? {
        return Ok(code);
    }

    loop {
        // Futures in the arms must not touch state the handlers mutate, so
        // each arm reduces to a Tick handled after the select ends.
        let tick = tokio::select! {
            _ = &mut ctrl_c => Tick::Shutdown,
            status = runner.wait_current() => Tick::RunExited(status),
            batch = changes.next_batch() => Tick::Changed(batch),
        };

        match tick {
            Tick::Shutdown => {
                debug!("ctrl-c received, shutting down");
                runner.shutdown().await;
                return Ok(0);
            }
            Tick::RunExited(status) => {
                if let Some(code) = runner.run_completed(status) {
                    return Ok(code);
                }
            }
            Tick::Changed(None) => {
                return Err(Error::other("file watcher stopped unexpectedly"));
            }
            Tick::Changed(Some(paths)) => {
                debug!(changed = paths.len(), "file changes detected");
                runner.pass_started(pipeline.passes() + 1).await;
                let comp = pipeline.run_pass()?;
                if let Some(code) = runner.pass_finished(&comp).await? {
                    return Ok(code);
                }
            }
        }
    }
}
