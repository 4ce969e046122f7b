//! The run orchestration state machine.
//!
//! One [`Runner`] reacts to compile lifecycle events. A new pass aborts any
//! in-flight worker; a finished pass decides between a full first run, an
//! affected-subset run, a skip, or (with compile errors) no run at all. The
//! handlers are only ever invoked sequentially from the driver loop, so all
//! state lives in plain fields.

use std::path::PathBuf;
use std::process::ExitStatus;

use retest_core::pipeline::Compilation;
use retest_core::{paths, AffectedTestSelector, Error, ProjectConfig, Settings, WorkerSpec};
use retest_proto::{TestSelection, WorkerRequest};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::RunnerEvent;
use crate::run_handle::RunHandle;

pub struct Runner {
    selector: AffectedTestSelector,
    worker: WorkerSpec,
    exec_argv: Vec<String>,
    cwd: PathBuf,
    watch: bool,
    manual: bool,
    current: Option<RunHandle>,
    run_count: u64,
    events: mpsc::UnboundedSender<RunnerEvent>,
}

impl Runner {
    pub fn new(
        settings: &Settings,
        config: &ProjectConfig,
        events: mpsc::UnboundedSender<RunnerEvent>,
    ) -> Result<Self, Error> {
        let selector =
            AffectedTestSelector::new(settings.cwd.clone(), config.test_pattern.as_deref())?;

        Ok(Self {
            selector,
            worker: config.worker.clone(),
            exec_argv: config.exec_argv.clone(),
            cwd: settings.cwd.clone(),
            watch: settings.watch,
            manual: settings.manual,
            current: None,
            run_count: 0,
            events,
        })
    }

    /// True while a worker run is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Completed worker runs so far.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.run_count
    }

    /// A new compile pass began: abort any in-flight run.
    pub async fn pass_started(&mut self, pass: u64) {
        self.send(RunnerEvent::PassStarted { pass });

        if let Some(handle) = self.current.take() {
            debug!(run = handle.run(), "aborting run superseded by new pass");
            handle.abort().await;
            self.send(RunnerEvent::RunAborted);
        }
    }

    /// A compile pass finished: decide whether to run, skip, or bail.
    ///
    /// Returns `Some(exit_code)` when the process should terminate
    /// (single-shot mode only).
    pub async fn pass_finished(&mut self, comp: &Compilation) -> Result<Option<i32>, Error> {
        self.send(RunnerEvent::PassFinished {
            stats: comp.stats().clone(),
            errors: comp.errors().to_vec(),
        });

        if comp.has_errors() {
            if let Some(handle) = self.current.take() {
                handle.abort().await;
                self.send(RunnerEvent::RunAborted);
            }
            if !self.watch {
                return Ok(Some(1));
            }
            return Ok(None);
        }

        if self.manual {
            self.send(RunnerEvent::ManualInstructions(self.manual_command(comp)));
            if !self.watch {
                return Ok(Some(0));
            }
            return Ok(None);
        }

        let selected = self.selector.select(comp.graph());
        self.selector.clear();

        // The first successful pass always runs everything, whatever the
        // selector found.
        let full = self.run_count == 0;
        if !full && selected.is_empty() {
            debug!("nothing rebuilt affects tests");
            self.send(RunnerEvent::RunSkipped);
            return Ok(None);
        }

        let selected_count = selected.len();
        let selection = if full {
            TestSelection::All
        } else {
            TestSelection::Subset(selected)
        };

        self.run_count += 1;
        let run = self.run_count;
        let request = WorkerRequest {
            tests_to_run: selection,
            launch_args: self.launch_args(comp),
        };

        let handle = RunHandle::start(&self.worker, &self.cwd, &request, run).await?;
        self.current = Some(handle);
        info!(run, full, selected = selected_count, "test run started");
        self.send(RunnerEvent::RunStarted {
            run,
            selected: selected_count,
            full,
        });

        Ok(None)
    }

    /// Await the in-flight worker's exit. Pends forever while no run is
    /// active, so it can sit in a `select!` arm unguarded.
    pub async fn wait_current(&mut self) -> std::io::Result<ExitStatus> {
        match self.current.as_mut() {
            Some(handle) => handle.wait().await,
            None => std::future::pending().await,
        }
    }

    /// The worker exited on its own. Returns the exit code to terminate with
    /// in single-shot mode.
    pub fn run_completed(&mut self, status: std::io::Result<ExitStatus>) -> Option<i32> {
        let code = match status {
            Ok(status) => status.code().unwrap_or(1),
            Err(e) => {
                warn!("failed to reap test worker: {e}");
                1
            }
        };

        let run = self.current.take().map_or(0, |handle| handle.run());
        debug!(run, code, "test run completed");
        self.send(RunnerEvent::RunCompleted { run, code });

        if self.watch {
            None
        } else {
            Some(code)
        }
    }

    /// Tear down before process exit: kill any in-flight worker.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.abort().await;
        }
    }

    fn send(&self, event: RunnerEvent) {
        let _ = self.events.send(event);
    }

    /// execArgv followed by the pass's artifact paths.
    fn launch_args(&self, comp: &Compilation) -> Vec<String> {
        let mut args = self.exec_argv.clone();
        args.extend(
            comp.artifacts()
                .iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );
        args
    }

    /// The copy-pastable command shown in manual mode.
    fn manual_command(&self, comp: &Compilation) -> String {
        let current = std::env::current_dir().unwrap_or_else(|_| self.cwd.clone());

        // In watch mode the command runs in another shell, so the absolute
        // path is the usable one.
        let cd_target = if self.watch {
            self.cwd.display().to_string()
        } else {
            paths::relative_to(&current, &self.cwd).display().to_string()
        };

        let mut argv: Vec<String> = self.worker.args.clone();
        if self.watch {
            argv.push("--watch".to_owned());
        }
        argv.extend(self.exec_argv.iter().cloned());
        argv.extend(
            comp.artifacts()
                .iter()
                .map(|p| paths::relative_to(&current, p).display().to_string()),
        );

        let mut command = self.worker.program.clone();
        for arg in &argv {
            command.push(' ');
            command.push_str(&shell_quote(arg));
        }

        let mut lines = Vec::new();
        if !cd_target.is_empty() && cd_target != "." {
            lines.push(format!("cd {}", shell_quote(&cd_target)));
        }
        lines.push(command);

        format!(
            "Run the following {}to execute the tests\n\n  {}\n\n",
            if self.watch { "in another shell " } else { "" },
            lines.join("\n  ")
        )
    }
}

/// Quote one argument for a posix shell.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:".contains(c));
    if safe {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
