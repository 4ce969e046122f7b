//! One spawned, killable test worker process.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use retest_core::{Error, WorkerSpec};
use retest_proto::WorkerRequest;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::debug;

/// Handle to a single worker run. Handles are single-use: spawn with
/// [`start`](RunHandle::start), then either [`wait`](RunHandle::wait) for the
/// natural exit or [`abort`](RunHandle::abort) to kill the process.
///
/// `abort` consumes the handle, so an aborted run can never also report a
/// completion.
#[derive(Debug)]
pub struct RunHandle {
    child: Child,
    run: u64,
}

impl RunHandle {
    /// Spawn the worker in `cwd`, write the request as one JSON line to its
    /// stdin, and close the pipe. stdout/stderr are inherited so test output
    /// reaches the console directly.
    pub async fn start(
        worker: &WorkerSpec,
        cwd: &Path,
        request: &WorkerRequest,
        run: u64,
    ) -> Result<Self, Error> {
        let line = request
            .encode_line()
            .map_err(|e| Error::other(format!("failed to encode worker request: {e}")))?;

        let mut child = Command::new(&worker.program)
            .args(&worker.args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::WorkerSpawn {
                program: worker.program.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::other("failed to capture worker stdin"))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        drop(stdin);

        debug!(
            run,
            pid = child.id().unwrap_or(0),
            program = %worker.program,
            "spawned test worker"
        );

        Ok(Self { child, run })
    }

    /// The 1-based run number this worker belongs to.
    #[must_use]
    pub fn run(&self) -> u64 {
        self.run
    }

    /// Wait for the worker to exit on its own.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Kill the worker process and reap it.
    pub async fn abort(mut self) {
        debug!(run = self.run, "killing test worker");
        if let Err(e) = self.child.kill().await {
            debug!(run = self.run, "worker kill failed: {e}");
        }
    }
}
