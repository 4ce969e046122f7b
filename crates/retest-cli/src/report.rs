//! Console reporter.
//!
//! Turns [`RunnerEvent`]s into terminal lines. Every user-facing string lives
//! here; the library crates only ever speak through `tracing`. Progress and
//! results go to stdout, warnings and compile errors to stderr.

use std::io::IsTerminal;

use retest_core::pipeline::{CompileError, PassStats};
use retest_core::Settings;
use retest_runner::RunnerEvent;
use tokio::sync::mpsc;

pub struct Reporter {
    stats: bool,
    clear_screen: bool,
    silent: bool,
    interactive: bool,
}

impl Reporter {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            stats: settings.stats,
            clear_screen: settings.clear_screen,
            silent: settings.silent,
            interactive: std::io::stdout().is_terminal(),
        }
    }

    /// Consume events until the runner drops its sender.
    pub async fn drive(self, mut events: mpsc::UnboundedReceiver<RunnerEvent>) {
        while let Some(event) = events.recv().await {
            self.report(&event);
        }
    }

    fn report(&self, event: &RunnerEvent) {
        match event {
            RunnerEvent::PassStarted { pass } => self.pass_started(*pass),
            RunnerEvent::PassFinished { stats, errors } => self.pass_finished(stats, errors),
            RunnerEvent::RunStarted { selected, full, .. } => self.run_started(*selected, *full),
            RunnerEvent::RunAborted => self.run_aborted(),
            RunnerEvent::RunSkipped => self.run_skipped(),
            RunnerEvent::RunCompleted { code, .. } => self.run_completed(*code),
            RunnerEvent::ManualInstructions(text) => self.manual(text),
        }
    }

    fn pass_started(&self, pass: u64) {
        if self.silent {
            return;
        }
        if pass > 1 && self.clear_screen && self.interactive {
            // ESC[2J clears the screen, ESC[1;0H homes the cursor
            print!("\u{001b}[2J\u{001b}[1;0H");
        }
        if pass == 1 {
            println!("bundling");
        } else {
            println!("re-bundling");
        }
    }

    /// Compile errors print even in silent mode.
    fn pass_finished(&self, stats: &PassStats, errors: &[CompileError]) {
        let failed = !errors.is_empty();
        if !self.silent && (self.stats || failed) {
            println!("{}", pass_summary(stats));
        }
        for error in errors {
            eprintln!("error: {error}");
        }
        if failed {
            eprintln!("error: skipping tests because of bundle errors");
        }
    }

    fn run_started(&self, selected: usize, full: bool) {
        // A full run needs no announcement; the worker inherits the console.
        if self.silent || full {
            return;
        }
        println!("testing {selected} affected modules");
    }

    fn run_aborted(&self) {
        if self.silent {
            return;
        }
        eprintln!("warning: aborting test run");
    }

    fn run_skipped(&self) {
        if self.silent {
            return;
        }
        println!("skipped: no affected test modules");
    }

    fn run_completed(&self, code: i32) {
        if code == 0 {
            if !self.silent {
                println!("\u{2713} tests passed"); // ✓
            }
        } else {
            println!("\u{2717} tests failed (exit {code})"); // ✗
        }
    }

    fn manual(&self, text: &str) {
        if self.silent {
            return;
        }
        // The instructions carry their own trailing blank line.
        print!("{text}");
    }
}

fn pass_summary(stats: &PassStats) -> String {
    format!(
        "pass {}: {} modules ({} rebuilt) in {}ms",
        stats.pass,
        stats.modules,
        stats.built,
        stats.elapsed.as_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pass_summary_format() {
        let stats = PassStats {
            pass: 3,
            modules: 12,
            built: 2,
            errors: 0,
            elapsed: Duration::from_millis(41),
        };
        assert_eq!(pass_summary(&stats), "pass 3: 12 modules (2 rebuilt) in 41ms");
    }
}
