#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]

mod logging;
mod report;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use retest_core::config::DEFAULT_CONFIG_FILE;
use retest_core::{ProjectConfig, Settings};
use std::path::PathBuf;
use tokio::sync::mpsc;

use report::Reporter;

#[derive(Parser, Debug)]
#[command(name = "retest")]
#[command(author, version, about = "Runs the tests affected by each rebuild", long_about = None)]
struct Cli {
    /// Project config file (relative paths resolve against --cwd)
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Keep watching and re-running tests as files change
    #[arg(short, long)]
    watch: bool,

    /// Print the command to run the tests instead of spawning a worker
    #[arg(long)]
    manual: bool,

    /// Suppress reporting; compile errors and failures still print
    #[arg(short, long)]
    silent: bool,

    /// Skip the pass summary after each compile
    #[arg(long)]
    no_stats: bool,

    /// Never clear the screen between watch passes
    #[arg(long)]
    no_clear: bool,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit JSON formatted logs on stderr
    #[arg(long)]
    json: bool,

    /// Override the working directory
    #[arg(long, value_name = "PATH")]
    cwd: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine the project root
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

    let settings = Settings::new(cwd)
        .with_config_path(cli.config)
        .with_watch(cli.watch)
        .with_manual(cli.manual)
        .with_silent(cli.silent)
        .with_stats(!cli.no_stats)
        .with_clear_screen(!cli.no_clear)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(settings.verbosity, settings.json_logs);
    tracing::debug!(
        version = retest_core::VERSION,
        cwd = %settings.cwd.display(),
        config = %settings.config_path.display(),
        watch = settings.watch,
        "settings resolved"
    );

    let config = ProjectConfig::load(&settings.resolved_config_path()).into_diagnostic()?;
    let reporter = Reporter::new(&settings);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let code = runtime.block_on(async {
        let (events, rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(reporter.drive(rx));

        let result = if settings.watch {
            retest_runner::run_watch(&settings, &config, events).await
        } else {
            retest_runner::run_once(&settings, &config, events).await
        };

        // The runner dropped its sender; let the reporter drain the queue.
        let _ = printer.await;
        result
    });

    match code.into_diagnostic()? {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}
