//! Project configuration and runtime settings.
//!
//! Projects declare entries and the worker command in `retest.config.json`:
//!
//! ```json
//! {
//!   "entries": ["src/**/*.test.js"],
//!   "testPattern": "\\.test\\.js$",
//!   "worker": { "program": "node", "args": ["runner.js"] },
//!   "execArgv": ["--enable-source-maps"]
//! }
//! ```
//!
//! [`Settings`] carries the per-invocation options assembled by the CLI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "retest.config.json";

/// Command used to launch the test worker process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkerSpec {
    /// Executable to spawn.
    #[serde(default = "default_worker_program")]
    pub program: String,

    /// Arguments placed before the launch parameters.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_worker_program() -> String {
    "node".to_owned()
}

impl Default for WorkerSpec {
    fn default() -> Self {
        Self {
            program: default_worker_program(),
            args: Vec::new(),
        }
    }
}

/// Contents of `retest.config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    /// Entry glob patterns, relative to the project root.
    pub entries: Vec<String>,

    /// Regex deciding which module paths are test files. Defaults to a
    /// case-insensitive `test` substring match.
    #[serde(default)]
    pub test_pattern: Option<String>,

    /// Worker launch command.
    #[serde(default)]
    pub worker: WorkerSpec,

    /// Extra runtime arguments forwarded to the worker alongside the tests.
    #[serde(default)]
    pub exec_argv: Vec<String>,
}

impl ProjectConfig {
    /// Load and parse a config file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&source).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Per-invocation runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Project root directory.
    pub cwd: PathBuf,

    /// Config file path as given (relative paths resolve against `cwd`).
    pub config_path: PathBuf,

    /// Keep watching and re-running after the first pass.
    pub watch: bool,

    /// Print the worker command instead of spawning it.
    pub manual: bool,

    /// Suppress per-run reporting.
    pub silent: bool,

    /// Print pass stats after each compile.
    pub stats: bool,

    /// Clear the terminal before interactive re-runs.
    pub clear_screen: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Whether to emit JSON logs.
    pub json_logs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            watch: false,
            manual: false,
            silent: false,
            stats: true,
            clear_screen: true,
            verbosity: 0,
            json_logs: false,
        }
    }
}

impl Settings {
    /// Create settings with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set the config file path.
    #[must_use]
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = path;
        self
    }

    /// Set watch mode.
    #[must_use]
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Set manual mode.
    #[must_use]
    pub fn with_manual(mut self, manual: bool) -> Self {
        self.manual = manual;
        self
    }

    /// Set silent mode.
    #[must_use]
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Set stats reporting.
    #[must_use]
    pub fn with_stats(mut self, stats: bool) -> Self {
        self.stats = stats;
        self
    }

    /// Set screen clearing.
    #[must_use]
    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// The config path resolved against `cwd`.
    #[must_use]
    pub fn resolved_config_path(&self) -> PathBuf {
        if self.config_path.is_absolute() {
            self.config_path.clone()
        } else {
            self.cwd.join(&self.config_path)
        }
    }
}
