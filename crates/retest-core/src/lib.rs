#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::struct_excessive_bools)]

pub mod config;
pub mod error;
pub mod graph;
pub mod paths;
pub mod pipeline;
pub mod select;
pub mod version;

pub use config::{ProjectConfig, Settings, WorkerSpec};
pub use error::Error;
pub use graph::{DepGraph, GraphModule, ModuleId};
pub use pipeline::{Compilation, CompileError, PassStats, Pipeline};
pub use select::{AffectedTestSelector, PendingSet, DEFAULT_TEST_PATTERN};
pub use version::VERSION;
