//! Compilation pipeline.
//!
//! One [`Pipeline`] owns the incremental state carried between passes (the
//! content fingerprints); each [`run_pass`](Pipeline::run_pass) expands the
//! entry globs, loads the reachable modules, and produces a [`Compilation`]
//! with the dependency graph, per-module built flags, compile errors,
//! artifacts, and pass stats.
//!
//! The pipeline resolves relative specifiers only; bare (package) specifiers
//! are treated as external and never traversed.

pub mod scan;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::graph::{DepGraph, ModuleId};
use crate::paths;
use scan::scan_specifiers;

/// A problem found while loading the module graph. The pass keeps going after
/// recording one; the compilation just finishes with errors.
#[derive(Debug, Clone)]
pub struct CompileError {
    /// Offending module, relative to the project root (absent for entry-glob
    /// level problems).
    pub file: Option<PathBuf>,
    /// 1-indexed line when known.
    pub line: Option<u32>,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                write!(f, "{}:{line}: {}", paths::to_forward_slashes(file), self.message)
            }
            (Some(file), None) => {
                write!(f, "{}: {}", paths::to_forward_slashes(file), self.message)
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone)]
pub struct PassStats {
    /// 1-based pass number within this process.
    pub pass: u64,
    /// Modules in the graph.
    pub modules: usize,
    /// Modules whose content changed since the previous pass.
    pub built: usize,
    /// Compile errors recorded.
    pub errors: usize,
    /// Wall time for the pass.
    pub elapsed: Duration,
}

/// The output of one pass.
#[derive(Debug)]
pub struct Compilation {
    graph: DepGraph,
    errors: Vec<CompileError>,
    artifacts: Vec<PathBuf>,
    stats: PassStats,
}

impl Compilation {
    /// True when any compile error was recorded this pass.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The module graph for this pass.
    #[must_use]
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    /// Compile errors in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    /// Entry files handed to the test worker as launch parameters.
    #[must_use]
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Counters for this pass.
    #[must_use]
    pub fn stats(&self) -> &PassStats {
        &self.stats
    }
}

/// Incremental module loader producing one [`Compilation`] per pass.
#[derive(Debug)]
pub struct Pipeline {
    root: PathBuf,
    entries: Vec<String>,
    /// resource -> content digest from the previous pass.
    fingerprints: HashMap<String, String>,
    pass_count: u64,
}

impl Pipeline {
    /// Create a pipeline rooted at `root` with entry glob patterns relative
    /// to it.
    pub fn new(root: impl Into<PathBuf>, entries: Vec<String>) -> Self {
        Self {
            root: root.into(),
            entries,
            fingerprints: HashMap::new(),
            pass_count: 0,
        }
    }

    /// Number of completed passes.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.pass_count
    }

    /// Run one pass: expand entries, load every reachable module, and diff
    /// content fingerprints against the previous pass.
    ///
    /// # Errors
    /// Returns an error for malformed entry globs. Unreadable or unresolvable
    /// modules are compile errors inside the returned [`Compilation`], not
    /// `Err`.
    pub fn run_pass(&mut self) -> Result<Compilation, Error> {
        let started = Instant::now();
        self.pass_count += 1;

        let mut errors = Vec::new();
        let entry_paths = self.expand_entries(&mut errors)?;

        let mut graph = DepGraph::new();
        let mut ids_by_path: HashMap<PathBuf, ModuleId> = HashMap::new();
        let mut sources: Vec<String> = Vec::new();
        let mut fresh: HashMap<String, String> = HashMap::new();

        for path in &entry_paths {
            self.load_module(
                path,
                &mut graph,
                &mut ids_by_path,
                &mut sources,
                &mut fresh,
                &mut errors,
            );
        }

        // Scan newly loaded modules for imports; resolution appends more
        // modules behind the cursor.
        let mut cursor = 0;
        while cursor < sources.len() {
            let importer = cursor;
            cursor += 1;

            let specs = scan_specifiers(&sources[importer]);
            let importer_path = PathBuf::from(
                graph
                    .module(importer)
                    .map(|m| m.resource().to_owned())
                    .unwrap_or_default(),
            );
            let importer_dir = importer_path
                .parent()
                .map_or_else(|| self.root.clone(), Path::to_path_buf);

            for spec in specs {
                if !is_relative_specifier(&spec.specifier) {
                    continue;
                }

                match resolve_relative(&importer_dir, &spec.specifier) {
                    Some(target) => {
                        if let Some(target_id) = self.load_module(
                            &target,
                            &mut graph,
                            &mut ids_by_path,
                            &mut sources,
                            &mut fresh,
                            &mut errors,
                        ) {
                            graph.add_dependent(target_id, importer);
                        }
                    }
                    None => errors.push(CompileError {
                        file: Some(paths::relative_to(&self.root, &importer_path)),
                        line: Some(spec.line),
                        message: format!("cannot resolve '{}'", spec.specifier),
                    }),
                }
            }
        }

        self.fingerprints = fresh;

        let built = graph.modules().filter(|(_, m)| m.built()).count();
        let stats = PassStats {
            pass: self.pass_count,
            modules: graph.len(),
            built,
            errors: errors.len(),
            elapsed: started.elapsed(),
        };

        Ok(Compilation {
            graph,
            errors,
            artifacts: js_artifacts(&entry_paths),
            stats,
        })
    }

    /// Read, fingerprint, and add one module. Returns its id, or `None` when
    /// the file could not be read (recorded as a compile error).
    fn load_module(
        &self,
        path: &Path,
        graph: &mut DepGraph,
        ids_by_path: &mut HashMap<PathBuf, ModuleId>,
        sources: &mut Vec<String>,
        fresh: &mut HashMap<String, String>,
        errors: &mut Vec<CompileError>,
    ) -> Option<ModuleId> {
        if let Some(&id) = ids_by_path.get(path) {
            return Some(id);
        }

        let source = match retest_util::fs::read_to_string_lossy(path) {
            Ok(source) => source,
            Err(err) => {
                errors.push(CompileError {
                    file: Some(paths::relative_to(&self.root, path)),
                    line: None,
                    message: format!("cannot read module: {err}"),
                });
                return None;
            }
        };

        let digest = retest_util::hash::blake3_hex(source.as_bytes());
        let resource = path.to_string_lossy().into_owned();
        let built = self.fingerprints.get(&resource) != Some(&digest);
        fresh.insert(resource.clone(), digest);

        let id = graph.add_module(resource, built);
        ids_by_path.insert(path.to_path_buf(), id);
        sources.push(source);
        Some(id)
    }

    /// Expand the entry globs against the root. A pattern matching no file is
    /// a compile error; a pattern that does not parse is a hard error.
    fn expand_entries(&self, errors: &mut Vec<CompileError>) -> Result<Vec<PathBuf>, Error> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();

        for pattern in &self.entries {
            let rooted = self.root.join(pattern);
            let walker =
                glob::glob(&rooted.to_string_lossy()).map_err(|source| Error::EntryGlob {
                    pattern: pattern.clone(),
                    source,
                })?;

            let mut matched = false;
            for entry in walker {
                match entry {
                    Ok(path) if path.is_file() => {
                        matched = true;
                        if let Ok(canonical) = dunce::canonicalize(&path) {
                            if seen.insert(canonical.clone()) {
                                found.push(canonical);
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(err) => errors.push(CompileError {
                        file: None,
                        line: None,
                        message: format!("entry glob `{pattern}`: {err}"),
                    }),
                }
            }

            if !matched {
                errors.push(CompileError {
                    file: None,
                    line: None,
                    message: format!("entry glob `{pattern}` matched no files"),
                });
            }
        }

        Ok(found)
    }
}

fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// Resolve a relative specifier against the importer's directory. Candidate
/// order: exact path, with `.js` appended, `index.js` inside.
fn resolve_relative(importer_dir: &Path, specifier: &str) -> Option<PathBuf> {
    let joined = importer_dir.join(specifier);
    let candidates = [
        joined.clone(),
        append_extension(&joined, ".js"),
        joined.join("index.js"),
    ];

    candidates
        .iter()
        .filter_map(|candidate| dunce::canonicalize(candidate).ok())
        .find(|path| path.is_file())
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut joined = path.as_os_str().to_os_string();
    joined.push(ext);
    PathBuf::from(joined)
}

/// Launch-parameter artifacts: the entry files that are JavaScript.
fn js_artifacts(entries: &[PathBuf]) -> Vec<PathBuf> {
    entries
        .iter()
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("js" | "mjs" | "cjs")
            )
        })
        .cloned()
        .collect()
}
