//! Affected-test selection.
//!
//! After each pass, selection walks the reverse ("is required by") edges from
//! every freshly built module and collects every test module reachable that
//! way into a [`PendingSet`]. The set persists across passes until the caller
//! clears it, so tests discovered during a pass whose run was skipped are
//! still reported by the next pass. Ids are pass-local: the set stores
//! resources and translates them back to ids against each pass's graph.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex_lite::Regex;

use crate::error::Error;
use crate::graph::{DepGraph, ModuleId};
use crate::paths;

/// Default pattern identifying test modules by their root-relative path.
pub const DEFAULT_TEST_PATTERN: &str = "(?i)test";

/// Cross-pass accumulator of test resources known to be affected but not yet run.
///
/// Preserves insertion order. Entries stay until [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct PendingSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl PendingSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Returns false if it was already pending.
    pub fn add(&mut self, resource: &str) -> bool {
        if !self.seen.insert(resource.to_owned()) {
            return false;
        }
        self.ordered.push(resource.to_owned());
        true
    }

    /// Snapshot of the pending resources in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> &[String] {
        &self.ordered
    }

    /// Drop every pending resource.
    pub fn clear(&mut self) {
        self.ordered.clear();
        self.seen.clear();
    }

    /// Number of pending resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Finds the test modules affected by the modules rebuilt in a pass.
#[derive(Debug)]
pub struct AffectedTestSelector {
    root: PathBuf,
    pattern: Regex,
    pending: PendingSet,
}

impl AffectedTestSelector {
    /// Create a selector matching test paths with `pattern` (or the default
    /// case-insensitive `test` when `None`) relative to `root`.
    ///
    /// # Errors
    /// Returns [`Error::TestPattern`] when the pattern does not compile.
    pub fn new(root: impl Into<PathBuf>, pattern: Option<&str>) -> Result<Self, Error> {
        let raw = pattern.unwrap_or(DEFAULT_TEST_PATTERN);
        let pattern = Regex::new(raw).map_err(|source| Error::TestPattern {
            pattern: raw.to_owned(),
            source,
        })?;

        Ok(Self {
            root: root.into(),
            pattern,
            pending: PendingSet::new(),
        })
    }

    /// Select the ids of every pending test module, growing the pending set
    /// with the test modules reachable from this pass's built modules first.
    ///
    /// Resources left over from earlier passes that no longer resolve to a
    /// module in `graph` are dropped from the result (but stay pending).
    /// Returned ids are in pending-set insertion order.
    pub fn select(&mut self, graph: &DepGraph) -> Vec<ModuleId> {
        // Ids are pass-local, so the translation map is rebuilt every call.
        let ids_by_resource: HashMap<&str, ModuleId> =
            graph.modules().map(|(id, m)| (m.resource(), id)).collect();

        // One visited set for the whole call keeps diamond graphs linear and
        // cyclic graphs terminating.
        let mut visited: HashSet<ModuleId> = HashSet::new();

        for (id, module) in graph.modules() {
            if module.built() {
                self.traverse(graph, id, &mut visited);
            }
        }

        self.pending
            .snapshot()
            .iter()
            .filter_map(|resource| ids_by_resource.get(resource.as_str()).copied())
            .collect()
    }

    /// Walk the "is required by" edges from `start`, queueing every test
    /// module found along the way.
    fn traverse(&mut self, graph: &DepGraph, start: ModuleId, visited: &mut HashSet<ModuleId>) {
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            let Some(module) = graph.module(id) else {
                continue;
            };

            if self.is_test_path(module.resource()) {
                self.pending.add(module.resource());
            }

            // Reversed push keeps discovery in dependent declaration order.
            stack.extend(module.dependents().iter().rev().copied());
        }
    }

    fn is_test_path(&self, resource: &str) -> bool {
        let relative = paths::relative_to(&self.root, Path::new(resource));
        self.pattern.is_match(&paths::to_forward_slashes(&relative))
    }

    /// Drop everything pending. Called once a run has started covering the
    /// set, or once a pass decided to skip.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// The pending accumulator (read access for reporting).
    #[must_use]
    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> AffectedTestSelector {
        AffectedTestSelector::new("/proj", None).unwrap()
    }

    /// Two independent source files, each required by its own test file.
    fn two_pair_graph(repeat_built: bool, left_built: bool) -> DepGraph {
        let mut graph = DepGraph::new();
        let repeat = graph.add_module("/proj/src/repeatString.js", repeat_built);
        let repeat_test = graph.add_module("/proj/src/repeatString.test.js", false);
        let left = graph.add_module("/proj/src/leftPad.js", left_built);
        let left_test = graph.add_module("/proj/src/leftPad.test.js", false);
        graph.add_dependent(repeat, repeat_test);
        graph.add_dependent(left, left_test);
        graph
    }

    #[test]
    fn test_pending_set_keeps_insertion_order() {
        let mut pending = PendingSet::new();
        assert!(pending.add("/p/b.test.js"));
        assert!(pending.add("/p/a.test.js"));
        assert!(!pending.add("/p/b.test.js"));

        assert_eq!(pending.snapshot(), ["/p/b.test.js", "/p/a.test.js"]);
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_pending_set_clear() {
        let mut pending = PendingSet::new();
        pending.add("/p/a.test.js");
        pending.clear();

        assert!(pending.is_empty());
        // A cleared resource can be re-added
        assert!(pending.add("/p/a.test.js"));
    }

    #[test]
    fn test_selects_test_dependents_of_built_modules() {
        let graph = two_pair_graph(true, true);
        let mut selector = selector();

        let ids = selector.select(&graph);

        assert_eq!(ids, vec![1, 3]);
        assert_eq!(
            selector.pending().snapshot(),
            ["/proj/src/repeatString.test.js", "/proj/src/leftPad.test.js"]
        );
    }

    #[test]
    fn test_selects_only_tests_of_rebuilt_module() {
        // leftPad.js untouched this pass
        let graph = two_pair_graph(true, false);
        let mut selector = selector();

        let ids = selector.select(&graph);

        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_multi_level_discovery_order() {
        // leftPad.js requires repeatString.js; each has its own test file.
        // Rebuilding repeatString.js reaches leftPad's test first because the
        // walk descends through leftPad.js before repeatString's own test.
        let mut graph = DepGraph::new();
        let repeat = graph.add_module("/proj/src/repeatString.js", true);
        let left = graph.add_module("/proj/src/leftPad.js", false);
        let left_test = graph.add_module("/proj/src/leftPad.test.js", false);
        let repeat_test = graph.add_module("/proj/src/repeatString.test.js", false);
        graph.add_dependent(repeat, left);
        graph.add_dependent(repeat, repeat_test);
        graph.add_dependent(left, left_test);

        let ids = selector().select(&graph);

        assert_eq!(ids, vec![left_test, repeat_test]);
    }

    #[test]
    fn test_cyclic_dependents_terminate() {
        let mut graph = DepGraph::new();
        let a = graph.add_module("/proj/src/a.js", true);
        let b = graph.add_module("/proj/src/b.test.js", false);
        graph.add_dependent(a, b);
        graph.add_dependent(b, a);

        let ids = selector().select(&graph);

        assert_eq!(ids, vec![b]);
    }

    #[test]
    fn test_self_cycle_terminates() {
        let mut graph = DepGraph::new();
        let a = graph.add_module("/proj/src/a.test.js", true);
        graph.add_dependent(a, a);

        let ids = selector().select(&graph);

        assert_eq!(ids, vec![a]);
    }

    #[test]
    fn test_built_test_module_selects_itself() {
        let mut graph = DepGraph::new();
        let t = graph.add_module("/proj/src/util.test.js", true);

        let ids = selector().select(&graph);

        assert_eq!(ids, vec![t]);
    }

    #[test]
    fn test_diamond_reaches_all_parents_once() {
        // a is required by b and c; b is also required by d.test.js
        let mut graph = DepGraph::new();
        let a = graph.add_module("/proj/src/a.js", true);
        let b = graph.add_module("/proj/src/b.js", false);
        let c = graph.add_module("/proj/src/c.test.js", false);
        let d = graph.add_module("/proj/src/d.test.js", false);
        graph.add_dependent(a, b);
        graph.add_dependent(a, c);
        graph.add_dependent(b, d);

        let ids = selector().select(&graph);

        assert_eq!(ids, vec![d, c]);
    }

    #[test]
    fn test_selection_grows_until_cleared() {
        let mut selector = selector();

        let first = selector.select(&two_pair_graph(true, false));
        assert_eq!(first, vec![1]);

        // Next pass rebuilds the other pair; the uncleared set still carries
        // the first pass's find.
        let second = selector.select(&two_pair_graph(false, true));
        assert_eq!(second, vec![1, 3]);

        selector.clear();
        let third = selector.select(&two_pair_graph(false, false));
        assert!(third.is_empty());
    }

    #[test]
    fn test_repeated_select_without_changes_is_superset() {
        let graph = two_pair_graph(true, true);
        let mut selector = selector();

        let first = selector.select(&graph);
        let second = selector.select(&graph);

        assert_eq!(first, second);
    }

    #[test]
    fn test_ids_reresolved_per_pass() {
        let mut selector = selector();

        let mut pass1 = DepGraph::new();
        let src1 = pass1.add_module("/proj/src/a.js", true);
        let test1 = pass1.add_module("/proj/src/a.test.js", false);
        pass1.add_dependent(src1, test1);
        assert_eq!(selector.select(&pass1), vec![test1]);

        // Same resources, different id layout: a new module shifts every id.
        let mut pass2 = DepGraph::new();
        pass2.add_module("/proj/src/zero.js", false);
        let src2 = pass2.add_module("/proj/src/a.js", false);
        let test2 = pass2.add_module("/proj/src/a.test.js", false);
        pass2.add_dependent(src2, test2);

        assert_eq!(selector.select(&pass2), vec![test2]);
        assert_ne!(test1, test2);
    }

    #[test]
    fn test_removed_resource_dropped_from_result() {
        let mut selector = selector();

        let mut pass1 = DepGraph::new();
        let src = pass1.add_module("/proj/src/a.js", true);
        let test = pass1.add_module("/proj/src/a.test.js", false);
        pass1.add_dependent(src, test);
        assert_eq!(selector.select(&pass1), vec![test]);

        // The test file is gone in the next pass; its resource stays pending
        // but yields no id.
        let mut pass2 = DepGraph::new();
        pass2.add_module("/proj/src/a.js", false);

        assert!(selector.select(&pass2).is_empty());
        assert_eq!(selector.pending().len(), 1);
    }

    #[test]
    fn test_no_built_modules_returns_stale_pending() {
        let mut selector = selector();
        selector.select(&two_pair_graph(true, false));

        // Nothing rebuilt, nothing cleared: the stale entry is still returned.
        let ids = selector.select(&two_pair_graph(false, false));
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_default_pattern_is_case_insensitive() {
        let mut graph = DepGraph::new();
        let src = graph.add_module("/proj/src/math.js", true);
        let test = graph.add_module("/proj/src/MathTest.js", false);
        graph.add_dependent(src, test);

        let ids = selector().select(&graph);

        assert_eq!(ids, vec![test]);
    }

    #[test]
    fn test_pattern_applies_to_relative_path() {
        // The root directory name must not make everything a test module.
        let mut graph = DepGraph::new();
        graph.add_module("/home/tester/proj/src/app.js", true);

        let mut selector = AffectedTestSelector::new("/home/tester/proj", None).unwrap();
        assert!(selector.select(&graph).is_empty());
    }

    #[test]
    fn test_custom_pattern() {
        let mut graph = DepGraph::new();
        let src = graph.add_module("/proj/src/a.js", true);
        let spec = graph.add_module("/proj/src/a.spec.js", false);
        let test = graph.add_module("/proj/src/a.test.js", false);
        graph.add_dependent(src, spec);
        graph.add_dependent(src, test);

        let mut selector = AffectedTestSelector::new("/proj", Some(r"\.spec\.js$")).unwrap();
        let ids = selector.select(&graph);

        assert_eq!(ids, vec![spec]);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let result = AffectedTestSelector::new("/proj", Some("("));
        assert!(matches!(result, Err(Error::TestPattern { .. })));
    }

    #[test]
    fn test_empty_graph() {
        assert!(selector().select(&DepGraph::new()).is_empty());
    }
}
