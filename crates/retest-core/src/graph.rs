//! Per-pass module dependency graph view.
//!
//! One pass of the pipeline produces one [`DepGraph`]. Resources (absolute
//! module paths) are stable across passes; module ids are assigned in
//! discovery order and are only meaningful within the pass that produced
//! them, so anything persisted across passes must be keyed by resource and
//! re-resolved to an id each pass.

/// Pass-local identifier for a module in the graph.
pub type ModuleId = usize;

/// One source unit in a compilation pass.
#[derive(Debug, Clone)]
pub struct GraphModule {
    resource: String,
    built: bool,
    dependents: Vec<ModuleId>,
}

impl GraphModule {
    /// Stable path/identity of this module.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// True when this module was (re)compiled in the current pass rather than
    /// reused unchanged.
    #[must_use]
    pub fn built(&self) -> bool {
        self.built
    }

    /// Modules that directly require this one, in discovery order.
    #[must_use]
    pub fn dependents(&self) -> &[ModuleId] {
        &self.dependents
    }
}

/// Read-only view over the modules of one compilation pass.
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    modules: Vec<GraphModule>,
}

impl DepGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, returning its pass-local id.
    pub fn add_module(&mut self, resource: impl Into<String>, built: bool) -> ModuleId {
        let id = self.modules.len();
        self.modules.push(GraphModule {
            resource: resource.into(),
            built,
            dependents: Vec::new(),
        });
        id
    }

    /// Record the reverse edge "`target` is required by `dependent`".
    ///
    /// # Panics
    /// Panics if `target` was not returned by [`add_module`](Self::add_module)
    /// on this graph.
    pub fn add_dependent(&mut self, target: ModuleId, dependent: ModuleId) {
        self.modules[target].dependents.push(dependent);
    }

    /// Get a module by id.
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&GraphModule> {
        self.modules.get(id)
    }

    /// Iterate over all modules with their ids, in id order.
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &GraphModule)> {
        self.modules.iter().enumerate()
    }

    /// Number of modules in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
