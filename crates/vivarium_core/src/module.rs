//! Module contract.
//!
//! Every pluggable unit of the evolutionary loop (evaluators, selectors,
//! placement strategies, analyzers) carries a [`ModuleInfo`]: its identity,
//! the capabilities it declares, the populations it needs, its trait
//! declarations, and any configuration errors accumulated along the way.
//! Capabilities are data; the orchestrator dispatches through the matching
//! capability trait for each role a module declares.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vivarium_data::{Collection, Population, TraitValue, TypeTag};

use crate::trait_registry::{TraitRegistry, TraitSpec};

/// What part of the evolutionary loop a module implements. A module may
/// declare several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleRole {
    Evaluate,
    Select,
    Placement,
    Analyze,
}

/// A module's preference for how reproduction is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplicationTiming {
    #[default]
    NoPreference,
    RequireAsync,
    DefaultAsync,
    DefaultSync,
    RequireSync,
}

/// Identity and declared requirements of one module.
///
/// Constructed empty; traits are registered during the module's own setup
/// phase and populations are attached by the owning coordinator. Other
/// modules never touch this object: cross-module trait access goes through
/// the shared organism trait stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleInfo {
    name: String,
    roles: BTreeSet<ModuleRole>,
    timing: ReplicationTiming,
    required_pops: usize,
    pops: Vec<Uuid>,
    registry: TraitRegistry,
    errors: Vec<String>,
}

impl ModuleInfo {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enable_role(&mut self, role: ModuleRole) -> &mut Self {
        self.roles.insert(role);
        self
    }

    #[must_use]
    pub fn has_role(&self, role: ModuleRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = ModuleRole> + '_ {
        self.roles.iter().copied()
    }

    #[must_use]
    pub fn timing(&self) -> ReplicationTiming {
        self.timing
    }

    pub fn require_async(&mut self) -> &mut Self {
        self.timing = ReplicationTiming::RequireAsync;
        self
    }

    pub fn default_async(&mut self) -> &mut Self {
        self.timing = ReplicationTiming::DefaultAsync;
        self
    }

    pub fn default_sync(&mut self) -> &mut Self {
        self.timing = ReplicationTiming::DefaultSync;
        self
    }

    pub fn require_sync(&mut self) -> &mut Self {
        self.timing = ReplicationTiming::RequireSync;
        self
    }

    #[must_use]
    pub fn required_pops(&self) -> usize {
        self.required_pops
    }

    pub fn set_required_pops(&mut self, count: usize) -> &mut Self {
        self.required_pops = count;
        self
    }

    /// Attaches a population this module operates on. The coordinator
    /// checks the count against `required_pops` before the run starts.
    pub fn attach_population(&mut self, id: Uuid) -> &mut Self {
        self.pops.push(id);
        self
    }

    #[must_use]
    pub fn populations(&self) -> &[Uuid] {
        &self.pops
    }

    #[must_use]
    pub fn registry(&self) -> &TraitRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TraitRegistry {
        &mut self.registry
    }

    /// Records a configuration error against this module. The run keeps
    /// going; the orchestrator inspects accumulated errors before launch.
    pub fn record_error(&mut self, message: String) {
        tracing::warn!(module = %self.name, error = %message, "Module configuration error");
        self.errors.push(message);
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    // --- trait declaration wrappers ---
    //
    // Duplicate names land in the error list and the first declaration
    // stays in force; the returned handle always refers to the registered
    // spec so fluent chains keep working either way.

    pub fn add_owned_trait(&mut self, name: &str, desc: &str, default: TraitValue) -> &mut TraitSpec {
        if let Err(err) = self.registry.register_owned(name, desc, default) {
            let module = self.name.clone();
            self.record_error(format!("Module '{module}': {err}"));
        }
        self.spec_handle(name)
    }

    pub fn add_private_trait(
        &mut self,
        name: &str,
        desc: &str,
        default: TraitValue,
    ) -> &mut TraitSpec {
        if let Err(err) = self.registry.register_private(name, desc, default) {
            let module = self.name.clone();
            self.record_error(format!("Module '{module}': {err}"));
        }
        self.spec_handle(name)
    }

    pub fn add_shared_trait(&mut self, name: &str, desc: &str, tag: TypeTag) -> &mut TraitSpec {
        if let Err(err) = self.registry.register_shared(name, desc, tag) {
            let module = self.name.clone();
            self.record_error(format!("Module '{module}': {err}"));
        }
        self.spec_handle(name)
    }

    pub fn add_required_trait(&mut self, name: &str, desc: &str, tag: TypeTag) -> &mut TraitSpec {
        if let Err(err) = self.registry.register_required(name, desc, tag) {
            let module = self.name.clone();
            self.record_error(format!("Module '{module}': {err}"));
        }
        self.spec_handle(name)
    }

    fn spec_handle(&mut self, name: &str) -> &mut TraitSpec {
        self.registry
            .get_mut(name)
            .expect("trait present after registration attempt")
    }
}

/// Base contract every module implements.
pub trait Module {
    fn info(&self) -> &ModuleInfo;
    fn info_mut(&mut self) -> &mut ModuleInfo;

    /// Called once, before any simulation update, while the module may
    /// still mutate its own registry.
    fn setup(&mut self) {}

    /// Called every simulation update.
    fn update(&mut self, _update: u64) {}
}

/// Scores organisms. Declared via [`ModuleRole::Evaluate`].
pub trait Evaluate: Module {
    fn evaluate(&mut self, pop: &mut Population);
}

/// Chooses which organisms reproduce. Declared via [`ModuleRole::Select`].
pub trait Select: Module {
    fn select(&mut self, pop: &Population) -> Collection;
}

/// Decides where offspring land. Declared via [`ModuleRole::Placement`].
pub trait Placement: Module {
    fn place_offspring(&mut self, pop: &mut Population, parent: usize) -> Option<usize>;
}

/// Observes and records without steering evolution. Declared via
/// [`ModuleRole::Analyze`].
pub trait Analyze: Module {
    fn analyze(&mut self, pop: &Population);
}
