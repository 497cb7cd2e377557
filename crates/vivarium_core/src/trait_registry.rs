//! Per-module trait declarations.
//!
//! Each simulation module declares the organism traits it works with during
//! its own setup phase: what kind of value the trait holds, who may read or
//! write it, how it is re-initialized at birth, and whether old values are
//! archived. Declarations are data; the merge across modules happens later,
//! when registries are applied to a population layout.

use serde::{Deserialize, Serialize};
use vivarium_data::{TraitLayout, TraitValue, TypeTag};

use crate::error::{QueryError, Result};

/// Who may read or write a declared trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitAccess {
    /// This module reads and writes; other modules may only read.
    Owned,
    /// Any module may read or write; at least one must supply a default.
    Shared,
    /// This module only reads; some other module must write.
    Required,
    /// Only this module may read or write.
    Private,
}

/// How a trait is initialized in a newly-born organism. Injected organisms
/// always take the default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TraitInit {
    /// Reset to the declared default value.
    #[default]
    Default,
    /// Copied from the first parent.
    Parent,
    /// Average across all parents (numeric only).
    Average,
    /// Lowest across all parents (numeric only).
    Minimum,
    /// Highest across all parents (numeric only).
    Maximum,
}

/// Which old values are kept as the trait is reset over a lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TraitArchive {
    #[default]
    None,
    /// Keep the pre-reset value in `last_<name>`.
    LastReset,
    /// Append every pre-reset value to `archive_<name>`.
    AllResets,
    /// Record every mutation. Reserved: writes cannot currently be
    /// intercepted, so declaring this is accepted but behaves as AllResets.
    AllChanges,
}

/// One declared trait: identity, value kind, and the policies that govern
/// it. Handles returned by the registry expose fluent mutators so setup
/// code reads as a chain of intents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSpec {
    name: String,
    desc: String,
    tag: TypeTag,
    access: TraitAccess,
    init: TraitInit,
    reset_parent: bool,
    archive: TraitArchive,
    default: Option<TraitValue>,
}

impl TraitSpec {
    fn new(name: &str, desc: &str, tag: TypeTag, access: TraitAccess) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
            tag,
            access,
            init: TraitInit::Default,
            reset_parent: false,
            archive: TraitArchive::None,
            default: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.desc
    }

    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    #[must_use]
    pub fn access(&self) -> TraitAccess {
        self.access
    }

    #[must_use]
    pub fn init(&self) -> TraitInit {
        self.init
    }

    #[must_use]
    pub fn resets_parent(&self) -> bool {
        self.reset_parent
    }

    #[must_use]
    pub fn archive(&self) -> TraitArchive {
        self.archive
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&TraitValue> {
        self.default.as_ref()
    }

    /// Name of the derived trait holding the most recent pre-reset value.
    #[must_use]
    pub fn last_name(&self) -> String {
        format!("last_{}", self.name)
    }

    /// Name of the derived trait holding the ordered record of pre-reset
    /// values.
    #[must_use]
    pub fn archive_name(&self) -> String {
        format!("archive_{}", self.name)
    }

    /// Inherit the first parent's value at birth.
    pub fn inherit_parent(&mut self) -> &mut Self {
        self.init = TraitInit::Parent;
        self
    }

    /// Inherit the average across parents at birth.
    pub fn inherit_average(&mut self) -> &mut Self {
        self.init = TraitInit::Average;
        self
    }

    /// Inherit the minimum across parents at birth.
    pub fn inherit_minimum(&mut self) -> &mut Self {
        self.init = TraitInit::Minimum;
        self
    }

    /// Inherit the maximum across parents at birth.
    pub fn inherit_maximum(&mut self) -> &mut Self {
        self.init = TraitInit::Maximum;
        self
    }

    /// Also reset the parents to the computed child value at reproduction.
    pub fn reset_parent(&mut self) -> &mut Self {
        self.reset_parent = true;
        self
    }

    /// Keep the pre-reset value in `last_<name>`.
    pub fn archive_last(&mut self) -> &mut Self {
        self.archive = TraitArchive::LastReset;
        self
    }

    /// Append every pre-reset value to `archive_<name>`.
    pub fn archive_all(&mut self) -> &mut Self {
        self.archive = TraitArchive::AllResets;
        self
    }

    /// Supplies (or replaces) the default value. The declared kind follows
    /// the new default so setup code cannot desynchronize them.
    pub fn set_default(&mut self, value: TraitValue) -> &mut Self {
        self.tag = value.type_tag();
        self.default = Some(value);
        self
    }
}

/// The trait declarations of one module. Names are unique within a
/// registry; a duplicate registration is a configuration error reported to
/// the caller, and the first registration is retained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraitRegistry {
    specs: Vec<TraitSpec>,
}

impl TraitRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a trait with an explicit access mode. On a duplicate name
    /// the error carries the name and the existing declaration wins.
    pub fn register(
        &mut self,
        access: TraitAccess,
        name: &str,
        desc: &str,
        tag: TypeTag,
        default: Option<TraitValue>,
    ) -> Result<&mut TraitSpec> {
        if self.specs.iter().any(|s| s.name == name) {
            return Err(QueryError::DuplicateTrait(name.to_string()));
        }
        let mut spec = TraitSpec::new(name, desc, tag, access);
        if let Some(value) = default {
            spec.set_default(value);
        }
        self.specs.push(spec);
        Ok(self.specs.last_mut().expect("just pushed"))
    }

    /// This module reads and writes; others may only read. A starting
    /// default is mandatory.
    pub fn register_owned(
        &mut self,
        name: &str,
        desc: &str,
        default: TraitValue,
    ) -> Result<&mut TraitSpec> {
        let tag = default.type_tag();
        self.register(TraitAccess::Owned, name, desc, tag, Some(default))
    }

    /// Only this module touches the trait. A starting default is mandatory.
    pub fn register_private(
        &mut self,
        name: &str,
        desc: &str,
        default: TraitValue,
    ) -> Result<&mut TraitSpec> {
        let tag = default.type_tag();
        self.register(TraitAccess::Private, name, desc, tag, Some(default))
    }

    /// Any module may read or write. The default may be omitted here when
    /// another module is expected to supply one; the cross-module
    /// coordinator checks that someone did before the run starts.
    pub fn register_shared(
        &mut self,
        name: &str,
        desc: &str,
        tag: TypeTag,
    ) -> Result<&mut TraitSpec> {
        self.register(TraitAccess::Shared, name, desc, tag, None)
    }

    /// This module only reads; some other module must own or share-write
    /// the trait.
    pub fn register_required(
        &mut self,
        name: &str,
        desc: &str,
        tag: TypeTag,
    ) -> Result<&mut TraitSpec> {
        self.register(TraitAccess::Required, name, desc, tag, None)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TraitSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TraitSpec> {
        self.specs.iter_mut().find(|s| s.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraitSpec> {
        self.specs.iter()
    }

    /// Adds this registry's declarations to a population layout, including
    /// the derived `last_`/`archive_` slots for archiving traits. Required
    /// traits are declared too so readers resolve ids even when the writer
    /// registers later; type conflicts come back as rendered errors.
    pub fn apply_to_layout(&self, layout: &mut TraitLayout) -> Vec<String> {
        let mut errors = Vec::new();
        for spec in &self.specs {
            if let Err(e) = layout.add_trait(&spec.name, spec.tag) {
                errors.push(e.to_string());
                continue;
            }
            match spec.archive {
                TraitArchive::None => {}
                TraitArchive::LastReset => {
                    if let Err(e) = layout.add_trait(&spec.last_name(), spec.tag) {
                        errors.push(e.to_string());
                    }
                }
                TraitArchive::AllResets | TraitArchive::AllChanges => {
                    if let Err(e) = layout.add_trait(&spec.archive_name(), TypeTag::Opaque) {
                        errors.push(e.to_string());
                    }
                }
            }
        }
        errors
    }
}
