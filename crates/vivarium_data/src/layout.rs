//! Trait layout: the schema shared by every organism in a population.
//!
//! A layout maps trait names to dense ids and records the value kind of each
//! slot. Equation compilation resolves names to ids once, at build time, so
//! per-organism evaluation is a plain indexed read.

use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::value::TypeTag;

/// Dense index of a trait within a layout (and within every conforming
/// trait store).
pub type TraitId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LayoutEntry {
    name: String,
    tag: TypeTag,
}

/// Name/type schema for the traits of one population.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraitLayout {
    entries: Vec<LayoutEntry>,
    #[serde(skip)]
    by_name: HashMap<String, TraitId>,
}

impl TraitLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trait slot, returning its id. Re-declaring an existing name
    /// with the same type is idempotent; with a different type it is a
    /// conflict.
    pub fn add_trait(&mut self, name: &str, tag: TypeTag) -> Result<TraitId> {
        if let Some(&id) = self.by_name.get(name) {
            let existing = self.entries[id].tag;
            if existing != tag {
                bail!("trait '{name}' already declared as {existing}, cannot redeclare as {tag}");
            }
            return Ok(id);
        }
        let id = self.entries.len();
        self.entries.push(LayoutEntry {
            name: name.to_string(),
            tag,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<TraitId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn type_of(&self, id: TraitId) -> Option<TypeTag> {
        self.entries.get(id).map(|e| e.tag)
    }

    #[must_use]
    pub fn name_of(&self, id: TraitId) -> Option<&str> {
        self.entries.get(id).map(|e| e.name.as_str())
    }

    /// Whether the named trait exists and holds a numeric kind.
    #[must_use]
    pub fn is_numeric(&self, name: &str) -> bool {
        self.id_of(name)
            .and_then(|id| self.type_of(id))
            .is_some_and(TypeTag::is_numeric)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(id, name, tag)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (TraitId, &str, TypeTag)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(id, e)| (id, e.name.as_str(), e.tag))
    }

    /// Rebuilds the name index after deserialization.
    pub fn reindex(&mut self) {
        self.by_name = self
            .entries
            .iter()
            .enumerate()
            .map(|(id, e)| (e.name.clone(), id))
            .collect();
    }
}
