//! Population and collection containers.
//!
//! A population is the full ordered set of organisms under simulation; a
//! collection is an arbitrary ordered subset of one population, produced by
//! filters and extreme-finders. Aggregation code scans either through the
//! [`OrganismSource`] trait so it never cares which one it was handed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::TraitLayout;
use crate::store::TraitStore;

/// Ordered set of organisms sharing one trait layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Population {
    id: Uuid,
    name: String,
    layout: Arc<TraitLayout>,
    orgs: Vec<TraitStore>,
}

impl Population {
    #[must_use]
    pub fn new(name: &str, layout: Arc<TraitLayout>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            layout,
            orgs: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn layout(&self) -> &TraitLayout {
        &self.layout
    }

    #[must_use]
    pub fn layout_arc(&self) -> Arc<TraitLayout> {
        Arc::clone(&self.layout)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orgs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty()
    }

    #[must_use]
    pub fn organism(&self, idx: usize) -> Option<&TraitStore> {
        self.orgs.get(idx)
    }

    pub fn organism_mut(&mut self, idx: usize) -> Option<&mut TraitStore> {
        self.orgs.get_mut(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraitStore> {
        self.orgs.iter()
    }

    /// Adds an organism, growing its store to the layout's slot count if it
    /// was built against an older revision.
    pub fn spawn(&mut self, mut org: TraitStore) -> usize {
        org.conform_to(&self.layout);
        self.orgs.push(org);
        self.orgs.len() - 1
    }

    /// Spawns an organism with every slot at its zero value.
    pub fn spawn_default(&mut self) -> usize {
        self.spawn(TraitStore::from_layout(&self.layout))
    }

    /// The whole population as a collection.
    #[must_use]
    pub fn all(&self) -> Collection {
        Collection {
            population: self.id,
            indices: (0..self.orgs.len()).collect(),
        }
    }

    /// Materializes the organism at `idx` as a one-element collection;
    /// empty if out of range.
    #[must_use]
    pub fn singleton(&self, idx: usize) -> Collection {
        let indices = if idx < self.orgs.len() {
            vec![idx]
        } else {
            Vec::new()
        };
        Collection {
            population: self.id,
            indices,
        }
    }

    /// Borrowed view over `collection`, or `None` if it belongs to a
    /// different population.
    #[must_use]
    pub fn view<'a>(&'a self, collection: &'a Collection) -> Option<CollectionView<'a>> {
        (collection.population == self.id).then_some(CollectionView {
            population: self,
            indices: &collection.indices,
        })
    }

    /// Removes and returns every organism, preserving order. Used by the
    /// coordinator when moving organisms between populations.
    pub fn take_all(&mut self) -> Vec<TraitStore> {
        std::mem::take(&mut self.orgs)
    }

    /// Appends organisms after the current ones.
    pub fn absorb(&mut self, orgs: Vec<TraitStore>) {
        for org in orgs {
            self.spawn(org);
        }
    }

    pub fn clear(&mut self) {
        self.orgs.clear();
    }

    /// Rebuilds derived indexes after deserialization.
    pub fn reindex(&mut self) {
        if let Some(layout) = Arc::get_mut(&mut self.layout) {
            layout.reindex();
        }
    }
}

/// Ordered subset of one population, held as indices so it stays cheap to
/// clone and pass through script values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    population: Uuid,
    indices: Vec<usize>,
}

impl Collection {
    #[must_use]
    pub fn empty_for(population: Uuid) -> Self {
        Self {
            population,
            indices: Vec::new(),
        }
    }

    #[must_use]
    pub fn population(&self) -> Uuid {
        self.population
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn insert(&mut self, idx: usize) {
        self.indices.push(idx);
    }

    #[must_use]
    pub fn contains(&self, idx: usize) -> bool {
        self.indices.contains(&idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.indices.iter()
    }

    /// Position within the owning population of the collection member at
    /// `slot`.
    #[must_use]
    pub fn member(&self, slot: usize) -> Option<usize> {
        self.indices.get(slot).copied()
    }
}

/// Uniform read surface over a population or a collection view, scanned by
/// the aggregation layer.
pub trait OrganismSource {
    fn source_len(&self) -> usize;
    fn organism_at(&self, slot: usize) -> Option<&TraitStore>;
    fn source_layout(&self) -> &TraitLayout;

    fn source_is_empty(&self) -> bool {
        self.source_len() == 0
    }
}

impl OrganismSource for Population {
    fn source_len(&self) -> usize {
        self.len()
    }

    fn organism_at(&self, slot: usize) -> Option<&TraitStore> {
        self.organism(slot)
    }

    fn source_layout(&self) -> &TraitLayout {
        self.layout()
    }
}

/// Borrowed pairing of a collection with its owning population.
#[derive(Debug, Clone, Copy)]
pub struct CollectionView<'a> {
    population: &'a Population,
    indices: &'a [usize],
}

impl OrganismSource for CollectionView<'_> {
    fn source_len(&self) -> usize {
        self.indices.len()
    }

    fn organism_at(&self, slot: usize) -> Option<&TraitStore> {
        self.indices
            .get(slot)
            .and_then(|&idx| self.population.organism(idx))
    }

    fn source_layout(&self) -> &TraitLayout {
        self.population.layout()
    }
}
