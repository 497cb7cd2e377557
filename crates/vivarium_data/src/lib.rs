//! Core data structures for the Vivarium configuration and query layer.
//!
//! This crate holds the plain data types shared by every part of the
//! simulator: the tagged trait value union, the trait layout (the schema all
//! organisms in a population conform to), per-organism trait stores, and the
//! population/collection containers the query layer scans.
//!
//! No business logic lives here; the compilers and aggregators that operate
//! on these types are in `vivarium_core`.

/// Trait layout: the schema mapping trait names to ids and types.
pub mod layout;
/// Population and collection containers over organism trait stores.
pub mod population;
/// Per-organism trait value storage conforming to a layout.
pub mod store;
/// Tagged trait value union and its type tags.
pub mod value;

pub use layout::{TraitId, TraitLayout};
pub use population::{Collection, CollectionView, OrganismSource, Population};
pub use store::TraitStore;
pub use value::{format_number, TraitValue, TypeTag, ValueKey};
