//! # Vivarium
//!
//! Configuration and query layer for a modular agent-based evolution
//! simulator.
//!
//! Users write short textual expressions that are compiled against a
//! population of simulated organisms and evaluated repeatedly during a run:
//! for reporting, selection criteria, filtering, and dynamic
//! reconfiguration. Two subsystems carry the weight:
//!
//! - A typed, access-controlled trait metadata model
//!   ([`vivarium_core::trait_registry`]) that lets independently-authored
//!   modules declare, own, share, or require named per-organism attributes,
//!   with defined rules for initialization and inheritance across
//!   reproduction.
//! - An embedded equation/aggregation compiler ([`vivarium_core::eqn`],
//!   [`vivarium_core::aggregate`]) that turns an expression string and an
//!   aggregation mode into an executable function over a population or any
//!   subset of it.
//!
//! The [`script`] module binds both to the host scripting language: the
//! `TRAIT`/`CALC_*` member-function surface, subset producers, template
//! preprocessing, and run control.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vivarium_data::{Population, TraitLayout, TraitValue, TypeTag};
//! use vivarium_lib::script::{BasicControl, ScriptEngine};
//!
//! let mut layout = TraitLayout::new();
//! layout.add_trait("energy", TypeTag::Float).unwrap();
//! let mut pop = Population::new("main", Arc::new(layout));
//! for e in [3.0, 9.0, 6.0] {
//!     let idx = pop.spawn_default();
//!     pop.organism_mut(idx).unwrap().set(0, TraitValue::Float(e));
//! }
//!
//! let mut engine = ScriptEngine::new(BasicControl::new());
//! assert_eq!(engine.calc_mean(&pop, "energy"), 6.0);
//! assert_eq!(engine.id_max(&pop, "energy"), 1.0);
//! let strong = engine.filter(&pop, "energy > 5");
//! assert_eq!(strong.len(), 2);
//! ```

pub mod script;

pub use vivarium_core as core;
pub use vivarium_data as data;
