//! # Vivarium Core
//!
//! The configuration and query engine for Vivarium - a modular agent-based
//! evolution simulator.
//!
//! This crate contains the logic between user-written configuration text
//! and the organisms it describes:
//! - Trait declarations with access control, inheritance, and archiving
//! - The module contract every pluggable simulation unit implements
//! - An equation compiler from expression strings to per-organism functions
//! - An aggregation engine folding per-organism values into one summary
//! - Template preprocessing for `${...}` substitution in config strings
//!
//! ## Architecture
//!
//! Compilation is front-loaded: names resolve against a trait layout once,
//! at build time, and the resulting closures are stateless, so the same
//! compiled function can serve any number of read-only scans in one
//! evaluation pass. Recoverable configuration errors accumulate as text on
//! the owning module or an [`report::ErrorLog`]; evaluation always
//! continues with a neutral default.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vivarium_core::aggregate::build_summary;
//! use vivarium_data::{Population, TraitLayout, TraitValue, TypeTag};
//!
//! let mut layout = TraitLayout::new();
//! layout.add_trait("energy", TypeTag::Float).unwrap();
//! let mut pop = Population::new("main", Arc::new(layout));
//! for e in [4.0, 6.0] {
//!     let idx = pop.spawn_default();
//!     pop.organism_mut(idx).unwrap().set(0, TraitValue::Float(e));
//! }
//!
//! let mean = build_summary("energy", "mean", pop.layout()).unwrap();
//! assert_eq!(mean(&pop).as_f64(), 5.0);
//! ```

/// Aggregation of per-organism values into collection summaries
pub mod aggregate;
/// Interpreter guard-rail configuration
pub mod config;
/// Equation compilation from expression text to per-organism functions
pub mod eqn;
/// Error types for the query layer
pub mod error;
/// Birth-time trait initialization across parents
pub mod inherit;
/// Module contract and capability declarations
pub mod module;
/// Template `${...}` substitution
pub mod preprocess;
/// Logging setup and the recoverable-error channel
pub mod report;
/// Per-module trait declarations and access rules
pub mod trait_registry;

pub use aggregate::{build_summary, parse_mode, SummaryFn, SummaryMode, SummaryValue};
pub use config::InterpreterConfig;
pub use eqn::{compile, referenced_traits, CompiledEquation};
pub use error::{QueryError, Result};
pub use module::{Analyze, Evaluate, Module, ModuleInfo, ModuleRole, Placement, ReplicationTiming, Select};
pub use preprocess::{ExpressionHost, MathHost, Preprocessor};
pub use report::{init_logging, ErrorLog};
pub use trait_registry::{TraitAccess, TraitArchive, TraitInit, TraitRegistry, TraitSpec};
