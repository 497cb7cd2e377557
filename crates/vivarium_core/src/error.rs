//! Error types for the query layer.
//!
//! Everything here is recoverable by policy: callers either accumulate the
//! rendered message on the owning module or log it and fall back to a safe
//! default result. Nothing in this crate panics on a bad expression.

use thiserror::Error;
use vivarium_data::TypeTag;

/// Main error type for equation compilation, aggregation, and preprocessing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Expression text failed to parse
    #[error("Parse error in '{expr}': {detail}")]
    Parse { expr: String, detail: String },

    /// Expression names a trait absent from the layout
    #[error("Unknown trait '{0}'")]
    UnknownTrait(String),

    /// A math equation touched a non-numeric trait
    #[error("Trait '{name}' is {tag}, not numeric")]
    NotNumeric { name: String, tag: TypeTag },

    /// Aggregation mode string not in the mode grammar
    #[error("Unknown aggregation mode '{0}'")]
    UnknownMode(String),

    /// Comparison mode whose right-hand side is neither a number nor a trait
    #[error("Malformed comparison '{0}': expected a numeric value or trait name")]
    MalformedComparison(String),

    /// Positional aggregation past the end of the collection
    #[error("Index {index} out of range for collection of {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// Template expansion re-entered itself past the configured bound
    #[error("Template expansion exceeded depth limit {0}")]
    DepthExceeded(usize),

    /// Expression text longer than the configured bound
    #[error("Expression of {len} chars exceeds limit {max}")]
    ExpressionTooLong { len: usize, max: usize },

    /// A trait was registered twice within one module
    #[error("Duplicate trait '{0}' in module registry")]
    DuplicateTrait(String),

    /// The host engine failed to evaluate a template span
    #[error("Host evaluation failed: {0}")]
    Host(String),
}

/// Result type alias for query-layer operations.
pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// Creates a parse error for `expr`.
    #[must_use]
    pub fn parse<S: Into<String>>(expr: &str, detail: S) -> Self {
        Self::Parse {
            expr: expr.to_string(),
            detail: detail.into(),
        }
    }

    /// Creates a host evaluation error.
    #[must_use]
    pub fn host<S: Into<String>>(msg: S) -> Self {
        Self::Host(msg.into())
    }
}
