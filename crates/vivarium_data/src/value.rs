//! Tagged trait value union.
//!
//! Every per-organism attribute is one of a closed set of value kinds. The
//! union is deliberately small: the query layer only needs to distinguish
//! numeric kinds (which feed equations) from text (which stays textual
//! through aggregation) and opaque payloads (which it stores but never
//! computes on).

use serde::{Deserialize, Serialize};

/// Type tag for a trait, tracked separately from any concrete value so a
/// layout can describe traits that have no default yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Int,
    Float,
    Bool,
    Text,
    /// Structured payload the query layer carries but cannot compute on
    /// (archives, genome blobs, module-private records).
    Opaque,
}

impl TypeTag {
    /// Whether values of this kind can appear in a math equation.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::Float | TypeTag::Bool)
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Text => "text",
            TypeTag::Opaque => "opaque",
        };
        write!(f, "{name}")
    }
}

/// One trait value. Booleans numerify to 0/1 so selection expressions can
/// mix them freely with other numeric traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraitValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Opaque(serde_json::Value),
}

impl TraitValue {
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            TraitValue::Int(_) => TypeTag::Int,
            TraitValue::Float(_) => TypeTag::Float,
            TraitValue::Bool(_) => TypeTag::Bool,
            TraitValue::Text(_) => TypeTag::Text,
            TraitValue::Opaque(_) => TypeTag::Opaque,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.type_tag().is_numeric()
    }

    /// Numeric view of this value. Text parses if it happens to hold a
    /// number; opaque payloads never numerify.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TraitValue::Int(v) => Some(*v as f64),
            TraitValue::Float(v) => Some(*v),
            TraitValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            TraitValue::Text(s) => s.trim().parse::<f64>().ok(),
            TraitValue::Opaque(_) => None,
        }
    }

    /// Textual rendering used for reports and template substitution.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            TraitValue::Int(v) => v.to_string(),
            TraitValue::Float(v) => format_number(*v),
            TraitValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            TraitValue::Text(s) => s.clone(),
            TraitValue::Opaque(v) => v.to_string(),
        }
    }

    /// Exact-match bucketing key for distribution statistics. Distinct
    /// floating values are distinct buckets; no implicit histogramming.
    #[must_use]
    pub fn bucket_key(&self) -> ValueKey {
        match self {
            TraitValue::Int(v) => ValueKey::Int(*v),
            TraitValue::Float(v) => ValueKey::Bits(v.to_bits()),
            TraitValue::Bool(v) => ValueKey::Int(i64::from(*v)),
            TraitValue::Text(s) => ValueKey::Text(s.clone()),
            TraitValue::Opaque(v) => ValueKey::Text(v.to_string()),
        }
    }

    /// The zero/empty value for a type tag, used when a layout slot has no
    /// registered default.
    #[must_use]
    pub fn zero_for(tag: TypeTag) -> TraitValue {
        match tag {
            TypeTag::Int => TraitValue::Int(0),
            TypeTag::Float => TraitValue::Float(0.0),
            TypeTag::Bool => TraitValue::Bool(false),
            TypeTag::Text => TraitValue::Text(String::new()),
            TypeTag::Opaque => TraitValue::Opaque(serde_json::Value::Null),
        }
    }
}

impl From<i64> for TraitValue {
    fn from(v: i64) -> Self {
        TraitValue::Int(v)
    }
}

impl From<f64> for TraitValue {
    fn from(v: f64) -> Self {
        TraitValue::Float(v)
    }
}

impl From<bool> for TraitValue {
    fn from(v: bool) -> Self {
        TraitValue::Bool(v)
    }
}

impl From<&str> for TraitValue {
    fn from(v: &str) -> Self {
        TraitValue::Text(v.to_string())
    }
}

impl From<String> for TraitValue {
    fn from(v: String) -> Self {
        TraitValue::Text(v)
    }
}

/// Hashable key for exact-match value distributions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Int(i64),
    Bits(u64),
    Text(String),
}

/// Render a float the way reports expect: integral values drop the trailing
/// `.0`, everything else uses the shortest round-trip form.
#[must_use]
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
