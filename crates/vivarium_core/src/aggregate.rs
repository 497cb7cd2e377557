//! Aggregation over organism collections.
//!
//! Builds a function that computes a per-organism value for every member of
//! a collection and folds the results down to one summary, selected by a
//! short mode string:
//!
//! - *(empty)* — value for the first organism
//! - `K` — value for the organism at position K
//! - `==X` `!=X` `<X` `>X` `<=X` `>=X` — count of organisms whose value has
//!   that relationship with X (a numeric literal or another trait's value)
//! - `unique` (`richness`) — number of distinct values
//! - `mode` (`dom`, `dominant`) — most frequent value, first seen wins ties
//! - `min`, `max` — extreme values; `min_id`, `max_id` — their positions
//! - `ave` (`mean`), `median`, `variance`, `stddev`, `sum` (`total`)
//! - `entropy` — Shannon entropy, base = number of distinct values
//! - `:TRAIT` — mutual information with another trait's distribution
//!
//! Summaries stay textual when the expression is a single non-numeric trait
//! (position-selecting modes still yield a numeric index). An empty
//! collection always yields the neutral default without evaluating anything.

use std::collections::HashMap;
use std::sync::Arc;

use vivarium_data::{format_number, OrganismSource, TraitId, TraitLayout, ValueKey};

use crate::eqn::{self, CompiledEquation};
use crate::error::{QueryError, Result};

/// One summary result: numeric or textual, depending on the expression and
/// mode that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryValue {
    Number(f64),
    Text(String),
}

impl SummaryValue {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            SummaryValue::Number(v) => format_number(*v),
            SummaryValue::Text(s) => s.clone(),
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            SummaryValue::Number(v) => *v,
            SummaryValue::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }
}

impl std::fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    fn holds_f64(self, a: f64, b: f64) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Gt => a > b,
            CmpOp::Le => a <= b,
            CmpOp::Ge => a >= b,
        }
    }

    fn holds_str(self, a: &str, b: &str) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Gt => a > b,
            CmpOp::Le => a <= b,
            CmpOp::Ge => a >= b,
        }
    }
}

/// Parsed form of the mode grammar. The comparand of a comparison stays
/// textual here; each result family resolves it against its own value kind
/// at build time.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryMode {
    First,
    Index(usize),
    Compare(CmpOp, String),
    Unique,
    Dominant,
    Min,
    Max,
    MinId,
    MaxId,
    Mean,
    Median,
    Variance,
    StdDev,
    Sum,
    Entropy,
    MutualInfo(String),
}

/// Parses a mode string. Unknown words come back as
/// [`QueryError::UnknownMode`] so the caller can report and fall back.
pub fn parse_mode(mode: &str) -> Result<SummaryMode> {
    let mode = mode.trim();
    if mode.is_empty() {
        return Ok(SummaryMode::First);
    }
    if let Some(rest) = mode.strip_prefix(':') {
        let name = rest.trim();
        if name.is_empty() {
            return Err(QueryError::UnknownMode(mode.to_string()));
        }
        return Ok(SummaryMode::MutualInfo(name.to_string()));
    }
    for (prefix, op) in [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ] {
        if let Some(rest) = mode.strip_prefix(prefix) {
            let comparand = rest.trim();
            if comparand.is_empty() {
                return Err(QueryError::MalformedComparison(mode.to_string()));
            }
            return Ok(SummaryMode::Compare(op, comparand.to_string()));
        }
    }
    if mode.chars().all(|c| c.is_ascii_digit()) {
        let index = mode
            .parse::<usize>()
            .map_err(|_| QueryError::UnknownMode(mode.to_string()))?;
        return Ok(SummaryMode::Index(index));
    }
    Ok(match mode {
        "unique" | "richness" => SummaryMode::Unique,
        "mode" | "dom" | "dominant" => SummaryMode::Dominant,
        "min" => SummaryMode::Min,
        "max" => SummaryMode::Max,
        "min_id" => SummaryMode::MinId,
        "max_id" => SummaryMode::MaxId,
        "ave" | "mean" => SummaryMode::Mean,
        "median" => SummaryMode::Median,
        "variance" => SummaryMode::Variance,
        "stddev" => SummaryMode::StdDev,
        "sum" | "total" => SummaryMode::Sum,
        "entropy" => SummaryMode::Entropy,
        _ => return Err(QueryError::UnknownMode(mode.to_string())),
    })
}

/// A built summary: applies to any organism source over the layout it was
/// compiled against.
pub type SummaryFn = Arc<dyn Fn(&dyn OrganismSource) -> SummaryValue + Send + Sync>;

/// Builds a summary function for `expr` folded by `mode` over `layout`.
///
/// All compilation happens here; the returned closure only scans. Build
/// errors (bad expression, unknown mode, type mismatch) surface as
/// `Err`; scan-time configuration errors (index past the end) are logged
/// and yield the neutral default.
pub fn build_summary(expr: &str, mode: &str, layout: &TraitLayout) -> Result<SummaryFn> {
    let mode = parse_mode(mode)?;
    let trait_name = expr.trim();
    let is_identifier = !trait_name.is_empty()
        && trait_name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && trait_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if is_identifier && layout.has_name(trait_name) && !layout.is_numeric(trait_name) {
        let id = layout
            .id_of(trait_name)
            .ok_or_else(|| QueryError::UnknownTrait(trait_name.to_string()))?;
        return build_text_summary(trait_name, id, mode, layout);
    }
    build_numeric_summary(expr, mode, layout)
}

fn resolve_numeric_comparand(
    comparand: &str,
    layout: &TraitLayout,
) -> Result<NumericComparand> {
    if let Ok(value) = comparand.parse::<f64>() {
        return Ok(NumericComparand::Literal(value));
    }
    match layout.id_of(comparand) {
        Some(id) if layout.is_numeric(comparand) => Ok(NumericComparand::Trait(id)),
        Some(_) => Err(QueryError::NotNumeric {
            name: comparand.to_string(),
            tag: layout
                .type_of(layout.id_of(comparand).unwrap_or_default())
                .unwrap_or(vivarium_data::TypeTag::Opaque),
        }),
        None => Err(QueryError::MalformedComparison(comparand.to_string())),
    }
}

enum NumericComparand {
    Literal(f64),
    Trait(TraitId),
}

fn build_numeric_summary(
    expr: &str,
    mode: SummaryMode,
    layout: &TraitLayout,
) -> Result<SummaryFn> {
    let eqn = eqn::compile(layout, expr)?;

    match mode {
        SummaryMode::First => Ok(scan(eqn, |values| values.first().copied().unwrap_or(0.0))),
        SummaryMode::Index(index) => {
            let source = expr.to_string();
            Ok(Arc::new(move |orgs: &dyn OrganismSource| {
                if orgs.source_is_empty() {
                    return SummaryValue::Number(0.0);
                }
                match orgs.organism_at(index) {
                    Some(org) => SummaryValue::Number(eqn.eval(org)),
                    None => {
                        let err = QueryError::IndexOutOfRange {
                            index,
                            size: orgs.source_len(),
                        };
                        tracing::warn!(expr = %source, error = %err, "Aggregation failed");
                        SummaryValue::Number(0.0)
                    }
                }
            }))
        }
        SummaryMode::Compare(op, comparand) => {
            match resolve_numeric_comparand(&comparand, layout)? {
                NumericComparand::Literal(rhs) => Ok(scan_counting(eqn, move |v, _| {
                    op.holds_f64(v, rhs)
                })),
                NumericComparand::Trait(id) => Ok(scan_counting(eqn, move |v, org| {
                    op.holds_f64(v, org.get_f64(id))
                })),
            }
        }
        SummaryMode::Unique => Ok(scan(eqn, |values| distinct_counts(values).len() as f64)),
        SummaryMode::Dominant => Ok(scan(eqn, |values| {
            dominant_key(values.iter().map(|v| ValueKey::Bits(v.to_bits())))
                .map(|slot| values[slot])
                .unwrap_or(0.0)
        })),
        SummaryMode::Min => Ok(scan(eqn, |values| {
            values.iter().copied().fold(f64::INFINITY, f64::min)
        })),
        SummaryMode::Max => Ok(scan(eqn, |values| {
            values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        })),
        SummaryMode::MinId => Ok(scan(eqn, |values| extreme_slot(values, CmpOp::Lt) as f64)),
        SummaryMode::MaxId => Ok(scan(eqn, |values| extreme_slot(values, CmpOp::Gt) as f64)),
        SummaryMode::Mean => Ok(scan(eqn, |values| {
            values.iter().sum::<f64>() / values.len() as f64
        })),
        SummaryMode::Median => Ok(scan(eqn, |values| median(values))),
        SummaryMode::Variance => Ok(scan(eqn, |values| variance(values))),
        SummaryMode::StdDev => Ok(scan(eqn, |values| variance(values).sqrt())),
        SummaryMode::Sum => Ok(scan(eqn, |values| values.iter().sum())),
        SummaryMode::Entropy => Ok(scan(eqn, |values| {
            entropy(&distinct_counts(values), values.len())
        })),
        SummaryMode::MutualInfo(other) => {
            let other_id = layout
                .id_of(&other)
                .ok_or_else(|| QueryError::UnknownTrait(other.clone()))?;
            Ok(Arc::new(move |orgs: &dyn OrganismSource| {
                if orgs.source_is_empty() {
                    return SummaryValue::Number(0.0);
                }
                let mut pairs = Vec::with_capacity(orgs.source_len());
                for slot in 0..orgs.source_len() {
                    if let Some(org) = orgs.organism_at(slot) {
                        let x = ValueKey::Bits(eqn.eval(org).to_bits());
                        let y = org
                            .get(other_id)
                            .map(|v| v.bucket_key())
                            .unwrap_or(ValueKey::Int(0));
                        pairs.push((x, y));
                    }
                }
                SummaryValue::Number(mutual_information(&pairs))
            }))
        }
    }
}

/// Numeric fold over the gathered per-organism values; empty collections
/// short-circuit to 0 before the equation ever runs.
fn scan(
    eqn: CompiledEquation,
    fold: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
) -> SummaryFn {
    Arc::new(move |orgs: &dyn OrganismSource| {
        if orgs.source_is_empty() {
            return SummaryValue::Number(0.0);
        }
        let mut values = Vec::with_capacity(orgs.source_len());
        for slot in 0..orgs.source_len() {
            if let Some(org) = orgs.organism_at(slot) {
                values.push(eqn.eval(org));
            }
        }
        SummaryValue::Number(fold(&values))
    })
}

fn scan_counting(
    eqn: CompiledEquation,
    keep: impl Fn(f64, &vivarium_data::TraitStore) -> bool + Send + Sync + 'static,
) -> SummaryFn {
    Arc::new(move |orgs: &dyn OrganismSource| {
        if orgs.source_is_empty() {
            return SummaryValue::Number(0.0);
        }
        let mut count = 0usize;
        for slot in 0..orgs.source_len() {
            if let Some(org) = orgs.organism_at(slot) {
                if keep(eqn.eval(org), org) {
                    count += 1;
                }
            }
        }
        SummaryValue::Number(count as f64)
    })
}

fn build_text_summary(
    name: &str,
    id: TraitId,
    mode: SummaryMode,
    layout: &TraitLayout,
) -> Result<SummaryFn> {
    // Comparand and partner-trait resolution happens before the closure is
    // built, mirroring the numeric family.
    enum TextComparand {
        Literal(String),
        Trait(TraitId),
    }

    let gather = move |orgs: &dyn OrganismSource| -> Vec<String> {
        let mut values = Vec::with_capacity(orgs.source_len());
        for slot in 0..orgs.source_len() {
            if let Some(org) = orgs.organism_at(slot) {
                values.push(org.value_as_text(id));
            }
        }
        values
    };

    match mode {
        SummaryMode::First => Ok(text_scan(gather, |values| {
            SummaryValue::Text(values.first().cloned().unwrap_or_default())
        })),
        SummaryMode::Index(index) => {
            let name = name.to_string();
            Ok(Arc::new(move |orgs: &dyn OrganismSource| {
                if orgs.source_is_empty() {
                    return SummaryValue::Text(String::new());
                }
                match orgs.organism_at(index) {
                    Some(org) => SummaryValue::Text(org.value_as_text(id)),
                    None => {
                        let err = QueryError::IndexOutOfRange {
                            index,
                            size: orgs.source_len(),
                        };
                        tracing::warn!(trait_name = %name, error = %err, "Aggregation failed");
                        SummaryValue::Text(String::new())
                    }
                }
            }))
        }
        SummaryMode::Compare(op, comparand) => {
            let comparand = match layout.id_of(&comparand) {
                Some(other_id) => TextComparand::Trait(other_id),
                None => TextComparand::Literal(comparand),
            };
            Ok(Arc::new(move |orgs: &dyn OrganismSource| {
                if orgs.source_is_empty() {
                    return SummaryValue::Number(0.0);
                }
                let mut count = 0usize;
                for slot in 0..orgs.source_len() {
                    if let Some(org) = orgs.organism_at(slot) {
                        let value = org.value_as_text(id);
                        let rhs = match &comparand {
                            TextComparand::Literal(s) => s.clone(),
                            TextComparand::Trait(other_id) => org.value_as_text(*other_id),
                        };
                        if op.holds_str(&value, &rhs) {
                            count += 1;
                        }
                    }
                }
                SummaryValue::Number(count as f64)
            }))
        }
        SummaryMode::Unique => Ok(text_scan(gather, |values| {
            SummaryValue::Number(text_counts(values).len() as f64)
        })),
        SummaryMode::Dominant => Ok(text_scan(gather, |values| {
            SummaryValue::Text(
                dominant_key(values.iter().map(|s| ValueKey::Text(s.clone())))
                    .map(|slot| values[slot].clone())
                    .unwrap_or_default(),
            )
        })),
        SummaryMode::Min => Ok(text_scan(gather, |values| {
            SummaryValue::Text(values.iter().min().cloned().unwrap_or_default())
        })),
        SummaryMode::Max => Ok(text_scan(gather, |values| {
            SummaryValue::Text(values.iter().max().cloned().unwrap_or_default())
        })),
        SummaryMode::MinId => Ok(text_scan(gather, |values| {
            SummaryValue::Number(text_extreme_slot(values, true) as f64)
        })),
        SummaryMode::MaxId => Ok(text_scan(gather, |values| {
            SummaryValue::Number(text_extreme_slot(values, false) as f64)
        })),
        SummaryMode::Entropy => Ok(text_scan(gather, |values| {
            SummaryValue::Number(entropy(&text_counts(values), values.len()))
        })),
        SummaryMode::MutualInfo(other) => {
            let other_id = layout
                .id_of(&other)
                .ok_or_else(|| QueryError::UnknownTrait(other.clone()))?;
            Ok(Arc::new(move |orgs: &dyn OrganismSource| {
                if orgs.source_is_empty() {
                    return SummaryValue::Number(0.0);
                }
                let mut pairs = Vec::with_capacity(orgs.source_len());
                for slot in 0..orgs.source_len() {
                    if let Some(org) = orgs.organism_at(slot) {
                        let x = ValueKey::Text(org.value_as_text(id));
                        let y = org
                            .get(other_id)
                            .map(|v| v.bucket_key())
                            .unwrap_or(ValueKey::Int(0));
                        pairs.push((x, y));
                    }
                }
                SummaryValue::Number(mutual_information(&pairs))
            }))
        }
        SummaryMode::Mean
        | SummaryMode::Median
        | SummaryMode::Variance
        | SummaryMode::StdDev
        | SummaryMode::Sum => Err(QueryError::NotNumeric {
            name: name.to_string(),
            tag: layout
                .type_of(id)
                .unwrap_or(vivarium_data::TypeTag::Opaque),
        }),
    }
}

fn text_scan(
    gather: impl Fn(&dyn OrganismSource) -> Vec<String> + Send + Sync + 'static,
    fold: impl Fn(&[String]) -> SummaryValue + Send + Sync + 'static,
) -> SummaryFn {
    Arc::new(move |orgs: &dyn OrganismSource| {
        if orgs.source_is_empty() {
            return match fold(&[]) {
                SummaryValue::Number(_) => SummaryValue::Number(0.0),
                SummaryValue::Text(_) => SummaryValue::Text(String::new()),
            };
        }
        fold(&gather(orgs))
    })
}

// --- shared statistics helpers ---

fn distinct_counts(values: &[f64]) -> Vec<usize> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for v in values {
        *counts.entry(v.to_bits()).or_insert(0) += 1;
    }
    counts.into_values().collect()
}

fn text_counts(values: &[String]) -> Vec<usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }
    counts.into_values().collect()
}

/// Slot of the most frequent key; the first-encountered key wins ties.
fn dominant_key(keys: impl Iterator<Item = ValueKey>) -> Option<usize> {
    let mut counts: HashMap<ValueKey, (usize, usize)> = HashMap::new();
    for (slot, key) in keys.enumerate() {
        let entry = counts.entry(key).or_insert((0, slot));
        entry.0 += 1;
    }
    counts
        .into_values()
        .max_by(|(count_a, slot_a), (count_b, slot_b)| {
            count_a.cmp(count_b).then(slot_b.cmp(slot_a))
        })
        .map(|(_, slot)| slot)
}

fn extreme_slot(values: &[f64], op: CmpOp) -> usize {
    let mut best = 0usize;
    for (slot, &v) in values.iter().enumerate().skip(1) {
        if op.holds_f64(v, values[best]) {
            best = slot;
        }
    }
    best
}

fn text_extreme_slot(values: &[String], smallest: bool) -> usize {
    let mut best = 0usize;
    for (slot, v) in values.iter().enumerate().skip(1) {
        let better = if smallest {
            v < &values[best]
        } else {
            v > &values[best]
        };
        if better {
            best = slot;
        }
    }
    best
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

fn variance(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Shannon entropy of a count distribution, in the base given by the number
/// of distinct values: a uniform distribution scores 1 regardless of how
/// many bins it has.
fn entropy(counts: &[usize], total: usize) -> f64 {
    if counts.len() <= 1 || total == 0 {
        return 0.0;
    }
    let base_ln = (counts.len() as f64).ln();
    let total = total as f64;
    -counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p.ln()
        })
        .sum::<f64>()
        / base_ln
}

/// Mutual information between paired distributions, in nats, from exact-
/// match buckets.
fn mutual_information(pairs: &[(ValueKey, ValueKey)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let total = pairs.len() as f64;
    let mut x_counts: HashMap<&ValueKey, usize> = HashMap::new();
    let mut y_counts: HashMap<&ValueKey, usize> = HashMap::new();
    let mut joint: HashMap<(&ValueKey, &ValueKey), usize> = HashMap::new();
    for (x, y) in pairs {
        *x_counts.entry(x).or_insert(0) += 1;
        *y_counts.entry(y).or_insert(0) += 1;
        *joint.entry((x, y)).or_insert(0) += 1;
    }
    joint
        .iter()
        .map(|(&(x, y), &c)| {
            let p_xy = c as f64 / total;
            let p_x = x_counts[x] as f64 / total;
            let p_y = y_counts[y] as f64 / total;
            p_xy * (p_xy / (p_x * p_y)).ln()
        })
        .sum::<f64>()
        .max(0.0)
}
