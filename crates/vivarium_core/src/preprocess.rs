//! Template substitution for configuration strings.
//!
//! Replaces `${...}` spans with the result of evaluating the enclosed
//! expression through the host engine. `$$` collapses to a literal `$`; a
//! `$` followed by anything else is literal; an unmatched `${` leaves the
//! remainder of the string untouched so partially-written scripts survive
//! incremental editing. Substituted text is never re-scanned, which rules
//! out expansion loops within one string; re-entry through the host engine
//! is bounded by a configured depth instead.

use std::cell::Cell;

use vivarium_data::{format_number, TraitLayout};

use crate::eqn;
use crate::error::{QueryError, Result};

/// Evaluation seam into the host scripting engine: the text between the
/// braces of a `${...}` span in, its rendered result out.
pub trait ExpressionHost {
    fn eval_expression(&self, expr: &str) -> Result<String>;
}

/// Host backed by the equation compiler with an empty layout: evaluates
/// constant math, which is all a bare configuration string needs.
#[derive(Debug, Default)]
pub struct MathHost {
    layout: TraitLayout,
}

impl MathHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExpressionHost for MathHost {
    fn eval_expression(&self, expr: &str) -> Result<String> {
        let eqn = eqn::compile(&self.layout, expr)?;
        let empty = vivarium_data::TraitStore::default();
        Ok(format_number(eqn.eval(&empty)))
    }
}

/// One template expansion pass, re-entrant through the host engine up to a
/// configured depth.
pub struct Preprocessor<'a> {
    host: &'a dyn ExpressionHost,
    depth_limit: usize,
    depth: Cell<usize>,
}

impl<'a> Preprocessor<'a> {
    #[must_use]
    pub fn new(host: &'a dyn ExpressionHost, depth_limit: usize) -> Self {
        Self {
            host,
            depth_limit,
            depth: Cell::new(0),
        }
    }

    /// Expands every `${...}` span in `input`. Spans that fail to evaluate
    /// are left as written and logged; they are configuration mistakes, not
    /// reasons to lose the rest of the string.
    pub fn expand(&self, input: &str) -> Result<String> {
        let depth = self.depth.get() + 1;
        if depth > self.depth_limit {
            return Err(QueryError::DepthExceeded(self.depth_limit));
        }
        self.depth.set(depth);
        let result = self.expand_once(input);
        self.depth.set(depth - 1);
        result
    }

    fn expand_once(&self, input: &str) -> Result<String> {
        let chars: Vec<char> = input.chars().collect();
        let mut out = String::with_capacity(input.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '$' {
                out.push(chars[i]);
                i += 1;
                continue;
            }
            // A tag needs at least "$x" after this point.
            if i + 2 > chars.len() {
                out.extend(&chars[i..]);
                break;
            }
            if chars[i + 1] == '$' {
                out.push('$');
                i += 2;
                continue;
            }
            if chars[i + 1] != '{' {
                out.push('$');
                i += 1;
                continue;
            }
            let Some(end) = find_brace_match(&chars, i + 1) else {
                // No closing brace: everything from here on stays literal.
                out.extend(&chars[i..]);
                break;
            };
            let inner: String = chars[i + 2..end].iter().collect();
            match self.host.eval_expression(&inner) {
                Ok(text) => out.push_str(&text),
                Err(err) => {
                    tracing::warn!(span = %inner, error = %err, "Template span failed to evaluate");
                    out.extend(&chars[i..=end]);
                }
            }
            i = end + 1;
        }
        Ok(out)
    }
}

/// Index of the `}` matching the `{` at `open`, honoring nested pairs.
fn find_brace_match(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
