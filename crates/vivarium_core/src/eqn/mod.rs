//! Trait equation compiler.
//!
//! Turns an expression string and a trait layout into a stateless function
//! from one organism's trait store to a number. Names resolve to layout ids
//! once, at build time; evaluation is a closure-tree walk with no lookups,
//! no allocation, and no shared mutable state, so a compiled equation may be
//! run from any number of read-only scans at once.

mod lex;
mod parse;

use std::collections::BTreeSet;
use std::sync::Arc;

use vivarium_data::{TraitLayout, TraitStore};

use crate::error::{QueryError, Result};

use parse::{BinaryOp, Expr, Parser, UnaryOp};

type EvalFn = Arc<dyn Fn(&TraitStore) -> f64 + Send + Sync>;

/// A compiled, layout-bound equation.
#[derive(Clone)]
pub struct CompiledEquation {
    source: String,
    fun: EvalFn,
}

impl CompiledEquation {
    /// Evaluates against one organism's trait store.
    #[must_use]
    pub fn eval(&self, org: &TraitStore) -> f64 {
        (self.fun)(org)
    }

    /// Whether the result counts as true in a filter context.
    #[must_use]
    pub fn eval_truthy(&self, org: &TraitStore) -> bool {
        self.eval(org) != 0.0
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for CompiledEquation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledEquation")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Compiles `expr` against `layout`. Unknown names and non-numeric traits
/// fail here, at build time; a returned equation cannot fail at eval time.
pub fn compile(layout: &TraitLayout, expr: &str) -> Result<CompiledEquation> {
    let tokens = lex::tokenize(expr)?;
    let ast = Parser::new(expr, tokens).parse()?;
    let fun = build(layout, &ast)?;
    Ok(CompiledEquation {
        source: expr.to_string(),
        fun,
    })
}

/// Every trait name `expr` depends on, without building a function. Useful
/// for dependency analysis between modules.
pub fn referenced_traits(expr: &str) -> Result<BTreeSet<String>> {
    let tokens = lex::tokenize(expr)?;
    Ok(tokens
        .into_iter()
        .filter_map(|t| match t {
            lex::Token::Ident(name) => Some(name),
            _ => None,
        })
        .collect())
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn build(layout: &TraitLayout, expr: &Expr) -> Result<EvalFn> {
    match expr {
        Expr::Num(v) => {
            let v = *v;
            Ok(Arc::new(move |_| v))
        }
        Expr::Var(name) => {
            let id = layout
                .id_of(name)
                .ok_or_else(|| QueryError::UnknownTrait(name.clone()))?;
            let tag = layout
                .type_of(id)
                .ok_or_else(|| QueryError::UnknownTrait(name.clone()))?;
            if !tag.is_numeric() {
                return Err(QueryError::NotNumeric {
                    name: name.clone(),
                    tag,
                });
            }
            Ok(Arc::new(move |org: &TraitStore| org.get_f64(id)))
        }
        Expr::Unary(op, inner) => {
            let inner = build(layout, inner)?;
            let op = *op;
            Ok(Arc::new(move |org: &TraitStore| {
                let v = inner(org);
                match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Not => truth(v == 0.0),
                }
            }))
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = build(layout, lhs)?;
            let rhs = build(layout, rhs)?;
            let op = *op;
            Ok(Arc::new(move |org: &TraitStore| {
                let a = lhs(org);
                let b = rhs(org);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Mod => a % b,
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::Eq => truth(a == b),
                    BinaryOp::Ne => truth(a != b),
                    BinaryOp::Lt => truth(a < b),
                    BinaryOp::Gt => truth(a > b),
                    BinaryOp::Le => truth(a <= b),
                    BinaryOp::Ge => truth(a >= b),
                    BinaryOp::And => truth(a != 0.0 && b != 0.0),
                    BinaryOp::Or => truth(a != 0.0 || b != 0.0),
                }
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivarium_data::{TraitValue, TypeTag};

    fn layout() -> TraitLayout {
        let mut layout = TraitLayout::new();
        layout.add_trait("energy", TypeTag::Float).unwrap();
        layout.add_trait("age", TypeTag::Int).unwrap();
        layout.add_trait("taxon", TypeTag::Text).unwrap();
        layout
    }

    fn org(energy: f64, age: i64) -> TraitStore {
        let mut store = TraitStore::from_layout(&layout());
        store.set(0, TraitValue::Float(energy));
        store.set(1, TraitValue::Int(age));
        store
    }

    #[test]
    fn test_single_trait_is_identity() {
        let eqn = compile(&layout(), "energy").unwrap();
        assert_eq!(eqn.eval(&org(12.5, 3)), 12.5);
    }

    #[test]
    fn test_arithmetic_over_traits() {
        let eqn = compile(&layout(), "energy / 2 + age ** 2").unwrap();
        assert_eq!(eqn.eval(&org(10.0, 3)), 14.0);
    }

    #[test]
    fn test_comparison_and_boolean() {
        let eqn = compile(&layout(), "energy > 5 && age < 10").unwrap();
        assert_eq!(eqn.eval(&org(6.0, 3)), 1.0);
        assert_eq!(eqn.eval(&org(4.0, 3)), 0.0);
    }

    #[test]
    fn test_unknown_trait_fails_at_compile() {
        assert_eq!(
            compile(&layout(), "missing + 1").unwrap_err(),
            QueryError::UnknownTrait("missing".into())
        );
    }

    #[test]
    fn test_text_trait_rejected() {
        assert!(matches!(
            compile(&layout(), "taxon + 1").unwrap_err(),
            QueryError::NotNumeric { .. }
        ));
    }

    #[test]
    fn test_referenced_traits() {
        let names = referenced_traits("energy / 2 + age ** 2 > energy").unwrap();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["age".to_string(), "energy".to_string()]
        );
    }

    #[test]
    fn test_unary_chain() {
        let eqn = compile(&layout(), "--energy").unwrap();
        assert_eq!(eqn.eval(&org(4.0, 0)), 4.0);
        let eqn = compile(&layout(), "!energy").unwrap();
        assert_eq!(eqn.eval(&org(0.0, 0)), 1.0);
    }
}
