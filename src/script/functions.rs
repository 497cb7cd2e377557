//! Population and collection member functions.
//!
//! The uniform query surface user scripts see on both a full population and
//! an arbitrary organism subset, each a thin binding of the aggregation
//! engine with a fixed mode, plus the subset producers (`FIND_MIN`,
//! `FIND_MAX`, `FILTER`) and the organism-moving operations
//! (`REPLACE_WITH`, `APPEND`).

use vivarium_core::aggregate::SummaryValue;
use vivarium_core::eqn::{self, CompiledEquation};
use vivarium_data::{Collection, OrganismSource, Population, TraitLayout};

use super::{FunctionInfo, ScriptEngine, ScriptValue, SimControl, TargetKind};

/// Query functions exposed on both populations and collections:
/// `(script name, aggregation mode, description)`.
const QUERY_BINDINGS: &[(&str, &str, &str)] = &[
    ("TRAIT", "", "Return the value of the provided trait for the first organism"),
    ("CALC_RICHNESS", "richness", "Count the number of distinct values of a trait (or equation)."),
    ("CALC_MODE", "mode", "Identify the most common value of a trait (or equation)."),
    ("CALC_MEAN", "mean", "Calculate the average value of a trait (or equation)."),
    ("CALC_MIN", "min", "Find the smallest value of a trait (or equation)."),
    ("CALC_MAX", "max", "Find the largest value of a trait (or equation)."),
    ("ID_MIN", "min_id", "Find the index of the smallest value of a trait (or equation)."),
    ("ID_MAX", "max_id", "Find the index of the largest value of a trait (or equation)."),
    ("CALC_MEDIAN", "median", "Find the 50-percentile value of a trait (or equation)."),
    ("CALC_VARIANCE", "variance", "Find the variance of the distribution of values of a trait (or equation)."),
    ("CALC_STDDEV", "stddev", "Find the standard deviation of the distribution of values of a trait (or equation)."),
    ("CALC_SUM", "sum", "Add up the total value of a trait (or equation)."),
    ("CALC_ENTROPY", "entropy", "Determine the entropy of values for a trait (or equation)."),
];

impl<C: SimControl> ScriptEngine<C> {
    /// Member functions for the host's registration pass, covering both
    /// target types.
    #[must_use]
    pub fn member_functions(&self) -> Vec<FunctionInfo> {
        let mut entries = Vec::new();
        for target in [TargetKind::Population, TargetKind::Collection] {
            for &(name, _, desc) in QUERY_BINDINGS {
                entries.push(FunctionInfo { name, desc, target });
            }
            entries.push(FunctionInfo {
                name: "FIND_MIN",
                desc: "Produce OrgList with just the org with the minimum value of the provided function.",
                target,
            });
            entries.push(FunctionInfo {
                name: "FIND_MAX",
                desc: "Produce OrgList with just the org with the maximum value of the provided function.",
                target,
            });
            entries.push(FunctionInfo {
                name: "FILTER",
                desc: "Produce OrgList with just the orgs that pass through the filter criteria.",
                target,
            });
        }
        entries.push(FunctionInfo {
            name: "REPLACE_WITH",
            desc: "Move all organisms from another population, removing current orgs.",
            target: TargetKind::Population,
        });
        entries.push(FunctionInfo {
            name: "APPEND",
            desc: "Move all organisms from another population, adding after current orgs.",
            target: TargetKind::Population,
        });
        entries
    }

    fn numeric(&mut self, source: &dyn OrganismSource, expr: &str, mode: &str) -> f64 {
        self.summarize(source, expr, mode, SummaryValue::Number(0.0))
            .as_f64()
    }

    fn textual(&mut self, source: &dyn OrganismSource, expr: &str, mode: &str) -> String {
        self.summarize(source, expr, mode, SummaryValue::Text(String::new()))
            .render()
    }

    /// `TRAIT`: the expression's value for the first organism.
    pub fn trait_value(&mut self, source: &dyn OrganismSource, expr: &str) -> String {
        self.textual(source, expr, "")
    }

    pub fn calc_richness(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "richness")
    }

    pub fn calc_mode(&mut self, source: &dyn OrganismSource, expr: &str) -> String {
        self.textual(source, expr, "mode")
    }

    pub fn calc_mean(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "mean")
    }

    pub fn calc_min(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "min")
    }

    pub fn calc_max(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "max")
    }

    pub fn id_min(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "min_id")
    }

    pub fn id_max(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "max_id")
    }

    pub fn calc_median(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "median")
    }

    pub fn calc_variance(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "variance")
    }

    pub fn calc_stddev(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "stddev")
    }

    pub fn calc_sum(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "sum")
    }

    pub fn calc_entropy(&mut self, source: &dyn OrganismSource, expr: &str) -> f64 {
        self.numeric(source, expr, "entropy")
    }

    /// Mutual information between the expression and another trait.
    pub fn calc_mutual_info(
        &mut self,
        source: &dyn OrganismSource,
        expr: &str,
        other: &str,
    ) -> f64 {
        self.numeric(source, expr, &format!(":{other}"))
    }

    // --- subset producers ---

    /// `FIND_MIN`: the single organism achieving the smallest value, as a
    /// one-element collection (empty in, empty out).
    pub fn find_min(&mut self, pop: &Population, expr: &str) -> Collection {
        if pop.is_empty() {
            return Collection::empty_for(pop.id());
        }
        let idx = self.numeric(pop, expr, "min_id") as usize;
        pop.singleton(idx)
    }

    /// `FIND_MAX`: the single organism achieving the largest value.
    pub fn find_max(&mut self, pop: &Population, expr: &str) -> Collection {
        if pop.is_empty() {
            return Collection::empty_for(pop.id());
        }
        let idx = self.numeric(pop, expr, "max_id") as usize;
        pop.singleton(idx)
    }

    /// `FIND_MIN` over an existing subset.
    pub fn find_min_in(
        &mut self,
        pop: &Population,
        within: &Collection,
        expr: &str,
    ) -> Collection {
        self.find_extreme_in(pop, within, expr, "min_id")
    }

    /// `FIND_MAX` over an existing subset.
    pub fn find_max_in(
        &mut self,
        pop: &Population,
        within: &Collection,
        expr: &str,
    ) -> Collection {
        self.find_extreme_in(pop, within, expr, "max_id")
    }

    fn find_extreme_in(
        &mut self,
        pop: &Population,
        within: &Collection,
        expr: &str,
        mode: &str,
    ) -> Collection {
        let Some(view) = pop.view(within) else {
            self.record_error(format!(
                "Collection does not belong to population '{}'",
                pop.name()
            ));
            return Collection::empty_for(pop.id());
        };
        if within.is_empty() {
            return Collection::empty_for(pop.id());
        }
        let slot = self.numeric(&view, expr, mode) as usize;
        match within.member(slot) {
            Some(idx) => pop.singleton(idx),
            None => Collection::empty_for(pop.id()),
        }
    }

    /// `FILTER`: the subset for which the expression is truthy. The
    /// expression compiles once; an empty source skips compilation
    /// entirely, since there is no layout worth consulting.
    pub fn filter(&mut self, pop: &Population, expr: &str) -> Collection {
        let mut out = Collection::empty_for(pop.id());
        if pop.is_empty() {
            return out;
        }
        let Some(predicate) = self.compile_equation(pop.layout(), expr) else {
            return out;
        };
        for (idx, org) in pop.iter().enumerate() {
            if predicate.eval_truthy(org) {
                out.insert(idx);
            }
        }
        out
    }

    /// `FILTER` over an existing subset.
    pub fn filter_in(&mut self, pop: &Population, within: &Collection, expr: &str) -> Collection {
        let mut out = Collection::empty_for(pop.id());
        if within.is_empty() || pop.view(within).is_none() {
            return out;
        }
        let Some(predicate) = self.compile_equation(pop.layout(), expr) else {
            return out;
        };
        for &idx in within.iter() {
            if let Some(org) = pop.organism(idx) {
                if predicate.eval_truthy(org) {
                    out.insert(idx);
                }
            }
        }
        out
    }

    /// Preprocesses and compiles a trait equation against a layout,
    /// recording any failure. This is the general equation entry point;
    /// `FILTER` and selection modules both funnel through it.
    pub fn compile_equation(
        &mut self,
        layout: &TraitLayout,
        expr: &str,
    ) -> Option<CompiledEquation> {
        let expanded = match self.preprocess(expr) {
            Ok(text) => text,
            Err(err) => {
                self.record_error(format!("Equation '{expr}': {err}"));
                return None;
            }
        };
        match eqn::compile(layout, &expanded) {
            Ok(equation) => Some(equation),
            Err(err) => {
                self.record_error(format!("Equation '{expr}': {err}"));
                None
            }
        }
    }

    /// Every trait name an equation depends on, for dependency analysis
    /// between modules without building a function.
    pub fn equation_traits(&self, expr: &str) -> vivarium_core::Result<std::collections::BTreeSet<String>> {
        eqn::referenced_traits(expr)
    }

    // --- organism transfer ---

    /// `REPLACE_WITH`: clears `to`, then moves every organism of `from`
    /// into it through the coordinator seam.
    pub fn replace_with(&mut self, to: &mut Population, from: &mut Population) {
        to.clear();
        self.control_mut().transfer_organisms(from, to);
    }

    /// `APPEND`: moves every organism of `from` after the current contents
    /// of `to`.
    pub fn append_from(&mut self, to: &mut Population, from: &mut Population) {
        self.control_mut().transfer_organisms(from, to);
    }

    // --- dynamic dispatch for the host engine ---

    /// Calls a query member function by script name, against the whole
    /// population or a subset of it. The organism-moving operations bind
    /// directly instead: they need two populations, not a query argument.
    pub fn call_member(
        &mut self,
        name: &str,
        pop: &Population,
        within: Option<&Collection>,
        arg: &str,
    ) -> ScriptValue {
        if let Some(&(_, mode, _)) = QUERY_BINDINGS.iter().find(|&&(n, _, _)| n == name) {
            let textual = matches!(name, "TRAIT" | "CALC_MODE");
            let default = if textual {
                SummaryValue::Text(String::new())
            } else {
                SummaryValue::Number(0.0)
            };
            let result = match within {
                Some(collection) => match pop.view(collection) {
                    Some(view) => self.summarize(&view, arg, mode, default),
                    None => {
                        self.record_error(format!(
                            "Collection does not belong to population '{}'",
                            pop.name()
                        ));
                        default
                    }
                },
                None => self.summarize(pop, arg, mode, default),
            };
            return result.into();
        }
        match name {
            "FIND_MIN" => ScriptValue::Subset(match within {
                Some(collection) => self.find_min_in(pop, collection, arg),
                None => self.find_min(pop, arg),
            }),
            "FIND_MAX" => ScriptValue::Subset(match within {
                Some(collection) => self.find_max_in(pop, collection, arg),
                None => self.find_max(pop, arg),
            }),
            "FILTER" => ScriptValue::Subset(match within {
                Some(collection) => self.filter_in(pop, collection, arg),
                None => self.filter(pop, arg),
            }),
            _ => {
                self.record_error(format!("Unknown member function '{name}'"));
                ScriptValue::Unit
            }
        }
    }
}
