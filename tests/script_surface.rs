mod common;

use common::{energy_population, tagged_population, PopulationBuilder};
use vivarium_data::TypeTag;
use vivarium_lib::script::{BasicControl, ScriptEngine, ScriptValue, SimControl, TargetKind};

fn engine() -> ScriptEngine<BasicControl> {
    ScriptEngine::new(BasicControl::new())
}

#[test]
fn find_min_and_max_return_singletons() {
    let pop = energy_population(&[5.0, 2.0, 9.0]);
    let mut engine = engine();

    let lowest = engine.find_min(&pop, "energy");
    assert_eq!(lowest.len(), 1);
    assert_eq!(lowest.member(0), Some(1));

    let highest = engine.find_max(&pop, "energy");
    assert_eq!(highest.member(0), Some(2));
}

#[test]
fn find_on_singleton_returns_same_organism() {
    let pop = energy_population(&[7.0]);
    let mut engine = engine();
    let min = engine.find_min(&pop, "energy");
    let max = engine.find_max(&pop, "energy");
    assert_eq!(min, max);
    assert_eq!(min.member(0), Some(0));
}

#[test]
fn find_on_empty_population_is_empty() {
    let pop = energy_population(&[]);
    let mut engine = engine();
    assert!(engine.find_min(&pop, "energy").is_empty());
    assert!(engine.find_max(&pop, "energy").is_empty());
    assert!(engine.errors().is_empty());
}

#[test]
fn find_within_collection_maps_back_to_population() {
    let pop = energy_population(&[5.0, 2.0, 9.0, 1.0]);
    let mut engine = engine();
    // Restrict to indices 0 and 2; the minimum within is organism 0.
    let subset = engine.filter(&pop, "energy >= 5");
    assert_eq!(subset.len(), 2);
    let min = engine.find_min_in(&pop, &subset, "energy");
    assert_eq!(min.member(0), Some(0));
    let max = engine.find_max_in(&pop, &subset, "energy");
    assert_eq!(max.member(0), Some(2));
}

#[test]
fn filter_tautology_keeps_membership() {
    let pop = energy_population(&[1.0, 2.0, 3.0]);
    let mut engine = engine();
    let all = engine.filter(&pop, "1 == 1");
    assert_eq!(all.len(), pop.len());
    for (slot, idx) in all.iter().enumerate() {
        assert_eq!(slot, *idx);
    }
    let none = engine.filter(&pop, "0");
    assert!(none.is_empty());
}

#[test]
fn filter_on_empty_population_skips_compilation() {
    let pop = energy_population(&[]);
    let mut engine = engine();
    // The expression is nonsense, but an empty source must not reach the
    // compiler at all.
    let out = engine.filter(&pop, "no_such_trait >");
    assert!(out.is_empty());
    assert!(engine.errors().is_empty());
}

#[test]
fn filter_bad_expression_recorded() {
    let pop = energy_population(&[1.0]);
    let mut engine = engine();
    let out = engine.filter(&pop, "no_such_trait > 1");
    assert!(out.is_empty());
    assert_eq!(engine.errors().len(), 1);
}

#[test]
fn filter_within_subset_narrows() {
    let pop = energy_population(&[1.0, 4.0, 6.0, 8.0]);
    let mut engine = engine();
    let above_three = engine.filter(&pop, "energy > 3");
    let above_five = engine.filter_in(&pop, &above_three, "energy > 5");
    let kept: Vec<usize> = above_five.iter().copied().collect();
    assert_eq!(kept, vec![2, 3]);
}

#[test]
fn replace_with_clears_destination_first() {
    let mut to = energy_population(&[1.0, 2.0]);
    let mut from = PopulationBuilder::new()
        .named("side")
        .with_trait("energy", TypeTag::Float)
        .with_organism(vec![vivarium_data::TraitValue::Float(9.0)])
        .build();
    let mut engine = engine();
    engine.replace_with(&mut to, &mut from);
    assert_eq!(to.len(), 1);
    assert!(from.is_empty());
    assert_eq!(to.organism(0).unwrap().get_f64(0), 9.0);
}

#[test]
fn append_keeps_destination_organisms() {
    let mut to = energy_population(&[1.0, 2.0]);
    let mut from = energy_population(&[9.0]);
    let mut engine = engine();
    engine.append_from(&mut to, &mut from);
    assert_eq!(to.len(), 3);
    assert!(from.is_empty());
    assert_eq!(to.organism(2).unwrap().get_f64(0), 9.0);
}

#[test]
fn member_dispatch_covers_query_surface() {
    let pop = tagged_population(&[(2.0, "wolf"), (8.0, "elk")]);
    let mut engine = engine();

    assert_eq!(
        engine.call_member("CALC_MEAN", &pop, None, "energy"),
        ScriptValue::Number(5.0)
    );
    assert_eq!(
        engine.call_member("TRAIT", &pop, None, "taxon"),
        ScriptValue::Text("wolf".into())
    );
    match engine.call_member("FIND_MAX", &pop, None, "energy") {
        ScriptValue::Subset(subset) => assert_eq!(subset.member(0), Some(1)),
        other => panic!("expected subset, got {other:?}"),
    }
    assert_eq!(
        engine.call_member("NO_SUCH_FUNCTION", &pop, None, ""),
        ScriptValue::Unit
    );
    assert_eq!(engine.errors().len(), 1);
}

#[test]
fn foreign_collection_is_rejected() {
    let pop = energy_population(&[1.0, 2.0]);
    let other = energy_population(&[3.0]);
    let foreign = other.all();
    let mut engine = engine();
    let result = engine.call_member("CALC_SUM", &pop, Some(&foreign), "energy");
    assert_eq!(result, ScriptValue::Number(0.0));
    assert_eq!(engine.errors().len(), 1);
}

#[test]
fn registration_surface_lists_both_targets() {
    let engine = engine();
    let members = engine.member_functions();
    let pop_traits = members
        .iter()
        .filter(|f| f.name == "TRAIT" && f.target == TargetKind::Population)
        .count();
    let col_traits = members
        .iter()
        .filter(|f| f.name == "TRAIT" && f.target == TargetKind::Collection)
        .count();
    assert_eq!(pop_traits, 1);
    assert_eq!(col_traits, 1);
    assert!(members.iter().any(|f| f.name == "REPLACE_WITH"));
    assert!(members.iter().any(|f| f.name == "CALC_ENTROPY"));
    assert!(engine.global_functions().iter().any(|f| f.name == "PP"));
}

#[test]
fn deprecated_names_are_fatal_by_policy() {
    let engine = engine();
    for (old, new) in [
        ("EVAL", "EXEC"),
        ("exit", "EXIT"),
        ("inject", "INJECT"),
        ("print", "PRINT"),
    ] {
        let mut fresh = ScriptEngine::new(BasicControl::new());
        fresh.call_global(old, None);
        assert!(fresh.control().exit_requested(), "{old} should request exit");
        assert!(fresh.errors().entries()[0].contains(new));
    }
    // A fresh engine with no deprecated calls never requests exit.
    assert!(!engine.control().exit_requested());
}
