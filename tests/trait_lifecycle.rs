mod common;

use common::PopulationBuilder;
use vivarium_core::inherit::{apply_birth, BirthSettings};
use vivarium_core::{
    build_summary, Analyze, Module, ModuleInfo, ModuleRole, Select, TraitInit, TraitRegistry,
};
use vivarium_data::{Collection, Population, TraitLayout, TraitStore, TraitValue, TypeTag};

/// Analyze/Select module tracking mean fitness and selecting organisms
/// above it.
struct FitnessTracker {
    info: ModuleInfo,
    last_mean: f64,
}

impl FitnessTracker {
    fn new() -> Self {
        let mut info = ModuleInfo::new("FitnessTracker");
        info.enable_role(ModuleRole::Analyze)
            .enable_role(ModuleRole::Select)
            .set_required_pops(1);
        Self {
            info,
            last_mean: 0.0,
        }
    }
}

impl Module for FitnessTracker {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ModuleInfo {
        &mut self.info
    }

    fn setup(&mut self) {
        self.info
            .add_owned_trait("fitness", "Accumulated fitness score", TraitValue::Float(0.0))
            .inherit_average()
            .archive_last();
        self.info
            .add_required_trait("energy", "Stored energy", TypeTag::Float);
    }
}

impl Analyze for FitnessTracker {
    fn analyze(&mut self, pop: &Population) {
        if let Ok(mean) = build_summary("fitness", "mean", pop.layout()) {
            self.last_mean = mean(pop).as_f64();
        }
    }
}

impl Select for FitnessTracker {
    fn select(&mut self, pop: &Population) -> Collection {
        let mut out = Collection::empty_for(pop.id());
        let Ok(threshold) = build_summary("fitness", "mean", pop.layout()) else {
            return out;
        };
        let cutoff = threshold(pop).as_f64();
        if let Ok(eqn) = vivarium_core::compile(pop.layout(), "fitness") {
            for (idx, org) in pop.iter().enumerate() {
                if eqn.eval(org) >= cutoff {
                    out.insert(idx);
                }
            }
        }
        out
    }
}

fn fitness_population(tracker: &FitnessTracker, scores: &[f64]) -> Population {
    let mut layout = TraitLayout::new();
    let errors = tracker.info().registry().apply_to_layout(&mut layout);
    assert!(errors.is_empty());
    let mut builder = PopulationBuilder::new();
    for (_, name, tag) in layout.iter() {
        builder = builder.with_trait(name, tag);
    }
    let mut pop = builder.build();
    for &score in scores {
        let idx = pop.spawn_default();
        pop.organism_mut(idx)
            .unwrap()
            .set(0, TraitValue::Float(score));
    }
    pop
}

#[test]
fn setup_declares_traits_and_layout_slots() {
    let mut tracker = FitnessTracker::new();
    tracker.setup();
    let registry = tracker.info().registry();
    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry.get("fitness").unwrap().init(),
        TraitInit::Average
    );

    let mut layout = TraitLayout::new();
    assert!(registry.apply_to_layout(&mut layout).is_empty());
    assert!(layout.has_name("fitness"));
    assert!(layout.has_name("last_fitness"));
    assert!(layout.has_name("energy"));
    assert!(tracker.info().errors().is_empty());
}

#[test]
fn capability_dispatch_through_role_traits() {
    let mut tracker = FitnessTracker::new();
    tracker.setup();
    let pop = fitness_population(&tracker, &[2.0, 4.0, 9.0]);

    assert!(tracker.info().has_role(ModuleRole::Analyze));
    let analyzer: &mut dyn Analyze = &mut tracker;
    analyzer.analyze(&pop);
    assert_eq!(tracker.last_mean, 5.0);

    let selector: &mut dyn Select = &mut tracker;
    let chosen = selector.select(&pop);
    let kept: Vec<usize> = chosen.iter().copied().collect();
    assert_eq!(kept, vec![2]);
}

#[test]
fn shared_registries_merge_into_one_layout() {
    let mut scorer = ModuleInfo::new("scorer");
    scorer.add_owned_trait("score", "fitness score", TraitValue::Float(0.0));
    let mut reader = ModuleInfo::new("reader");
    reader.add_required_trait("score", "fitness score", TypeTag::Float);
    reader.add_owned_trait("rank", "derived rank", TraitValue::Int(0));

    let mut layout = TraitLayout::new();
    assert!(scorer.registry().apply_to_layout(&mut layout).is_empty());
    // The reader re-declares `score` with the same type: idempotent.
    assert!(reader.registry().apply_to_layout(&mut layout).is_empty());
    assert_eq!(layout.len(), 2);

    // A third module disagreeing on the type is reported, not fatal.
    let mut rogue = ModuleInfo::new("rogue");
    rogue.add_required_trait("score", "fitness score", TypeTag::Text);
    let errors = rogue.registry().apply_to_layout(&mut layout);
    assert_eq!(errors.len(), 1);
    assert_eq!(layout.len(), 2);
}

#[test]
fn birth_resets_traits_per_policy() {
    let mut registry = TraitRegistry::new();
    registry
        .register_owned("fitness", "score", TraitValue::Float(0.0))
        .unwrap()
        .inherit_average()
        .archive_last();
    registry
        .register_owned("lineage", "lineage label", TraitValue::Text("founder".into()))
        .unwrap()
        .inherit_parent();
    let mut layout = TraitLayout::new();
    assert!(registry.apply_to_layout(&mut layout).is_empty());

    let fitness = layout.id_of("fitness").unwrap();
    let lineage = layout.id_of("lineage").unwrap();
    let mut parent_a = TraitStore::from_layout(&layout);
    parent_a.set(fitness, TraitValue::Float(6.0));
    parent_a.set(lineage, TraitValue::Text("alpha".into()));
    let mut parent_b = TraitStore::from_layout(&layout);
    parent_b.set(fitness, TraitValue::Float(2.0));
    parent_b.set(lineage, TraitValue::Text("beta".into()));

    let mut child = TraitStore::from_layout(&layout);
    let mut parents = vec![parent_a, parent_b];
    let settings = BirthSettings {
        layout: &layout,
        archive_cap: 16,
    };
    let errors = apply_birth(&registry, &settings, &mut child, &mut parents);
    assert!(errors.is_empty());

    assert_eq!(child.get_f64(fitness), 4.0);
    // First parent wins textual inheritance.
    assert_eq!(child.value_as_text(lineage), "alpha");
    // Parents keep their own values; no reset flag was set.
    assert_eq!(parents[0].get_f64(fitness), 6.0);
}

#[test]
fn injected_organisms_take_defaults() {
    let mut registry = TraitRegistry::new();
    registry
        .register_owned("energy", "stored energy", TraitValue::Float(25.0))
        .unwrap()
        .inherit_parent();
    let mut layout = TraitLayout::new();
    assert!(registry.apply_to_layout(&mut layout).is_empty());

    let mut child = TraitStore::from_layout(&layout);
    let settings = BirthSettings {
        layout: &layout,
        archive_cap: 0,
    };
    let errors = apply_birth(&registry, &settings, &mut child, &mut []);
    assert!(errors.is_empty());
    assert_eq!(child.get_f64(0), 25.0);
}
