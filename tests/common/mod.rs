use std::sync::Arc;

use vivarium_data::{Population, TraitLayout, TraitStore, TraitValue, TypeTag};

#[allow(dead_code)]
pub struct PopulationBuilder {
    name: String,
    layout: TraitLayout,
    rows: Vec<Vec<TraitValue>>,
}

#[allow(dead_code)]
impl PopulationBuilder {
    pub fn new() -> Self {
        Self {
            name: "main".to_string(),
            layout: TraitLayout::new(),
            rows: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_trait(mut self, name: &str, tag: TypeTag) -> Self {
        self.layout
            .add_trait(name, tag)
            .expect("test layout declares each trait once");
        self
    }

    /// Adds one organism with values for the declared traits, in
    /// declaration order. Missing tail slots stay at their zero value.
    pub fn with_organism(mut self, values: Vec<TraitValue>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn build(self) -> Population {
        let mut pop = Population::new(&self.name, Arc::new(self.layout));
        for row in self.rows {
            let mut store = TraitStore::from_layout(pop.layout());
            for (id, value) in row.into_iter().enumerate() {
                store.set(id, value);
            }
            pop.spawn(store);
        }
        pop
    }
}

/// Population with a single numeric `energy` trait.
#[allow(dead_code)]
pub fn energy_population(values: &[f64]) -> Population {
    let mut builder = PopulationBuilder::new().with_trait("energy", TypeTag::Float);
    for &v in values {
        builder = builder.with_organism(vec![TraitValue::Float(v)]);
    }
    builder.build()
}

/// Population with numeric `energy` and textual `taxon` traits.
#[allow(dead_code)]
pub fn tagged_population(values: &[(f64, &str)]) -> Population {
    let mut builder = PopulationBuilder::new()
        .with_trait("energy", TypeTag::Float)
        .with_trait("taxon", TypeTag::Text);
    for &(e, t) in values {
        builder = builder.with_organism(vec![TraitValue::Float(e), TraitValue::Text(t.into())]);
    }
    builder.build()
}
