//! Per-organism trait storage.

use serde::{Deserialize, Serialize};

use crate::layout::{TraitId, TraitLayout};
use crate::value::{TraitValue, TypeTag};

/// The trait values of one organism, indexed by the ids of the population's
/// layout. A store is always created from a layout so the slot count and
/// kinds line up by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitStore {
    values: Vec<TraitValue>,
}

impl TraitStore {
    /// Creates a store with the zero/empty value in every slot of `layout`.
    #[must_use]
    pub fn from_layout(layout: &TraitLayout) -> Self {
        let values = layout
            .iter()
            .map(|(_, _, tag)| TraitValue::zero_for(tag))
            .collect();
        Self { values }
    }

    #[must_use]
    pub fn get(&self, id: TraitId) -> Option<&TraitValue> {
        self.values.get(id)
    }

    /// Overwrites the slot `id`. Out-of-range ids are ignored rather than
    /// grown: a store never outgrows its layout.
    pub fn set(&mut self, id: TraitId, value: TraitValue) {
        if let Some(slot) = self.values.get_mut(id) {
            *slot = value;
        }
    }

    /// Numeric view of slot `id`; 0.0 for absent or non-numeric slots so
    /// equation evaluation never panics mid-scan.
    #[must_use]
    pub fn get_f64(&self, id: TraitId) -> f64 {
        self.get(id).and_then(TraitValue::as_f64).unwrap_or(0.0)
    }

    /// Textual rendering of slot `id` for reports and string aggregation.
    #[must_use]
    pub fn value_as_text(&self, id: TraitId) -> String {
        self.get(id).map(TraitValue::render).unwrap_or_default()
    }

    /// Appends `value` to the ordered record in slot `id`, dropping the
    /// oldest entries beyond `cap` (0 means unbounded). The slot becomes a
    /// JSON array payload if it was not one already.
    pub fn append_to_record(&mut self, id: TraitId, value: &TraitValue, cap: usize) {
        let Some(slot) = self.values.get_mut(id) else {
            return;
        };
        let entry = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        if let TraitValue::Opaque(serde_json::Value::Array(items)) = slot {
            items.push(entry);
            if cap > 0 && items.len() > cap {
                let excess = items.len() - cap;
                items.drain(..excess);
            }
            return;
        }
        *slot = TraitValue::Opaque(serde_json::Value::Array(vec![entry]));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Grows the store with zero values up to `layout`'s current slot count,
    /// for organisms created before late trait declarations landed.
    pub fn conform_to(&mut self, layout: &TraitLayout) {
        for (id, _, tag) in layout.iter() {
            if id >= self.values.len() {
                self.values.push(TraitValue::zero_for(tag));
            }
        }
    }
}

/// Convenience for building a store slot-by-slot in tests and injectors.
impl FromIterator<TraitValue> for TraitStore {
    fn from_iter<I: IntoIterator<Item = TraitValue>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl TraitStore {
    /// Whether slot `id` currently holds the given kind.
    #[must_use]
    pub fn slot_is(&self, id: TraitId, tag: TypeTag) -> bool {
        self.get(id).is_some_and(|v| v.type_tag() == tag)
    }
}
