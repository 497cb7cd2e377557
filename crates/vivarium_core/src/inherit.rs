//! Birth-time trait initialization.
//!
//! When an organism is born, every declared trait is reset according to its
//! inheritance policy: back to the default, copied from the first parent, or
//! combined across all parents. Traits modeling destructive resources also
//! reset the parents to the computed child value, and archiving policies
//! squirrel the pre-reset values away under derived names.

use vivarium_data::{TraitLayout, TraitStore, TraitValue, TypeTag};

use crate::error::{QueryError, Result};
use crate::trait_registry::{TraitArchive, TraitInit, TraitRegistry, TraitSpec};

/// Shared inputs for one birth event.
pub struct BirthSettings<'a> {
    pub layout: &'a TraitLayout,
    /// Cap on `archive_<name>` records; 0 means unbounded.
    pub archive_cap: usize,
}

/// The value a newborn receives for `spec`, given its parents. An empty
/// parent slice means injection, which always takes the default.
pub fn inherited_value(
    spec: &TraitSpec,
    layout: &TraitLayout,
    parents: &[&TraitStore],
) -> Result<TraitValue> {
    let default = || {
        spec.default_value()
            .cloned()
            .unwrap_or_else(|| TraitValue::zero_for(spec.type_tag()))
    };
    if parents.is_empty() {
        return Ok(default());
    }
    let id = layout
        .id_of(spec.name())
        .ok_or_else(|| QueryError::UnknownTrait(spec.name().to_string()))?;

    match spec.init() {
        TraitInit::Default => Ok(default()),
        TraitInit::Parent => Ok(parents[0].get(id).cloned().unwrap_or_else(default)),
        TraitInit::Average | TraitInit::Minimum | TraitInit::Maximum => {
            if !spec.type_tag().is_numeric() {
                return Err(QueryError::NotNumeric {
                    name: spec.name().to_string(),
                    tag: spec.type_tag(),
                });
            }
            let values: Vec<f64> = parents.iter().map(|p| p.get_f64(id)).collect();
            let combined = match spec.init() {
                TraitInit::Average => values.iter().sum::<f64>() / values.len() as f64,
                TraitInit::Minimum => values.iter().copied().fold(f64::INFINITY, f64::min),
                _ => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            Ok(wrap_numeric(spec.type_tag(), combined))
        }
    }
}

/// Resets one store's slot for `spec` to `value`, archiving the old value
/// first where the policy asks for it.
pub fn reset_trait(
    spec: &TraitSpec,
    settings: &BirthSettings<'_>,
    store: &mut TraitStore,
    value: TraitValue,
) -> Result<()> {
    let layout = settings.layout;
    let id = layout
        .id_of(spec.name())
        .ok_or_else(|| QueryError::UnknownTrait(spec.name().to_string()))?;

    match spec.archive() {
        TraitArchive::None => {}
        TraitArchive::LastReset => {
            if let (Some(last_id), Some(old)) = (layout.id_of(&spec.last_name()), store.get(id)) {
                let old = old.clone();
                store.set(last_id, old);
            }
        }
        TraitArchive::AllResets | TraitArchive::AllChanges => {
            if let Some(archive_id) = layout.id_of(&spec.archive_name()) {
                if let Some(old) = store.get(id).cloned() {
                    store.append_to_record(archive_id, &old, settings.archive_cap);
                }
            }
        }
    }
    store.set(id, value);
    Ok(())
}

/// Applies every declaration in `registry` to a birth event: the child's
/// slots are reset to their inherited values, and parents are reset too
/// where the declaration models a destructive resource. Failures are
/// collected as rendered messages; the rest of the traits still apply.
pub fn apply_birth(
    registry: &TraitRegistry,
    settings: &BirthSettings<'_>,
    child: &mut TraitStore,
    parents: &mut [TraitStore],
) -> Vec<String> {
    let mut errors = Vec::new();
    for spec in registry.iter() {
        let parent_refs: Vec<&TraitStore> = parents.iter().collect();
        let value = match inherited_value(spec, settings.layout, &parent_refs) {
            Ok(v) => v,
            Err(e) => {
                errors.push(e.to_string());
                continue;
            }
        };
        if let Err(e) = reset_trait(spec, settings, child, value.clone()) {
            errors.push(e.to_string());
            continue;
        }
        if spec.resets_parent() {
            for parent in parents.iter_mut() {
                if let Err(e) = reset_trait(spec, settings, parent, value.clone()) {
                    errors.push(e.to_string());
                }
            }
        }
    }
    errors
}

fn wrap_numeric(tag: TypeTag, value: f64) -> TraitValue {
    match tag {
        TypeTag::Int => TraitValue::Int(value.round() as i64),
        TypeTag::Bool => TraitValue::Bool(value != 0.0),
        _ => TraitValue::Float(value),
    }
}
