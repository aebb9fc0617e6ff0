//! AttrModel v1: Invariant Checks
//!
//! Run after every structural mutation. The first violation is returned
//! as `AttrError::InvariantViolation`.

use crate::chain::{chain_slots, detect_cycles, walk};
use crate::error::{AttrError, AttrResult};
use crate::space::ObjectSpace;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn check_invariants(space: &ObjectSpace) -> AttrResult<()> {
    check_parent_refs(space)?;
    check_acyclic(space)?;
    check_entity_classes(space)?;
    check_fixed_entities(space)?;
    check_fixed_flags(space)?;
    check_slot_values(space)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

/// Every parent reference names an existing class.
fn check_parent_refs(space: &ObjectSpace) -> AttrResult<()> {
    for class in space.classes() {
        if let Some(parent) = class.parent {
            if space.class(parent).is_err() {
                return Err(AttrError::InvariantViolation {
                    rule: "parent_refs",
                    detail: format!("class {:?} has unknown parent {:?}", class.name, parent),
                });
            }
        }
    }
    Ok(())
}

fn check_acyclic(space: &ObjectSpace) -> AttrResult<()> {
    let cycles = detect_cycles(space);
    match cycles.first() {
        Some(cycle) => Err(AttrError::InvariantViolation {
            rule: "acyclic_chain",
            detail: format!("inheritance cycle: {}", cycle.join(" -> ")),
        }),
        None => Ok(()),
    }
}

fn check_entity_classes(space: &ObjectSpace) -> AttrResult<()> {
    for entity in space.entities() {
        if space.class(entity.class).is_err() {
            return Err(AttrError::InvariantViolation {
                rule: "entity_class",
                detail: format!("entity {:?} has unknown class {:?}", entity.id, entity.class),
            });
        }
    }
    Ok(())
}

/// Fixed-slot entities never acquire a local mapping.
fn check_fixed_entities(space: &ObjectSpace) -> AttrResult<()> {
    for entity in space.entities() {
        if entity.is_fixed() && entity.local().is_some() {
            return Err(AttrError::InvariantViolation {
                rule: "fixed_slots",
                detail: format!("fixed-slot entity {:?} has a local mapping", entity.id),
            });
        }
    }
    Ok(())
}

/// The stored fixed flag agrees with the current chain: fixed exactly when
/// every class in it declares slots.
fn check_fixed_flags(space: &ObjectSpace) -> AttrResult<()> {
    for entity in space.entities() {
        let expected = chain_slots(space, entity.class).is_some();
        if entity.is_fixed() != expected {
            return Err(AttrError::InvariantViolation {
                rule: "fixed_flags",
                detail: format!(
                    "entity {:?} is {} but its class chain says {}",
                    entity.id,
                    layout_name(entity.is_fixed()),
                    layout_name(expected)
                ),
            });
        }
    }
    Ok(())
}

fn layout_name(fixed: bool) -> &'static str {
    if fixed {
        "fixed-slot"
    } else {
        "dynamic"
    }
}

/// Slot values only live under names declared somewhere in the chain.
fn check_slot_values(space: &ObjectSpace) -> AttrResult<()> {
    for entity in space.entities() {
        if entity.slot_values().is_empty() {
            continue;
        }
        let declared: Vec<String> = walk(space, entity.class)
            .filter_map(|c| c.slots.clone())
            .flatten()
            .collect();
        for slot in entity.slot_values().keys() {
            if !declared.contains(slot) {
                return Err(AttrError::InvariantViolation {
                    rule: "slot_values",
                    detail: format!("entity {:?} stores undeclared slot {:?}", entity.id, slot),
                });
            }
        }
    }
    Ok(())
}
