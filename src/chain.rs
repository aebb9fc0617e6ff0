//! AttrModel v1: Inheritance Chains
//!
//! Single-inheritance walks over an `ObjectSpace`. No MRO: every class has
//! at most one parent, so the chain is a path ending at a root.

use std::collections::{BTreeMap, BTreeSet};

use crate::space::{ClassDef, ObjectSpace};
use crate::value::{ClassId, Value};

// ---------------------------------------------------------------------------
// Walking
// ---------------------------------------------------------------------------

/// Iterator from a class up to its root.
///
/// Bounded by the number of classes so a corrupted (cyclic) space cannot
/// loop forever.
pub struct ClassChain<'a> {
    space: &'a ObjectSpace,
    next: Option<ClassId>,
    remaining: usize,
}

impl<'a> Iterator for ClassChain<'a> {
    type Item = &'a ClassDef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let class = self.space.class(self.next?).ok()?;
        self.remaining -= 1;
        self.next = class.parent;
        Some(class)
    }
}

/// Chain starting at `start` itself.
pub fn walk(space: &ObjectSpace, start: ClassId) -> ClassChain<'_> {
    ClassChain {
        space,
        next: Some(start),
        remaining: space.classes().count(),
    }
}

/// First class in the chain whose namespace holds `name`.
pub fn find_in_chain(space: &ObjectSpace, start: ClassId, name: &str) -> Option<(ClassId, Value)> {
    walk(space, start).find_map(|c| c.own(name).map(|v| (c.id, v.clone())))
}

/// `cls` is `ancestor` or inherits from it.
pub fn is_subclass(space: &ObjectSpace, cls: ClassId, ancestor: ClassId) -> bool {
    walk(space, cls).any(|c| c.id == ancestor)
}

/// Names visible through the chain, deduplicated and sorted.
pub fn chain_names(space: &ObjectSpace, start: ClassId) -> BTreeSet<String> {
    walk(space, start)
        .flat_map(|c| c.namespace.keys().cloned())
        .collect()
}

/// Union of declared slots, or `None` if any class in the chain has no
/// slot declaration (its entities then get a local mapping).
pub fn chain_slots(space: &ObjectSpace, start: ClassId) -> Option<BTreeSet<String>> {
    let mut slots = BTreeSet::new();
    for class in walk(space, start) {
        slots.extend(class.slots.as_ref()?.iter().cloned());
    }
    Some(slots)
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

/// Would pointing `cls` at `parent` close a loop?
pub fn would_cycle(space: &ObjectSpace, cls: ClassId, parent: ClassId) -> bool {
    is_subclass(space, parent, cls)
}

/// Find parent cycles. Each cycle is reported once as the class names
/// along the loop, starting and ending at the same class.
///
/// Out-degree is at most one, so a three-colour walk per root suffices.
/// Roots are visited in id order for determinism.
pub fn detect_cycles(space: &ObjectSpace) -> Vec<Vec<String>> {
    const WHITE: u8 = 0;
    const GREY: u8 = 1;
    const BLACK: u8 = 2;

    let mut colour: BTreeMap<ClassId, u8> = space.classes().map(|c| (c.id, WHITE)).collect();
    let mut cycles = Vec::new();

    let ids: Vec<ClassId> = space.classes().map(|c| c.id).collect();
    for start in ids {
        if colour.get(&start).copied() != Some(WHITE) {
            continue;
        }

        let mut path: Vec<ClassId> = Vec::new();
        let mut node = Some(start);
        while let Some(id) = node {
            match colour.get(&id).copied() {
                Some(WHITE) => {
                    colour.insert(id, GREY);
                    path.push(id);
                    node = space.class(id).ok().and_then(|c| c.parent);
                }
                Some(GREY) => {
                    // Loop closes on a node of the current path.
                    if let Some(pos) = path.iter().position(|p| *p == id) {
                        let mut cycle: Vec<String> = path[pos..]
                            .iter()
                            .filter_map(|p| space.class(*p).ok().map(|c| c.name.clone()))
                            .collect();
                        if let Some(first) = cycle.first().cloned() {
                            cycle.push(first);
                        }
                        cycles.push(cycle);
                    }
                    break;
                }
                // Black or dangling parent: nothing new on this path.
                _ => break,
            }
        }
        for id in path {
            colour.insert(id, BLACK);
        }
    }

    cycles
}
