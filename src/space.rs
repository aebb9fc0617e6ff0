//! AttrModel v1: Object Space
//!
//! Arena of classes and entities. Pure storage: no lookup rules here.

use std::collections::BTreeMap;

use crate::descriptor::{Descriptor, Property};
use crate::error::{AttrError, AttrResult};
use crate::value::{ClassId, EntityId, Function, Value};

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

/// A class: name, namespace and at most one parent.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    pub parent: Option<ClassId>,
    pub namespace: BTreeMap<String, Value>,
    /// `Some` when the class body declares slots (possibly empty).
    pub slots: Option<Vec<String>>,
}

impl ClassDef {
    pub fn own(&self, name: &str) -> Option<&Value> {
        self.namespace.get(name)
    }
}

/// Class body under construction. Registered through `AttributeResolver::define_class`.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    pub(crate) name: String,
    pub(crate) parent: Option<ClassId>,
    pub(crate) namespace: BTreeMap<String, Value>,
    pub(crate) slots: Option<Vec<String>>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            namespace: BTreeMap::new(),
            slots: None,
        }
    }

    pub fn parent(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Plain class attribute.
    pub fn attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.namespace.insert(name.to_string(), value.into());
        self
    }

    /// Function bound to the entity when read through an entity.
    pub fn method<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&mut crate::resolver::AttributeResolver, &[Value]) -> AttrResult<Value> + 'static,
    {
        let f = Function::new(name, body);
        self.attr(name, f)
    }

    pub fn property(self, name: &str, property: Property) -> Self {
        self.attr(name, Descriptor::Property(property))
    }

    pub fn class_method(self, name: &str, func: Function) -> Self {
        self.attr(name, Descriptor::ClassMethod(func))
    }

    pub fn static_method(self, name: &str, func: Function) -> Self {
        self.attr(name, Descriptor::StaticMethod(func))
    }

    pub fn descriptor(self, name: &str, descriptor: Descriptor) -> Self {
        self.attr(name, descriptor)
    }

    /// Declare fixed storage slots.
    pub fn slots(mut self, names: &[&str]) -> Self {
        self.slots = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// An instance: identity, class, and either a local mapping or fixed slots.
#[derive(Debug, Clone)]
pub struct EntityData {
    pub id: EntityId,
    pub class: ClassId,
    fixed: bool,
    local: Option<BTreeMap<String, Value>>,
    slot_values: BTreeMap<String, Value>,
}

impl EntityData {
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// The local mapping, if one has been created.
    pub fn local(&self) -> Option<&BTreeMap<String, Value>> {
        self.local.as_ref()
    }

    pub fn local_value(&self, name: &str) -> Option<&Value> {
        self.local.as_ref().and_then(|m| m.get(name))
    }

    /// Write into the local mapping, creating it on first use.
    pub fn store_local(&mut self, name: &str, value: Value) -> AttrResult<()> {
        if self.fixed {
            return Err(AttrError::SlotNotDeclared(name.to_string()));
        }
        self.local
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove_local(&mut self, name: &str) -> AttrResult<Value> {
        if self.fixed {
            return Err(AttrError::SlotNotDeclared(name.to_string()));
        }
        self.local
            .as_mut()
            .and_then(|m| m.remove(name))
            .ok_or_else(|| AttrError::AttributeNotFound(name.to_string()))
    }

    pub fn slot_values(&self) -> &BTreeMap<String, Value> {
        &self.slot_values
    }

    pub fn slot_value(&self, slot: &str) -> Option<&Value> {
        self.slot_values.get(slot)
    }

    pub(crate) fn set_slot(&mut self, slot: &str, value: Value) {
        self.slot_values.insert(slot.to_string(), value);
    }

    pub(crate) fn clear_slot(&mut self, slot: &str) -> Option<Value> {
        self.slot_values.remove(slot)
    }
}

// ---------------------------------------------------------------------------
// Space
// ---------------------------------------------------------------------------

/// Owner of every class and entity. Ids are never reused.
#[derive(Debug, Clone, Default)]
pub struct ObjectSpace {
    classes: BTreeMap<ClassId, ClassDef>,
    entities: BTreeMap<EntityId, EntityData>,
    next_class: u32,
    next_entity: u32,
}

impl ObjectSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(&self, id: ClassId) -> AttrResult<&ClassDef> {
        self.classes.get(&id).ok_or(AttrError::UnknownClass(id))
    }

    pub fn class_mut(&mut self, id: ClassId) -> AttrResult<&mut ClassDef> {
        self.classes.get_mut(&id).ok_or(AttrError::UnknownClass(id))
    }

    pub fn entity(&self, id: EntityId) -> AttrResult<&EntityData> {
        self.entities.get(&id).ok_or(AttrError::UnknownEntity(id))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> AttrResult<&mut EntityData> {
        self.entities.get_mut(&id).ok_or(AttrError::UnknownEntity(id))
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityData> {
        self.entities.values()
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.classes.values().find(|c| c.name == name).map(|c| c.id)
    }

    pub(crate) fn insert_class(
        &mut self,
        name: String,
        parent: Option<ClassId>,
        namespace: BTreeMap<String, Value>,
        slots: Option<Vec<String>>,
    ) -> ClassId {
        let id = ClassId(self.next_class);
        self.next_class += 1;
        self.classes.insert(
            id,
            ClassDef {
                id,
                name,
                parent,
                namespace,
                slots,
            },
        );
        id
    }

    pub(crate) fn remove_class(&mut self, id: ClassId) {
        self.classes.remove(&id);
    }

    pub(crate) fn remove_entity(&mut self, id: EntityId) {
        self.entities.remove(&id);
    }

    pub(crate) fn insert_entity(&mut self, class: ClassId, fixed: bool) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(
            id,
            EntityData {
                id,
                class,
                fixed,
                local: None,
                slot_values: BTreeMap::new(),
            },
        );
        id
    }
}
