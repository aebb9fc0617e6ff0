//! AttrModel v1: Attribute Resolver
//!
//! Read, write and delete resolution for `entity.attribute` and
//! `Class.attribute`, including descriptor dispatch and method binding.
//!
//! Precedence on entity get:
//!   1. data descriptor found on the class chain
//!   2. entity local storage
//!   3. non-data descriptor, function (bound to the entity), plain class value
//!   4. `AttributeNotFound`

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::chain::{chain_names, chain_slots, find_in_chain, is_subclass, would_cycle};
use crate::config::{ResolverConfig, ShadowPolicy};
use crate::descriptor::{invoke_delete, invoke_get, invoke_set, Descriptor};
use crate::error::{AttrError, AttrResult};
use crate::invariants::check_invariants;
use crate::names::validate_identifier;
use crate::space::{ClassBuilder, ObjectSpace};
use crate::value::{ClassId, EntityId, Value};

/// Owns the object space and applies the resolution rules to it.
///
/// Native functions and accessors receive `&mut AttributeResolver`, so
/// they can resolve further attributes (a computed property reading the
/// entity's other fields, for example).
#[derive(Debug, Default)]
pub struct AttributeResolver {
    space: ObjectSpace,
    config: ResolverConfig,
}

impl AttributeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            space: ObjectSpace::new(),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn space(&self) -> &ObjectSpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut ObjectSpace {
        &mut self.space
    }

    // -----------------------------------------------------------------------
    // Classes and entities
    // -----------------------------------------------------------------------

    /// Register a class body.
    ///
    /// Declared slots become `Member` descriptors in the namespace.
    pub fn define_class(&mut self, builder: ClassBuilder) -> AttrResult<ClassId> {
        let ClassBuilder {
            name,
            parent,
            mut namespace,
            slots,
        } = builder;

        validate_identifier(&name)?;
        if let Some(parent) = parent {
            self.space.class(parent)?;
        }
        if let Some(slots) = &slots {
            for slot in slots {
                validate_identifier(slot)?;
                if namespace.contains_key(slot) {
                    return Err(AttrError::SlotConflict(slot.clone()));
                }
            }
        }
        if self.config.unhash_on_eq
            && namespace.contains_key("__eq__")
            && !namespace.contains_key("__hash__")
        {
            namespace.insert("__hash__".to_string(), Value::None);
        }

        let id = self.space.insert_class(name.clone(), parent, namespace, slots.clone());
        for slot in slots.iter().flatten() {
            let member = Value::descriptor(Descriptor::Member {
                slot: slot.clone(),
                owner: id,
            });
            self.space.class_mut(id)?.namespace.insert(slot.clone(), member);
        }

        if let Err(err) = check_invariants(&self.space) {
            self.space.remove_class(id);
            return Err(err);
        }
        debug!(class = %name, id = id.0, parent = ?parent, slotted = slots.is_some(), "class defined");
        Ok(id)
    }

    /// Create an entity without running `__init__`.
    pub fn instantiate(&mut self, class: ClassId) -> AttrResult<EntityId> {
        self.space.class(class)?;
        let fixed = chain_slots(&self.space, class).is_some();
        let id = self.space.insert_entity(class, fixed);
        trace!(entity = id.0, class = class.0, fixed, "entity created");
        Ok(id)
    }

    /// Create an entity and run `__init__` bound to it with `args`.
    ///
    /// A failed `__init__` removes the entity again.
    pub fn construct(&mut self, class: ClassId, args: &[Value]) -> AttrResult<EntityId> {
        let entity = self.instantiate(class)?;
        if let Err(err) = self.run_init(class, entity, args) {
            self.space.remove_entity(entity);
            debug!(entity = entity.0, class = class.0, error = %err, "construction failed");
            return Err(err);
        }
        debug!(entity = entity.0, class = class.0, "entity constructed");
        Ok(entity)
    }

    fn run_init(&mut self, class: ClassId, entity: EntityId, args: &[Value]) -> AttrResult<()> {
        match find_in_chain(&self.space, class, "__init__") {
            Some((_, init)) => {
                let bound = self.bind_special(init, entity, class, "__init__")?;
                let result = self.call(&bound, args)?;
                if !result.is_none() {
                    return Err(AttrError::TypeMismatch(format!(
                        "__init__() should return None, not '{}'",
                        result.type_name()
                    )));
                }
                Ok(())
            }
            None if !args.is_empty() => {
                let name = self.space.class(class)?.name.clone();
                Err(AttrError::TypeMismatch(format!("{name}() takes no arguments")))
            }
            None => Ok(()),
        }
    }

    pub fn class_of(&self, entity: EntityId) -> AttrResult<ClassId> {
        Ok(self.space.entity(entity)?.class)
    }

    pub fn class_name(&self, class: ClassId) -> AttrResult<&str> {
        Ok(&self.space.class(class)?.name)
    }

    pub fn is_instance(&self, entity: EntityId, class: ClassId) -> AttrResult<bool> {
        let own = self.class_of(entity)?;
        Ok(is_subclass(&self.space, own, class))
    }

    pub fn is_subclass(&self, class: ClassId, ancestor: ClassId) -> AttrResult<bool> {
        self.space.class(class)?;
        self.space.class(ancestor)?;
        Ok(is_subclass(&self.space, class, ancestor))
    }

    /// Re-point a class at a new parent (or make it a root).
    ///
    /// Rejected when an existing instance of `class` or of a subclass would
    /// switch between fixed slots and a local mapping.
    pub fn set_parent(&mut self, class: ClassId, parent: Option<ClassId>) -> AttrResult<()> {
        let name = self.space.class(class)?.name.clone();
        if let Some(parent) = parent {
            let parent_name = self.space.class(parent)?.name.clone();
            if would_cycle(&self.space, class, parent) {
                return Err(AttrError::InheritanceCycle {
                    class: name,
                    parent: parent_name,
                });
            }
        }

        let previous = std::mem::replace(&mut self.space.class_mut(class)?.parent, parent);
        let layout_changed = self
            .space
            .entities()
            .filter(|e| is_subclass(&self.space, e.class, class))
            .any(|e| e.is_fixed() != chain_slots(&self.space, e.class).is_some());
        let result = if layout_changed {
            Err(AttrError::LayoutChange(name.clone()))
        } else {
            check_invariants(&self.space)
        };
        if let Err(err) = result {
            self.space.class_mut(class)?.parent = previous;
            return Err(err);
        }
        debug!(class = %name, parent = ?parent, "parent changed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// `entity.name`
    pub fn resolve_get(&mut self, entity: EntityId, name: &str) -> AttrResult<Value> {
        let class = self.class_of(entity)?;
        let candidate = find_in_chain(&self.space, class, name).map(|(_, v)| v);

        if let Some(Value::Descriptor(d)) = &candidate {
            if self.descriptor_beats_local(d) {
                trace!(entity = entity.0, attr = name, kind = d.kind_name(), "data descriptor get");
                return invoke_get(d, self, name, Some(entity), class);
            }
        }

        if let Some(local) = self.space.entity(entity)?.local_value(name) {
            trace!(entity = entity.0, attr = name, "local storage get");
            return Ok(local.clone());
        }

        match candidate {
            Some(Value::Descriptor(d)) => {
                trace!(entity = entity.0, attr = name, kind = d.kind_name(), "non-data descriptor get");
                invoke_get(&d, self, name, Some(entity), class)
            }
            Some(Value::Function(f)) => {
                trace!(entity = entity.0, attr = name, "method bound");
                Ok(Value::bound(f, Value::Entity(entity)))
            }
            Some(value) => Ok(value),
            None => Err(AttrError::AttributeNotFound(name.to_string())),
        }
    }

    /// `Class.name`
    pub fn resolve_class_get(&mut self, class: ClassId, name: &str) -> AttrResult<Value> {
        self.space.class(class)?;
        match find_in_chain(&self.space, class, name).map(|(_, v)| v) {
            Some(Value::Descriptor(d)) => {
                trace!(class = class.0, attr = name, kind = d.kind_name(), "class descriptor get");
                invoke_get(&d, self, name, None, class)
            }
            // Functions stay unbound when read through the class.
            Some(value) => Ok(value),
            None => Err(AttrError::AttributeNotFound(name.to_string())),
        }
    }

    /// `entity.name = value`
    pub fn resolve_set(&mut self, entity: EntityId, name: &str, value: Value) -> AttrResult<()> {
        let class = self.class_of(entity)?;
        if let Some((_, Value::Descriptor(d))) = find_in_chain(&self.space, class, name) {
            if d.is_data() {
                trace!(entity = entity.0, attr = name, kind = d.kind_name(), "data descriptor set");
                return invoke_set(&d, self, name, entity, value);
            }
            if self.config.non_data_shadowing == ShadowPolicy::Reject {
                return Err(AttrError::AttributeImmutable(name.to_string()));
            }
        }
        trace!(entity = entity.0, attr = name, "local storage set");
        self.space.entity_mut(entity)?.store_local(name, value)
    }

    /// `del entity.name`
    pub fn resolve_delete(&mut self, entity: EntityId, name: &str) -> AttrResult<()> {
        let class = self.class_of(entity)?;
        if let Some((_, Value::Descriptor(d))) = find_in_chain(&self.space, class, name) {
            if d.is_data() {
                trace!(entity = entity.0, attr = name, kind = d.kind_name(), "data descriptor delete");
                return invoke_delete(&d, self, name, entity);
            }
        }
        trace!(entity = entity.0, attr = name, "local storage delete");
        self.space.entity_mut(entity)?.remove_local(name).map(|_| ())
    }

    /// `Class.name = value`: writes the class's own namespace.
    pub fn set_class_attr(&mut self, class: ClassId, name: &str, value: Value) -> AttrResult<()> {
        let def = self.space.class_mut(class)?;
        def.namespace.insert(name.to_string(), value);
        debug!(class = %def.name, attr = name, "class attribute set");
        Ok(())
    }

    /// `del Class.name`: only the class's own namespace, never a parent's.
    pub fn delete_class_attr(&mut self, class: ClassId, name: &str) -> AttrResult<()> {
        let def = self.space.class_mut(class)?;
        if def.namespace.remove(name).is_none() {
            return Err(AttrError::AttributeNotFound(name.to_string()));
        }
        debug!(class = %def.name, attr = name, "class attribute deleted");
        Ok(())
    }

    fn descriptor_beats_local(&self, d: &Descriptor) -> bool {
        d.is_data() || self.config.non_data_shadowing == ShadowPolicy::Reject
    }

    // -----------------------------------------------------------------------
    // Convenience on top of resolution
    // -----------------------------------------------------------------------

    /// `hasattr`: only the attribute-error family counts as absence.
    pub fn has_attr(&mut self, entity: EntityId, name: &str) -> AttrResult<bool> {
        match self.resolve_get(entity, name) {
            Ok(_) => Ok(true),
            Err(err) if err.is_missing_attribute() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// `getattr(entity, name, default)`
    pub fn get_attr_or(&mut self, entity: EntityId, name: &str, default: Value) -> AttrResult<Value> {
        match self.resolve_get(entity, name) {
            Err(err) if err.is_missing_attribute() => Ok(default),
            other => other,
        }
    }

    /// `vars(entity)`: the local mapping. Fixed-slot entities have none.
    pub fn instance_dict(&self, entity: EntityId) -> AttrResult<BTreeMap<String, Value>> {
        let data = self.space.entity(entity)?;
        if data.is_fixed() {
            return Err(AttrError::AttributeNotFound("__dict__".to_string()));
        }
        Ok(data.local().cloned().unwrap_or_default())
    }

    /// `dir(entity)`: chain names, local names and filled slots, sorted.
    pub fn dir(&self, entity: EntityId) -> AttrResult<Vec<String>> {
        let data = self.space.entity(entity)?;
        let mut names: BTreeSet<String> = chain_names(&self.space, data.class);
        if let Some(local) = data.local() {
            names.extend(local.keys().cloned());
        }
        names.extend(data.slot_values().keys().cloned());
        Ok(names.into_iter().collect())
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Call any callable value.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> AttrResult<Value> {
        match callee {
            Value::Function(f) => f.invoke(self, args),
            Value::BoundMethod(m) => m.invoke(self, args),
            Value::Class(c) => self.construct(*c, args).map(Value::Entity),
            Value::Entity(e) => {
                let class = self.class_of(*e)?;
                match find_in_chain(&self.space, class, "__call__") {
                    Some((_, call)) => {
                        let bound = self.bind_special(call, *e, class, "__call__")?;
                        self.call(&bound, args)
                    }
                    None => Err(AttrError::NotCallable(self.space.class(class)?.name.clone())),
                }
            }
            other => Err(AttrError::NotCallable(other.type_name().to_string())),
        }
    }

    /// `entity.name(args...)`
    pub fn call_method(&mut self, entity: EntityId, name: &str, args: &[Value]) -> AttrResult<Value> {
        let callee = self.resolve_get(entity, name)?;
        self.call(&callee, args)
    }

    /// Bind a special method found on the class chain, skipping local storage.
    pub(crate) fn bind_special(
        &mut self,
        found: Value,
        entity: EntityId,
        class: ClassId,
        name: &str,
    ) -> AttrResult<Value> {
        match found {
            Value::Function(f) => Ok(Value::bound(f, Value::Entity(entity))),
            Value::Descriptor(d) => invoke_get(&d, self, name, Some(entity), class),
            other => Ok(other),
        }
    }
}
