//! AttrModel v1: Descriptors
//!
//! A descriptor is a class-namespace value that intercepts attribute access.
//! Capabilities are fixed when the descriptor is built and never recomputed.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{AttrError, AttrResult};
use crate::resolver::AttributeResolver;
use crate::value::{ClassId, EntityId, Function, Value};

/// Get accessor: `(resolver, instance, owner)`. `instance` is `None` for class access.
pub type GetFn = dyn Fn(&mut AttributeResolver, Option<EntityId>, ClassId) -> AttrResult<Value>;
/// Set accessor: `(resolver, instance, value)`.
pub type SetFn = dyn Fn(&mut AttributeResolver, EntityId, Value) -> AttrResult<()>;
/// Delete accessor: `(resolver, instance)`.
pub type DeleteFn = dyn Fn(&mut AttributeResolver, EntityId) -> AttrResult<()>;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Accessor set exposed by a custom descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capabilities {
    GetOnly,
    GetSet,
    GetDelete,
    GetSetDelete,
    SetOnly,
    SetDelete,
    DeleteOnly,
}

impl Capabilities {
    /// `None` when no accessor is present.
    pub const fn from_accessors(get: bool, set: bool, delete: bool) -> Option<Self> {
        match (get, set, delete) {
            (true, false, false) => Some(Self::GetOnly),
            (true, true, false) => Some(Self::GetSet),
            (true, false, true) => Some(Self::GetDelete),
            (true, true, true) => Some(Self::GetSetDelete),
            (false, true, false) => Some(Self::SetOnly),
            (false, true, true) => Some(Self::SetDelete),
            (false, false, true) => Some(Self::DeleteOnly),
            (false, false, false) => None,
        }
    }

    pub const fn has_get(self) -> bool {
        matches!(
            self,
            Self::GetOnly | Self::GetSet | Self::GetDelete | Self::GetSetDelete
        )
    }

    pub const fn has_set(self) -> bool {
        matches!(
            self,
            Self::GetSet | Self::GetSetDelete | Self::SetOnly | Self::SetDelete
        )
    }

    pub const fn has_delete(self) -> bool {
        matches!(
            self,
            Self::GetDelete | Self::GetSetDelete | Self::SetDelete | Self::DeleteOnly
        )
    }

    /// Data descriptors take precedence over local storage.
    pub const fn is_data(self) -> bool {
        self.has_set() || self.has_delete()
    }
}

// ---------------------------------------------------------------------------
// Custom descriptors
// ---------------------------------------------------------------------------

/// User-defined accessors with a registration-time capability tag.
#[derive(Clone)]
pub struct CustomDescriptor {
    name: String,
    capabilities: Capabilities,
    get: Option<Rc<GetFn>>,
    set: Option<Rc<SetFn>>,
    delete: Option<Rc<DeleteFn>>,
}

impl CustomDescriptor {
    pub fn builder(name: &str) -> CustomDescriptorBuilder {
        CustomDescriptorBuilder {
            name: name.to_string(),
            get: None,
            set: None,
            delete: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl fmt::Debug for CustomDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDescriptor")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

pub struct CustomDescriptorBuilder {
    name: String,
    get: Option<Rc<GetFn>>,
    set: Option<Rc<SetFn>>,
    delete: Option<Rc<DeleteFn>>,
}

impl CustomDescriptorBuilder {
    pub fn on_get<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut AttributeResolver, Option<EntityId>, ClassId) -> AttrResult<Value> + 'static,
    {
        self.get = Some(Rc::new(f));
        self
    }

    pub fn on_set<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut AttributeResolver, EntityId, Value) -> AttrResult<()> + 'static,
    {
        self.set = Some(Rc::new(f));
        self
    }

    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut AttributeResolver, EntityId) -> AttrResult<()> + 'static,
    {
        self.delete = Some(Rc::new(f));
        self
    }

    /// Resolve the capability tag. Fails with `EmptyDescriptor` if no accessor was given.
    pub fn build(self) -> AttrResult<Descriptor> {
        let capabilities = Capabilities::from_accessors(
            self.get.is_some(),
            self.set.is_some(),
            self.delete.is_some(),
        )
        .ok_or_else(|| AttrError::EmptyDescriptor(self.name.clone()))?;

        Ok(Descriptor::Custom(CustomDescriptor {
            name: self.name,
            capabilities,
            get: self.get,
            set: self.set,
            delete: self.delete,
        }))
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Getter/setter/deleter functions, each called with the entity first.
///
/// A property is always a data descriptor: a missing setter makes the
/// attribute read-only instead of letting local storage shadow it.
#[derive(Debug, Clone, Default)]
pub struct Property {
    pub fget: Option<Function>,
    pub fset: Option<Function>,
    pub fdel: Option<Function>,
    pub doc: Option<String>,
}

impl Property {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn getter(mut self, f: Function) -> Self {
        self.fget = Some(f);
        self
    }

    pub fn setter(mut self, f: Function) -> Self {
        self.fset = Some(f);
        self
    }

    pub fn deleter(mut self, f: Function) -> Self {
        self.fdel = Some(f);
        self
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    /// The property's docstring, falling back to the getter's name.
    pub fn docstring(&self) -> Option<&str> {
        self.doc
            .as_deref()
            .or_else(|| self.fget.as_ref().map(Function::name))
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Descriptor {
    Custom(CustomDescriptor),
    Property(Property),
    /// Binds the wrapped function to the class, whatever the access path.
    ClassMethod(Function),
    /// Returns the wrapped function unbound, whatever the access path.
    StaticMethod(Function),
    /// Storage for one declared slot.
    Member { slot: String, owner: ClassId },
}

impl Descriptor {
    pub fn is_data(&self) -> bool {
        match self {
            Self::Custom(c) => c.capabilities.is_data(),
            Self::Property(_) | Self::Member { .. } => true,
            Self::ClassMethod(_) | Self::StaticMethod(_) => false,
        }
    }

    /// Non-data descriptors a user attaches explicitly (not plain functions).
    pub fn is_non_data(&self) -> bool {
        !self.is_data()
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Custom(_) => "descriptor",
            Self::Property(_) => "property",
            Self::ClassMethod(_) => "classmethod",
            Self::StaticMethod(_) => "staticmethod",
            Self::Member { .. } => "member_descriptor",
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run the get side of the protocol for `name`.
pub(crate) fn invoke_get(
    descriptor: &Rc<Descriptor>,
    rt: &mut AttributeResolver,
    name: &str,
    instance: Option<EntityId>,
    owner: ClassId,
) -> AttrResult<Value> {
    match descriptor.as_ref() {
        Descriptor::Custom(c) => match &c.get {
            Some(get) => get(rt, instance, owner),
            None => Err(AttrError::AttributeUnreadable(name.to_string())),
        },
        Descriptor::Property(p) => match instance {
            None => Ok(Value::Descriptor(Rc::clone(descriptor))),
            Some(entity) => match &p.fget {
                Some(fget) => fget.invoke(rt, &[Value::Entity(entity)]),
                None => Err(AttrError::AttributeUnreadable(name.to_string())),
            },
        },
        Descriptor::ClassMethod(f) => Ok(Value::bound(f.clone(), Value::Class(owner))),
        Descriptor::StaticMethod(f) => Ok(Value::Function(f.clone())),
        Descriptor::Member { slot, .. } => match instance {
            None => Ok(Value::Descriptor(Rc::clone(descriptor))),
            Some(entity) => rt
                .space()
                .entity(entity)?
                .slot_value(slot)
                .cloned()
                .ok_or_else(|| AttrError::AttributeNotFound(name.to_string())),
        },
    }
}

/// Run the set side of a data descriptor.
pub(crate) fn invoke_set(
    descriptor: &Descriptor,
    rt: &mut AttributeResolver,
    name: &str,
    instance: EntityId,
    value: Value,
) -> AttrResult<()> {
    match descriptor {
        Descriptor::Custom(c) => match &c.set {
            Some(set) => set(rt, instance, value),
            None => Err(AttrError::AttributeImmutable(name.to_string())),
        },
        Descriptor::Property(p) => match &p.fset {
            Some(fset) => fset
                .invoke(rt, &[Value::Entity(instance), value])
                .map(|_| ()),
            None => Err(AttrError::AttributeImmutable(name.to_string())),
        },
        Descriptor::Member { slot, .. } => {
            rt.space_mut().entity_mut(instance)?.set_slot(slot, value);
            Ok(())
        }
        Descriptor::ClassMethod(_) | Descriptor::StaticMethod(_) => {
            Err(AttrError::AttributeImmutable(name.to_string()))
        }
    }
}

/// Run the delete side of a data descriptor.
pub(crate) fn invoke_delete(
    descriptor: &Descriptor,
    rt: &mut AttributeResolver,
    name: &str,
    instance: EntityId,
) -> AttrResult<()> {
    match descriptor {
        Descriptor::Custom(c) => match &c.delete {
            Some(delete) => delete(rt, instance),
            None => Err(AttrError::AttributeNotDeletable(name.to_string())),
        },
        Descriptor::Property(p) => match &p.fdel {
            Some(fdel) => fdel.invoke(rt, &[Value::Entity(instance)]).map(|_| ()),
            None => Err(AttrError::AttributeNotDeletable(name.to_string())),
        },
        Descriptor::Member { slot, .. } => {
            match rt.space_mut().entity_mut(instance)?.clear_slot(slot) {
                Some(_) => Ok(()),
                None => Err(AttrError::AttributeNotFound(name.to_string())),
            }
        }
        Descriptor::ClassMethod(_) | Descriptor::StaticMethod(_) => {
            Err(AttrError::AttributeNotDeletable(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_tags_cover_every_accessor_combination() {
        assert_eq!(Capabilities::from_accessors(false, false, false), None);
        assert_eq!(
            Capabilities::from_accessors(true, false, false),
            Some(Capabilities::GetOnly)
        );
        assert_eq!(
            Capabilities::from_accessors(false, true, false),
            Some(Capabilities::SetOnly)
        );
        assert_eq!(
            Capabilities::from_accessors(true, true, true),
            Some(Capabilities::GetSetDelete)
        );
    }

    #[test]
    fn data_descriptor_classification() {
        assert!(!Capabilities::GetOnly.is_data());
        assert!(Capabilities::GetSet.is_data());
        assert!(Capabilities::GetDelete.is_data());
        assert!(Capabilities::SetOnly.is_data());
        assert!(Capabilities::DeleteOnly.is_data());
    }

    #[test]
    fn empty_custom_descriptor_is_rejected() {
        let err = CustomDescriptor::builder("nothing").build().unwrap_err();
        assert_eq!(err, AttrError::EmptyDescriptor("nothing".to_string()));
    }

    #[test]
    fn builder_resolves_capabilities_once() {
        let d = CustomDescriptor::builder("w")
            .on_set(|_, _, _| Ok(()))
            .build()
            .unwrap();
        match d {
            Descriptor::Custom(c) => assert_eq!(c.capabilities(), Capabilities::SetOnly),
            other => panic!("unexpected descriptor {other:?}"),
        }
    }

    #[test]
    fn property_docstring() {
        let getter = Function::new("area", |_, _| Ok(Value::None));
        assert_eq!(Property::new().docstring(), None);
        assert_eq!(Property::new().getter(getter.clone()).docstring(), Some("area"));
        assert_eq!(
            Property::new().getter(getter).doc("Area of the circle.").docstring(),
            Some("Area of the circle.")
        );
    }

    #[test]
    fn builtin_descriptor_kinds() {
        let f = Function::new("f", |_, _| Ok(Value::None));
        assert!(Descriptor::Property(Property::new()).is_data());
        assert!(Descriptor::Member { slot: "x".into(), owner: ClassId(0) }.is_data());
        assert!(Descriptor::ClassMethod(f.clone()).is_non_data());
        assert!(Descriptor::StaticMethod(f).is_non_data());
    }
}
