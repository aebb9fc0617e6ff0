//! AttrModel v1: Runtime Values
//!
//! Pure data plus identity rules. Resolution logic lives in `resolver`.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::error::AttrResult;
use crate::resolver::AttributeResolver;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Handle of a class inside an `ObjectSpace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Handle of an entity (instance) inside an `ObjectSpace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Signature of every native function body.
pub type NativeFn = dyn Fn(&mut AttributeResolver, &[Value]) -> AttrResult<Value>;

/// A named callable. Two functions are equal only if they share a body.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl Function {
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&mut AttributeResolver, &[Value]) -> AttrResult<Value> + 'static,
    {
        Self {
            name: Rc::from(name),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the body with exactly the given arguments (no implicit receiver).
    pub fn invoke(&self, rt: &mut AttributeResolver, args: &[Value]) -> AttrResult<Value> {
        (self.body)(rt, args)
    }

    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.body) as *const () as usize
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// A function paired with the receiver it was retrieved through.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    pub func: Function,
    /// `Value::Entity` for ordinary methods, `Value::Class` for class-bound ones.
    pub receiver: Value,
}

impl BoundMethod {
    /// Invoke with `(receiver, args...)`.
    pub fn invoke(&self, rt: &mut AttributeResolver, args: &[Value]) -> AttrResult<Value> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(self.receiver.clone());
        full.extend_from_slice(args);
        self.func.invoke(rt, &full)
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Function(Function),
    BoundMethod(Rc<BoundMethod>),
    Class(ClassId),
    Entity(EntityId),
    Descriptor(Rc<Descriptor>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Self::Str(s.to_string())
    }

    pub fn bound(func: Function, receiver: Value) -> Self {
        Self::BoundMethod(Rc::new(BoundMethod { func, receiver }))
    }

    pub fn descriptor(descriptor: Descriptor) -> Self {
        Self::Descriptor(Rc::new(descriptor))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: ints widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            Self::Class(id) => Some(*id),
            _ => None,
        }
    }

    /// Name of the value's built-in kind; entities report `"object"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Function(_) => "function",
            Self::BoundMethod(_) => "method",
            Self::Class(_) => "type",
            Self::Entity(_) => "object",
            Self::Descriptor(d) => d.kind_name(),
        }
    }

    /// Scalars convertible from and to JSON.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => Some(Self::None),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::None => Some(serde_json::Value::Null),
            Self::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Self::Int(i) => Some(serde_json::Value::from(*i)),
            Self::Float(x) => serde_json::Number::from_f64(*x).map(serde_json::Value::Number),
            Self::Str(s) => Some(serde_json::Value::String(s.clone())),
            _ => None,
        }
    }
}

/// Scalars compare by value, functions and descriptors by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => int_eq_float(*a, *b),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.same(b),
            (Self::BoundMethod(a), Self::BoundMethod(b)) => {
                a.func.same(&b.func) && a.receiver == b.receiver
            }
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) => a == b,
            (Self::Descriptor(a), Self::Descriptor(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Exact int/float comparison: no rounding of large ints through `f64`.
fn int_eq_float(i: i64, x: f64) -> bool {
    // 2^63 is exactly representable; `i64` covers [-2^63, 2^63).
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    x.fract() == 0.0 && (-LIMIT..LIMIT).contains(&x) && x as i64 == i
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

impl From<Descriptor> for Value {
    fn from(d: Descriptor) -> Self {
        Self::descriptor(d)
    }
}
