//! Error taxonomy for attribute resolution.
//!
//! Every failure is reported to the immediate caller. Errors raised by
//! accessor or method bodies travel through the resolver untouched.

use crate::value::{ClassId, EntityId};

/// All failures the resolver can surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttrError {
    /// Name absent from local storage and from the whole class chain.
    #[error("attribute '{0}' not found")]
    AttributeNotFound(String),

    /// Write against a data descriptor that exposes no set accessor.
    #[error("can't set attribute '{0}': descriptor is read-only")]
    AttributeImmutable(String),

    /// Delete against a data descriptor that exposes no delete accessor.
    #[error("can't delete attribute '{0}'")]
    AttributeNotDeletable(String),

    /// Read against a data descriptor that exposes no get accessor.
    #[error("attribute '{0}' is write-only")]
    AttributeUnreadable(String),

    /// Write or delete of an undeclared name on a fixed-slot entity.
    #[error("'{0}' is not a declared slot")]
    SlotNotDeclared(String),

    /// A declared slot collides with an entry of the class body.
    #[error("'{0}' in slots conflicts with class variable")]
    SlotConflict(String),

    /// A custom descriptor was built without any accessor.
    #[error("descriptor '{0}' exposes no accessors")]
    EmptyDescriptor(String),

    /// Class or slot name is not a valid identifier.
    #[error("invalid identifier {0:?}")]
    InvalidName(String),

    /// Re-parenting would change whether existing instances use fixed slots.
    #[error("re-parenting '{0}' would change the storage layout of existing instances")]
    LayoutChange(String),

    #[error("setting the parent of '{class}' to '{parent}' would create an inheritance cycle")]
    InheritanceCycle { class: String, parent: String },

    #[error("unknown class {0:?}")]
    UnknownClass(ClassId),

    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),

    #[error("'{0}' object is not callable")]
    NotCallable(String),

    #[error("type error: {0}")]
    TypeMismatch(String),

    #[error("unhashable type: '{0}'")]
    Unhashable(String),

    /// Failure reported by an accessor, method or constructor body.
    #[error("{kind}: {message}")]
    Raised { kind: String, message: String },

    #[error("invariant violation: [{rule}] {detail}")]
    InvariantViolation { rule: &'static str, detail: String },

    #[error("invalid resolver config: {0}")]
    Config(String),
}

impl AttrError {
    /// Error reported from user code, e.g. `AttrError::raise("ValueError", "...")`.
    pub fn raise(kind: &str, message: impl Into<String>) -> Self {
        Self::Raised {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    /// True for the attribute-error family that `has_attr` treats as absence.
    pub fn is_missing_attribute(&self) -> bool {
        matches!(
            self,
            Self::AttributeNotFound(_) | Self::AttributeUnreadable(_)
        )
    }
}

pub type AttrResult<T> = Result<T, AttrError>;
