#![forbid(unsafe_code)]

//! AttrModel: attribute resolution for a single-inheritance object model.
//!
//! Data descriptors beat local storage, local storage beats non-data
//! descriptors and methods, and functions read through an entity come
//! back bound to it.

/// Version stamped into canonical serializations.
pub const MODEL_VERSION: u32 = 1;

pub mod chain;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hashing;
pub mod invariants;
pub mod names;
pub mod protocols;
pub mod resolver;
pub mod space;
pub mod transcript;
pub mod value;

pub use config::{ResolverConfig, ShadowPolicy};
pub use descriptor::{Capabilities, CustomDescriptor, Descriptor, Property};
pub use error::{AttrError, AttrResult};
pub use resolver::AttributeResolver;
pub use space::{ClassBuilder, ObjectSpace};
pub use value::{ClassId, EntityId, Function, Value};
