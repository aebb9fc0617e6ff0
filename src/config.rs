//! Resolver configuration.
//!
//! Plain serde data with defaults, loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{AttrError, AttrResult};

/// What local storage may do against a same-named non-data descriptor
/// (class-bound, static, or a get-only custom descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowPolicy {
    /// Local values shadow the descriptor on get; sets write locally.
    #[default]
    Allow,
    /// The descriptor wins on get; sets of that name are rejected.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ResolverConfig {
    pub non_data_shadowing: ShadowPolicy,
    /// A class body defining `__eq__` without `__hash__` gets `__hash__ = None`.
    pub unhash_on_eq: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            non_data_shadowing: ShadowPolicy::Allow,
            unhash_on_eq: true,
        }
    }
}

impl ResolverConfig {
    pub fn from_json_str(s: &str) -> AttrResult<Self> {
        serde_json::from_str(s).map_err(|e| AttrError::Config(e.to_string()))
    }
}
