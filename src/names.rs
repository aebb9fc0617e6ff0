//! Identifier rules for class and slot names.

use crate::error::{AttrError, AttrResult};

/// True if `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Validate an identifier, returning `InvalidName` on mismatch.
pub fn validate_identifier(name: &str) -> AttrResult<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(AttrError::InvalidName(name.to_string()))
    }
}
