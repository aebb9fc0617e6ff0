//! Special-method protocols: string conversion, truthiness, equality and hashing.
//!
//! Special methods are looked up on the class chain only. Local storage
//! never supplies `__str__`, `__bool__` and friends.

use sha2::{Digest, Sha256};

use crate::chain::find_in_chain;
use crate::error::{AttrError, AttrResult};
use crate::resolver::AttributeResolver;
use crate::value::{EntityId, Value};

/// Find `name` on the entity's class chain and bind it.
///
/// A class-level `None` (e.g. `__hash__ = None`) is returned as-is.
pub fn lookup_special(
    rt: &mut AttributeResolver,
    entity: EntityId,
    name: &str,
) -> AttrResult<Option<Value>> {
    let class = rt.class_of(entity)?;
    match find_in_chain(rt.space(), class, name) {
        Some((_, Value::None)) => Ok(Some(Value::None)),
        Some((_, found)) => rt.bind_special(found, entity, class, name).map(Some),
        None => Ok(None),
    }
}

fn call_special(
    rt: &mut AttributeResolver,
    entity: EntityId,
    name: &str,
    args: &[Value],
) -> AttrResult<Option<Value>> {
    match lookup_special(rt, entity, name)? {
        Some(Value::None) | None => Ok(None),
        Some(method) => rt.call(&method, args).map(Some),
    }
}

// ---------------------------------------------------------------------------
// str / repr
// ---------------------------------------------------------------------------

/// `repr(value)`
pub fn to_repr(rt: &mut AttributeResolver, value: &Value) -> AttrResult<String> {
    match value {
        Value::None => Ok("None".to_string()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(x) => Ok(format_float(*x)),
        Value::Str(s) => Ok(format!("'{}'", s.replace('\'', "\\'"))),
        Value::Function(f) => Ok(format!("<function {}>", f.name())),
        Value::BoundMethod(m) => {
            let receiver = to_repr(rt, &m.receiver)?;
            Ok(format!("<bound method {} of {}>", m.func.name(), receiver))
        }
        Value::Class(c) => Ok(format!("<class '{}'>", rt.class_name(*c)?)),
        Value::Descriptor(d) => Ok(format!("<{} object>", d.kind_name())),
        Value::Entity(e) => match call_special(rt, *e, "__repr__", &[])? {
            Some(Value::Str(s)) => Ok(s),
            Some(other) => Err(AttrError::TypeMismatch(format!(
                "__repr__ returned non-string (type {})",
                other.type_name()
            ))),
            None => {
                let class = rt.class_of(*e)?;
                Ok(format!("<{} object #{}>", rt.class_name(class)?, e.0))
            }
        },
    }
}

/// `str(value)`: `__str__`, falling back to `repr`.
pub fn to_str(rt: &mut AttributeResolver, value: &Value) -> AttrResult<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Entity(e) => match call_special(rt, *e, "__str__", &[])? {
            Some(Value::Str(s)) => Ok(s),
            Some(other) => Err(AttrError::TypeMismatch(format!(
                "__str__ returned non-string (type {})",
                other.type_name()
            ))),
            None => to_repr(rt, value),
        },
        _ => to_repr(rt, value),
    }
}

/// `format(value, spec)`: `__format__` on the class chain, which must
/// return a string. Without one, an empty spec falls back to `to_str`.
///
/// Built-in scalars understand a small subset of specs: `.Nf`, `.Ne` and
/// `%` for numbers, `d` for ints, `s` for strings.
pub fn format_value(rt: &mut AttributeResolver, value: &Value, spec: &str) -> AttrResult<String> {
    if let Value::Entity(e) = value {
        return match call_special(rt, *e, "__format__", &[Value::str(spec)])? {
            Some(Value::Str(s)) => Ok(s),
            Some(other) => Err(AttrError::TypeMismatch(format!(
                "__format__ must return a str, not {}",
                other.type_name()
            ))),
            None if spec.is_empty() => to_str(rt, value),
            None => {
                let class = rt.class_of(*e)?;
                Err(AttrError::TypeMismatch(format!(
                    "unsupported format string passed to {}.__format__",
                    rt.class_name(class)?
                )))
            }
        };
    }
    if spec.is_empty() {
        return to_str(rt, value);
    }
    format_scalar(value, spec).ok_or_else(|| {
        AttrError::raise(
            "ValueError",
            format!(
                "Unknown format code '{spec}' for object of type '{}'",
                value.type_name()
            ),
        )
    })
}

fn format_scalar(value: &Value, spec: &str) -> Option<String> {
    match (value, spec) {
        (Value::Int(i), "d") => Some(i.to_string()),
        (Value::Str(s), "s") => Some(s.clone()),
        (Value::Int(_) | Value::Float(_), _) => {
            let x = value.as_float()?;
            let (precision, kind) = match spec.strip_prefix('.') {
                Some(rest) => {
                    let kind = rest.chars().last()?;
                    let digits: usize = rest[..rest.len() - kind.len_utf8()].parse().ok()?;
                    (digits, kind)
                }
                None if spec.chars().count() == 1 => (6, spec.chars().next()?),
                None => return None,
            };
            match kind {
                'f' => Some(format!("{x:.precision$}")),
                'e' => Some(exponent_form(x, precision)),
                '%' => Some(format!("{:.precision$}%", x * 100.0)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `1.50e+03` rather than Rust's `1.50e3`.
fn exponent_form(x: f64, precision: usize) -> String {
    let sci = format!("{x:.precision$e}");
    match sci.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => sci,
    }
}

/// Shortest round-trip digits; exponent form below 1e-4 and from 1e16 up.
fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        let sign = if x > 0.0 { "" } else { "-" };
        return format!("{sign}inf");
    }
    let sci = format!("{x:e}");
    let parts = sci
        .split_once('e')
        .and_then(|(mantissa, exp)| exp.parse::<i32>().ok().map(|exp| (mantissa, exp)));
    match parts {
        Some((mantissa, exp)) if x != 0.0 && !(-4..16).contains(&exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        _ => {
            let plain = format!("{x}");
            if plain.contains('.') {
                plain
            } else {
                format!("{plain}.0")
            }
        }
    }
}

/// Deterministic string hash: first eight bytes of SHA-256.
fn str_hash(s: &str) -> i64 {
    let digest = Sha256::digest(s.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::from_le_bytes(head)
}
