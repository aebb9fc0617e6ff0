//! AttrModel v1: Canonical Hashing
//!
//! Deterministic canonical serialization + SHA-256 of an `ObjectSpace`.
//!
//! Rules:
//!   - model_version first
//!   - classes, then entities, each in id order
//!   - namespaces and local mappings in key order (BTreeMap)
//!   - scalars as JSON, everything else as a stable tag

use serde_json::{Map, Value as Json};
use sha2::{Digest, Sha256};

use crate::space::ObjectSpace;
use crate::value::Value;
use crate::MODEL_VERSION;

/// Canonical serialization of the space to UTF-8 JSON bytes. No whitespace.
pub fn canonical_serialize(space: &ObjectSpace) -> Vec<u8> {
    build_canonical_value(space).to_string().into_bytes()
}

/// SHA-256 of the canonical serialization, lowercase hex.
pub fn canonical_hash(space: &ObjectSpace) -> String {
    let digest = Sha256::digest(canonical_serialize(space));
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn build_canonical_value(space: &ObjectSpace) -> Json {
    let mut classes = Vec::new();
    for class in space.classes() {
        let mut namespace = Map::new();
        for (name, value) in &class.namespace {
            namespace.insert(name.clone(), encode(value));
        }

        let mut map = Map::new();
        map.insert("id".to_string(), Json::from(class.id.0));
        map.insert("name".to_string(), Json::String(class.name.clone()));
        map.insert(
            "parent".to_string(),
            class.parent.map_or(Json::Null, |p| Json::from(p.0)),
        );
        map.insert(
            "slots".to_string(),
            class.slots.as_ref().map_or(Json::Null, |s| {
                Json::Array(s.iter().cloned().map(Json::String).collect())
            }),
        );
        map.insert("namespace".to_string(), Json::Object(namespace));
        classes.push(Json::Object(map));
    }

    let mut entities = Vec::new();
    for entity in space.entities() {
        let local = entity.local().map_or(Json::Null, |m| {
            Json::Object(m.iter().map(|(k, v)| (k.clone(), encode(v))).collect())
        });
        let slots: Map<String, Json> = entity
            .slot_values()
            .iter()
            .map(|(k, v)| (k.clone(), encode(v)))
            .collect();

        let mut map = Map::new();
        map.insert("id".to_string(), Json::from(entity.id.0));
        map.insert("class".to_string(), Json::from(entity.class.0));
        map.insert("fixed".to_string(), Json::Bool(entity.is_fixed()));
        map.insert("local".to_string(), local);
        map.insert("slots".to_string(), Json::Object(slots));
        entities.push(Json::Object(map));
    }

    let mut root = Map::new();
    root.insert("model_version".to_string(), Json::from(MODEL_VERSION));
    root.insert("classes".to_string(), Json::Array(classes));
    root.insert("entities".to_string(), Json::Array(entities));
    Json::Object(root)
}

fn encode(value: &Value) -> Json {
    if let Some(json) = value.to_json() {
        return json;
    }
    match value {
        Value::Function(f) => Json::String(format!("<function {}>", f.name())),
        Value::BoundMethod(m) => {
            let mut map = Map::new();
            map.insert("bound".to_string(), Json::String(m.func.name().to_string()));
            map.insert("receiver".to_string(), encode(&m.receiver));
            Json::Object(map)
        }
        Value::Class(c) => single("class", Json::from(c.0)),
        Value::Entity(e) => single("entity", Json::from(e.0)),
        Value::Descriptor(d) => Json::String(format!("<{}>", d.kind_name())),
        // Non-finite floats have no JSON number form.
        Value::Float(x) => Json::String(x.to_string()),
        _ => Json::Null,
    }
}

fn single(key: &str, value: Json) -> Json {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Json::Object(map)
}
