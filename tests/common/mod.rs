//! Shared fixtures for the integration tests.
//!
//! Class definitions mirror the lecture examples: Circle with a computed
//! area, Person with a full property, Location with slots.

#![allow(dead_code)]

use std::f64::consts::PI;

use attr_model::{
    AttrError, AttrResult, AttributeResolver, ClassBuilder, ClassId, EntityId, Function, Property,
    Value,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// First positional argument as the receiving entity.
pub fn receiver(args: &[Value]) -> AttrResult<EntityId> {
    args.first()
        .and_then(Value::as_entity)
        .ok_or_else(|| AttrError::TypeMismatch("expected self".to_string()))
}

pub fn arg(args: &[Value], index: usize) -> AttrResult<Value> {
    args.get(index)
        .cloned()
        .ok_or_else(|| AttrError::TypeMismatch(format!("missing argument {index}")))
}

/// `Circle(r)` with `area` computed on every read from the locally stored `r`.
pub fn circle_class(rt: &mut AttributeResolver) -> ClassId {
    let area = Function::new("area", |rt, args| {
        let me = receiver(args)?;
        let r = rt
            .resolve_get(me, "r")?
            .as_float()
            .ok_or_else(|| AttrError::TypeMismatch("r must be a number".into()))?;
        Ok(Value::Float(PI * r * r))
    });
    rt.define_class(
        ClassBuilder::new("Circle")
            .method("__init__", |rt, args| {
                let me = receiver(args)?;
                rt.resolve_set(me, "r", arg(args, 1)?)?;
                Ok(Value::None)
            })
            .property("area", Property::new().getter(area)),
    )
    .expect("define Circle")
}

/// `Person(name)` whose `name` property stores into `_name`, with a deleter.
pub fn person_class(rt: &mut AttributeResolver) -> ClassId {
    let get_name = Function::new("get_name", |rt, args| {
        let me = receiver(args)?;
        rt.resolve_get(me, "_name")
    });
    let set_name = Function::new("set_name", |rt, args| {
        let me = receiver(args)?;
        rt.resolve_set(me, "_name", arg(args, 1)?)?;
        Ok(Value::None)
    });
    let del_name = Function::new("del_name", |rt, args| {
        let me = receiver(args)?;
        rt.resolve_delete(me, "_name")?;
        Ok(Value::None)
    });
    rt.define_class(
        ClassBuilder::new("Person")
            .method("__init__", |rt, args| {
                let me = receiver(args)?;
                rt.resolve_set(me, "name", arg(args, 1)?)?;
                Ok(Value::None)
            })
            .property(
                "name",
                Property::new()
                    .getter(get_name)
                    .setter(set_name)
                    .deleter(del_name)
                    .doc("Person name."),
            ),
    )
    .expect("define Person")
}

/// `Location(name, longitude, latitude)` with slots and read-only coordinates.
pub fn location_class(rt: &mut AttributeResolver) -> ClassId {
    let longitude = Function::new("longitude", |rt, args| {
        let me = receiver(args)?;
        rt.resolve_get(me, "_longitude")
    });
    let latitude = Function::new("latitude", |rt, args| {
        let me = receiver(args)?;
        rt.resolve_get(me, "_latitude")
    });
    rt.define_class(
        ClassBuilder::new("Location")
            .slots(&["name", "_longitude", "_latitude"])
            .method("__init__", |rt, args| {
                let me = receiver(args)?;
                rt.resolve_set(me, "_longitude", arg(args, 2)?)?;
                rt.resolve_set(me, "_latitude", arg(args, 3)?)?;
                rt.resolve_set(me, "name", arg(args, 1)?)?;
                Ok(Value::None)
            })
            .property("longitude", Property::new().getter(longitude))
            .property("latitude", Property::new().getter(latitude)),
    )
    .expect("define Location")
}

pub fn assert_close(value: &Value, expected: f64) {
    let got = value.as_float().expect("numeric value");
    assert!(
        (got - expected).abs() < 1e-9,
        "expected {expected}, got {got}"
    );
}
