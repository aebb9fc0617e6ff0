//! Fixed-slot storage.

mod common;

use attr_model::{AttrError, AttributeResolver, ClassBuilder, Property, Value};

use common::{assert_close, location_class};

fn mumbai(rt: &mut AttributeResolver) -> attr_model::EntityId {
    let location = location_class(rt);
    rt.construct(
        location,
        &[Value::str("Mumbai"), Value::Float(19.0760), Value::Float(72.8777)],
    )
    .unwrap()
}

#[test]
fn declared_slots_read_and_write() {
    let mut rt = AttributeResolver::new();
    let m = mumbai(&mut rt);

    assert_eq!(rt.resolve_get(m, "name").unwrap(), Value::str("Mumbai"));
    assert_close(&rt.resolve_get(m, "longitude").unwrap(), 19.0760);
    assert_close(&rt.resolve_get(m, "latitude").unwrap(), 72.8777);

    rt.resolve_set(m, "name", Value::str("Bombay")).unwrap();
    assert_eq!(rt.resolve_get(m, "name").unwrap(), Value::str("Bombay"));
}

#[test]
fn undeclared_names_are_rejected() {
    let mut rt = AttributeResolver::new();
    let m = mumbai(&mut rt);

    assert_eq!(
        rt.resolve_set(m, "z", Value::Int(1)),
        Err(AttrError::SlotNotDeclared("z".into()))
    );
    assert_eq!(
        rt.resolve_get(m, "z"),
        Err(AttrError::AttributeNotFound("z".into()))
    );
    assert_eq!(
        rt.resolve_delete(m, "z"),
        Err(AttrError::SlotNotDeclared("z".into()))
    );
}

#[test]
fn fixed_entities_have_no_local_mapping() {
    let mut rt = AttributeResolver::new();
    let m = mumbai(&mut rt);

    assert!(rt.space().entity(m).unwrap().is_fixed());
    assert_eq!(
        rt.instance_dict(m),
        Err(AttrError::AttributeNotFound("__dict__".into()))
    );
    assert_eq!(rt.space().entity(m).unwrap().local(), None);
}

#[test]
fn read_only_properties_guard_the_backing_slots() {
    let mut rt = AttributeResolver::new();
    let m = mumbai(&mut rt);

    assert_eq!(
        rt.resolve_set(m, "longitude", Value::Float(0.0)),
        Err(AttrError::AttributeImmutable("longitude".into()))
    );
    // The backing slot itself stays writable.
    rt.resolve_set(m, "_longitude", Value::Float(1.5)).unwrap();
    assert_close(&rt.resolve_get(m, "longitude").unwrap(), 1.5);
}

#[test]
fn unfilled_and_cleared_slots_read_as_missing() {
    let mut rt = AttributeResolver::new();
    let location = location_class(&mut rt);
    let blank = rt.instantiate(location).unwrap();

    assert_eq!(
        rt.resolve_get(blank, "name"),
        Err(AttrError::AttributeNotFound("name".into()))
    );
    assert!(!rt.has_attr(blank, "name").unwrap());

    rt.resolve_set(blank, "name", Value::str("Pune")).unwrap();
    rt.resolve_delete(blank, "name").unwrap();
    assert_eq!(
        rt.resolve_delete(blank, "name"),
        Err(AttrError::AttributeNotFound("name".into()))
    );
}

#[test]
fn slot_members_are_visible_on_the_class() {
    let mut rt = AttributeResolver::new();
    let location = location_class(&mut rt);
    assert!(matches!(
        rt.resolve_class_get(location, "name").unwrap(),
        Value::Descriptor(_)
    ));
}

#[test]
fn subclass_without_slots_regains_local_storage() {
    let mut rt = AttributeResolver::new();
    let location = location_class(&mut rt);
    let city = rt
        .define_class(ClassBuilder::new("City").parent(location))
        .unwrap();
    let c = rt
        .construct(city, &[Value::str("Delhi"), Value::Float(28.6), Value::Float(77.2)])
        .unwrap();

    assert!(!rt.space().entity(c).unwrap().is_fixed());
    rt.resolve_set(c, "population", Value::Int(32_000_000)).unwrap();
    assert_eq!(rt.resolve_get(c, "population").unwrap(), Value::Int(32_000_000));
    // Inherited slots still go through their members.
    assert_eq!(rt.resolve_get(c, "name").unwrap(), Value::str("Delhi"));
    assert!(!rt.instance_dict(c).unwrap().contains_key("name"));
}

#[test]
fn slotted_subclass_extends_the_parent_slots() {
    let mut rt = AttributeResolver::new();
    let location = location_class(&mut rt);
    let port = rt
        .define_class(ClassBuilder::new("Port").parent(location).slots(&["berths"]))
        .unwrap();
    let p = rt
        .construct(port, &[Value::str("Kochi"), Value::Float(9.9), Value::Float(76.2)])
        .unwrap();

    assert!(rt.space().entity(p).unwrap().is_fixed());
    rt.resolve_set(p, "berths", Value::Int(12)).unwrap();
    assert_eq!(rt.resolve_get(p, "berths").unwrap(), Value::Int(12));
    assert_eq!(
        rt.resolve_set(p, "harbour", Value::Int(1)),
        Err(AttrError::SlotNotDeclared("harbour".into()))
    );
    assert_eq!(
        rt.dir(p).unwrap().iter().filter(|n| n.as_str() == "berths").count(),
        1
    );
}

#[test]
fn slot_colliding_with_class_body_is_rejected() {
    let mut rt = AttributeResolver::new();
    let getter = attr_model::Function::new("area", |_, _| Ok(Value::Float(0.0)));
    let err = rt
        .define_class(
            ClassBuilder::new("Shape")
                .slots(&["area"])
                .property("area", Property::new().getter(getter)),
        )
        .unwrap_err();
    assert_eq!(err, AttrError::SlotConflict("area".into()));
    assert!(rt.space().class_by_name("Shape").is_none());
}

#[test]
fn invalid_slot_names_are_rejected() {
    let mut rt = AttributeResolver::new();
    assert_eq!(
        rt.define_class(ClassBuilder::new("Bad").slots(&["1st"])).unwrap_err(),
        AttrError::InvalidName("1st".into())
    );
}

#[test]
fn xy_slots_reject_z() {
    let mut rt = AttributeResolver::new();
    let c = rt
        .define_class(ClassBuilder::new("C").slots(&["x", "y"]))
        .unwrap();
    let e = rt.instantiate(c).unwrap();
    rt.resolve_set(e, "x", Value::Int(1)).unwrap();
    rt.resolve_set(e, "y", Value::Int(2)).unwrap();
    assert_eq!(
        rt.resolve_set(e, "z", Value::Int(1)),
        Err(AttrError::SlotNotDeclared("z".into()))
    );
    assert_eq!(rt.dir(e).unwrap(), vec!["x", "y"]);
}
