// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end encode/decode of every value kind, including class graphs
//! with sharing and cycles.

use hwire::marshal::{decode, encode, encode_with};
use hwire::value::InvocationMode;
use hwire::{
    ClassDef, ClassInstance, CodecConfig, Decoder, Encoder, EnumDef, Error, FormatType, Identity,
    Members, ObjectGraph, ProxyDef, ProxyValue, StructDef, TypeId, TypeRegistry, Value,
};

struct Demo {
    registry: TypeRegistry,
    order: TypeId,
    shape: TypeId,
    circle: TypeId,
    group: TypeId,
}

fn demo_registry() -> Demo {
    let mut registry = TypeRegistry::new();
    let status = registry
        .define_enum(
            EnumDef::new("::Shop::Status")
                .enumerator("open")
                .enumerator_value("shipped", 5)
                .enumerator("closed"),
        )
        .expect("status");
    let line = registry
        .define_struct(
            StructDef::new("::Shop::Line")
                .member("sku", TypeId::STRING)
                .member("qty", TypeId::SHORT)
                .member("price", TypeId::DOUBLE),
        )
        .expect("line");
    let lines = registry.define_sequence("::Shop::Lines", line).expect("lines");
    let attrs = registry
        .define_dictionary("::Shop::Attrs", TypeId::STRING, TypeId::STRING)
        .expect("attrs");
    let counts = registry
        .define_dictionary("::Shop::Counts", status, TypeId::LONG)
        .expect("counts");
    let courier = registry.define_proxy(ProxyDef::new("::Shop::Courier")).expect("courier");
    let order = registry
        .define_struct(
            StructDef::new("::Shop::Order")
                .member("id", TypeId::LONG)
                .member("status", status)
                .member("lines", lines)
                .member("attrs", attrs)
                .member("counts", counts)
                .member("courier", courier)
                .member("express", TypeId::BOOL)
                .member("weight", TypeId::FLOAT)
                .optional_member("note", TypeId::STRING, 1)
                .optional_member("priority", TypeId::BYTE, 2),
        )
        .expect("order");

    let shape = registry.declare_class("::Geo::Shape").expect("declare");
    registry
        .define_class(
            ClassDef::new("::Geo::Shape")
                .abstract_class()
                .member("name", TypeId::STRING)
                .member("parent", shape),
        )
        .expect("shape");
    let circle = registry
        .define_class(
            ClassDef::new("::Geo::Circle")
                .base(shape)
                .compact_id(12)
                .member("radius", TypeId::DOUBLE)
                .optional_member("color", TypeId::INT, 4),
        )
        .expect("circle");
    let shapes = registry.define_sequence("::Geo::Shapes", shape).expect("shapes");
    let group = registry
        .define_class(
            ClassDef::new("::Geo::Group")
                .base(shape)
                .member("children", shapes)
                .member("anything", TypeId::OBJECT),
        )
        .expect("group");

    Demo {
        registry,
        order,
        shape,
        circle,
        group,
    }
}

fn order_value() -> Value {
    let line = |sku: &str, qty: i16, price: f64| {
        Value::Struct(
            Members::new()
                .with("sku", sku)
                .with("qty", qty)
                .with("price", price),
        )
    };
    let mut courier = ProxyValue::new(Identity::new("courier-7").with_category("shipping"))
        .with_adapter_id("Couriers")
        .with_facet("v2");
    courier.mode = InvocationMode::Oneway;
    courier.secure = true;

    Value::Struct(
        Members::new()
            .with("id", 9_000_000_000i64)
            .with("status", Value::Enum(5))
            .with(
                "lines",
                Value::Sequence(vec![line("A-1", 2, 9.5), line("B-22", 1, 120.0)]),
            )
            .with(
                "attrs",
                Value::Dictionary(vec![
                    (Value::from("gift"), Value::from("yes")),
                    (Value::from("lang"), Value::from("fr")),
                ]),
            )
            .with(
                "counts",
                Value::Dictionary(vec![
                    (Value::Enum(0), Value::Long(3)),
                    (Value::Enum(6), Value::Long(1)),
                ]),
            )
            .with("courier", courier)
            .with("express", true)
            .with("weight", 2.5f32)
            .with("note", "leave at door")
            .with_unset("priority"),
    )
}

#[test]
fn plain_values_roundtrip() {
    let demo = demo_registry();
    let graph = ObjectGraph::new();
    let value = order_value();
    let bytes = encode(&demo.registry, &graph, demo.order, &value).expect("encode");
    let (decoded, decoded_graph) = decode(&demo.registry, &bytes, demo.order).expect("decode");
    assert_eq!(decoded, value);
    assert!(decoded_graph.is_empty());

    let members = decoded.as_members().expect("struct");
    assert!(members.is_unset("priority"));
    let courier = members.get("courier").and_then(Value::as_proxy).expect("proxy");
    assert_eq!(courier.mode, InvocationMode::Oneway);
    assert_eq!(courier.facet, "v2");
}

#[test]
fn validation_rejects_bad_values() {
    let demo = demo_registry();
    let graph = ObjectGraph::new();

    let mut value = order_value();
    if let Value::Struct(members) = &mut value {
        members.set("status", Value::Enum(3));
    }
    assert!(matches!(
        encode(&demo.registry, &graph, demo.order, &value),
        Err(Error::Validation { .. })
    ));
    // validate() looks at the outer shape only; nested values are checked
    // as the encoder reaches them.
    assert!(demo.registry.validate(demo.order, &value, &graph));
    let status = demo.registry.type_by_name("::Shop::Status").expect("status");
    assert!(!demo.registry.validate(status, &Value::Enum(3), &graph));
    assert!(demo.registry.validate(status, &Value::Enum(6), &graph));

    // Wrong kind.
    assert!(matches!(
        encode(&demo.registry, &graph, TypeId::INT, &Value::from("7")),
        Err(Error::Validation { .. })
    ));
    // Out of range for a short.
    assert!(matches!(
        encode(&demo.registry, &graph, TypeId::SHORT, &Value::Int(70_000)),
        Err(Error::Validation { .. })
    ));

    // A proxy without an identity name would read back as null.
    let mut value = order_value();
    if let Value::Struct(members) = &mut value {
        members.set("courier", ProxyValue::new(Identity::new("")));
    }
    assert!(matches!(
        encode(&demo.registry, &graph, demo.order, &value),
        Err(Error::Validation { .. })
    ));
}

/// Build a group holding a circle twice, itself, and a cycle through
/// `parent` links.
fn shapes_graph() -> (ObjectGraph, Value) {
    let mut graph = ObjectGraph::new();
    let group = graph.insert(ClassInstance::new("::Geo::Group"));
    let circle = graph.insert(
        ClassInstance::new("::Geo::Circle")
            .with("name", "c1")
            .with("parent", group)
            .with("radius", 1.5f64)
            .with("color", 0xFF0000i32),
    );
    let plain = graph.insert(
        ClassInstance::new("::Geo::Circle")
            .with("name", "c2")
            .with("parent", Value::Class(None))
            .with("radius", 3.0f64),
    );
    let members = Members::new()
        .with("name", "g")
        .with("parent", Value::Class(None))
        .with(
            "children",
            Value::Sequence(vec![Value::from(circle), Value::from(plain), Value::from(circle)]),
        )
        .with("anything", group);
    if let Some(instance) = graph.get_mut(group) {
        instance.members = members;
    }
    (graph, Value::from(group))
}

#[test]
fn class_graph_roundtrip_both_formats() {
    let demo = demo_registry();
    let (graph, root) = shapes_graph();
    for format in [FormatType::Compact, FormatType::Sliced] {
        let config = CodecConfig::default().with_format(format);
        let bytes = encode_with(&demo.registry, &graph, config, demo.shape, &root).expect("encode");
        let (value, decoded) = decode(&demo.registry, &bytes, demo.shape).expect("decode");
        assert_eq!(decoded.len(), 3, "{:?}", format);
        assert!(graph.structurally_equal(&root, &decoded, &value), "{:?}", format);

        let group = decoded.get(value.as_object().expect("root")).expect("group");
        let children = group
            .members
            .get("children")
            .and_then(Value::as_sequence)
            .expect("children");
        assert_eq!(children[0], children[2]);
        assert_eq!(group.members.get("anything"), Some(&value));
    }
}

#[test]
fn sliced_format_is_larger_than_compact() {
    let demo = demo_registry();
    let (graph, root) = shapes_graph();
    let compact = encode(&demo.registry, &graph, demo.group, &root).expect("compact");
    let config = CodecConfig::default().with_format(FormatType::Sliced);
    let sliced = encode_with(&demo.registry, &graph, config, demo.group, &root).expect("sliced");
    assert!(sliced.len() > compact.len());
}

#[test]
fn abstract_formal_accepts_concrete_subtype() {
    let demo = demo_registry();
    let mut graph = ObjectGraph::new();
    let r = graph.insert(
        ClassInstance::new("::Geo::Circle")
            .with("name", "c")
            .with("parent", Value::Class(None))
            .with("radius", 2.0f64),
    );
    let bytes = encode(&demo.registry, &graph, demo.shape, &Value::from(r)).expect("encode");
    let (value, decoded) = decode(&demo.registry, &bytes, demo.circle).expect("decode");
    let instance = decoded.get(value.as_object().expect("object")).expect("instance");
    assert_eq!(instance.type_id, "::Geo::Circle");
    assert!(instance.members.is_unset("color"));
}

#[test]
fn identity_is_shared_across_writes_in_one_encapsulation() {
    let demo = demo_registry();
    let mut graph = ObjectGraph::new();
    let r = graph.insert(
        ClassInstance::new("::Geo::Circle")
            .with("name", "shared")
            .with("parent", Value::Class(None))
            .with("radius", 1.0f64),
    );

    let mut encoder = Encoder::new(&demo.registry, &graph);
    encoder.start_encapsulation().expect("start");
    encoder.write(demo.shape, &Value::from(r)).expect("first");
    let after_first = encoder.len();
    encoder.write(demo.shape, &Value::from(r)).expect("second");
    // Second write is a one-byte back-reference.
    assert_eq!(encoder.len(), after_first + 1);
    encoder.end_encapsulation().expect("end");
    let bytes = encoder.finish().expect("finish");

    let mut decoder = Decoder::new(&demo.registry, &bytes).expect("decoder");
    decoder.start_encapsulation().expect("start");
    let first = decoder.read(demo.shape).expect("first");
    let second = decoder.read(demo.shape).expect("second");
    decoder.end_encapsulation().expect("end");
    let decoded = decoder.finish().expect("finish");
    assert_eq!(first, second);
    assert_eq!(decoded.len(), 1);
}

#[test]
fn nested_encapsulations_scope_instance_ids() {
    let demo = demo_registry();
    let mut graph = ObjectGraph::new();
    let r = graph.insert(
        ClassInstance::new("::Geo::Circle")
            .with("name", "n")
            .with("parent", Value::Class(None))
            .with("radius", 1.0f64),
    );

    let mut encoder = Encoder::new(&demo.registry, &graph);
    encoder.start_encapsulation().expect("outer");
    encoder.write(demo.shape, &Value::from(r)).expect("outer write");
    encoder.start_encapsulation().expect("inner");
    encoder.write(demo.shape, &Value::from(r)).expect("inner write");
    encoder.end_encapsulation().expect("inner end");
    encoder.end_encapsulation().expect("outer end");
    let bytes = encoder.finish().expect("finish");

    let mut decoder = Decoder::new(&demo.registry, &bytes).expect("decoder");
    decoder.start_encapsulation().expect("outer");
    let outer = decoder.read(demo.shape).expect("outer read");
    decoder.start_encapsulation().expect("inner");
    let inner = decoder.read(demo.shape).expect("inner read");
    decoder.end_encapsulation().expect("inner end");
    decoder.end_encapsulation().expect("outer end");
    let decoded = decoder.finish().expect("finish");
    // The inner encapsulation marshals its own copy.
    assert_ne!(outer, inner);
    assert_eq!(decoded.len(), 2);
}

#[test]
fn interface_by_value() {
    let mut registry = TypeRegistry::new();
    let printer = registry
        .define_class(ClassDef::new("::Demo::Printer").interface_by_value())
        .expect("printer");
    registry
        .define_class(ClassDef::new("::Demo::LaserPrinter").member("dpi", TypeId::INT))
        .expect("laser");

    let mut graph = ObjectGraph::new();
    let r = graph.insert(ClassInstance::new("::Demo::LaserPrinter").with("dpi", 600i32));
    let bytes = encode(&registry, &graph, printer, &Value::from(r)).expect("encode");

    let (value, decoded) = decode(&registry, &bytes, printer).expect("decode");
    let instance = decoded.get(value.as_object().expect("object")).expect("instance");
    assert_eq!(instance.type_id, "::Demo::LaserPrinter");
    assert!(instance.members.is_empty());
}

#[test]
fn nested_sequences_with_an_empty_inner_sequence() {
    let mut registry = TypeRegistry::new();
    let point = registry
        .define_struct(
            StructDef::new("::Geo::Point")
                .member("x", TypeId::INT)
                .member("y", TypeId::INT),
        )
        .expect("point");
    let row = registry.define_sequence("::Geo::Row", point).expect("row");
    let grid = registry.define_sequence("::Geo::Grid", row).expect("grid");

    let p = |x: i32, y: i32| Value::Struct(Members::new().with("x", x).with("y", y));
    let value = Value::Sequence(vec![
        Value::Sequence(vec![p(1, 2), p(3, 4)]),
        Value::Sequence(Vec::new()),
        Value::Sequence(vec![p(5, 6)]),
    ]);

    let graph = ObjectGraph::new();
    let mut encoder = Encoder::new(&registry, &graph);
    encoder.write(grid, &value).expect("write");
    let bytes = encoder.finish().expect("finish");
    // outer count, first row (count + 2 points), empty row, last row
    assert_eq!(bytes.len(), 1 + 1 + 16 + 1 + 1 + 8);
    assert_eq!(bytes[0], 3);
    assert_eq!(bytes[18], 0);
    assert_eq!(bytes[19], 1);

    let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
    assert_eq!(decoder.read(grid).expect("read"), value);

    let bytes = encode(&registry, &graph, grid, &value).expect("encode");
    let (decoded, _) = decode(&registry, &bytes, grid).expect("decode");
    assert_eq!(decoded, value);
}
