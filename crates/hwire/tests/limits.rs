// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Size field boundaries, safety limits and hostile input.

use hwire::marshal::{decode, decode_with, encode, encode_with};
use hwire::{
    ClassDef, ClassInstance, CodecConfig, Decoder, Encoder, Error, ObjectGraph, StructDef, TypeId,
    TypeRegistry, Value,
};

fn byte_seq_registry() -> (TypeRegistry, TypeId) {
    let mut registry = TypeRegistry::new();
    let ty = registry.define_sequence("::Demo::Bytes", TypeId::BYTE).expect("bytes");
    (registry, ty)
}

fn bytes_value(len: usize) -> Value {
    Value::Sequence((0..len).map(|i| Value::Byte(i as u8)).collect())
}

#[test]
fn size_field_boundaries() {
    let (registry, ty) = byte_seq_registry();
    let graph = ObjectGraph::new();
    for (len, prefix) in [
        (0usize, vec![0u8]),
        (254, vec![254]),
        (255, vec![0xFF, 255, 0, 0, 0]),
        (256, vec![0xFF, 0, 1, 0, 0]),
    ] {
        let value = bytes_value(len);
        let mut encoder = Encoder::new(&registry, &graph);
        encoder.write(ty, &value).expect("write");
        let bytes = encoder.finish().expect("finish");
        assert_eq!(&bytes[..prefix.len()], &prefix[..], "prefix for {} elements", len);
        assert_eq!(bytes.len(), prefix.len() + len);

        let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
        assert_eq!(decoder.read(ty).expect("read"), value);
    }
}

#[test]
fn random_sequence_sizes_roundtrip() {
    let (registry, ty) = byte_seq_registry();
    let graph = ObjectGraph::new();
    let mut rng = fastrand::Rng::with_seed(0x5EED);
    for _ in 0..32 {
        let value = bytes_value(rng.usize(0..2000));
        let bytes = encode(&registry, &graph, ty, &value).expect("encode");
        let (decoded, _) = decode(&registry, &bytes, ty).expect("decode");
        assert_eq!(decoded, value);
    }
}

#[test]
fn corrupt_count_is_rejected_before_allocation() {
    let mut registry = TypeRegistry::new();
    let ints = registry.define_sequence("::Demo::Ints", TypeId::INT).expect("ints");
    // Claims 0x7FFFFFFF ints, carries 4 bytes.
    let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 1, 0, 0, 0];
    let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
    assert!(matches!(decoder.read(ints), Err(Error::MalformedData { .. })));

    // Negative size.
    let bytes = [0xFF, 0xFE, 0xFF, 0xFF, 0xFF];
    let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
    assert!(matches!(decoder.read(ints), Err(Error::MalformedData { .. })));
}

#[test]
fn empty_struct_count_is_capped() {
    let mut registry = TypeRegistry::new();
    let empty = registry.define_struct(StructDef::new("::Demo::Empty")).expect("empty");
    let seq = registry.define_sequence("::Demo::Empties", empty).expect("seq");
    let config = CodecConfig::default().with_message_size_max(1024);

    // 2000 zero-byte elements fit in no bytes but exceed the limit.
    let mut bytes = vec![0xFF];
    bytes.extend_from_slice(&2000i32.to_le_bytes());
    let mut decoder = Decoder::with_config(&registry, &bytes, config.clone()).expect("decoder");
    assert!(matches!(decoder.read(seq), Err(Error::MalformedData { .. })));

    let bytes = [3u8];
    let mut decoder = Decoder::with_config(&registry, &bytes, config).expect("decoder");
    assert_eq!(
        decoder.read(seq).expect("read"),
        Value::Sequence(vec![Value::Struct(Default::default()); 3])
    );
}

#[test]
fn wide_indirection_table_decodes_in_linear_time() {
    let mut registry = TypeRegistry::new();
    registry.define_class(ClassDef::new("::Demo::Leaf")).expect("leaf");
    let leaves = registry.define_sequence("::Demo::Leaves", TypeId::OBJECT).expect("leaves");
    let holder = registry
        .define_class(ClassDef::new("::Demo::Holder").member("items", leaves))
        .expect("holder");

    let count = 40_000;
    let mut graph = ObjectGraph::new();
    let items = (0..count)
        .map(|_| Value::from(graph.insert(ClassInstance::new("::Demo::Leaf"))))
        .collect();
    let head = Value::from(
        graph.insert(ClassInstance::new("::Demo::Holder").with("items", Value::Sequence(items))),
    );
    let config = CodecConfig::default()
        .with_format(hwire::FormatType::Sliced)
        .with_message_size_max(16 << 20);
    let bytes = encode_with(&registry, &graph, config.clone(), holder, &head).expect("encode");

    let started = std::time::Instant::now();
    let (value, decoded) = decode_with(&registry, config, &bytes, holder).expect("decode");
    let elapsed = started.elapsed();
    assert!(elapsed < std::time::Duration::from_secs(2), "decode took {:?}", elapsed);

    assert_eq!(decoded.len(), count + 1);
    let r = value.as_object().expect("holder ref");
    let items = decoded.get(r).and_then(|h| h.members.get("items")).expect("items");
    let Value::Sequence(items) = items else {
        panic!("items is not a sequence: {:?}", items);
    };
    assert_eq!(items.len(), count);
    let first = items[0].as_object().expect("first leaf");
    assert_eq!(decoded.get(first).map(|i| i.type_id.as_str()), Some("::Demo::Leaf"));
}

fn chain_registry() -> (TypeRegistry, TypeId) {
    let mut registry = TypeRegistry::new();
    let node = registry.declare_class("::Demo::Link").expect("declare");
    registry
        .define_class(ClassDef::new("::Demo::Link").member("next", node))
        .expect("link");
    (registry, node)
}

fn chain(len: usize) -> (ObjectGraph, Value) {
    let mut graph = ObjectGraph::new();
    let mut next = Value::Class(None);
    for _ in 0..len {
        let r = graph.insert(ClassInstance::new("::Demo::Link").with("next", next));
        next = Value::from(r);
    }
    (graph, next)
}

#[test]
fn class_graph_depth_limit() {
    let (registry, node) = chain_registry();
    let (graph, head) = chain(20);

    let config = CodecConfig::default().with_class_graph_depth_max(20);
    let bytes = encode_with(&registry, &graph, config.clone(), node, &head).expect("at the limit");
    let (value, decoded) = decode_with(&registry, config, &bytes, node).expect("decode");
    assert!(graph.structurally_equal(&head, &decoded, &value));

    let tight = CodecConfig::default().with_class_graph_depth_max(10);
    assert!(matches!(
        encode_with(&registry, &graph, tight.clone(), node, &head),
        Err(Error::DepthExceeded { max: 10 })
    ));
    assert!(matches!(
        decode_with(&registry, tight, &bytes, node),
        Err(Error::DepthExceeded { max: 10 })
    ));
}

#[test]
fn message_size_limit() {
    let (registry, ty) = byte_seq_registry();
    let graph = ObjectGraph::new();
    let config = CodecConfig::default().with_message_size_max(64);

    assert!(matches!(
        encode_with(&registry, &graph, config.clone(), ty, &bytes_value(100)),
        Err(Error::MessageTooLarge { max: 64, .. })
    ));

    let bytes = encode(&registry, &graph, ty, &bytes_value(100)).expect("encode");
    assert!(matches!(
        decode_with(&registry, config, &bytes, ty),
        Err(Error::MessageTooLarge { max: 64, .. })
    ));
}

#[test]
fn bad_encapsulation_headers() {
    let registry = TypeRegistry::new();
    // Size larger than the buffer.
    let bytes = [50, 0, 0, 0, 1, 1, 7, 0, 0, 0];
    assert!(matches!(
        decode(&registry, &bytes, TypeId::INT),
        Err(Error::MalformedData { .. })
    ));
    // Size smaller than the header.
    let bytes = [2, 0, 0, 0, 1, 1];
    assert!(matches!(
        decode(&registry, &bytes, TypeId::INT),
        Err(Error::MalformedData { .. })
    ));
    // Unknown encoding version.
    let bytes = [10, 0, 0, 0, 2, 0, 7, 0, 0, 0];
    assert!(matches!(
        decode(&registry, &bytes, TypeId::INT),
        Err(Error::UnsupportedEncoding(_))
    ));
}

#[test]
fn random_garbage_never_panics() {
    let (registry, node) = chain_registry();
    let mut rng = fastrand::Rng::with_seed(42);
    for _ in 0..2000 {
        let len = rng.usize(0..64);
        let mut bytes: Vec<u8> = (0..len).map(|_| rng.u8(..)).collect();
        // Keep a plausible header on most inputs so the body gets exercised.
        if len >= 6 && rng.bool() {
            bytes[..4].copy_from_slice(&(len as i32).to_le_bytes());
            bytes[4] = 1;
            bytes[5] = 1;
        }
        let _ = decode(&registry, &bytes, node);
        let _ = decode(&registry, &bytes, TypeId::OBJECT);
    }
}

#[test]
fn mutated_valid_messages_never_panic() {
    let (registry, node) = chain_registry();
    let (graph, head) = chain(4);
    let config = CodecConfig::default().with_format(hwire::FormatType::Sliced);
    let valid = encode_with(&registry, &graph, config, node, &head).expect("encode");

    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..2000 {
        let mut bytes = valid.clone();
        let flips = rng.usize(1..4);
        for _ in 0..flips {
            let i = rng.usize(0..bytes.len());
            bytes[i] = rng.u8(..);
        }
        let _ = decode(&registry, &bytes, node);
    }
}
