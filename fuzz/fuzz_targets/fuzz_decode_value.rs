// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hwire::marshal::{decode_with, encode_with};
use hwire::schema::{Schema, SchemaLoader};
use hwire::CodecConfig;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

const SCHEMA: &str = r#"
types:
  - kind: enum
    name: ::F::Kind
    enumerators: [a, b, { name: c, value: 300 }]
  - kind: class
    name: ::F::Node
    compact_id: 7
    preserve_slices: true
    members:
      - { name: kind, type: ::F::Kind }
      - { name: next, type: ::F::Node }
      - { name: any, type: Object }
      - { name: note, type: string, tag: 1 }
  - kind: class
    name: ::F::Leaf
    base: ::F::Node
    members:
      - { name: data, type: ::F::Bytes }
      - { name: where, type: "Object*", tag: 40 }
  - kind: sequence
    name: ::F::Bytes
    element: byte
  - kind: struct
    name: ::F::Entry
    members:
      - { name: id, type: long }
      - { name: node, type: ::F::Node }
      - { name: weight, type: double, tag: 2 }
  - kind: dictionary
    name: ::F::Table
    key: string
    value: ::F::Entry
"#;

fn schema() -> &'static Schema {
    static SCHEMA_CELL: OnceLock<Schema> = OnceLock::new();
    SCHEMA_CELL.get_or_init(|| SchemaLoader::from_yaml_str(SCHEMA).expect("fuzz schema"))
}

fuzz_target!(|data: &[u8]| {
    let schema = schema();
    let Some(table) = schema.registry.type_by_name("::F::Table") else {
        return;
    };
    let config = CodecConfig::default()
        .with_class_graph_depth_max(32)
        .with_message_size_max(1 << 16);

    // Whatever decodes must encode again.
    if let Ok((value, graph)) = decode_with(&schema.registry, config.clone(), data, table) {
        let _ = encode_with(&schema.registry, &graph, config, table, &value);
    }
});
