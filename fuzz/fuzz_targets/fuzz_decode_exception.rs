// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hwire::marshal::decode_exception_with;
use hwire::schema::{Schema, SchemaLoader};
use hwire::CodecConfig;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

const SCHEMA: &str = r#"
types:
  - kind: class
    name: ::F::Detail
    members:
      - { name: text, type: string }
      - { name: cause, type: ::F::Detail }
  - kind: exception
    name: ::F::Failed
    preserve_slices: true
    members:
      - { name: code, type: int }
      - { name: detail, type: ::F::Detail, tag: 3 }
  - kind: exception
    name: ::F::Timeout
    base: ::F::Failed
    members:
      - { name: after, type: long }
"#;

fn schema() -> &'static Schema {
    static SCHEMA_CELL: OnceLock<Schema> = OnceLock::new();
    SCHEMA_CELL.get_or_init(|| SchemaLoader::from_yaml_str(SCHEMA).expect("fuzz schema"))
}

fuzz_target!(|data: &[u8]| {
    let config = CodecConfig::default().with_class_graph_depth_max(32);
    let _ = decode_exception_with(&schema().registry, config, data);
});
