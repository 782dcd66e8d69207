// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hwire::schema::SchemaLoader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(schema) = SchemaLoader::from_yaml_str(text) {
            // A loaded registry has no declared-only types left.
            assert!(schema.registry.check_complete().is_ok());
        }
    }
});
