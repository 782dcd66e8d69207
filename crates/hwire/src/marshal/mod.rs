// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object-graph marshaling.
//!
//! [`Encoder`] and [`Decoder`] walk values against a [`TypeRegistry`],
//! including class graphs (sharing, cycles, slicing of unknown subtypes),
//! tagged optionals and user exceptions. The free functions wrap one value
//! in one encapsulation.
//!
//! # Example
//!
//! ```
//! use hwire::marshal::{decode, encode};
//! use hwire::{ClassDef, ClassInstance, ObjectGraph, TypeId, TypeRegistry, Value};
//!
//! let mut registry = TypeRegistry::new();
//! let node = registry.declare_class("::Demo::Node").unwrap();
//! registry
//!     .define_class(ClassDef::new("::Demo::Node").member("next", node))
//!     .unwrap();
//!
//! // a -> b -> a
//! let mut graph = ObjectGraph::new();
//! let a = graph.insert(ClassInstance::new("::Demo::Node"));
//! let b = graph.insert(ClassInstance::new("::Demo::Node").with("next", a));
//! graph.get_mut(a).unwrap().members.set("next", b);
//!
//! let bytes = encode(&registry, &graph, node, &Value::from(a)).unwrap();
//! let (value, decoded) = decode(&registry, &bytes, node).unwrap();
//! assert!(graph.structurally_equal(&Value::from(a), &decoded, &value));
//! ```

mod decoder;
mod encoder;
mod exception;
mod hooks;
mod optional;
mod slices;
mod validate;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use hooks::ValueHooks;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::types::{TypeId, TypeRegistry};
use crate::value::{ObjectGraph, UserException, Value};

/// Encode `value` as `ty` inside one encapsulation, with default settings.
pub fn encode(
    registry: &TypeRegistry,
    graph: &ObjectGraph,
    ty: TypeId,
    value: &Value,
) -> Result<Vec<u8>> {
    encode_with(registry, graph, CodecConfig::default(), ty, value)
}

pub fn encode_with(
    registry: &TypeRegistry,
    graph: &ObjectGraph,
    config: CodecConfig,
    ty: TypeId,
    value: &Value,
) -> Result<Vec<u8>> {
    let mut encoder = Encoder::with_config(registry, graph, config);
    encoder.start_encapsulation()?;
    encoder.write(ty, value)?;
    encoder.end_encapsulation()?;
    encoder.finish()
}

/// Decode one encapsulation holding a value of type `ty`.
pub fn decode(registry: &TypeRegistry, bytes: &[u8], ty: TypeId) -> Result<(Value, ObjectGraph)> {
    decode_with(registry, CodecConfig::default(), bytes, ty)
}

pub fn decode_with(
    registry: &TypeRegistry,
    config: CodecConfig,
    bytes: &[u8],
    ty: TypeId,
) -> Result<(Value, ObjectGraph)> {
    let mut decoder = Decoder::with_config(registry, bytes, config)?;
    decoder.start_encapsulation()?;
    let value = decoder.read(ty)?;
    decoder.end_encapsulation()?;
    Ok((value, decoder.finish()?))
}

/// Encode a user exception inside one encapsulation.
pub fn encode_exception(
    registry: &TypeRegistry,
    graph: &ObjectGraph,
    exception: &UserException,
) -> Result<Vec<u8>> {
    encode_exception_with(registry, graph, CodecConfig::default(), exception)
}

pub fn encode_exception_with(
    registry: &TypeRegistry,
    graph: &ObjectGraph,
    config: CodecConfig,
    exception: &UserException,
) -> Result<Vec<u8>> {
    let mut encoder = Encoder::with_config(registry, graph, config);
    encoder.start_encapsulation()?;
    encoder.write_exception(exception)?;
    encoder.end_encapsulation()?;
    encoder.finish()
}

pub fn decode_exception(
    registry: &TypeRegistry,
    bytes: &[u8],
) -> Result<(UserException, ObjectGraph)> {
    decode_exception_with(registry, CodecConfig::default(), bytes)
}

pub fn decode_exception_with(
    registry: &TypeRegistry,
    config: CodecConfig,
    bytes: &[u8],
) -> Result<(UserException, ObjectGraph)> {
    let mut decoder = Decoder::with_config(registry, bytes, config)?;
    decoder.start_encapsulation()?;
    let exception = decoder.read_exception()?;
    decoder.end_encapsulation()?;
    Ok((exception, decoder.finish()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatType;
    use crate::error::Error;
    use crate::types::{ClassDef, StructDef};
    use crate::value::{ClassInstance, Members};
    use std::cell::Cell;

    struct CountingHooks {
        written: Cell<usize>,
        read: Cell<usize>,
    }

    impl ValueHooks for CountingHooks {
        fn pre_marshal(&self, _instance: &ClassInstance) -> std::result::Result<(), String> {
            self.written.set(self.written.get() + 1);
            Ok(())
        }

        fn post_unmarshal(&self, instance: &mut ClassInstance) -> std::result::Result<(), String> {
            self.read.set(self.read.get() + 1);
            instance.members.set("seen", true);
            Ok(())
        }
    }

    struct RejectingHooks;

    impl ValueHooks for RejectingHooks {
        fn pre_marshal(&self, instance: &ClassInstance) -> std::result::Result<(), String> {
            Err(format!("refusing {}", instance.type_id))
        }
    }

    fn pair_registry() -> (TypeRegistry, TypeId, TypeId) {
        let mut registry = TypeRegistry::new();
        let node = registry
            .define_class(ClassDef::new("::Demo::Node").member("v", TypeId::INT))
            .expect("class");
        let pair = registry
            .define_struct(StructDef::new("::Demo::Pair").member("a", node).member("b", node))
            .expect("struct");
        (registry, node, pair)
    }

    #[test]
    fn test_hooks_run_once_per_instance() {
        let (registry, _, pair) = pair_registry();
        let mut graph = ObjectGraph::new();
        let shared = graph.insert(ClassInstance::new("::Demo::Node").with("v", 1i32));
        let value = Value::Struct(Members::new().with("a", shared).with("b", shared));

        let hooks = CountingHooks {
            written: Cell::new(0),
            read: Cell::new(0),
        };
        let mut encoder = Encoder::new(&registry, &graph).with_hooks(&hooks);
        encoder.write(pair, &value).expect("write");
        let bytes = encoder.finish().expect("finish");
        assert_eq!(hooks.written.get(), 1);

        let mut decoder = Decoder::new(&registry, &bytes).expect("decoder").with_hooks(&hooks);
        decoder.read(pair).expect("read");
        let decoded = decoder.finish().expect("finish");
        assert_eq!(hooks.read.get(), 1);
        let (_, instance) = decoded.iter().next().expect("instance");
        assert_eq!(instance.members.get("seen"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_hook_error_aborts() {
        let (registry, node, _) = pair_registry();
        let mut graph = ObjectGraph::new();
        let r = graph.insert(ClassInstance::new("::Demo::Node").with("v", 1i32));
        let mut encoder = Encoder::new(&registry, &graph).with_hooks(&RejectingHooks);
        assert!(matches!(encoder.write(node, &Value::from(r)), Err(Error::Hook(_))));
    }

    #[test]
    fn test_sliced_format_shares_through_indirection() {
        let mut registry = TypeRegistry::new();
        let node = registry
            .define_class(ClassDef::new("::Demo::Node").member("v", TypeId::INT))
            .expect("node");
        let holder = registry
            .define_class(ClassDef::new("::Demo::Holder").member("a", node).member("b", node))
            .expect("holder");
        let mut graph = ObjectGraph::new();
        let shared = graph.insert(ClassInstance::new("::Demo::Node").with("v", 4i32));
        let root = graph.insert(
            ClassInstance::new("::Demo::Holder")
                .with("a", shared)
                .with("b", shared),
        );

        let config = CodecConfig::default().with_format(FormatType::Sliced);
        let bytes =
            encode_with(&registry, &graph, config, holder, &Value::from(root)).expect("encode");
        let (value, decoded) = decode(&registry, &bytes, holder).expect("decode");
        assert_eq!(decoded.len(), 2);
        assert!(graph.structurally_equal(&Value::from(root), &decoded, &value));
    }

    #[test]
    fn test_formal_type_mismatch() {
        let mut registry = TypeRegistry::new();
        let shape = registry.define_class(ClassDef::new("::Demo::Shape")).expect("shape");
        let circle = registry
            .define_class(ClassDef::new("::Demo::Circle").base(shape))
            .expect("circle");
        let mut graph = ObjectGraph::new();
        let r = graph.insert(ClassInstance::new("::Demo::Shape"));
        let bytes = encode(&registry, &graph, shape, &Value::from(r)).expect("encode");
        match decode(&registry, &bytes, circle) {
            Err(Error::UnexpectedObject { expected, actual }) => {
                assert_eq!(expected, "::Demo::Circle");
                assert_eq!(actual, "::Demo::Shape");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
