// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HWIRE - schema-driven value marshaling for the Ice 1.1 encoding
//!
//! Encodes and decodes dynamically typed values (primitives, enums,
//! structs, sequences, dictionaries, proxies, class object graphs and user
//! exceptions) against a runtime [`TypeRegistry`], producing the compact
//! little-endian Ice wire format.
//!
//! ## Quick Start
//!
//! ```rust
//! use hwire::marshal::{decode, encode};
//! use hwire::{Members, ObjectGraph, StructDef, TypeId, TypeRegistry, Value};
//!
//! fn main() -> hwire::Result<()> {
//!     let mut registry = TypeRegistry::new();
//!     let point = registry.define_struct(
//!         StructDef::new("::Demo::Point")
//!             .member("x", TypeId::INT)
//!             .member("y", TypeId::INT)
//!             .optional_member("label", TypeId::STRING, 1),
//!     )?;
//!
//!     let value = Value::Struct(Members::new().with("x", 3i32).with("y", -4i32));
//!     let graph = ObjectGraph::new();
//!     let bytes = encode(&registry, &graph, point, &value)?;
//!
//!     let (decoded, _) = decode(&registry, &bytes, point)?;
//!     assert_eq!(decoded, value);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          marshal                                    |
//! |   Encoder / Decoder | class slices | optionals | exceptions | hooks |
//! +---------------------------------------------------------------------+
//! |            types                  |              value              |
//! |   TypeRegistry | descriptors      |   Value | ObjectGraph | proxies |
//! +---------------------------------------------------------------------+
//! |                          stream                                     |
//! |   sizes | primitives | strings | encapsulations | optional headers  |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeRegistry`] | Arena of type descriptors, with forward declarations |
//! | [`Value`] | Dynamically typed value |
//! | [`ObjectGraph`] | Arena owning the class instances of one message |
//! | [`Encoder`] / [`Decoder`] | Streaming marshaler for one message |
//! | [`CodecConfig`] | Encoding, class format and safety limits |

/// Wire constants and codec configuration.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Object-graph marshaling (classes, optionals, exceptions).
pub mod marshal;
/// YAML/JSON schema documents.
#[cfg(feature = "schema-loaders")]
pub mod schema;
/// Byte-level wire codec.
pub mod stream;
/// Type descriptors and the registry.
pub mod types;
/// Dynamic values and object graphs.
pub mod value;

pub use config::{CodecConfig, EncodingVersion, FormatType};
pub use error::{Error, Result};
pub use marshal::{Decoder, Encoder, ValueHooks};
pub use types::{
    ClassDef, DataMember, EnumDef, ExceptionDef, PrimitiveKind, ProxyDef, StructDef,
    TypeDescriptor, TypeId, TypeRegistry,
};
pub use value::{
    ClassInstance, Identity, Members, ObjectGraph, ObjectRef, ProxyValue, SliceInfo, SlicedData,
    UserException, Value,
};

/// HWIRE version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
