// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML/JSON schema documents.
//!
//! A schema document declares the types of a [`TypeRegistry`] and,
//! optionally, the codec settings used with them.
//!
//! # Example
//!
//! ```yaml
//! codec:
//!   format: sliced
//!   class_graph_depth_max: 64
//!
//! types:
//!   - kind: enum
//!     name: ::Demo::Color
//!     enumerators: [red, green, { name: blue, value: 10 }]
//!   - kind: class
//!     name: ::Demo::Node
//!     compact_id: 3
//!     members:
//!       - { name: next, type: ::Demo::Node }
//!       - { name: label, type: string, tag: 1 }
//!   - kind: interface
//!     name: ::Demo::Printer
//!   - kind: struct
//!     name: ::Demo::Job
//!     members:
//!       - { name: printer, type: "::Demo::Printer*" }
//! ```
//!
//! Type references are primitive names (`int`, `string`, ...), `Object`
//! for any class, `Object*` for any proxy, `Name*` for a proxy of an
//! interface, or the scoped name of another type. A member with a `tag`
//! is optional. Classes, interfaces and exceptions may be referenced
//! before they appear; other types are defined once everything they use
//! is known.

use crate::config::{CodecConfig, EncodingVersion, FormatType, OBJECT_TYPE_ID};
use crate::error::{Error, Result};
use crate::types::{ClassDef, EnumDef, ExceptionDef, ProxyDef, StructDef, TypeId, TypeRegistry};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Registry and codec settings loaded from one document.
#[derive(Debug)]
pub struct Schema {
    pub registry: TypeRegistry,
    pub config: CodecConfig,
}

impl Schema {
    /// Look up a type by the name a document would use for it
    /// (`int`, `::M::T`, `::M::I*`, `Object`).
    pub fn type_named(&self, name: &str) -> Result<TypeId> {
        resolve(&self.registry, name)?
            .ok_or_else(|| Error::InvalidSchema(format!("unknown type '{}'", name)))
    }
}

/// Schema document loader.
pub struct SchemaLoader;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SchemaDocument {
    codec: Option<CodecSection>,
    types: Vec<TypeEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CodecSection {
    encoding: Option<String>,
    format: Option<String>,
    class_graph_depth_max: Option<usize>,
    message_size_max: Option<usize>,
    slice_values: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TypeEntry {
    Enum {
        name: String,
        enumerators: Vec<EnumeratorEntry>,
    },
    Struct {
        name: String,
        #[serde(default)]
        members: Vec<MemberEntry>,
    },
    Sequence {
        name: String,
        element: String,
    },
    Dictionary {
        name: String,
        key: String,
        value: String,
    },
    Class(ClassEntry),
    #[serde(alias = "proxy")]
    Interface {
        name: String,
        #[serde(default)]
        bases: Vec<String>,
    },
    Exception(ExceptionEntry),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnumeratorEntry {
    Name(String),
    Valued { name: String, value: i32 },
}

#[derive(Debug, Deserialize)]
struct MemberEntry {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    tag: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClassEntry {
    name: String,
    base: Option<String>,
    compact_id: Option<i32>,
    #[serde(rename = "abstract")]
    is_abstract: bool,
    preserve_slices: bool,
    interface_by_value: bool,
    members: Vec<MemberEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExceptionEntry {
    name: String,
    base: Option<String>,
    preserve_slices: bool,
    members: Vec<MemberEntry>,
}

impl SchemaLoader {
    /// Load a schema file; `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Schema> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::InvalidSchema(format!("failed to read {}: {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Schema> {
        let doc: SchemaDocument = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidSchema(format!("YAML parse error: {}", e)))?;
        build(doc)
    }

    pub fn from_json_str(json: &str) -> Result<Schema> {
        let doc: SchemaDocument = serde_json::from_str(json)
            .map_err(|e| Error::InvalidSchema(format!("JSON parse error: {}", e)))?;
        build(doc)
    }
}

fn build(doc: SchemaDocument) -> Result<Schema> {
    let config = match doc.codec {
        Some(section) => codec_config(section)?,
        None => CodecConfig::default(),
    };
    let registry = build_registry(&doc.types)?;
    log::debug!(
        "[schema] loaded {} types ({:?} format)",
        doc.types.len(),
        config.format
    );
    Ok(Schema { registry, config })
}

fn codec_config(section: CodecSection) -> Result<CodecConfig> {
    let mut config = CodecConfig::default();
    if let Some(encoding) = section.encoding {
        config.encoding = match encoding.trim() {
            "1.0" => EncodingVersion::V1_0,
            "1.1" => EncodingVersion::V1_1,
            other => {
                return Err(Error::InvalidSchema(format!(
                    "unsupported encoding '{}'",
                    other
                )))
            }
        };
    }
    if let Some(format) = section.format {
        config.format = format
            .parse::<FormatType>()
            .map_err(Error::InvalidSchema)?;
    }
    if let Some(depth) = section.class_graph_depth_max {
        config.class_graph_depth_max = depth;
    }
    if let Some(size) = section.message_size_max {
        config.message_size_max = size;
    }
    if let Some(enabled) = section.slice_values {
        config.slice_values = enabled;
    }
    Ok(config)
}

/// Outcome of one definition attempt.
enum Step {
    Defined,
    /// A referenced type is not known yet.
    Blocked(String),
}

fn build_registry(entries: &[TypeEntry]) -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();

    // Classes, interfaces and exceptions can be referenced before they are
    // defined.
    for entry in entries {
        match entry {
            TypeEntry::Class(class) => {
                registry.declare_class(&class.name)?;
            }
            TypeEntry::Interface { name, .. } => {
                registry.declare_proxy(name)?;
            }
            TypeEntry::Exception(exception) => {
                registry.declare_exception(&exception.name)?;
            }
            _ => {}
        }
    }

    let (plain, declared): (Vec<&TypeEntry>, Vec<&TypeEntry>) = entries.iter().partition(|e| {
        !matches!(
            e,
            TypeEntry::Class(_) | TypeEntry::Interface { .. } | TypeEntry::Exception(_)
        )
    });
    define_in_order(&mut registry, plain)?;
    // Bases must be defined before derived types.
    define_in_order(&mut registry, declared)?;

    registry.check_complete()?;
    Ok(registry)
}

/// Define entries in rounds until all are defined or a round makes no
/// progress.
fn define_in_order(registry: &mut TypeRegistry, mut pending: Vec<&TypeEntry>) -> Result<()> {
    while !pending.is_empty() {
        let before = pending.len();
        let mut blocked = Vec::new();
        let mut first_missing = None;
        for entry in pending {
            if let Step::Blocked(missing) = define_entry(registry, entry)? {
                first_missing.get_or_insert((entry_name(entry).to_string(), missing));
                blocked.push(entry);
            }
        }
        if let Some((owner, missing)) = first_missing {
            if blocked.len() == before {
                return Err(Error::InvalidSchema(format!(
                    "'{}' refers to unknown type '{}'",
                    owner, missing
                )));
            }
        }
        pending = blocked;
    }
    Ok(())
}

fn entry_name(entry: &TypeEntry) -> &str {
    match entry {
        TypeEntry::Enum { name, .. }
        | TypeEntry::Struct { name, .. }
        | TypeEntry::Sequence { name, .. }
        | TypeEntry::Dictionary { name, .. }
        | TypeEntry::Interface { name, .. } => name,
        TypeEntry::Class(class) => &class.name,
        TypeEntry::Exception(exception) => &exception.name,
    }
}

macro_rules! resolve_or_block {
    ($registry:expr, $name:expr) => {
        match resolve($registry, $name)? {
            Some(id) => id,
            None => return Ok(Step::Blocked($name.to_string())),
        }
    };
}

fn define_entry(registry: &mut TypeRegistry, entry: &TypeEntry) -> Result<Step> {
    match entry {
        TypeEntry::Enum { name, enumerators } => {
            let mut def = EnumDef::new(name.as_str());
            for enumerator in enumerators {
                def = match enumerator {
                    EnumeratorEntry::Name(n) => def.enumerator(n.as_str()),
                    EnumeratorEntry::Valued { name, value } => {
                        def.enumerator_value(name.as_str(), *value)
                    }
                };
            }
            registry.define_enum(def)?;
        }
        TypeEntry::Struct { name, members } => {
            let mut def = StructDef::new(name.as_str());
            for member in members {
                let ty = resolve_or_block!(registry, &member.ty);
                def = match member.tag {
                    Some(tag) => def.optional_member(member.name.as_str(), ty, tag),
                    None => def.member(member.name.as_str(), ty),
                };
            }
            registry.define_struct(def)?;
        }
        TypeEntry::Sequence { name, element } => {
            let element = resolve_or_block!(registry, element);
            registry.define_sequence(name, element)?;
        }
        TypeEntry::Dictionary { name, key, value } => {
            let key = resolve_or_block!(registry, key);
            let value = resolve_or_block!(registry, value);
            registry.define_dictionary(name, key, value)?;
        }
        TypeEntry::Class(class) => {
            let mut def = ClassDef::new(class.name.as_str());
            if let Some(base) = &class.base {
                let base_id = resolve_or_block!(registry, base);
                if base_id != TypeId::OBJECT && !registry.is_defined(base_id) {
                    return Ok(Step::Blocked(base.clone()));
                }
                def = def.base(base_id);
            }
            if let Some(compact_id) = class.compact_id {
                def = def.compact_id(compact_id);
            }
            if class.is_abstract {
                def = def.abstract_class();
            }
            if class.preserve_slices {
                def = def.preserve_slices();
            }
            if class.interface_by_value {
                def = def.interface_by_value();
            }
            for member in &class.members {
                let ty = resolve_or_block!(registry, &member.ty);
                def = match member.tag {
                    Some(tag) => def.optional_member(member.name.as_str(), ty, tag),
                    None => def.member(member.name.as_str(), ty),
                };
            }
            registry.define_class(def)?;
        }
        TypeEntry::Interface { name, bases } => {
            let mut def = ProxyDef::new(name.as_str());
            for (i, base) in bases.iter().enumerate() {
                let proxy = base.trim_end_matches('*');
                let id = match registry.proxy_by_name(proxy) {
                    Some(id) if registry.is_defined(id) => id,
                    Some(_) => return Ok(Step::Blocked(base.clone())),
                    None => {
                        return Err(Error::InvalidSchema(format!(
                            "base '{}' of interface '{}' is not an interface",
                            base, name
                        )))
                    }
                };
                def = if i == 0 { def.base(id) } else { def.interface(id) };
            }
            registry.define_proxy(def)?;
        }
        TypeEntry::Exception(exception) => {
            let mut def = ExceptionDef::new(exception.name.as_str());
            if let Some(base) = &exception.base {
                let id = registry.exception_by_name(base).ok_or_else(|| {
                    Error::InvalidSchema(format!(
                        "base '{}' of exception '{}' is not an exception",
                        base, exception.name
                    ))
                })?;
                if !registry.is_defined(id) {
                    return Ok(Step::Blocked(base.clone()));
                }
                def = def.base(id);
            }
            if exception.preserve_slices {
                def = def.preserve_slices();
            }
            for member in &exception.members {
                let ty = resolve_or_block!(registry, &member.ty);
                def = match member.tag {
                    Some(tag) => def.optional_member(member.name.as_str(), ty, tag),
                    None => def.member(member.name.as_str(), ty),
                };
            }
            registry.define_exception(def)?;
        }
    }
    Ok(Step::Defined)
}

/// Resolve a type reference; `None` when the name is not known yet.
fn resolve(registry: &TypeRegistry, name: &str) -> Result<Option<TypeId>> {
    let name = name.trim();
    if let Some(interface) = name.strip_suffix('*') {
        let interface = interface.trim();
        if interface == "Object" || interface == OBJECT_TYPE_ID {
            return Ok(Some(TypeId::OBJECT_PROXY));
        }
        return match registry.proxy_by_name(interface) {
            Some(id) => Ok(Some(id)),
            None => Err(Error::InvalidSchema(format!(
                "'{}' is not an interface",
                interface
            ))),
        };
    }
    if name == "Object" || name == OBJECT_TYPE_ID {
        return Ok(Some(TypeId::OBJECT));
    }
    Ok(registry
        .type_by_name(name)
        .or_else(|| registry.class_by_name(name))
        .or_else(|| registry.exception_by_name(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDescriptor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DEMO: &str = r#"
codec:
  format: sliced
  class_graph_depth_max: 16
  slice_values: false

types:
  - kind: struct
    name: ::Demo::Job
    members:
      - { name: items, type: ::Demo::Items }
      - { name: printer, type: "::Demo::Printer*" }
      - { name: color, type: ::Demo::Color, tag: 2 }
  - kind: sequence
    name: ::Demo::Items
    element: ::Demo::Node
  - kind: enum
    name: ::Demo::Color
    enumerators: [red, green, { name: blue, value: 10 }]
  - kind: class
    name: ::Demo::Leaf
    base: ::Demo::Node
    preserve_slices: true
  - kind: class
    name: ::Demo::Node
    compact_id: 3
    members:
      - { name: next, type: ::Demo::Node }
      - { name: any, type: Object }
  - kind: interface
    name: ::Demo::Printer
  - kind: exception
    name: ::Demo::JobFailed
    base: ::Demo::Failure
    members:
      - { name: job, type: ::Demo::Job }
  - kind: exception
    name: ::Demo::Failure
    members:
      - { name: code, type: int }
"#;

    #[test]
    fn test_parse_demo() {
        let schema = SchemaLoader::from_yaml_str(DEMO).expect("schema");
        assert_eq!(schema.config.format, FormatType::Sliced);
        assert_eq!(schema.config.class_graph_depth_max, 16);
        assert!(!schema.config.slice_values);

        let registry = &schema.registry;
        let node = registry.class_by_name("::Demo::Node").expect("node");
        let leaf = registry.class_by_name("::Demo::Leaf").expect("leaf");
        assert!(registry.is_a(leaf, node));
        assert_eq!(registry.class_by_compact_id(3), Some(node));
        assert!(registry.class(leaf).expect("leaf").preserve_slices);

        let color = registry.type_by_name("::Demo::Color").expect("color");
        match registry.lookup(color).expect("lookup") {
            TypeDescriptor::Enum(e) => {
                assert_eq!(e.value_of("green"), Some(1));
                assert_eq!(e.value_of("blue"), Some(10));
            }
            other => panic!("unexpected descriptor: {:?}", other),
        }

        let failed = registry.exception_by_name("::Demo::JobFailed").expect("exception");
        assert_eq!(registry.exception_chain(failed).expect("chain").len(), 2);
    }

    #[test]
    fn test_unknown_type_reference() {
        let yaml = r#"
types:
  - kind: struct
    name: ::Demo::S
    members:
      - { name: x, type: ::Demo::Missing }
"#;
        match SchemaLoader::from_yaml_str(yaml) {
            Err(Error::InvalidSchema(msg)) => assert!(msg.contains("::Demo::Missing")),
            other => panic!("expected InvalidSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_encoding() {
        let yaml = "codec:\n  encoding: \"2.0\"\n";
        assert!(matches!(
            SchemaLoader::from_yaml_str(yaml),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_exception_as_member_rejected() {
        let yaml = r#"
types:
  - kind: exception
    name: ::Demo::E
  - kind: struct
    name: ::Demo::S
    members:
      - { name: e, type: ::Demo::E }
"#;
        assert!(matches!(
            SchemaLoader::from_yaml_str(yaml),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_load_json_file() {
        let json = r#"{
            "codec": { "encoding": "1.0" },
            "types": [
                { "kind": "struct", "name": "::Demo::P",
                  "members": [ { "name": "x", "type": "short" } ] }
            ]
        }"#;
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("tempfile");
        file.write_all(json.as_bytes()).expect("write");

        let schema = SchemaLoader::load_from_file(file.path()).expect("schema");
        assert_eq!(schema.config.encoding, EncodingVersion::V1_0);
        assert!(schema.registry.type_by_name("::Demo::P").is_some());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(DEMO.as_bytes()).expect("write");
        let schema = SchemaLoader::load_from_file(file.path()).expect("schema");
        assert!(schema.registry.proxy_by_name("::Demo::Printer").is_some());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SchemaLoader::load_from_file("/nonexistent/schema.yaml"),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_type_named() {
        let schema = SchemaLoader::from_yaml_str(DEMO).expect("schema");
        assert_eq!(schema.type_named("int").unwrap(), TypeId::INT);
        assert_eq!(schema.type_named("Object*").unwrap(), TypeId::OBJECT_PROXY);
        assert_eq!(
            schema.type_named("::Demo::Printer*").ok(),
            schema.registry.proxy_by_name("::Demo::Printer")
        );
        assert!(schema.type_named("::Demo::Nope").is_err());
    }
}
