// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON to [`Value`] conversion, driven by the registry.
//!
//! Accepts the same shapes the renderer prints:
//!
//! - enums as enumerator names or numbers
//! - structs, classes and exceptions as objects; a missing or `null`
//!   optional member is unset
//! - dictionaries as `[key, value]` pairs, or as an object for string keys
//! - classes with an optional `@type` and `@id`; `{"@ref": id}` points back
//!   at an instance already built
//! - proxies as `"category/name@adapter"` strings

use anyhow::{anyhow, bail, Context};
use hwire::types::TypeDescriptor;
use hwire::{
    ClassInstance, DataMember, Identity, Members, ObjectGraph, ObjectRef, PrimitiveKind,
    ProxyValue, TypeId, TypeRegistry, UserException, Value,
};
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

pub struct ValueBuilder<'a> {
    registry: &'a TypeRegistry,
    graph: ObjectGraph,
    ids: HashMap<u64, ObjectRef>,
}

impl<'a> ValueBuilder<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            graph: ObjectGraph::new(),
            ids: HashMap::new(),
        }
    }

    /// The instances created by [`ValueBuilder::build`] so far.
    pub fn finish(self) -> ObjectGraph {
        self.graph
    }

    pub fn build(&mut self, ty: TypeId, json: &Json) -> anyhow::Result<Value> {
        let registry = self.registry;
        let desc = registry
            .lookup(ty)
            .with_context(|| format!("type '{}'", registry.name_of(ty)))?;
        match desc {
            TypeDescriptor::Primitive(kind) => primitive(*kind, json),
            TypeDescriptor::Enum(e) => match json {
                Json::String(name) => e
                    .value_of(name)
                    .map(Value::Enum)
                    .ok_or_else(|| anyhow!("'{}' is not an enumerator of {}", name, e.name)),
                _ => Ok(Value::Enum(integer(json)?)),
            },
            TypeDescriptor::Struct(s) => {
                let object = expect_object(json, &s.name)?;
                let declared = s.members.iter().chain(&s.optional_members);
                let members = self.members(&s.name, declared, object)?;
                Ok(Value::Struct(members))
            }
            TypeDescriptor::Sequence(s) => {
                let items = json
                    .as_array()
                    .ok_or_else(|| anyhow!("{} expects an array", s.name))?;
                let items = items
                    .iter()
                    .map(|item| self.build(s.element, item))
                    .collect::<anyhow::Result<_>>()?;
                Ok(Value::Sequence(items))
            }
            TypeDescriptor::Dictionary(d) => {
                let entries = match json {
                    Json::Object(object) if d.key == TypeId::STRING => object
                        .iter()
                        .map(|(k, v)| Ok((Value::String(k.clone()), self.build(d.value, v)?)))
                        .collect::<anyhow::Result<_>>()?,
                    Json::Array(pairs) => pairs
                        .iter()
                        .map(|pair| match pair.as_array().map(Vec::as_slice) {
                            Some([k, v]) => Ok((self.build(d.key, k)?, self.build(d.value, v)?)),
                            _ => bail!("{} entries must be [key, value] pairs", d.name),
                        })
                        .collect::<anyhow::Result<_>>()?,
                    _ => bail!("{} expects an array of pairs", d.name),
                };
                Ok(Value::Dictionary(entries))
            }
            TypeDescriptor::Class(c) => match json {
                Json::Null => Ok(Value::Class(None)),
                _ => Ok(Value::Class(Some(self.instance(&c.name, expect_object(json, &c.name)?)?))),
            },
            TypeDescriptor::Proxy(p) => match json {
                Json::Null => Ok(Value::Proxy(None)),
                Json::String(text) => Ok(Value::Proxy(Some(parse_proxy(text)?))),
                _ => bail!("{} expects a \"category/name@adapter\" string", p.name),
            },
            TypeDescriptor::Exception(e) => bail!("exception {} cannot be used as a value", e.name),
        }
    }

    /// Build a user exception; `@type` names the most-derived exception.
    pub fn exception(&mut self, json: &Json) -> anyhow::Result<UserException> {
        let registry = self.registry;
        let object = expect_object(json, "exception")?;
        let type_id = object
            .get("@type")
            .and_then(Json::as_str)
            .ok_or_else(|| anyhow!("exception needs an \"@type\""))?;
        let id = registry
            .exception_by_name(type_id)
            .ok_or_else(|| anyhow!("unknown exception '{}'", type_id))?;
        let mut declared = Vec::new();
        for level in registry.exception_chain(id)? {
            let e = registry.exception(level)?;
            declared.extend(e.members.iter().chain(&e.optional_members));
        }
        let mut exception = UserException::new(type_id);
        exception.members = self.members(type_id, declared.into_iter(), object)?;
        Ok(exception)
    }

    fn instance(&mut self, formal: &str, object: &Map<String, Json>) -> anyhow::Result<ObjectRef> {
        if let Some(id) = object.get("@ref") {
            let id = id.as_u64().ok_or_else(|| anyhow!("\"@ref\" must be a number"))?;
            return self
                .ids
                .get(&id)
                .copied()
                .ok_or_else(|| anyhow!("\"@ref\": {} does not name an earlier instance", id));
        }

        let registry = self.registry;
        let type_id = object.get("@type").and_then(Json::as_str).unwrap_or(formal);
        let mut declared = Vec::new();
        if let Some(class) = registry.class_by_name(type_id) {
            for level in registry.class_chain(class)? {
                let c = registry.class(level)?;
                declared.extend(c.members.iter().chain(&c.optional_members));
            }
        } else if type_id != formal {
            bail!("unknown class '{}'", type_id);
        }

        // Registered before its members so they can refer back to it.
        let r = self.graph.insert(ClassInstance::new(type_id));
        if let Some(id) = object.get("@id") {
            let id = id.as_u64().ok_or_else(|| anyhow!("\"@id\" must be a number"))?;
            self.ids.insert(id, r);
        }
        let members = self.members(type_id, declared.into_iter(), object)?;
        if let Some(instance) = self.graph.get_mut(r) {
            instance.members = members;
        }
        Ok(r)
    }

    fn members<'m>(
        &mut self,
        owner: &str,
        declared: impl Iterator<Item = &'m DataMember>,
        object: &Map<String, Json>,
    ) -> anyhow::Result<Members> {
        let mut members = Members::new();
        for member in declared {
            match object.get(&member.name) {
                None | Some(Json::Null) if member.optional => members.unset(member.name.clone()),
                None => bail!("{} is missing member '{}'", owner, member.name),
                Some(json) => {
                    let value = self
                        .build(member.ty, json)
                        .with_context(|| format!("{}.{}", owner, member.name))?;
                    members.set(member.name.clone(), value);
                }
            }
        }
        Ok(members)
    }
}

fn expect_object<'j>(json: &'j Json, what: &str) -> anyhow::Result<&'j Map<String, Json>> {
    json.as_object()
        .ok_or_else(|| anyhow!("{} expects an object", what))
}

fn integer<T: TryFrom<i64>>(json: &Json) -> anyhow::Result<T> {
    let n = json
        .as_i64()
        .ok_or_else(|| anyhow!("expected an integer, got {}", json))?;
    T::try_from(n).map_err(|_| anyhow!("{} is out of range", n))
}

fn primitive(kind: PrimitiveKind, json: &Json) -> anyhow::Result<Value> {
    let float = || json.as_f64().ok_or_else(|| anyhow!("expected a number, got {}", json));
    Ok(match kind {
        PrimitiveKind::Bool => Value::Bool(
            json.as_bool()
                .ok_or_else(|| anyhow!("expected a bool, got {}", json))?,
        ),
        PrimitiveKind::Byte => Value::Byte(integer(json)?),
        PrimitiveKind::Short => Value::Short(integer(json)?),
        PrimitiveKind::Int => Value::Int(integer(json)?),
        PrimitiveKind::Long => Value::Long(integer(json)?),
        PrimitiveKind::Float => Value::Float(float()? as f32),
        PrimitiveKind::Double => Value::Double(float()?),
        PrimitiveKind::String => Value::String(
            json.as_str()
                .ok_or_else(|| anyhow!("expected a string, got {}", json))?
                .to_string(),
        ),
    })
}

/// Parse `[category/]name[@adapter]`.
fn parse_proxy(text: &str) -> anyhow::Result<ProxyValue> {
    let (identity, adapter) = match text.split_once('@') {
        Some((identity, adapter)) => (identity, adapter),
        None => (text, ""),
    };
    let identity = match identity.split_once('/') {
        Some((category, name)) => Identity::new(name).with_category(category),
        None => Identity::new(identity),
    };
    if identity.name.is_empty() {
        bail!("proxy '{}' has an empty identity name", text);
    }
    Ok(ProxyValue::new(identity).with_adapter_id(adapter))
}
