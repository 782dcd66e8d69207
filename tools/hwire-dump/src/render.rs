// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoded values as JSON.
//!
//! Class instances are rendered inline the first time they are reached
//! with an `@id`; later references become `{"@ref": id}` so shared and
//! cyclic graphs stay finite.

use hwire::types::TypeDescriptor;
use hwire::{ObjectGraph, ObjectRef, ProxyValue, TypeId, TypeRegistry, UserException, Value};
use serde_json::{json, Map, Value as Json};
use std::collections::HashMap;

pub struct Renderer<'a> {
    registry: &'a TypeRegistry,
    graph: &'a ObjectGraph,
    seen: HashMap<ObjectRef, usize>,
}

impl<'a> Renderer<'a> {
    pub fn new(registry: &'a TypeRegistry, graph: &'a ObjectGraph) -> Self {
        Self {
            registry,
            graph,
            seen: HashMap::new(),
        }
    }

    pub fn value(&mut self, ty: Option<TypeId>, value: &Value) -> Json {
        let registry = self.registry;
        let desc = ty.and_then(|ty| registry.lookup(ty).ok());
        match value {
            Value::Bool(v) => json!(v),
            Value::Byte(v) => json!(v),
            Value::Short(v) => json!(v),
            Value::Int(v) => json!(v),
            Value::Long(v) => json!(v),
            Value::Float(v) => json!(v),
            Value::Double(v) => json!(v),
            Value::String(v) => json!(v),
            Value::Enum(v) => match desc {
                Some(TypeDescriptor::Enum(e)) => match e.name_of(*v) {
                    Some(name) => json!(name),
                    None => json!(v),
                },
                _ => json!(v),
            },
            Value::Struct(members) => {
                let types = match desc {
                    Some(TypeDescriptor::Struct(s)) => s
                        .members
                        .iter()
                        .chain(s.optional_members.iter())
                        .map(|m| (m.name.clone(), m.ty))
                        .collect(),
                    _ => HashMap::new(),
                };
                Json::Object(self.members(&types, members))
            }
            Value::Sequence(items) => {
                let element = match desc {
                    Some(TypeDescriptor::Sequence(s)) => Some(s.element),
                    _ => None,
                };
                Json::Array(items.iter().map(|item| self.value(element, item)).collect())
            }
            Value::Dictionary(entries) => {
                let (key_ty, value_ty) = match desc {
                    Some(TypeDescriptor::Dictionary(d)) => (Some(d.key), Some(d.value)),
                    _ => (None, None),
                };
                Json::Array(
                    entries
                        .iter()
                        .map(|(k, v)| json!([self.value(key_ty, k), self.value(value_ty, v)]))
                        .collect(),
                )
            }
            Value::Class(None) | Value::Proxy(None) => Json::Null,
            Value::Class(Some(r)) => self.instance(*r),
            Value::Proxy(Some(proxy)) => proxy_json(proxy),
        }
    }

    pub fn exception(&mut self, exception: &UserException) -> Json {
        let registry = self.registry;
        let types: HashMap<String, TypeId> = registry
            .exception_by_name(&exception.type_id)
            .and_then(|id| registry.exception_chain(id).ok())
            .map(|chain| {
                chain
                    .iter()
                    .filter_map(|id| registry.exception(*id).ok())
                    .flat_map(|e| e.members.iter().chain(e.optional_members.iter()))
                    .map(|m| (m.name.clone(), m.ty))
                    .collect()
            })
            .unwrap_or_default();
        let mut object = Map::new();
        object.insert("@type".into(), json!(exception.type_id));
        object.extend(self.members(&types, &exception.members));
        if let Some(sliced) = &exception.sliced_data {
            object.insert("@sliced".into(), self.sliced(sliced));
        }
        Json::Object(object)
    }

    fn instance(&mut self, r: ObjectRef) -> Json {
        if let Some(id) = self.seen.get(&r) {
            return json!({ "@ref": id });
        }
        let id = self.seen.len() + 1;
        self.seen.insert(r, id);

        let (registry, graph) = (self.registry, self.graph);
        let Some(instance) = graph.get(r) else {
            return json!({ "@dangling": r.index() });
        };
        let types: HashMap<String, TypeId> = registry
            .class_by_name(&instance.type_id)
            .and_then(|class| registry.class_chain(class).ok())
            .map(|chain| {
                chain
                    .iter()
                    .filter_map(|id| registry.class(*id).ok())
                    .flat_map(|c| c.members.iter().chain(c.optional_members.iter()))
                    .map(|m| (m.name.clone(), m.ty))
                    .collect()
            })
            .unwrap_or_default();

        let mut object = Map::new();
        object.insert("@id".into(), json!(id));
        object.insert("@type".into(), json!(instance.type_id));
        object.extend(self.members(&types, &instance.members));
        if let Some(sliced) = &instance.sliced_data {
            object.insert("@sliced".into(), self.sliced(sliced));
        }
        Json::Object(object)
    }

    fn members(
        &mut self,
        types: &HashMap<String, TypeId>,
        members: &hwire::Members,
    ) -> Map<String, Json> {
        let mut names: Vec<_> = members.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        names
            .into_iter()
            .map(|(name, value)| {
                let rendered = match value {
                    Some(value) => self.value(types.get(name).copied(), value),
                    None => Json::Null,
                };
                (name.to_string(), rendered)
            })
            .collect()
    }

    fn sliced(&mut self, sliced: &hwire::SlicedData) -> Json {
        Json::Array(
            sliced
                .slices
                .iter()
                .map(|slice| {
                    let instances: Vec<Json> =
                        slice.instances.iter().map(|r| self.instance(*r)).collect();
                    json!({
                        "type": slice.type_id,
                        "compact_id": slice.compact_id,
                        "bytes": slice.bytes.len(),
                        "instances": instances,
                    })
                })
                .collect(),
        )
    }
}

fn proxy_json(proxy: &ProxyValue) -> Json {
    let identity = if proxy.identity.category.is_empty() {
        proxy.identity.name.clone()
    } else {
        format!("{}/{}", proxy.identity.category, proxy.identity.name)
    };
    json!({
        "identity": identity,
        "facet": proxy.facet,
        "mode": format!("{:?}", proxy.mode).to_lowercase(),
        "secure": proxy.secure,
        "adapter_id": proxy.adapter_id,
        "endpoints": proxy.endpoints.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwire::{ClassDef, ClassInstance, EnumDef};

    #[test]
    fn test_cycle_renders_as_ref() {
        let mut registry = TypeRegistry::new();
        let node = registry.declare_class("::N").unwrap();
        registry.define_class(ClassDef::new("::N").member("next", node)).unwrap();
        let mut graph = ObjectGraph::new();
        let a = graph.insert(ClassInstance::new("::N"));
        graph.get_mut(a).unwrap().members.set("next", a);

        let json = Renderer::new(&registry, &graph).value(Some(node), &Value::from(a));
        assert_eq!(json["@id"], json!(1));
        assert_eq!(json["next"], json!({ "@ref": 1 }));
    }

    #[test]
    fn test_enum_names() {
        let mut registry = TypeRegistry::new();
        let color = registry
            .define_enum(EnumDef::new("::Color").enumerator("red").enumerator("green"))
            .unwrap();
        let graph = ObjectGraph::new();
        let mut renderer = Renderer::new(&registry, &graph);
        assert_eq!(renderer.value(Some(color), &Value::Enum(1)), json!("green"));
        assert_eq!(renderer.value(None, &Value::Enum(1)), json!(1));
    }
}
