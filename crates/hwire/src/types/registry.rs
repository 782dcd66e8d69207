// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Arena of type descriptors with two-phase registration.
//!
//! Classes, proxies and exceptions may be declared (placeholder slot) before
//! being defined, so descriptors can refer to each other cyclically through
//! [`TypeId`]s. Structs, enums, sequences and dictionaries are defined in one
//! step from already-registered ids, which makes cycles that do not pass
//! through a class impossible by construction.
//!
//! A registry is built once and then shared read-only by any number of
//! encoders and decoders.

use super::builder::{ClassDef, EnumDef, ExceptionDef, ProxyDef, StructDef};
use super::{
    ClassDescriptor, DataMember, DictionaryDescriptor, EnumDescriptor, ExceptionDescriptor,
    PrimitiveKind, ProxyDescriptor, SequenceDescriptor, StructDescriptor, TypeDescriptor, TypeId,
};
use crate::config::{OBJECT_TYPE_ID, USER_EXCEPTION_TYPE_ID};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclaredKind {
    Class,
    Proxy,
    Exception,
}

#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Declared { name: String, kind: DeclaredKind },
    Defined(TypeDescriptor),
}

/// Owner of every type descriptor known to a codec.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    slots: Vec<Slot>,
    classes: HashMap<String, TypeId>,
    proxies: HashMap<String, TypeId>,
    exceptions: HashMap<String, TypeId>,
    named: HashMap<String, TypeId>,
    compact_ids: HashMap<i32, TypeId>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry holding the primitives, the root class and the root proxy.
    pub fn new() -> Self {
        let mut registry = Self {
            slots: Vec::with_capacity(64),
            classes: HashMap::new(),
            proxies: HashMap::new(),
            exceptions: HashMap::new(),
            named: HashMap::new(),
            compact_ids: HashMap::new(),
        };
        for kind in PrimitiveKind::ALL {
            registry
                .slots
                .push(Slot::Defined(TypeDescriptor::Primitive(kind)));
        }
        registry
            .slots
            .push(Slot::Defined(TypeDescriptor::Class(ClassDescriptor {
                name: OBJECT_TYPE_ID.to_string(),
                compact_id: None,
                is_abstract: true,
                preserve_slices: false,
                interface_by_value: false,
                base: None,
                members: Vec::new(),
                optional_members: Vec::new(),
            })));
        registry
            .slots
            .push(Slot::Defined(TypeDescriptor::Proxy(ProxyDescriptor {
                name: OBJECT_TYPE_ID.to_string(),
                base: None,
                interfaces: Vec::new(),
            })));
        registry
            .proxies
            .insert(OBJECT_TYPE_ID.to_string(), TypeId::OBJECT_PROXY);
        debug_assert_eq!(registry.slots.len(), TypeId::BUILTIN_COUNT);
        registry
    }

    /// Number of slots, builtins included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() <= TypeId::BUILTIN_COUNT
    }

    pub(crate) fn slot(&self, id: TypeId) -> Option<&Slot> {
        self.slots.get(id.index())
    }

    fn push(&mut self, slot: Slot) -> TypeId {
        let id = TypeId(self.slots.len() as u32);
        self.slots.push(slot);
        id
    }

    // ===================================================================
    // Declaration
    // ===================================================================

    /// Declare a class; returns the existing id if already known.
    pub fn declare_class(&mut self, name: &str) -> Result<TypeId> {
        self.declare(name, DeclaredKind::Class)
    }

    pub fn declare_proxy(&mut self, name: &str) -> Result<TypeId> {
        self.declare(name, DeclaredKind::Proxy)
    }

    pub fn declare_exception(&mut self, name: &str) -> Result<TypeId> {
        self.declare(name, DeclaredKind::Exception)
    }

    fn declare(&mut self, name: &str, kind: DeclaredKind) -> Result<TypeId> {
        check_scoped_name(name)?;
        if let Some(id) = self.map_for(kind).get(name) {
            return Ok(*id);
        }
        if kind == DeclaredKind::Class && name == OBJECT_TYPE_ID {
            return Ok(TypeId::OBJECT);
        }
        let id = self.push(Slot::Declared {
            name: name.to_string(),
            kind,
        });
        self.map_for_mut(kind).insert(name.to_string(), id);
        Ok(id)
    }

    fn map_for(&self, kind: DeclaredKind) -> &HashMap<String, TypeId> {
        match kind {
            DeclaredKind::Class => &self.classes,
            DeclaredKind::Proxy => &self.proxies,
            DeclaredKind::Exception => &self.exceptions,
        }
    }

    fn map_for_mut(&mut self, kind: DeclaredKind) -> &mut HashMap<String, TypeId> {
        match kind {
            DeclaredKind::Class => &mut self.classes,
            DeclaredKind::Proxy => &mut self.proxies,
            DeclaredKind::Exception => &mut self.exceptions,
        }
    }

    /// Slot to fill for a definition: the declared placeholder or a new one.
    fn definition_slot(&mut self, name: &str, kind: DeclaredKind) -> Result<TypeId> {
        match self.map_for(kind).get(name) {
            Some(id) if self.is_defined(*id) => Err(Error::InvalidSchema(format!(
                "'{}' is already defined",
                name
            ))),
            Some(id) => Ok(*id),
            None => self.declare(name, kind),
        }
    }

    // ===================================================================
    // Definition
    // ===================================================================

    /// Define a class, filling its declaration if there is one.
    pub fn define_class(&mut self, def: ClassDef) -> Result<TypeId> {
        check_scoped_name(&def.name)?;
        if def.name == OBJECT_TYPE_ID {
            return Err(Error::InvalidSchema(format!(
                "'{}' is reserved",
                OBJECT_TYPE_ID
            )));
        }
        let base = match def.base {
            Some(TypeId::OBJECT) | None => None,
            Some(base) => {
                self.defined_class(base, &def.name)?;
                Some(base)
            }
        };
        if let Some(compact_id) = def.compact_id {
            if compact_id < 0 {
                return Err(Error::InvalidSchema(format!(
                    "negative compact id {} for '{}'",
                    compact_id, def.name
                )));
            }
            if let Some(other) = self.compact_ids.get(&compact_id) {
                return Err(Error::InvalidSchema(format!(
                    "compact id {} of '{}' already used by '{}'",
                    compact_id,
                    def.name,
                    self.name_of(*other)
                )));
            }
        }
        let (members, optional_members) = self.split_members(&def.name, def.members)?;

        let id = self.definition_slot(&def.name, DeclaredKind::Class)?;
        if let Some(compact_id) = def.compact_id {
            self.compact_ids.insert(compact_id, id);
        }
        self.slots[id.index()] = Slot::Defined(TypeDescriptor::Class(ClassDescriptor {
            name: def.name,
            compact_id: def.compact_id,
            is_abstract: def.is_abstract,
            preserve_slices: def.preserve_slices,
            interface_by_value: def.interface_by_value,
            base,
            members,
            optional_members,
        }));
        Ok(id)
    }

    pub fn define_proxy(&mut self, def: ProxyDef) -> Result<TypeId> {
        check_scoped_name(&def.name)?;
        for parent in def.base.iter().chain(def.interfaces.iter()) {
            match self.lookup(*parent) {
                Ok(TypeDescriptor::Proxy(_)) => {}
                Ok(other) => {
                    return Err(Error::InvalidSchema(format!(
                        "base '{}' of proxy '{}' is a {}",
                        other.name(),
                        def.name,
                        other.kind_name()
                    )))
                }
                Err(_) => {
                    return Err(Error::InvalidSchema(format!(
                        "base '{}' of proxy '{}' must be defined first",
                        self.name_of(*parent),
                        def.name
                    )))
                }
            }
        }
        let id = self.definition_slot(&def.name, DeclaredKind::Proxy)?;
        self.slots[id.index()] = Slot::Defined(TypeDescriptor::Proxy(ProxyDescriptor {
            name: def.name,
            base: def.base,
            interfaces: def.interfaces,
        }));
        Ok(id)
    }

    pub fn define_exception(&mut self, def: ExceptionDef) -> Result<TypeId> {
        check_scoped_name(&def.name)?;
        if def.name == USER_EXCEPTION_TYPE_ID {
            return Err(Error::InvalidSchema(format!(
                "'{}' is reserved",
                USER_EXCEPTION_TYPE_ID
            )));
        }
        let mut uses_classes = false;
        if let Some(base) = def.base {
            match self.lookup(base) {
                Ok(TypeDescriptor::Exception(parent)) => uses_classes = parent.uses_classes,
                _ => {
                    return Err(Error::InvalidSchema(format!(
                        "base '{}' of exception '{}' must be a defined exception",
                        self.name_of(base),
                        def.name
                    )))
                }
            }
        }
        let (members, optional_members) = self.split_members(&def.name, def.members)?;
        uses_classes = uses_classes
            || members
                .iter()
                .chain(optional_members.iter())
                .any(|m| self.uses_classes(m.ty));

        let id = self.definition_slot(&def.name, DeclaredKind::Exception)?;
        self.slots[id.index()] = Slot::Defined(TypeDescriptor::Exception(ExceptionDescriptor {
            name: def.name,
            base: def.base,
            members,
            optional_members,
            preserve_slices: def.preserve_slices,
            uses_classes,
        }));
        Ok(id)
    }

    pub fn define_struct(&mut self, def: StructDef) -> Result<TypeId> {
        self.check_new_name(&def.name)?;
        let (members, optional_members) = self.split_members(&def.name, def.members)?;

        let mut variable_length = false;
        let mut wire_size = 0usize;
        let mut min_wire_size = 0usize;
        for member in &members {
            variable_length |= self.variable_length(member.ty);
            wire_size = wire_size.saturating_add(self.wire_size(member.ty));
            min_wire_size = min_wire_size.saturating_add(self.min_wire_size(member.ty));
        }
        if !optional_members.is_empty() {
            // Optional section and its end marker.
            variable_length = true;
            min_wire_size += 1;
        }

        let name = def.name.clone();
        let id = self.push(Slot::Defined(TypeDescriptor::Struct(StructDescriptor {
            name: def.name,
            members,
            optional_members,
            variable_length,
            wire_size,
            min_wire_size,
        })));
        self.named.insert(name, id);
        Ok(id)
    }

    pub fn define_enum(&mut self, def: EnumDef) -> Result<TypeId> {
        self.check_new_name(&def.name)?;
        if def.enumerators.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "enum '{}' has no enumerators",
                def.name
            )));
        }
        let mut enumerators = BTreeMap::new();
        let mut names = HashSet::new();
        for (name, value) in def.enumerators {
            if value < 0 {
                return Err(Error::InvalidSchema(format!(
                    "enumerator '{}' of '{}' has negative value {}",
                    name, def.name, value
                )));
            }
            if !names.insert(name.clone()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate enumerator '{}' in '{}'",
                    name, def.name
                )));
            }
            if enumerators.insert(value, name).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "duplicate enumerator value {} in '{}'",
                    value, def.name
                )));
            }
        }
        let max_value = enumerators.keys().next_back().copied().unwrap_or(0);
        let name = def.name.clone();
        let id = self.push(Slot::Defined(TypeDescriptor::Enum(EnumDescriptor {
            name: def.name,
            enumerators,
            max_value,
        })));
        self.named.insert(name, id);
        Ok(id)
    }

    pub fn define_sequence(&mut self, name: &str, element: TypeId) -> Result<TypeId> {
        self.check_new_name(name)?;
        self.check_member_type(name, element)?;
        let id = self.push(Slot::Defined(TypeDescriptor::Sequence(SequenceDescriptor {
            name: name.to_string(),
            element,
        })));
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    /// Keys are restricted to primitives and enums.
    pub fn define_dictionary(&mut self, name: &str, key: TypeId, value: TypeId) -> Result<TypeId> {
        self.check_new_name(name)?;
        match self.lookup(key) {
            Ok(TypeDescriptor::Primitive(_)) | Ok(TypeDescriptor::Enum(_)) => {}
            _ => {
                return Err(Error::InvalidSchema(format!(
                    "dictionary '{}' key '{}' must be a primitive or an enum",
                    name,
                    self.name_of(key)
                )))
            }
        }
        self.check_member_type(name, value)?;
        let id = self.push(Slot::Defined(TypeDescriptor::Dictionary(
            DictionaryDescriptor {
                name: name.to_string(),
                key,
                value,
            },
        )));
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    fn check_new_name(&self, name: &str) -> Result<()> {
        check_scoped_name(name)?;
        if self.named.contains_key(name) || PrimitiveKind::from_name(name).is_some() {
            return Err(Error::InvalidSchema(format!(
                "'{}' is already defined",
                name
            )));
        }
        Ok(())
    }

    fn defined_class(&self, id: TypeId, owner: &str) -> Result<&ClassDescriptor> {
        match self.lookup(id) {
            Ok(TypeDescriptor::Class(class)) => Ok(class),
            _ => Err(Error::InvalidSchema(format!(
                "base '{}' of class '{}' must be a defined class",
                self.name_of(id),
                owner
            ))),
        }
    }

    fn check_member_type(&self, owner: &str, ty: TypeId) -> Result<()> {
        match self.slot(ty) {
            None => Err(Error::InvalidSchema(format!(
                "'{}' refers to unknown type {}",
                owner, ty
            ))),
            Some(Slot::Declared {
                kind: DeclaredKind::Exception,
                name,
            })
            | Some(Slot::Defined(TypeDescriptor::Exception(ExceptionDescriptor { name, .. }))) => {
                Err(Error::InvalidSchema(format!(
                    "'{}' cannot hold exception '{}' as a value",
                    owner, name
                )))
            }
            Some(_) => Ok(()),
        }
    }

    /// Split members into required (declaration order) and optional (by tag).
    fn split_members(
        &self,
        owner: &str,
        members: Vec<DataMember>,
    ) -> Result<(Vec<DataMember>, Vec<DataMember>)> {
        let mut names = HashSet::new();
        for member in &members {
            if !names.insert(member.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate member '{}' in '{}'",
                    member.name, owner
                )));
            }
            self.check_member_type(owner, member.ty)?;
        }

        let (mut optional, required): (Vec<_>, Vec<_>) =
            members.into_iter().partition(|m| m.optional);
        optional.sort_by_key(|m| m.tag);
        if let Some(pair) = optional.windows(2).find(|w| w[0].tag == w[1].tag) {
            return Err(Error::InvalidSchema(format!(
                "members '{}' and '{}' of '{}' share tag {}",
                pair[0].name, pair[1].name, owner, pair[0].tag
            )));
        }
        if let Some(member) = optional.iter().find(|m| i32::try_from(m.tag).is_err()) {
            return Err(Error::InvalidSchema(format!(
                "tag {} of '{}' is out of range",
                member.tag, member.name
            )));
        }
        Ok((required, optional))
    }

    // ===================================================================
    // Lookup
    // ===================================================================

    /// Descriptor for `id`; forward declarations that were never defined
    /// yield [`Error::SchemaIncomplete`].
    pub fn lookup(&self, id: TypeId) -> Result<&TypeDescriptor> {
        match self.slot(id) {
            Some(Slot::Defined(desc)) => Ok(desc),
            Some(Slot::Declared { name, .. }) => Err(Error::SchemaIncomplete(name.clone())),
            None => Err(Error::InvalidSchema(format!("unknown type {}", id))),
        }
    }

    pub fn is_defined(&self, id: TypeId) -> bool {
        matches!(self.slot(id), Some(Slot::Defined(_)))
    }

    /// Type id string of a slot, declared or defined.
    pub fn name_of(&self, id: TypeId) -> &str {
        match self.slot(id) {
            Some(Slot::Defined(desc)) => desc.name(),
            Some(Slot::Declared { name, .. }) => name,
            None => "<unknown>",
        }
    }

    /// Class id for a type id string (declared classes included, root excluded).
    pub fn class_by_name(&self, name: &str) -> Option<TypeId> {
        self.classes.get(name).copied()
    }

    pub fn class_by_compact_id(&self, compact_id: i32) -> Option<TypeId> {
        self.compact_ids.get(&compact_id).copied()
    }

    pub fn exception_by_name(&self, name: &str) -> Option<TypeId> {
        self.exceptions.get(name).copied()
    }

    pub fn proxy_by_name(&self, name: &str) -> Option<TypeId> {
        self.proxies.get(name).copied()
    }

    /// Struct, enum, sequence, dictionary or primitive by name.
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        PrimitiveKind::from_name(name)
            .map(PrimitiveKind::type_id)
            .or_else(|| self.named.get(name).copied())
    }

    pub fn class(&self, id: TypeId) -> Result<&ClassDescriptor> {
        match self.lookup(id)? {
            TypeDescriptor::Class(class) => Ok(class),
            other => Err(Error::InvalidSchema(format!(
                "'{}' is a {}, not a class",
                other.name(),
                other.kind_name()
            ))),
        }
    }

    pub fn exception(&self, id: TypeId) -> Result<&ExceptionDescriptor> {
        match self.lookup(id)? {
            TypeDescriptor::Exception(exception) => Ok(exception),
            other => Err(Error::InvalidSchema(format!(
                "'{}' is a {}, not an exception",
                other.name(),
                other.kind_name()
            ))),
        }
    }

    /// Class hierarchy from `id` up to (excluding) the root class.
    pub fn class_chain(&self, id: TypeId) -> Result<Vec<TypeId>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(class_id) = current {
            if class_id == TypeId::OBJECT {
                break;
            }
            current = self.class(class_id)?.base;
            chain.push(class_id);
        }
        Ok(chain)
    }

    /// Exception hierarchy from `id` up to its root.
    pub fn exception_chain(&self, id: TypeId) -> Result<Vec<TypeId>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(exception_id) = current {
            current = self.exception(exception_id)?.base;
            chain.push(exception_id);
        }
        Ok(chain)
    }

    /// Subtype test for classes, proxies and exceptions.
    pub fn is_a(&self, derived: TypeId, base: TypeId) -> bool {
        if derived == base {
            return true;
        }
        match self.lookup(derived) {
            Ok(TypeDescriptor::Class(class)) => {
                base == TypeId::OBJECT || class.base.is_some_and(|b| self.is_a(b, base))
            }
            Ok(TypeDescriptor::Proxy(proxy)) => {
                base == TypeId::OBJECT_PROXY
                    || proxy
                        .base
                        .iter()
                        .chain(proxy.interfaces.iter())
                        .any(|b| self.is_a(*b, base))
            }
            Ok(TypeDescriptor::Exception(exception)) => {
                exception.base.is_some_and(|b| self.is_a(b, base))
            }
            _ => false,
        }
    }

    /// Fail on the first forward declaration that was never defined.
    pub fn check_complete(&self) -> Result<()> {
        match self.slots.iter().find_map(|slot| match slot {
            Slot::Declared { name, .. } => Some(name),
            Slot::Defined(_) => None,
        }) {
            Some(name) => Err(Error::SchemaIncomplete(name.clone())),
            None => Ok(()),
        }
    }

    /// User-registered types in registration order: id, name, descriptor
    /// (`None` while only declared).
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &str, Option<&TypeDescriptor>)> {
        self.slots
            .iter()
            .enumerate()
            .skip(TypeId::BUILTIN_COUNT)
            .map(|(index, slot)| {
                let id = TypeId(index as u32);
                match slot {
                    Slot::Defined(desc) => (id, desc.name(), Some(desc)),
                    Slot::Declared { name, .. } => (id, name.as_str(), None),
                }
            })
    }
}

/// Type ids are scoped names such as `::Module::Type`.
fn check_scoped_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidSchema("empty type name".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.len(), TypeId::BUILTIN_COUNT);
        assert!(registry.is_empty());
        assert_eq!(registry.name_of(TypeId::STRING), "string");
        assert_eq!(registry.name_of(TypeId::OBJECT), OBJECT_TYPE_ID);
        assert_eq!(registry.type_by_name("long"), Some(TypeId::LONG));
        assert_eq!(registry.class_by_name(OBJECT_TYPE_ID), None);
        assert_eq!(registry.proxy_by_name(OBJECT_TYPE_ID), Some(TypeId::OBJECT_PROXY));
    }

    #[test]
    fn test_declare_then_define() {
        let mut registry = TypeRegistry::new();
        let node = registry.declare_class("::Demo::Node").expect("declare");
        assert_eq!(registry.declare_class("::Demo::Node").expect("again"), node);

        match registry.lookup(node) {
            Err(Error::SchemaIncomplete(name)) => assert_eq!(name, "::Demo::Node"),
            other => panic!("expected SchemaIncomplete, got {:?}", other),
        }
        assert!(registry.check_complete().is_err());

        let defined = registry
            .define_class(ClassDef::new("::Demo::Node").optional_member("next", node, 1))
            .expect("define");
        assert_eq!(defined, node);
        assert!(registry.check_complete().is_ok());
        assert!(registry
            .define_class(ClassDef::new("::Demo::Node"))
            .is_err());
    }

    #[test]
    fn test_optional_members_sorted_by_tag() {
        let mut registry = TypeRegistry::new();
        let id = registry
            .define_struct(
                StructDef::new("::Demo::Tagged")
                    .optional_member("five", TypeId::INT, 5)
                    .member("req", TypeId::SHORT)
                    .optional_member("one", TypeId::INT, 1)
                    .optional_member("three", TypeId::INT, 3),
            )
            .expect("define");
        let TypeDescriptor::Struct(desc) = registry.lookup(id).expect("lookup") else {
            panic!("not a struct");
        };
        let tags: Vec<_> = desc.optional_members.iter().map(|m| m.tag).collect();
        assert_eq!(tags, vec![1, 3, 5]);
        assert_eq!(desc.members.len(), 1);
        assert!(desc.variable_length);
    }

    #[test]
    fn test_rejects_duplicate_tags_and_members() {
        let mut registry = TypeRegistry::new();
        let err = registry
            .define_struct(
                StructDef::new("::S")
                    .optional_member("a", TypeId::INT, 2)
                    .optional_member("b", TypeId::INT, 2),
            )
            .expect_err("duplicate tag");
        assert!(matches!(err, Error::InvalidSchema(_)));

        assert!(registry
            .define_struct(
                StructDef::new("::S")
                    .member("a", TypeId::INT)
                    .member("a", TypeId::LONG),
            )
            .is_err());
        // Nothing was registered by the failed attempts.
        assert_eq!(registry.type_by_name("::S"), None);
    }

    #[test]
    fn test_dictionary_key_restriction() {
        let mut registry = TypeRegistry::new();
        let seq = registry
            .define_sequence("::Demo::IntSeq", TypeId::INT)
            .expect("seq");
        assert!(registry
            .define_dictionary("::Demo::Bad", seq, TypeId::INT)
            .is_err());
        assert!(registry
            .define_dictionary("::Demo::Bad", TypeId::OBJECT, TypeId::INT)
            .is_err());
        let color = registry
            .define_enum(EnumDef::new("::Demo::Color").enumerator("red"))
            .expect("enum");
        registry
            .define_dictionary("::Demo::ColorMap", color, TypeId::STRING)
            .expect("enum key");
    }

    #[test]
    fn test_class_hierarchy() {
        let mut registry = TypeRegistry::new();
        let base = registry
            .define_class(ClassDef::new("::Demo::Base").compact_id(1))
            .expect("base");
        let derived = registry
            .define_class(ClassDef::new("::Demo::Derived").base(base))
            .expect("derived");
        assert_eq!(registry.class_chain(derived).expect("chain"), vec![derived, base]);
        assert!(registry.is_a(derived, base));
        assert!(registry.is_a(derived, TypeId::OBJECT));
        assert!(!registry.is_a(base, derived));
        assert_eq!(registry.class_by_compact_id(1), Some(base));

        let err = registry
            .define_class(ClassDef::new("::Demo::Other").compact_id(1))
            .expect_err("compact id reuse");
        assert!(matches!(err, Error::InvalidSchema(_)));

        let forward = registry.declare_class("::Demo::Later").expect("declare");
        assert!(registry
            .define_class(ClassDef::new("::Demo::Child").base(forward))
            .is_err());
    }

    #[test]
    fn test_exception_uses_classes_inherited() {
        let mut registry = TypeRegistry::new();
        let node = registry.declare_class("::Demo::Node").expect("declare");
        let base = registry
            .define_exception(ExceptionDef::new("::Demo::Base").member("node", node))
            .expect("base");
        let derived = registry
            .define_exception(ExceptionDef::new("::Demo::Derived").base(base))
            .expect("derived");
        let plain = registry
            .define_exception(ExceptionDef::new("::Demo::Plain").member("code", TypeId::INT))
            .expect("plain");
        assert!(registry.exception(derived).expect("derived").uses_classes);
        assert!(!registry.exception(plain).expect("plain").uses_classes);
        assert_eq!(
            registry.exception_chain(derived).expect("chain"),
            vec![derived, base]
        );
    }

    #[test]
    fn test_exception_not_a_member_type() {
        let mut registry = TypeRegistry::new();
        let ex = registry
            .define_exception(ExceptionDef::new("::Demo::Failure"))
            .expect("exception");
        assert!(registry.define_sequence("::Demo::Failures", ex).is_err());
    }

    #[test]
    fn test_proxy_is_a_through_interfaces() {
        let mut registry = TypeRegistry::new();
        let a = registry.define_proxy(ProxyDef::new("::Demo::A")).expect("a");
        let b = registry.define_proxy(ProxyDef::new("::Demo::B")).expect("b");
        let c = registry
            .define_proxy(ProxyDef::new("::Demo::C").base(a).interface(b))
            .expect("c");
        assert!(registry.is_a(c, b));
        assert!(registry.is_a(c, TypeId::OBJECT_PROXY));
        assert!(!registry.is_a(a, b));
    }

    #[test]
    fn test_enum_validation() {
        let mut registry = TypeRegistry::new();
        assert!(registry.define_enum(EnumDef::new("::E")).is_err());
        assert!(registry
            .define_enum(EnumDef::new("::E").enumerator("a").enumerator_value("b", 0))
            .is_err());
        let id = registry
            .define_enum(EnumDef::new("::E").enumerator("a").enumerator_value("b", 300))
            .expect("enum");
        let TypeDescriptor::Enum(desc) = registry.lookup(id).expect("lookup") else {
            panic!("not an enum");
        };
        assert_eq!(desc.max_value, 300);
    }
}
