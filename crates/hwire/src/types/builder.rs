// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent definitions handed to [`TypeRegistry`](super::TypeRegistry).
//!
//! ```
//! use hwire::types::{ClassDef, StructDef, TypeId, TypeRegistry};
//!
//! let mut registry = TypeRegistry::new();
//! let node = registry.declare_class("::Demo::Node").unwrap();
//! registry
//!     .define_class(
//!         ClassDef::new("::Demo::Node")
//!             .member("value", TypeId::INT)
//!             .optional_member("next", node, 1),
//!     )
//!     .unwrap();
//! let point = registry
//!     .define_struct(StructDef::new("::Demo::Point").member("x", TypeId::INT))
//!     .unwrap();
//! assert!(registry.check_complete().is_ok());
//! # let _ = point;
//! ```

use super::{DataMember, TypeId};

/// Struct definition.
#[derive(Debug, Clone)]
pub struct StructDef {
    pub(crate) name: String,
    pub(crate) members: Vec<DataMember>,
}

impl StructDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Add a required member.
    pub fn member(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.members.push(DataMember::required(name, ty));
        self
    }

    /// Add an optional member identified by `tag`.
    pub fn optional_member(mut self, name: impl Into<String>, ty: TypeId, tag: usize) -> Self {
        self.members.push(DataMember::optional(name, ty, tag));
        self
    }
}

/// Class definition.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub(crate) name: String,
    pub(crate) compact_id: Option<i32>,
    pub(crate) base: Option<TypeId>,
    pub(crate) is_abstract: bool,
    pub(crate) preserve_slices: bool,
    pub(crate) interface_by_value: bool,
    pub(crate) members: Vec<DataMember>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compact_id: None,
            base: None,
            is_abstract: false,
            preserve_slices: false,
            interface_by_value: false,
            members: Vec::new(),
        }
    }

    pub fn compact_id(mut self, id: i32) -> Self {
        self.compact_id = Some(id);
        self
    }

    pub fn base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Keep unknown derived slices when decoding instances of this class.
    pub fn preserve_slices(mut self) -> Self {
        self.preserve_slices = true;
        self
    }

    /// Mark as an interface passed by value (type id only on the wire).
    pub fn interface_by_value(mut self) -> Self {
        self.interface_by_value = true;
        self
    }

    pub fn member(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.members.push(DataMember::required(name, ty));
        self
    }

    pub fn optional_member(mut self, name: impl Into<String>, ty: TypeId, tag: usize) -> Self {
        self.members.push(DataMember::optional(name, ty, tag));
        self
    }
}

/// User exception definition.
#[derive(Debug, Clone)]
pub struct ExceptionDef {
    pub(crate) name: String,
    pub(crate) base: Option<TypeId>,
    pub(crate) preserve_slices: bool,
    pub(crate) members: Vec<DataMember>,
}

impl ExceptionDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            preserve_slices: false,
            members: Vec::new(),
        }
    }

    pub fn base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn preserve_slices(mut self) -> Self {
        self.preserve_slices = true;
        self
    }

    pub fn member(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.members.push(DataMember::required(name, ty));
        self
    }

    pub fn optional_member(mut self, name: impl Into<String>, ty: TypeId, tag: usize) -> Self {
        self.members.push(DataMember::optional(name, ty, tag));
        self
    }
}

/// Enum definition. Enumerators without an explicit value take the
/// previous value plus one (starting at zero).
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub(crate) name: String,
    pub(crate) enumerators: Vec<(String, i32)>,
    next_value: i32,
}

impl EnumDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enumerators: Vec::new(),
            next_value: 0,
        }
    }

    pub fn enumerator(self, name: impl Into<String>) -> Self {
        let value = self.next_value;
        self.enumerator_value(name, value)
    }

    pub fn enumerator_value(mut self, name: impl Into<String>, value: i32) -> Self {
        self.enumerators.push((name.into(), value));
        self.next_value = value.saturating_add(1);
        self
    }
}

/// Proxy (interface) definition.
#[derive(Debug, Clone)]
pub struct ProxyDef {
    pub(crate) name: String,
    pub(crate) base: Option<TypeId>,
    pub(crate) interfaces: Vec<TypeId>,
}

impl ProxyDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            interfaces: Vec::new(),
        }
    }

    pub fn base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn interface(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_def_implicit_values() {
        let def = EnumDef::new("::E")
            .enumerator("a")
            .enumerator_value("b", 10)
            .enumerator("c");
        assert_eq!(
            def.enumerators,
            vec![("a".to_string(), 0), ("b".to_string(), 10), ("c".to_string(), 11)]
        );
    }

    #[test]
    fn test_class_def_flags() {
        let def = ClassDef::new("::C")
            .compact_id(4)
            .preserve_slices()
            .abstract_class();
        assert_eq!(def.compact_id, Some(4));
        assert!(def.preserve_slices);
        assert!(def.is_abstract);
        assert!(!def.interface_by_value);
    }
}
