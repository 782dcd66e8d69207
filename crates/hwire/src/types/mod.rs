// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors and the registry that owns them.
//!
//! Descriptors live in an arena inside [`TypeRegistry`] and refer to each
//! other by [`TypeId`]. Classes, proxies and exceptions can be declared first
//! and defined later, which is how recursive class graphs are expressed.

pub mod builder;
pub mod layout;
pub mod registry;

pub use builder::{ClassDef, EnumDef, ExceptionDef, ProxyDef, StructDef};
pub use registry::TypeRegistry;

use std::collections::BTreeMap;
use std::fmt;

/// Handle to a descriptor slot in a [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub const BOOL: TypeId = TypeId(0);
    pub const BYTE: TypeId = TypeId(1);
    pub const SHORT: TypeId = TypeId(2);
    pub const INT: TypeId = TypeId(3);
    pub const LONG: TypeId = TypeId(4);
    pub const FLOAT: TypeId = TypeId(5);
    pub const DOUBLE: TypeId = TypeId(6);
    pub const STRING: TypeId = TypeId(7);
    /// Root class: accepts an instance of any class.
    pub const OBJECT: TypeId = TypeId(8);
    /// Root proxy: accepts a proxy of any interface.
    pub const OBJECT_PROXY: TypeId = TypeId(9);

    pub(crate) const BUILTIN_COUNT: usize = 10;

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive kinds with their fixed wire widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::String,
    ];

    /// Size in bytes (None for strings).
    pub fn size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Byte => Some(1),
            Self::Short => Some(2),
            Self::Int | Self::Float => Some(4),
            Self::Long | Self::Double => Some(8),
            Self::String => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<PrimitiveKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn type_id(self) -> TypeId {
        match self {
            Self::Bool => TypeId::BOOL,
            Self::Byte => TypeId::BYTE,
            Self::Short => TypeId::SHORT,
            Self::Int => TypeId::INT,
            Self::Long => TypeId::LONG,
            Self::Float => TypeId::FLOAT,
            Self::Double => TypeId::DOUBLE,
            Self::String => TypeId::STRING,
        }
    }
}

/// A member of a struct, class or exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMember {
    pub name: String,
    pub ty: TypeId,
    pub optional: bool,
    /// Meaningful only for optional members.
    pub tag: usize,
}

impl DataMember {
    pub fn required(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            tag: 0,
        }
    }

    pub fn optional(name: impl Into<String>, ty: TypeId, tag: usize) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
            tag,
        }
    }
}

/// Enumeration: ordered value to name mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: String,
    pub enumerators: BTreeMap<i32, String>,
    pub max_value: i32,
}

impl EnumDescriptor {
    pub fn contains(&self, value: i32) -> bool {
        self.enumerators.contains_key(&value)
    }

    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.enumerators.get(&value).map(String::as_str)
    }

    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.enumerators
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(v, _)| *v)
    }

    /// Fixed width used by the 1.0 encoding.
    pub fn fixed_width(&self) -> usize {
        if self.max_value < 127 {
            1
        } else if self.max_value < 32767 {
            2
        } else {
            4
        }
    }
}

/// Struct: required members in declaration order, optional members by tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    pub name: String,
    pub members: Vec<DataMember>,
    pub optional_members: Vec<DataMember>,
    pub(crate) variable_length: bool,
    pub(crate) wire_size: usize,
    pub(crate) min_wire_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDescriptor {
    pub name: String,
    pub element: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryDescriptor {
    pub name: String,
    pub key: TypeId,
    pub value: TypeId,
}

/// Class: one slice per level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: String,
    pub compact_id: Option<i32>,
    pub is_abstract: bool,
    pub preserve_slices: bool,
    /// Marshal only the dynamic type id when used as a formal type.
    pub interface_by_value: bool,
    /// `None` means the root class.
    pub base: Option<TypeId>,
    pub members: Vec<DataMember>,
    pub optional_members: Vec<DataMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub name: String,
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionDescriptor {
    pub name: String,
    pub base: Option<TypeId>,
    pub members: Vec<DataMember>,
    pub optional_members: Vec<DataMember>,
    pub preserve_slices: bool,
    /// True when any level of the hierarchy carries class data.
    pub uses_classes: bool,
}

/// Closed set of type descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Enum(EnumDescriptor),
    Struct(StructDescriptor),
    Sequence(SequenceDescriptor),
    Dictionary(DictionaryDescriptor),
    Class(ClassDescriptor),
    Proxy(ProxyDescriptor),
    Exception(ExceptionDescriptor),
}

impl TypeDescriptor {
    /// Type id string (primitive names for primitives).
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Primitive(kind) => kind.name(),
            TypeDescriptor::Enum(d) => &d.name,
            TypeDescriptor::Struct(d) => &d.name,
            TypeDescriptor::Sequence(d) => &d.name,
            TypeDescriptor::Dictionary(d) => &d.name,
            TypeDescriptor::Class(d) => &d.name,
            TypeDescriptor::Proxy(d) => &d.name,
            TypeDescriptor::Exception(d) => &d.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDescriptor::Primitive(_) => "primitive",
            TypeDescriptor::Enum(_) => "enum",
            TypeDescriptor::Struct(_) => "struct",
            TypeDescriptor::Sequence(_) => "sequence",
            TypeDescriptor::Dictionary(_) => "dictionary",
            TypeDescriptor::Class(_) => "class",
            TypeDescriptor::Proxy(_) => "proxy",
            TypeDescriptor::Exception(_) => "exception",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(_))
    }
}
