// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Static wire characteristics of registered types.
//!
//! These answers depend only on the schema, never on a value, so the
//! optional-member encoder can pick a framing before looking at data.

use super::registry::{DeclaredKind, Slot};
use super::{PrimitiveKind, TypeDescriptor, TypeId, TypeRegistry};
use crate::stream::OptionalFormat;

impl TypeRegistry {
    /// True unless every value of `ty` has the same encoded size.
    pub fn variable_length(&self, ty: TypeId) -> bool {
        match self.slot(ty) {
            Some(Slot::Defined(TypeDescriptor::Primitive(kind))) => kind.size().is_none(),
            Some(Slot::Defined(TypeDescriptor::Struct(desc))) => desc.variable_length,
            // Enums are size-encoded in 1.1.
            _ => true,
        }
    }

    /// Encoded size of a fixed-length type; 1 (a size prefix) otherwise.
    pub fn wire_size(&self, ty: TypeId) -> usize {
        match self.slot(ty) {
            Some(Slot::Defined(TypeDescriptor::Primitive(kind))) => kind.size().unwrap_or(1),
            Some(Slot::Defined(TypeDescriptor::Struct(desc))) => desc.wire_size,
            _ => 1,
        }
    }

    /// Smallest possible encoding, used to sanity check sequence counts.
    pub fn min_wire_size(&self, ty: TypeId) -> usize {
        match self.slot(ty) {
            Some(Slot::Defined(TypeDescriptor::Primitive(kind))) => kind.size().unwrap_or(1),
            Some(Slot::Defined(TypeDescriptor::Struct(desc))) => desc.min_wire_size,
            // Identity name and category.
            Some(Slot::Defined(TypeDescriptor::Proxy(_)))
            | Some(Slot::Declared {
                kind: DeclaredKind::Proxy,
                ..
            }) => 2,
            _ => 1,
        }
    }

    /// Framing used when `ty` is the type of an optional member.
    pub fn optional_format(&self, ty: TypeId) -> OptionalFormat {
        match self.slot(ty) {
            Some(Slot::Defined(desc)) => match desc {
                TypeDescriptor::Primitive(kind) => match kind {
                    PrimitiveKind::Bool | PrimitiveKind::Byte => OptionalFormat::F1,
                    PrimitiveKind::Short => OptionalFormat::F2,
                    PrimitiveKind::Int | PrimitiveKind::Float => OptionalFormat::F4,
                    PrimitiveKind::Long | PrimitiveKind::Double => OptionalFormat::F8,
                    PrimitiveKind::String => OptionalFormat::VSize,
                },
                TypeDescriptor::Enum(_) => OptionalFormat::Size,
                TypeDescriptor::Struct(s) if s.variable_length => OptionalFormat::FSize,
                TypeDescriptor::Struct(_) => OptionalFormat::VSize,
                TypeDescriptor::Sequence(s) if self.variable_length(s.element) => {
                    OptionalFormat::FSize
                }
                TypeDescriptor::Sequence(_) => OptionalFormat::VSize,
                TypeDescriptor::Dictionary(d)
                    if self.variable_length(d.key) || self.variable_length(d.value) =>
                {
                    OptionalFormat::FSize
                }
                TypeDescriptor::Dictionary(_) => OptionalFormat::VSize,
                TypeDescriptor::Class(_) => OptionalFormat::Class,
                TypeDescriptor::Proxy(_) | TypeDescriptor::Exception(_) => OptionalFormat::FSize,
            },
            Some(Slot::Declared {
                kind: DeclaredKind::Class,
                ..
            }) => OptionalFormat::Class,
            _ => OptionalFormat::FSize,
        }
    }

    /// True when encoding a value of `ty` may involve class instances.
    pub fn uses_classes(&self, ty: TypeId) -> bool {
        match self.slot(ty) {
            Some(Slot::Declared { kind, .. }) => *kind == DeclaredKind::Class,
            Some(Slot::Defined(desc)) => match desc {
                TypeDescriptor::Class(_) => true,
                TypeDescriptor::Struct(s) => s
                    .members
                    .iter()
                    .chain(s.optional_members.iter())
                    .any(|m| self.uses_classes(m.ty)),
                TypeDescriptor::Sequence(s) => self.uses_classes(s.element),
                TypeDescriptor::Dictionary(d) => self.uses_classes(d.value),
                TypeDescriptor::Exception(e) => e.uses_classes,
                _ => false,
            },
            None => false,
        }
    }
}
