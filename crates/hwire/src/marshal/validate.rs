// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local value checks run before a value is marshaled.
//!
//! Only the outermost shape is checked; nested values are checked when the
//! encoder descends into them.

use crate::error::{Error, Result};
use crate::types::{PrimitiveKind, TypeDescriptor, TypeId, TypeRegistry};
use crate::value::{ObjectGraph, Value};

impl TypeRegistry {
    /// True when `value` can be marshaled as `ty`.
    pub fn validate(&self, ty: TypeId, value: &Value, graph: &ObjectGraph) -> bool {
        self.check_value(ty, value, graph).is_ok()
    }

    pub(crate) fn check_value(&self, ty: TypeId, value: &Value, graph: &ObjectGraph) -> Result<()> {
        let desc = self.lookup(ty)?;
        let mismatch = || {
            Error::validation(
                desc.name(),
                format!("expected {}, got {}", desc.kind_name(), value.kind_name()),
            )
        };
        match (desc, value) {
            (TypeDescriptor::Primitive(kind), _) => {
                check_primitive(*kind, value)
                    .map_err(|reason| Error::validation(kind.name(), reason))
            }
            (TypeDescriptor::Enum(e), Value::Enum(v)) => {
                if e.contains(*v) {
                    Ok(())
                } else {
                    Err(Error::validation(
                        &e.name,
                        format!("{} is not an enumerator", v),
                    ))
                }
            }
            (TypeDescriptor::Struct(_), Value::Struct(_))
            | (TypeDescriptor::Sequence(_), Value::Sequence(_))
            | (TypeDescriptor::Dictionary(_), Value::Dictionary(_))
            | (TypeDescriptor::Proxy(_), Value::Proxy(None))
            | (TypeDescriptor::Class(_), Value::Class(None)) => Ok(()),
            // an empty name is the null proxy on the wire
            (TypeDescriptor::Proxy(p), Value::Proxy(Some(proxy))) => {
                if proxy.identity.name.is_empty() {
                    Err(Error::validation(&p.name, "proxy identity has an empty name"))
                } else {
                    Ok(())
                }
            }
            (TypeDescriptor::Class(class), Value::Class(Some(r))) => {
                let instance = graph.get(*r).ok_or_else(|| {
                    Error::validation(
                        &class.name,
                        format!("dangling instance reference {}", r.index()),
                    )
                })?;
                if ty == TypeId::OBJECT || class.interface_by_value {
                    return Ok(());
                }
                match self.class_by_name(&instance.type_id) {
                    Some(actual) if self.is_a(actual, ty) => Ok(()),
                    Some(_) => Err(Error::validation(
                        &class.name,
                        format!("instance of '{}' is not a '{}'", instance.type_id, class.name),
                    )),
                    None => Err(Error::validation(
                        &class.name,
                        format!("instance type '{}' is not registered", instance.type_id),
                    )),
                }
            }
            (TypeDescriptor::Exception(e), _) => Err(Error::validation(
                &e.name,
                "exceptions cannot be marshaled as values",
            )),
            _ => Err(mismatch()),
        }
    }
}

fn check_primitive(kind: PrimitiveKind, value: &Value) -> core::result::Result<(), String> {
    let in_range = |min: i64, max: i64| match value.as_i64() {
        Some(v) if (min..=max).contains(&v) => Ok(()),
        Some(v) => Err(format!("{} is out of range [{}, {}]", v, min, max)),
        None => Err(format!("expected {}, got {}", kind.name(), value.kind_name())),
    };
    match kind {
        PrimitiveKind::Bool => match value {
            Value::Bool(_) => Ok(()),
            _ => Err(format!("expected bool, got {}", value.kind_name())),
        },
        PrimitiveKind::Byte => in_range(0, i64::from(u8::MAX)),
        PrimitiveKind::Short => in_range(i64::from(i16::MIN), i64::from(i16::MAX)),
        PrimitiveKind::Int => in_range(i64::from(i32::MIN), i64::from(i32::MAX)),
        PrimitiveKind::Long => in_range(i64::MIN, i64::MAX),
        PrimitiveKind::Float => match value {
            Value::Float(_) => Ok(()),
            Value::Double(v) if !v.is_finite() || v.abs() <= f64::from(f32::MAX) => Ok(()),
            Value::Double(v) => Err(format!("{} does not fit a float", v)),
            _ => Err(format!("expected float, got {}", value.kind_name())),
        },
        PrimitiveKind::Double => match value {
            Value::Float(_) | Value::Double(_) => Ok(()),
            _ => Err(format!("expected double, got {}", value.kind_name())),
        },
        PrimitiveKind::String => match value {
            Value::String(_) => Ok(()),
            _ => Err(format!("expected string, got {}", value.kind_name())),
        },
    }
}
