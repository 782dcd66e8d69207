// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic values marshaled against registered types.
//!
//! Class instances are not stored inline: a [`Value::Class`] holds an
//! [`ObjectRef`] into an [`ObjectGraph`] arena, which is how shared and
//! cyclic references are represented.

pub mod exception;
pub mod object;
pub mod proxy;
pub mod sliced;

pub use exception::UserException;
pub use object::{ClassInstance, ObjectGraph, ObjectRef};
pub use proxy::{EndpointData, Identity, InvocationMode, ProxyValue};
pub use sliced::{SliceInfo, SlicedData};

use crate::error::Result;
use std::collections::HashMap;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Enumerator value.
    Enum(i32),
    Struct(Members),
    Sequence(Vec<Value>),
    /// Entries in wire order.
    Dictionary(Vec<(Value, Value)>),
    /// Null or an instance in the accompanying [`ObjectGraph`].
    Class(Option<ObjectRef>),
    Proxy(Option<ProxyValue>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::Struct(_) => "struct",
            Value::Sequence(_) => "sequence",
            Value::Dictionary(_) => "dictionary",
            Value::Class(_) => "class",
            Value::Proxy(_) => "proxy",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer variant, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_members(&self) -> Option<&Members> {
        match self {
            Value::Struct(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(v) => Some(v),
            _ => None,
        }
    }

    /// Instance reference of a non-null class value.
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Class(r) => *r,
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&ProxyValue> {
        match self {
            Value::Proxy(p) => p.as_ref(),
            _ => None,
        }
    }

    /// Visit every class reference held (transitively) by this value.
    pub(crate) fn for_each_ref_mut<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut ObjectRef) -> Result<()>,
    {
        match self {
            Value::Class(Some(r)) => f(r),
            Value::Struct(members) => members.for_each_ref_mut(f),
            Value::Sequence(items) => {
                for item in items {
                    item.for_each_ref_mut(f)?;
                }
                Ok(())
            }
            Value::Dictionary(entries) => {
                for (_, value) in entries {
                    value.for_each_ref_mut(f)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<ObjectRef> for Value {
    fn from(r: ObjectRef) -> Self {
        Value::Class(Some(r))
    }
}

impl From<Members> for Value {
    fn from(m: Members) -> Self {
        Value::Struct(m)
    }
}

impl From<ProxyValue> for Value {
    fn from(p: ProxyValue) -> Self {
        Value::Proxy(Some(p))
    }
}

/// Named member values of a struct, class slice chain or exception.
///
/// An optional member is either set (`Some`) or explicitly unset (`None`);
/// a name that was never inserted compares equal to an unset one.
#[derive(Debug, Clone, Default)]
pub struct Members {
    entries: HashMap<String, Option<Value>>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Members::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder form of [`Members::unset`].
    pub fn with_unset(mut self, name: impl Into<String>) -> Self {
        self.unset(name);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), Some(value.into()));
    }

    /// Mark an optional member as absent.
    pub fn unset(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), None);
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.entries.insert(name.into(), value);
    }

    /// Value of a set member.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries.get_mut(name).and_then(Option::as_mut)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True for members explicitly marked unset (decoded absent optionals).
    pub fn is_unset(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(None))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    /// Names of set members, sorted.
    pub fn set_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, v)| v.is_some())
            .map(|(n, _)| n.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn for_each_ref_mut<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut ObjectRef) -> Result<()>,
    {
        for value in self.entries.values_mut().flatten() {
            value.for_each_ref_mut(f)?;
        }
        Ok(())
    }
}

impl PartialEq for Members {
    fn eq(&self, other: &Self) -> bool {
        let set = |m: &Members| m.entries.values().filter(|v| v.is_some()).count();
        set(self) == set(other)
            && self
                .entries
                .iter()
                .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
                .all(|(name, value)| other.get(name) == Some(value))
    }
}
