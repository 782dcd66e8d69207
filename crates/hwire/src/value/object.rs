// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Class instances and the arena that owns them.

use super::sliced::SlicedData;
use super::{Members, Value};
use std::collections::HashMap;

const INDIRECT_FLAG: u32 = 1 << 31;

/// Index of a class instance in an [`ObjectGraph`].
///
/// Two values holding the same `ObjectRef` refer to one shared instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(u32);

impl ObjectRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Placeholder for the `index`-th entry of the current slice's
    /// indirection table, replaced once the table has been read.
    pub(crate) fn indirect(index: usize) -> ObjectRef {
        ObjectRef(INDIRECT_FLAG | (index as u32 & !INDIRECT_FLAG))
    }

    pub(crate) fn indirect_index(self) -> Option<usize> {
        if self.0 & INDIRECT_FLAG != 0 {
            Some((self.0 & !INDIRECT_FLAG) as usize)
        } else {
            None
        }
    }
}

/// A class instance: its most-derived type id and all member values along
/// the hierarchy, keyed by member name.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInstance {
    pub type_id: String,
    pub members: Members,
    /// Slices of derived types unknown to the decoding schema.
    pub sliced_data: Option<SlicedData>,
}

impl ClassInstance {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            members: Members::new(),
            sliced_data: None,
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.set(name, value);
        self
    }

    pub fn with_members(mut self, members: Members) -> Self {
        self.members = members;
        self
    }
}

/// Arena of class instances for one message.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    instances: Vec<ClassInstance>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: ClassInstance) -> ObjectRef {
        debug_assert!((self.instances.len() as u64) < u64::from(INDIRECT_FLAG));
        let r = ObjectRef(self.instances.len() as u32);
        self.instances.push(instance);
        r
    }

    pub fn get(&self, r: ObjectRef) -> Option<&ClassInstance> {
        self.instances.get(r.index())
    }

    pub fn get_mut(&mut self, r: ObjectRef) -> Option<&mut ClassInstance> {
        self.instances.get_mut(r.index())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &ClassInstance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, instance)| (ObjectRef(i as u32), instance))
    }

    /// Reserve a slot filled in once the instance is fully decoded.
    pub(crate) fn reserve(&mut self, type_id: &str) -> ObjectRef {
        self.insert(ClassInstance::new(type_id))
    }

    pub(crate) fn replace(&mut self, r: ObjectRef, instance: ClassInstance) {
        if let Some(slot) = self.instances.get_mut(r.index()) {
            *slot = instance;
        }
    }

    /// Compare `a` (in `self`) with `b` (in `other`) structurally.
    ///
    /// Instances are matched one to one, so aliasing and cycles must have the
    /// same shape in both graphs.
    pub fn structurally_equal(&self, a: &Value, other: &ObjectGraph, b: &Value) -> bool {
        GraphComparison {
            left: self,
            right: other,
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
        .values(a, b)
    }
}

struct GraphComparison<'g> {
    left: &'g ObjectGraph,
    right: &'g ObjectGraph,
    forward: HashMap<ObjectRef, ObjectRef>,
    backward: HashMap<ObjectRef, ObjectRef>,
}

impl GraphComparison<'_> {
    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Class(Some(x)), Value::Class(Some(y))) => self.instances(*x, *y),
            (Value::Struct(x), Value::Struct(y)) => self.members(x, y),
            (Value::Sequence(x), Value::Sequence(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(l, r)| self.values(l, r))
            }
            (Value::Dictionary(x), Value::Dictionary(y)) => {
                x.len() == y.len()
                    && x
                        .iter()
                        .zip(y)
                        .all(|((lk, lv), (rk, rv))| lk == rk && self.values(lv, rv))
            }
            _ => a == b,
        }
    }

    fn instances(&mut self, x: ObjectRef, y: ObjectRef) -> bool {
        match (self.forward.get(&x), self.backward.get(&y)) {
            (Some(mapped), _) => return *mapped == y,
            (None, Some(_)) => return false,
            (None, None) => {}
        }
        self.forward.insert(x, y);
        self.backward.insert(y, x);

        let (left_graph, right_graph) = (self.left, self.right);
        let (Some(left), Some(right)) = (left_graph.get(x), right_graph.get(y)) else {
            return false;
        };
        if left.type_id != right.type_id || !self.members(&left.members, &right.members) {
            return false;
        }
        match (&left.sliced_data, &right.sliced_data) {
            (None, None) => true,
            (Some(l), Some(r)) => {
                l.slices.len() == r.slices.len()
                    && l.slices.iter().zip(&r.slices).all(|(ls, rs)| {
                        ls.same_framing(rs)
                            && ls.instances.len() == rs.instances.len()
                            && ls
                                .instances
                                .iter()
                                .zip(&rs.instances)
                                .all(|(li, ri)| self.instances(*li, *ri))
                    })
            }
            _ => false,
        }
    }

    fn members(&mut self, x: &Members, y: &Members) -> bool {
        if x.set_names() != y.set_names() {
            return false;
        }
        x.iter().all(|(name, value)| match (value, y.get(name)) {
            (Some(l), Some(r)) => self.values(l, r),
            (None, _) => true,
            (Some(_), None) => false,
        })
    }
}
