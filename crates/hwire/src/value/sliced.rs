// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Preserved slices of types unknown to the decoding schema.

use super::object::ObjectRef;

/// One skipped slice, kept verbatim so it can be re-marshaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceInfo {
    /// Type id string; empty when the slice carried only a compact id.
    pub type_id: String,
    pub compact_id: Option<i32>,
    /// Slice payload, without the optional end marker.
    pub bytes: Vec<u8>,
    /// Instances referenced from the payload through its indirection table.
    pub instances: Vec<ObjectRef>,
    pub has_optional_members: bool,
    pub is_last_slice: bool,
}

impl SliceInfo {
    /// Same type, payload and flags (instances compared separately).
    pub(crate) fn same_framing(&self, other: &SliceInfo) -> bool {
        self.type_id == other.type_id
            && self.compact_id == other.compact_id
            && self.bytes == other.bytes
            && self.has_optional_members == other.has_optional_members
            && self.is_last_slice == other.is_last_slice
    }
}

/// Unknown slices of one value or exception, most-derived first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlicedData {
    pub slices: Vec<SliceInfo>,
}

impl SlicedData {
    pub fn new(slices: Vec<SliceInfo>) -> Self {
        Self { slices }
    }

    /// Type id of the most-derived preserved slice.
    pub fn most_derived_type_id(&self) -> Option<&str> {
        self.slices
            .first()
            .map(|slice| slice.type_id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Total bytes of preserved payload.
    pub fn payload_len(&self) -> usize {
        self.slices.iter().map(|slice| slice.bytes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(type_id: &str, bytes: &[u8]) -> SliceInfo {
        SliceInfo {
            type_id: type_id.to_string(),
            compact_id: None,
            bytes: bytes.to_vec(),
            instances: Vec::new(),
            has_optional_members: false,
            is_last_slice: false,
        }
    }

    #[test]
    fn test_most_derived_type_id() {
        let data = SlicedData::new(vec![
            slice("::Demo::Newer", &[1, 2]),
            slice("::Demo::New", &[3]),
        ]);
        assert_eq!(data.most_derived_type_id(), Some("::Demo::Newer"));
        assert_eq!(data.payload_len(), 3);
        assert_eq!(SlicedData::default().most_derived_type_id(), None);
    }

    #[test]
    fn test_same_framing_ignores_instances() {
        let a = slice("::A", &[9]);
        let mut b = a.clone();
        b.instances.push(ObjectRef::indirect(0));
        assert!(a.same_framing(&b));
        b.has_optional_members = true;
        assert!(!a.same_framing(&b));
    }
}
