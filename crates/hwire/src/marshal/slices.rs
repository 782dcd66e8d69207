// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-encapsulation marshaling state and slice frames.
//!
//! Every encapsulation owns its own type-id table, instance ids and object
//! map. A frame is pushed for each class instance or exception being
//! written/read and tracks the slice currently open inside it.

use crate::config::FormatType;
use crate::error::{Error, Result};
use crate::types::TypeId;
use crate::value::{ObjectRef, SliceInfo};
use std::collections::HashMap;

/// Instance ids start at 2: 0 is null and 1 announces an inline instance.
const FIRST_INSTANCE_ID: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SliceType {
    Value,
    Exception,
}

pub(crate) fn no_frame() -> Error {
    Error::Marshal("no class or exception slice in progress".into())
}

// =======================================================================
// Write side
// =======================================================================

#[derive(Debug)]
pub(crate) struct WriteFrame {
    pub slice_type: SliceType,
    /// Slice sizes and indirection tables are written.
    pub sliced: bool,
    pub first_slice: bool,
    pub flags: u8,
    pub flags_pos: usize,
    pub size_pos: usize,
    /// Instances referenced from the open slice, with their formal type.
    pub indirection_table: Vec<(ObjectRef, TypeId)>,
    pub indirection_map: HashMap<ObjectRef, usize>,
}

impl WriteFrame {
    pub fn new(slice_type: SliceType, sliced: bool) -> Self {
        Self {
            slice_type,
            sliced,
            first_slice: true,
            flags: 0,
            flags_pos: 0,
            size_pos: 0,
            indirection_table: Vec::new(),
            indirection_map: HashMap::new(),
        }
    }

    /// 1-based table index for `r`, adding it on first use.
    pub fn indirection_index(&mut self, r: ObjectRef, formal: TypeId) -> usize {
        if let Some(index) = self.indirection_map.get(&r) {
            return *index;
        }
        self.indirection_table.push((r, formal));
        let index = self.indirection_table.len();
        self.indirection_map.insert(r, index);
        index
    }
}

#[derive(Debug)]
pub(crate) struct EncapsWriter {
    pub format: FormatType,
    pub type_ids: HashMap<String, usize>,
    pub marshaled: HashMap<ObjectRef, usize>,
    pub value_id_index: usize,
    pub frames: Vec<WriteFrame>,
}

impl EncapsWriter {
    pub fn new(format: FormatType) -> Self {
        Self {
            format,
            type_ids: HashMap::new(),
            marshaled: HashMap::new(),
            value_id_index: FIRST_INSTANCE_ID,
            frames: Vec::new(),
        }
    }
}

// =======================================================================
// Read side
// =======================================================================

#[derive(Debug)]
pub(crate) struct ReadFrame {
    pub slice_type: SliceType,
    pub flags: u8,
    /// End of the open slice, when the slice carries its size.
    pub slice_end: Option<usize>,
    pub type_id: String,
    pub compact_id: Option<i32>,
    /// Unknown slices skipped so far.
    pub slices: Vec<SliceInfo>,
    /// Indirection placeholders of the open slice: table index, formal type.
    pub indirect_patches: Vec<(usize, TypeId)>,
}

impl ReadFrame {
    pub fn new(slice_type: SliceType) -> Self {
        Self {
            slice_type,
            flags: 0,
            slice_end: None,
            type_id: String::new(),
            compact_id: None,
            slices: Vec::new(),
            indirect_patches: Vec::new(),
        }
    }

    /// Type id for diagnostics: string form, or the compact id.
    pub fn display_type_id(&self) -> String {
        match self.compact_id {
            Some(id) if self.type_id.is_empty() => format!("compact id {}", id),
            _ => self.type_id.clone(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct EncapsReader {
    pub type_ids: Vec<String>,
    pub unmarshaled: HashMap<usize, ObjectRef>,
    pub value_id_index: usize,
    pub frames: Vec<ReadFrame>,
}

impl Default for EncapsReader {
    fn default() -> Self {
        Self::new()
    }
}

impl EncapsReader {
    pub fn new() -> Self {
        Self {
            type_ids: Vec::new(),
            unmarshaled: HashMap::new(),
            value_id_index: FIRST_INSTANCE_ID,
            frames: Vec::new(),
        }
    }

    pub fn next_instance_id(&mut self) -> usize {
        self.value_id_index += 1;
        self.value_id_index
    }

    pub fn current_frame(&mut self) -> Result<&mut ReadFrame> {
        self.frames.last_mut().ok_or_else(no_frame)
    }
}
