// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value encoder.
//!
//! Walks a [`Value`] against its [`TypeDescriptor`] and writes the 1.1 wire
//! form. Class instances are written once per encapsulation; later
//! references reuse the instance id (compact format) or the slice's
//! indirection table (sliced format).

use super::hooks::ValueHooks;
use super::optional::OptionalScope;
use super::slices::{no_frame, EncapsWriter, SliceType, WriteFrame};
use crate::config::{
    CodecConfig, EncodingVersion, FormatType, CLASS_INLINE, CLASS_NULL, FLAG_HAS_INDIRECTION_TABLE,
    FLAG_HAS_OPTIONAL_MEMBERS, FLAG_HAS_SLICE_SIZE, FLAG_HAS_TYPE_ID_COMPACT,
    FLAG_HAS_TYPE_ID_INDEX, FLAG_HAS_TYPE_ID_STRING, FLAG_IS_LAST_SLICE, OPTIONAL_END_MARKER,
};
use crate::error::{Error, Result};
use crate::stream::OutputStream;
use crate::types::{
    DataMember, EnumDescriptor, PrimitiveKind, StructDescriptor, TypeDescriptor, TypeId,
    TypeRegistry,
};
use crate::value::proxy::write_proxy;
use crate::value::{ClassInstance, Members, ObjectGraph, ObjectRef, SlicedData, Value};

/// Encoder for one message.
///
/// # Example
///
/// ```
/// use hwire::{Encoder, ObjectGraph, TypeId, TypeRegistry, Value};
///
/// let registry = TypeRegistry::new();
/// let graph = ObjectGraph::new();
/// let mut encoder = Encoder::new(&registry, &graph);
/// encoder.start_encapsulation().unwrap();
/// encoder.write(TypeId::INT, &Value::Int(7)).unwrap();
/// encoder.end_encapsulation().unwrap();
/// assert_eq!(encoder.finish().unwrap(), vec![10, 0, 0, 0, 1, 1, 7, 0, 0, 0]);
/// ```
pub struct Encoder<'a> {
    pub(super) registry: &'a TypeRegistry,
    pub(super) graph: &'a ObjectGraph,
    pub(super) config: CodecConfig,
    pub(super) hooks: Option<&'a dyn ValueHooks>,
    pub(super) out: OutputStream,
    /// State of the innermost encapsulation (or of the bare stream).
    pub(super) current: EncapsWriter,
    pub(super) outer: Vec<EncapsWriter>,
    pub(super) depth: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(registry: &'a TypeRegistry, graph: &'a ObjectGraph) -> Self {
        Self::with_config(registry, graph, CodecConfig::default())
    }

    pub fn with_config(
        registry: &'a TypeRegistry,
        graph: &'a ObjectGraph,
        config: CodecConfig,
    ) -> Self {
        Self {
            registry,
            graph,
            current: EncapsWriter::new(config.format),
            config,
            hooks: None,
            out: OutputStream::new(),
            outer: Vec::new(),
            depth: 0,
        }
    }

    pub fn with_hooks(mut self, hooks: &'a dyn ValueHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Open an encapsulation using the configured encoding and format.
    pub fn start_encapsulation(&mut self) -> Result<()> {
        self.out.start_encapsulation(self.config.encoding)?;
        let fresh = EncapsWriter::new(self.config.format);
        self.outer.push(std::mem::replace(&mut self.current, fresh));
        Ok(())
    }

    pub fn end_encapsulation(&mut self) -> Result<()> {
        let outer = self
            .outer
            .pop()
            .ok_or_else(|| Error::Marshal("end_encapsulation without start".into()))?;
        self.out.end_encapsulation()?;
        self.current = outer;
        Ok(())
    }

    /// Encode `value` as an instance of `ty`.
    pub fn write(&mut self, ty: TypeId, value: &Value) -> Result<()> {
        let registry = self.registry;
        registry.check_value(ty, value, self.graph)?;
        match (registry.lookup(ty)?, value) {
            (TypeDescriptor::Primitive(kind), _) => self.write_primitive(*kind, value),
            (TypeDescriptor::Enum(desc), Value::Enum(v)) => self.write_enum(desc, *v),
            (TypeDescriptor::Struct(desc), Value::Struct(members)) => {
                self.write_struct(desc, members)
            }
            (TypeDescriptor::Sequence(desc), Value::Sequence(items)) => {
                self.out.write_size(items.len())?;
                for item in items {
                    self.write(desc.element, item)?;
                }
                Ok(())
            }
            (TypeDescriptor::Dictionary(desc), Value::Dictionary(entries)) => {
                self.out.write_size(entries.len())?;
                for (key, value) in entries {
                    self.write(desc.key, key)?;
                    self.write(desc.value, value)?;
                }
                Ok(())
            }
            (TypeDescriptor::Class(_), Value::Class(r)) => self.write_class(ty, *r),
            (TypeDescriptor::Proxy(_), Value::Proxy(proxy)) => {
                write_proxy(&mut self.out, proxy.as_ref())
            }
            (desc, value) => Err(Error::validation(
                desc.name(),
                format!("cannot encode {} as {}", value.kind_name(), desc.kind_name()),
            )),
        }
    }

    /// Close the stream and return the encoded bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.outer.is_empty() {
            return Err(Error::Marshal(format!(
                "{} encapsulation(s) still open",
                self.outer.len()
            )));
        }
        if self.out.len() > self.config.message_size_max {
            return Err(Error::MessageTooLarge {
                size: self.out.len(),
                max: self.config.message_size_max,
            });
        }
        Ok(self.out.into_bytes())
    }

    // ===================================================================
    // Plain values
    // ===================================================================

    fn write_primitive(&mut self, kind: PrimitiveKind, value: &Value) -> Result<()> {
        let invalid =
            || Error::validation(kind.name(), format!("cannot encode {}", value.kind_name()));
        let int = || value.as_i64().ok_or_else(invalid);
        let float = || value.as_f64().ok_or_else(invalid);
        match kind {
            PrimitiveKind::Bool => self.out.write_bool(value.as_bool().ok_or_else(invalid)?),
            PrimitiveKind::Byte => self.out.write_u8(int()? as u8),
            PrimitiveKind::Short => self.out.write_i16(int()? as i16),
            PrimitiveKind::Int => self.out.write_i32(int()? as i32),
            PrimitiveKind::Long => self.out.write_i64(int()?),
            PrimitiveKind::Float => self.out.write_f32(float()? as f32),
            PrimitiveKind::Double => self.out.write_f64(float()?),
            PrimitiveKind::String => self.out.write_string(value.as_str().ok_or_else(invalid)?)?,
        }
        Ok(())
    }

    fn write_enum(&mut self, desc: &EnumDescriptor, value: i32) -> Result<()> {
        if self.out.encoding() == EncodingVersion::V1_0 {
            match desc.fixed_width() {
                1 => self.out.write_u8(value as u8),
                2 => self.out.write_i16(value as i16),
                _ => self.out.write_i32(value),
            }
            return Ok(());
        }
        let size = usize::try_from(value)
            .map_err(|_| Error::validation(&desc.name, format!("negative enumerator {}", value)))?;
        self.out.write_size(size)
    }

    fn write_struct(&mut self, desc: &StructDescriptor, members: &Members) -> Result<()> {
        self.write_required(&desc.name, &desc.members, members)?;
        if !desc.optional_members.is_empty() && self.out.encoding().supports_optionals() {
            self.write_optional_members(&desc.optional_members, members, OptionalScope::Struct)?;
            self.out.write_u8(OPTIONAL_END_MARKER);
        }
        Ok(())
    }

    pub(super) fn write_required(
        &mut self,
        owner: &str,
        required: &[DataMember],
        members: &Members,
    ) -> Result<()> {
        for member in required {
            let value = members.get(&member.name).ok_or_else(|| {
                Error::validation(owner, format!("required member '{}' is not set", member.name))
            })?;
            self.write(member.ty, value)?;
        }
        Ok(())
    }

    // ===================================================================
    // Class instances
    // ===================================================================

    fn write_class(&mut self, formal: TypeId, r: Option<ObjectRef>) -> Result<()> {
        let Some(r) = r else {
            return self.out.write_size(CLASS_NULL);
        };
        if !self.out.encoding().supports_optionals() {
            return Err(Error::UnsupportedEncoding(self.out.encoding()));
        }
        if let Some(frame) = self.current.frames.last_mut() {
            if frame.sliced {
                let index = frame.indirection_index(r, formal);
                return self.out.write_size(index);
            }
        }
        self.write_instance(r, formal)
    }

    /// Inline the instance on first use, otherwise write its id.
    pub(super) fn write_instance(&mut self, r: ObjectRef, formal: TypeId) -> Result<()> {
        if let Some(id) = self.current.marshaled.get(&r) {
            return self.out.write_size(*id);
        }
        self.current.value_id_index += 1;
        self.current.marshaled.insert(r, self.current.value_id_index);
        self.out.write_size(CLASS_INLINE)?;

        let graph = self.graph;
        let instance = graph.get(r).ok_or_else(|| {
            Error::validation(
                self.registry.name_of(formal),
                format!("dangling instance reference {}", r.index()),
            )
        })?;
        if let Some(hooks) = self.hooks {
            hooks.pre_marshal(instance).map_err(Error::Hook)?;
        }

        self.depth += 1;
        if self.depth > self.config.class_graph_depth_max {
            self.depth -= 1;
            return Err(Error::DepthExceeded {
                max: self.config.class_graph_depth_max,
            });
        }
        let sliced = self.current.format == FormatType::Sliced;
        self.current.frames.push(WriteFrame::new(SliceType::Value, sliced));
        let result = self.write_instance_slices(instance, formal);
        self.current.frames.pop();
        self.depth -= 1;
        result
    }

    fn write_instance_slices(&mut self, instance: &ClassInstance, formal: TypeId) -> Result<()> {
        let registry = self.registry;
        if let Some(sliced) = &instance.sliced_data {
            self.write_sliced_data(sliced)?;
        }

        if registry.class(formal)?.interface_by_value {
            self.start_slice(&instance.type_id, None, true)?;
            return self.end_slice();
        }

        let Some(class_id) = registry.class_by_name(&instance.type_id) else {
            let preserved_last = instance
                .sliced_data
                .as_ref()
                .and_then(|data| data.slices.last())
                .is_some_and(|slice| slice.is_last_slice);
            if preserved_last && self.current.format == FormatType::Sliced {
                return Ok(());
            }
            return Err(Error::validation(
                &instance.type_id,
                "class is not registered and cannot be re-encoded from preserved slices",
            ));
        };

        let chain = registry.class_chain(class_id)?;
        for (i, id) in chain.iter().enumerate() {
            let class = registry.class(*id)?;
            self.start_slice(&class.name, class.compact_id, i + 1 == chain.len())?;
            self.write_required(&class.name, &class.members, &instance.members)?;
            self.write_optional_members(
                &class.optional_members,
                &instance.members,
                OptionalScope::Slice,
            )?;
            self.end_slice()?;
        }
        Ok(())
    }

    /// Re-emit slices preserved from an earlier decode.
    pub(super) fn write_sliced_data(&mut self, sliced: &SlicedData) -> Result<()> {
        if self.current.frames.last().is_some_and(|frame| !frame.sliced) {
            log::debug!(
                "[marshal] dropping {} preserved slice(s) of '{}' in compact format",
                sliced.slices.len(),
                sliced.most_derived_type_id().unwrap_or_default()
            );
            return Ok(());
        }
        for info in &sliced.slices {
            self.start_slice(&info.type_id, info.compact_id, info.is_last_slice)?;
            self.out.write_bytes(&info.bytes);
            let frame = self.current.frames.last_mut().ok_or_else(no_frame)?;
            if info.has_optional_members {
                frame.flags |= FLAG_HAS_OPTIONAL_MEMBERS;
            }
            // Positional: the preserved bytes index this table as written.
            frame
                .indirection_table
                .extend(info.instances.iter().map(|r| (*r, TypeId::OBJECT)));
            self.end_slice()?;
        }
        Ok(())
    }

    // ===================================================================
    // Slices
    // ===================================================================

    pub(super) fn start_slice(
        &mut self,
        type_id: &str,
        compact_id: Option<i32>,
        last: bool,
    ) -> Result<()> {
        let out = &mut self.out;
        let EncapsWriter { frames, type_ids, .. } = &mut self.current;
        let frame = frames.last_mut().ok_or_else(no_frame)?;

        frame.flags = 0;
        if frame.sliced {
            frame.flags |= FLAG_HAS_SLICE_SIZE;
        }
        if last {
            frame.flags |= FLAG_IS_LAST_SLICE;
        }
        frame.flags_pos = out.len();
        out.write_u8(0);

        match frame.slice_type {
            SliceType::Value if frame.sliced || frame.first_slice => {
                if let Some(compact) = compact_id {
                    frame.flags |= FLAG_HAS_TYPE_ID_COMPACT;
                    let compact = usize::try_from(compact)
                        .map_err(|_| Error::validation(type_id, "negative compact id"))?;
                    out.write_size(compact)?;
                } else if let Some(index) = type_ids.get(type_id) {
                    frame.flags |= FLAG_HAS_TYPE_ID_INDEX;
                    out.write_size(*index)?;
                } else {
                    frame.flags |= FLAG_HAS_TYPE_ID_STRING;
                    let index = type_ids.len() + 1;
                    type_ids.insert(type_id.to_string(), index);
                    out.write_string(type_id)?;
                }
            }
            SliceType::Value => {}
            SliceType::Exception => out.write_string(type_id)?,
        }

        if frame.sliced {
            frame.size_pos = out.start_size();
        }
        frame.first_slice = false;
        Ok(())
    }

    pub(super) fn end_slice(&mut self) -> Result<()> {
        let frame = self.current.frames.last_mut().ok_or_else(no_frame)?;
        if frame.flags & FLAG_HAS_OPTIONAL_MEMBERS != 0 {
            self.out.write_u8(OPTIONAL_END_MARKER);
        }
        if frame.flags & FLAG_HAS_SLICE_SIZE != 0 {
            let size = self.out.len() - frame.size_pos;
            let size = i32::try_from(size)
                .map_err(|_| Error::Marshal(format!("slice of {} bytes too large", size)))?;
            self.out.rewrite_i32(size, frame.size_pos);
        }

        let table = std::mem::take(&mut frame.indirection_table);
        frame.indirection_map.clear();
        let flags_pos = frame.flags_pos;
        let mut flags = frame.flags;
        if !table.is_empty() {
            flags |= FLAG_HAS_INDIRECTION_TABLE;
            self.out.write_size(table.len())?;
            for (r, formal) in table {
                self.write_instance(r, formal)?;
            }
        }
        self.out.rewrite_u8(flags, flags_pos);
        Ok(())
    }

    pub(super) fn mark_optional_members(&mut self) {
        if let Some(frame) = self.current.frames.last_mut() {
            frame.flags |= FLAG_HAS_OPTIONAL_MEMBERS;
        }
    }
}
