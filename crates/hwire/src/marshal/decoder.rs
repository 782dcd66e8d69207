// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value decoder.
//!
//! Class instances are decoded into an [`ObjectGraph`] arena: a slot is
//! reserved when an instance starts so that back-references (including
//! cycles) resolve to it, and references to indirection-table entries are
//! held as placeholders until the slice's table has been read. Formal type
//! checks run once the outermost read completes and every slot is filled.

use super::hooks::ValueHooks;
use super::optional::OptionalScope;
use super::slices::{no_frame, EncapsReader, ReadFrame, SliceType};
use crate::config::{
    CodecConfig, EncodingVersion, CLASS_INLINE, CLASS_NULL, FLAG_HAS_INDIRECTION_TABLE,
    FLAG_HAS_OPTIONAL_MEMBERS, FLAG_HAS_SLICE_SIZE, FLAG_HAS_TYPE_ID_COMPACT,
    FLAG_HAS_TYPE_ID_INDEX, FLAG_HAS_TYPE_ID_STRING, FLAG_IS_LAST_SLICE, FLAG_TYPE_ID_MASK,
    OPTIONAL_END_MARKER,
};
use crate::error::{Error, Result};
use crate::stream::InputStream;
use crate::types::{
    DataMember, EnumDescriptor, PrimitiveKind, StructDescriptor, TypeDescriptor, TypeId,
    TypeRegistry,
};
use crate::value::proxy::read_proxy;
use crate::value::{ClassInstance, Members, ObjectGraph, ObjectRef, SliceInfo, SlicedData, Value};

/// Decoder for one message.
///
/// # Example
///
/// ```
/// use hwire::{Decoder, TypeId, TypeRegistry, Value};
///
/// let registry = TypeRegistry::new();
/// let bytes = [10, 0, 0, 0, 1, 1, 7, 0, 0, 0];
/// let mut decoder = Decoder::new(&registry, &bytes).unwrap();
/// decoder.start_encapsulation().unwrap();
/// assert_eq!(decoder.read(TypeId::INT).unwrap(), Value::Int(7));
/// decoder.end_encapsulation().unwrap();
/// let graph = decoder.finish().unwrap();
/// assert!(graph.is_empty());
/// ```
pub struct Decoder<'a> {
    pub(super) registry: &'a TypeRegistry,
    pub(super) config: CodecConfig,
    pub(super) hooks: Option<&'a dyn ValueHooks>,
    pub(super) input: InputStream<'a>,
    pub(super) graph: ObjectGraph,
    pub(super) current: EncapsReader,
    pub(super) outer: Vec<EncapsReader>,
    pub(super) depth: usize,
    /// References to check against their formal type once decoding completes.
    pub(super) pending_checks: Vec<(ObjectRef, TypeId)>,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a TypeRegistry, bytes: &'a [u8]) -> Result<Self> {
        Self::with_config(registry, bytes, CodecConfig::default())
    }

    pub fn with_config(
        registry: &'a TypeRegistry,
        bytes: &'a [u8],
        config: CodecConfig,
    ) -> Result<Self> {
        if bytes.len() > config.message_size_max {
            return Err(Error::MessageTooLarge {
                size: bytes.len(),
                max: config.message_size_max,
            });
        }
        Ok(Self {
            registry,
            config,
            hooks: None,
            input: InputStream::new(bytes),
            graph: ObjectGraph::new(),
            current: EncapsReader::new(),
            outer: Vec::new(),
            depth: 0,
            pending_checks: Vec::new(),
        })
    }

    pub fn with_hooks(mut self, hooks: &'a dyn ValueHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn pos(&self) -> usize {
        self.input.pos()
    }

    /// Instances decoded so far.
    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn start_encapsulation(&mut self) -> Result<EncodingVersion> {
        let encoding = self.input.start_encapsulation()?;
        self.outer.push(std::mem::take(&mut self.current));
        Ok(encoding)
    }

    /// Leave the encapsulation; unknown trailing optional parameters are skipped.
    pub fn end_encapsulation(&mut self) -> Result<()> {
        let outer = self
            .outer
            .pop()
            .ok_or_else(|| Error::Marshal("end_encapsulation without start".into()))?;
        if self.input.encoding().supports_optionals() {
            self.skip_optionals()?;
        }
        self.input.end_encapsulation()?;
        self.current = outer;
        Ok(())
    }

    /// Decode a value of type `ty`.
    pub fn read(&mut self, ty: TypeId) -> Result<Value> {
        let value = self.read_value(ty)?;
        self.flush_checks()?;
        Ok(value)
    }

    /// Check that the whole input was consumed and hand over the graph.
    pub fn finish(self) -> Result<ObjectGraph> {
        if !self.outer.is_empty() {
            return Err(self.input.malformed("encapsulation not closed"));
        }
        if !self.input.is_at_end() {
            return Err(self.input.malformed(format!(
                "{} trailing bytes",
                self.input.remaining()
            )));
        }
        Ok(self.graph)
    }

    // ===================================================================
    // Plain values
    // ===================================================================

    pub(super) fn read_value(&mut self, ty: TypeId) -> Result<Value> {
        let registry = self.registry;
        match registry.lookup(ty)? {
            TypeDescriptor::Primitive(kind) => self.read_primitive(*kind),
            TypeDescriptor::Enum(desc) => self.read_enum(desc),
            TypeDescriptor::Struct(desc) => self.read_struct(desc).map(Value::Struct),
            TypeDescriptor::Sequence(desc) => {
                let count = self.read_count(registry.min_wire_size(desc.element))?;
                let mut items = Vec::with_capacity(count.min(self.input.remaining()));
                for _ in 0..count {
                    items.push(self.read_value(desc.element)?);
                }
                Ok(Value::Sequence(items))
            }
            TypeDescriptor::Dictionary(desc) => {
                let min = registry.min_wire_size(desc.key) + registry.min_wire_size(desc.value);
                let count = self.read_count(min)?;
                let mut entries = Vec::with_capacity(count.min(self.input.remaining()));
                for _ in 0..count {
                    let key = self.read_value(desc.key)?;
                    let value = self.read_value(desc.value)?;
                    entries.push((key, value));
                }
                Ok(Value::Dictionary(entries))
            }
            TypeDescriptor::Class(_) => self.read_class(ty).map(Value::Class),
            TypeDescriptor::Proxy(_) => read_proxy(&mut self.input).map(Value::Proxy),
            TypeDescriptor::Exception(desc) => Err(Error::validation(
                &desc.name,
                "exceptions cannot be decoded as values",
            )),
        }
    }

    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Value> {
        let input = &mut self.input;
        Ok(match kind {
            PrimitiveKind::Bool => Value::Bool(input.read_bool()?),
            PrimitiveKind::Byte => Value::Byte(input.read_u8()?),
            PrimitiveKind::Short => Value::Short(input.read_i16()?),
            PrimitiveKind::Int => Value::Int(input.read_i32()?),
            PrimitiveKind::Long => Value::Long(input.read_i64()?),
            PrimitiveKind::Float => Value::Float(input.read_f32()?),
            PrimitiveKind::Double => Value::Double(input.read_f64()?),
            PrimitiveKind::String => Value::String(input.read_string()?),
        })
    }

    fn read_enum(&mut self, desc: &EnumDescriptor) -> Result<Value> {
        let value = if self.input.encoding() == EncodingVersion::V1_0 {
            match desc.fixed_width() {
                1 => i32::from(self.input.read_u8()?),
                2 => i32::from(self.input.read_i16()?),
                _ => self.input.read_i32()?,
            }
        } else {
            let size = self.input.read_size()?;
            i32::try_from(size)
                .map_err(|_| self.input.malformed(format!("enumerator {} overflows", size)))?
        };
        if !desc.contains(value) {
            return Err(self.input.malformed(format!(
                "{} is not an enumerator of '{}'",
                value, desc.name
            )));
        }
        Ok(Value::Enum(value))
    }

    fn read_struct(&mut self, desc: &StructDescriptor) -> Result<Members> {
        let mut members = Members::new();
        for member in &desc.members {
            let value = self.read_value(member.ty)?;
            members.insert(member.name.as_str(), Some(value));
        }
        if !desc.optional_members.is_empty() && self.input.encoding().supports_optionals() {
            self.read_optional_members(
                &desc.optional_members,
                &mut members,
                OptionalScope::Struct,
            )?;
            self.skip_optionals_to_marker()?;
        }
        Ok(members)
    }

    /// Element count, bounded by what the remaining input can hold.
    fn read_count(&mut self, min_elem_size: usize) -> Result<usize> {
        if min_elem_size > 0 {
            return self.input.read_and_check_seq_size(min_elem_size);
        }
        let count = self.input.read_size()?;
        if count > self.config.message_size_max {
            return Err(self.input.malformed(format!(
                "{} empty elements exceed the message size limit",
                count
            )));
        }
        Ok(count)
    }

    // ===================================================================
    // Class instances
    // ===================================================================

    pub(super) fn read_class(&mut self, formal: TypeId) -> Result<Option<ObjectRef>> {
        if !self.input.encoding().supports_optionals() {
            return Err(Error::UnsupportedEncoding(self.input.encoding()));
        }
        let index = self.input.read_size()?;
        if index == CLASS_NULL {
            return Ok(None);
        }
        if let Some(frame) = self.current.frames.last_mut() {
            if frame.flags & FLAG_HAS_INDIRECTION_TABLE != 0 {
                frame.indirect_patches.push((index - 1, formal));
                return Ok(Some(ObjectRef::indirect(index - 1)));
            }
        }
        let r = self.read_instance(index, formal)?;
        if formal != TypeId::OBJECT {
            self.pending_checks.push((r, formal));
        }
        Ok(Some(r))
    }

    /// Resolve an instance id, decoding the instance when it is inline.
    fn read_instance(&mut self, index: usize, formal: TypeId) -> Result<ObjectRef> {
        if index > CLASS_INLINE {
            return self.current.unmarshaled.get(&index).copied().ok_or_else(|| {
                self.input
                    .malformed(format!("reference to unknown instance id {}", index))
            });
        }
        if self.depth >= self.config.class_graph_depth_max {
            return Err(Error::DepthExceeded {
                max: self.config.class_graph_depth_max,
            });
        }

        let id = self.current.next_instance_id();
        let slot = self.graph.reserve("");
        self.current.unmarshaled.insert(id, slot);

        self.depth += 1;
        self.current.frames.push(ReadFrame::new(SliceType::Value));
        let result = self.read_instance_body(formal);
        self.current.frames.pop();
        self.depth -= 1;

        let mut instance = result?;
        if let Some(hooks) = self.hooks {
            hooks.post_unmarshal(&mut instance).map_err(Error::Hook)?;
        }
        self.graph.replace(slot, instance);
        Ok(slot)
    }

    fn read_instance_body(&mut self, formal: TypeId) -> Result<ClassInstance> {
        let registry = self.registry;
        self.start_slice()?;

        if formal != TypeId::OBJECT && registry.class(formal)?.interface_by_value {
            let frame = self.current.current_frame()?;
            let type_id = match frame.compact_id {
                Some(compact) => registry
                    .class_by_compact_id(compact)
                    .map(|id| registry.name_of(id).to_string())
                    .unwrap_or_else(|| frame.display_type_id()),
                None => frame.type_id.clone(),
            };
            let mut members = Members::new();
            self.end_slice(&mut members)?;
            self.expect_last_slice(&type_id)?;
            return Ok(ClassInstance::new(type_id));
        }

        let most_derived = self.current.current_frame()?.display_type_id();
        let known = loop {
            let frame = self.current.current_frame()?;
            let candidate = match frame.compact_id {
                Some(compact) => registry.class_by_compact_id(compact),
                None => registry.class_by_name(&frame.type_id),
            };
            if let Some(id) = candidate {
                registry.class(id)?;
                break Some(id);
            }

            let type_id = frame.display_type_id();
            let last = frame.flags & FLAG_IS_LAST_SLICE != 0;
            if !self.config.slice_values {
                return Err(Error::NoValueFactory {
                    type_id,
                    reason: "no class registered and slicing is disabled".into(),
                });
            }
            self.skip_slice(&type_id)?;
            if last {
                break None;
            }
            self.start_slice()?;
        };

        let (mut instance, preserve) = match known {
            Some(class_id) => {
                let members = self.read_known_slices(class_id)?;
                let instance = ClassInstance::new(registry.name_of(class_id)).with_members(members);
                (instance, self.preserves_slices(class_id)?)
            }
            None => {
                log::debug!(
                    "[marshal] no class for '{}', keeping it as opaque slices",
                    most_derived
                );
                (ClassInstance::new(most_derived.as_str()), true)
            }
        };
        instance.sliced_data = self.take_sliced(preserve, &most_derived)?;
        Ok(instance)
    }

    /// Read the slices of a registered class, most-derived first.
    fn read_known_slices(&mut self, class_id: TypeId) -> Result<Members> {
        let registry = self.registry;
        let chain = registry.class_chain(class_id)?;
        let mut members = Members::new();
        for (i, id) in chain.iter().enumerate() {
            let class = registry.class(*id)?;
            if i > 0 {
                if self.current.current_frame()?.flags & FLAG_IS_LAST_SLICE != 0 {
                    return Err(self.input.malformed(format!(
                        "slices of '{}' end before base '{}'",
                        registry.name_of(class_id),
                        class.name
                    )));
                }
                self.start_slice()?;
                let frame = self.current.current_frame()?;
                if !frame.type_id.is_empty() && frame.type_id != class.name {
                    let found = frame.type_id.clone();
                    return Err(self.input.malformed(format!(
                        "expected slice '{}', found '{}'",
                        class.name, found
                    )));
                }
            }
            self.read_slice_members(&class.members, &class.optional_members, &mut members)?;
            self.end_slice(&mut members)?;
        }
        self.expect_last_slice(registry.name_of(class_id))?;
        Ok(members)
    }

    pub(super) fn read_slice_members(
        &mut self,
        required: &[DataMember],
        optional: &[DataMember],
        members: &mut Members,
    ) -> Result<()> {
        for member in required {
            let value = self.read_value(member.ty)?;
            members.insert(member.name.as_str(), Some(value));
        }
        self.read_optional_members(optional, members, OptionalScope::Slice)
    }

    fn preserves_slices(&self, class_id: TypeId) -> Result<bool> {
        let registry = self.registry;
        for id in registry.class_chain(class_id)? {
            if registry.class(id)?.preserve_slices {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub(super) fn expect_last_slice(&mut self, type_id: &str) -> Result<()> {
        if self.current.current_frame()?.flags & FLAG_IS_LAST_SLICE == 0 {
            return Err(self.input.malformed(format!(
                "'{}' is followed by slices outside its hierarchy",
                type_id
            )));
        }
        Ok(())
    }

    /// Hand over the slices skipped for the current instance or exception.
    pub(super) fn take_sliced(
        &mut self,
        preserve: bool,
        most_derived: &str,
    ) -> Result<Option<SlicedData>> {
        let slices = std::mem::take(&mut self.current.current_frame()?.slices);
        if slices.is_empty() {
            return Ok(None);
        }
        if preserve {
            return Ok(Some(SlicedData::new(slices)));
        }
        log::warn!(
            "[marshal] '{}': dropped {} unknown slice(s), type does not preserve slices",
            most_derived,
            slices.len()
        );
        Ok(None)
    }

    /// Fail on the first decoded reference whose instance is not a subtype
    /// of the declared type.
    pub(super) fn flush_checks(&mut self) -> Result<()> {
        let registry = self.registry;
        for (r, formal) in std::mem::take(&mut self.pending_checks) {
            if registry.class(formal).is_ok_and(|class| class.interface_by_value) {
                continue;
            }
            let Some(instance) = self.graph.get(r) else {
                continue;
            };
            let matches = registry
                .class_by_name(&instance.type_id)
                .is_some_and(|actual| registry.is_a(actual, formal));
            if !matches {
                return Err(Error::UnexpectedObject {
                    expected: registry.name_of(formal).to_string(),
                    actual: instance.type_id.clone(),
                });
            }
        }
        Ok(())
    }

    // ===================================================================
    // Slices
    // ===================================================================

    pub(super) fn start_slice(&mut self) -> Result<()> {
        let input = &mut self.input;
        let EncapsReader { frames, type_ids, .. } = &mut self.current;
        let frame = frames.last_mut().ok_or_else(no_frame)?;

        let flags = input.read_u8()?;
        frame.flags = flags;
        frame.compact_id = None;
        match frame.slice_type {
            SliceType::Value => match flags & FLAG_TYPE_ID_MASK {
                FLAG_HAS_TYPE_ID_COMPACT => {
                    frame.type_id.clear();
                    let compact = input.read_size()?;
                    let compact = i32::try_from(compact)
                        .map_err(|_| input.malformed(format!("compact id {} overflows", compact)))?;
                    frame.compact_id = Some(compact);
                }
                FLAG_HAS_TYPE_ID_STRING => {
                    let type_id = input.read_string()?;
                    type_ids.push(type_id.clone());
                    frame.type_id = type_id;
                }
                FLAG_HAS_TYPE_ID_INDEX => {
                    let index = input.read_size()?;
                    frame.type_id = index
                        .checked_sub(1)
                        .and_then(|i| type_ids.get(i))
                        .cloned()
                        .ok_or_else(|| {
                            input.malformed(format!("unknown type id index {}", index))
                        })?;
                }
                _ => frame.type_id.clear(),
            },
            SliceType::Exception => frame.type_id = input.read_string()?,
        }

        frame.slice_end = None;
        if flags & FLAG_HAS_SLICE_SIZE != 0 {
            let size = input.read_i32()?;
            // the size counts its own four bytes
            let body = usize::try_from(size)
                .ok()
                .and_then(|s| s.checked_sub(4))
                .ok_or_else(|| input.malformed(format!("invalid slice size {}", size)))?;
            if body > input.remaining() {
                return Err(input.malformed(format!(
                    "slice of {} bytes exceeds the {} remaining",
                    body,
                    input.remaining()
                )));
            }
            frame.slice_end = Some(input.pos() + body);
        }
        Ok(())
    }

    /// Finish a slice read against the registry: trailing optionals, then
    /// the indirection table, whose entries replace the placeholders in
    /// `members`.
    pub(super) fn end_slice(&mut self, members: &mut Members) -> Result<()> {
        let frame = self.current.current_frame()?;
        let flags = frame.flags;
        let slice_end = frame.slice_end;
        if flags & FLAG_HAS_OPTIONAL_MEMBERS != 0 {
            self.skip_optionals_to_marker()?;
        }
        if let Some(end) = slice_end {
            if self.input.pos() != end {
                return Err(self.input.malformed(format!(
                    "slice ends at offset {} but its members ended at {}",
                    end,
                    self.input.pos()
                )));
            }
        }
        if flags & FLAG_HAS_INDIRECTION_TABLE == 0 {
            return Ok(());
        }

        let patches = std::mem::take(&mut self.current.current_frame()?.indirect_patches);
        if patches.is_empty() && flags & FLAG_HAS_OPTIONAL_MEMBERS == 0 {
            return Err(self.input.malformed("indirection table without references"));
        }
        let table = self.read_indirection_table(&patches)?;
        let offset = self.input.pos();
        members.for_each_ref_mut(&mut |r: &mut ObjectRef| {
            if let Some(index) = r.indirect_index() {
                *r = *table.get(index).ok_or_else(|| {
                    Error::malformed(
                        offset,
                        format!("indirection index {} out of range", index + 1),
                    )
                })?;
            }
            Ok(())
        })
    }

    /// Read a table of instance references. `patches` supplies the formal
    /// type of the entries referenced from the slice.
    fn read_indirection_table(&mut self, patches: &[(usize, TypeId)]) -> Result<Vec<ObjectRef>> {
        let count = self.input.read_and_check_seq_size(1)?;
        if count == 0 {
            return Err(self.input.malformed("empty indirection table"));
        }
        // First reference to an entry decides the formal type it is read as.
        let mut formals: Vec<Option<TypeId>> = vec![None; count];
        for (entry, formal) in patches {
            if let Some(slot @ None) = formals.get_mut(*entry) {
                *slot = Some(*formal);
            }
        }
        let mut table = Vec::with_capacity(count);
        for formal in formals {
            let index = self.input.read_size()?;
            if index == CLASS_NULL {
                return Err(self.input.malformed("null entry in indirection table"));
            }
            table.push(self.read_instance(index, formal.unwrap_or(TypeId::OBJECT))?);
        }
        for (index, formal) in patches {
            let r = *table.get(*index).ok_or_else(|| {
                self.input
                    .malformed(format!("indirection index {} out of range", index + 1))
            })?;
            if *formal != TypeId::OBJECT {
                self.pending_checks.push((r, *formal));
            }
        }
        Ok(table)
    }

    /// Skip a slice of an unknown type, keeping its bytes and instances.
    pub(super) fn skip_slice(&mut self, type_id: &str) -> Result<()> {
        let frame = self.current.current_frame()?;
        let Some(end) = frame.slice_end else {
            return Err(match frame.slice_type {
                SliceType::Value => Error::NoValueFactory {
                    type_id: type_id.to_string(),
                    reason: "compact format prevents slicing \
                             (the sender should use the sliced format)"
                        .into(),
                },
                SliceType::Exception => Error::UnknownUserException {
                    type_id: type_id.to_string(),
                },
            });
        };
        let flags = frame.flags;
        let slice_type_id = frame.type_id.clone();
        let compact_id = frame.compact_id;

        let start = self.input.pos();
        let mut bytes = &self.input.buffer()[start..end];
        self.input.skip(end - start)?;
        let has_optional_members = flags & FLAG_HAS_OPTIONAL_MEMBERS != 0;
        if has_optional_members {
            // the end marker is written again on re-encode
            match bytes.split_last() {
                Some((&OPTIONAL_END_MARKER, rest)) => bytes = rest,
                _ => {
                    return Err(self.input.malformed(format!(
                        "slice '{}' has optional members but no end marker",
                        type_id
                    )))
                }
            }
        }
        log::debug!("[marshal] skipped slice '{}' ({} bytes)", type_id, bytes.len());

        let instances = if flags & FLAG_HAS_INDIRECTION_TABLE != 0 {
            self.read_indirection_table(&[])?
        } else {
            Vec::new()
        };
        let info = SliceInfo {
            type_id: slice_type_id,
            compact_id,
            bytes: bytes.to_vec(),
            instances,
            has_optional_members,
            is_last_slice: flags & FLAG_IS_LAST_SLICE != 0,
        };
        self.current.current_frame()?.slices.push(info);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::Encoder;
    use crate::types::{ClassDef, EnumDef, StructDef};

    #[test]
    fn test_read_primitives() {
        let registry = TypeRegistry::new();
        let bytes = [1, 0xFE, 0xFF, 2, b'o', b'k'];
        let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
        assert_eq!(decoder.read(TypeId::BOOL).expect("bool"), Value::Bool(true));
        assert_eq!(decoder.read(TypeId::SHORT).expect("short"), Value::Short(-2));
        assert_eq!(decoder.read(TypeId::STRING).expect("string"), Value::from("ok"));
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let registry = TypeRegistry::new();
        let bytes = [1, 2];
        let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
        decoder.read(TypeId::BYTE).expect("byte");
        assert!(matches!(decoder.finish(), Err(Error::MalformedData { offset: 1, .. })));
    }

    #[test]
    fn test_unknown_enumerator_is_malformed() {
        let mut registry = TypeRegistry::new();
        let color = registry
            .define_enum(EnumDef::new("::Demo::Color").enumerator("red"))
            .expect("enum");
        let bytes = [3];
        let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
        assert!(matches!(decoder.read(color), Err(Error::MalformedData { .. })));
    }

    #[test]
    fn test_cycle_resolves_to_same_slot() {
        let mut registry = TypeRegistry::new();
        let node = registry.declare_class("::Demo::Node").expect("declare");
        registry
            .define_class(ClassDef::new("::Demo::Node").member("next", node))
            .expect("define");
        let mut graph = ObjectGraph::new();
        let r = graph.insert(ClassInstance::new("::Demo::Node"));
        graph.get_mut(r).expect("node").members.set("next", r);

        let mut encoder = Encoder::new(&registry, &graph);
        encoder.write(node, &Value::from(r)).expect("write");
        let bytes = encoder.finish().expect("finish");

        let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
        let value = decoder.read(node).expect("read");
        let decoded = decoder.finish().expect("finish");
        let root = value.as_object().expect("instance");
        let next = decoded
            .get(root)
            .and_then(|instance| instance.members.get("next"))
            .and_then(Value::as_object);
        assert_eq!(next, Some(root));
    }

    #[test]
    fn test_back_reference_to_unknown_id() {
        let mut registry = TypeRegistry::new();
        let node = registry.define_class(ClassDef::new("::Demo::Node")).expect("class");
        let bytes = [5];
        let mut decoder = Decoder::new(&registry, &bytes).expect("decoder");
        assert!(matches!(decoder.read(node), Err(Error::MalformedData { .. })));
    }

    #[test]
    fn test_depth_limit_on_decode() {
        let mut registry = TypeRegistry::new();
        let node = registry.declare_class("::Chain").expect("declare");
        registry
            .define_class(ClassDef::new("::Chain").member("next", node))
            .expect("class");
        let mut graph = ObjectGraph::new();
        let mut next = Value::Class(None);
        for _ in 0..8 {
            next = Value::from(graph.insert(ClassInstance::new("::Chain").with("next", next)));
        }
        let mut encoder = Encoder::new(&registry, &graph);
        encoder.write(node, &next).expect("write");
        let bytes = encoder.finish().expect("finish");

        let config = CodecConfig::default().with_class_graph_depth_max(4);
        let mut decoder = Decoder::with_config(&registry, &bytes, config).expect("decoder");
        assert!(matches!(decoder.read(node), Err(Error::DepthExceeded { max: 4 })));
    }

    #[test]
    fn test_struct_optional_section_requires_marker() {
        let mut registry = TypeRegistry::new();
        let opt = registry
            .define_struct(
                StructDef::new("::Demo::Opt")
                    .member("a", TypeId::BYTE)
                    .optional_member("b", TypeId::BYTE, 1),
            )
            .expect("struct");
        let good = [7, 0x08, 1, OPTIONAL_END_MARKER];
        let mut decoder = Decoder::new(&registry, &good).expect("decoder");
        let value = decoder.read(opt).expect("read");
        let members = value.as_members().expect("members");
        assert_eq!(members.get("b"), Some(&Value::Byte(1)));

        let truncated = [7, 0x08, 1];
        let mut decoder = Decoder::new(&registry, &truncated).expect("decoder");
        assert!(matches!(decoder.read(opt), Err(Error::MalformedData { .. })));
    }

    #[test]
    fn test_message_size_limit() {
        let registry = TypeRegistry::new();
        let bytes = vec![0u8; 64];
        let config = CodecConfig::default().with_message_size_max(32);
        assert!(matches!(
            Decoder::with_config(&registry, &bytes, config),
            Err(Error::MessageTooLarge { size: 64, max: 32 })
        ));
    }
}
