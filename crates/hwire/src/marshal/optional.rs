// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagged optional members.
//!
//! Each optional is a header (`tag << 3 | format`) followed by a payload
//! framed so that a reader that does not know the tag can skip it:
//!
//! | format | payload                                     |
//! |--------|---------------------------------------------|
//! | F1..F8 | fixed-size primitive                        |
//! | Size   | enumerator as a size                        |
//! | VSize  | size prefix, then fixed-size elements       |
//! | FSize  | i32 length, then variable-size payload      |
//! | Class  | class reference                             |
//!
//! Optionals are written in ascending tag order and read by skipping any
//! lower unknown tag until the wanted one (or a higher one) is found.

use super::decoder::Decoder;
use super::encoder::Encoder;
use crate::config::{FLAG_HAS_OPTIONAL_MEMBERS, OPTIONAL_END_MARKER, SIZE_INLINE_MAX};
use crate::error::Result;
use crate::stream::OptionalFormat;
use crate::types::{DataMember, TypeDescriptor, TypeId};
use crate::value::{Members, Value};

/// Where an optional section lives; decides end markers and slice flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OptionalScope {
    /// Operation parameters: bounded by the encapsulation.
    Top,
    /// Struct members: terminated by the end marker, no slice flag.
    Struct,
    /// Class or exception slice: flagged on the slice, terminated by the end marker.
    Slice,
}

/// VSize payload length for `count` fixed-size elements of `elem_size` bytes.
pub(crate) fn vsize_payload(count: usize, elem_size: usize) -> usize {
    if count == 0 {
        return 1;
    }
    let prefix = if count > SIZE_INLINE_MAX { 5 } else { 1 };
    count.saturating_mul(elem_size).saturating_add(prefix)
}

// =======================================================================
// Encoding
// =======================================================================

impl<'a> Encoder<'a> {
    /// Write an optional operation parameter; `None` writes nothing.
    pub fn write_optional(&mut self, tag: usize, ty: TypeId, value: Option<&Value>) -> Result<()> {
        match value {
            Some(value) => self.write_optional_value(tag, ty, value, OptionalScope::Top),
            None => Ok(()),
        }
    }

    /// Set members only, in declaration (ascending tag) order.
    pub(super) fn write_optional_members(
        &mut self,
        optional: &[DataMember],
        members: &Members,
        scope: OptionalScope,
    ) -> Result<()> {
        for member in optional {
            if let Some(value) = members.get(&member.name) {
                self.write_optional_value(member.tag, member.ty, value, scope)?;
            }
        }
        Ok(())
    }

    fn write_optional_value(
        &mut self,
        tag: usize,
        ty: TypeId,
        value: &Value,
        scope: OptionalScope,
    ) -> Result<()> {
        // 1.0 has no optionals: the member is simply not sent.
        if !self.out.encoding().supports_optionals() {
            return Ok(());
        }
        let registry = self.registry;
        registry.check_value(ty, value, self.graph)?;
        let format = registry.optional_format(ty);
        self.out.write_optional_header(tag, format)?;
        if scope == OptionalScope::Slice {
            self.mark_optional_members();
        }

        match format {
            OptionalFormat::VSize => match (registry.lookup(ty)?, value) {
                (TypeDescriptor::Struct(desc), _) => {
                    self.out.write_size(desc.wire_size)?;
                }
                (TypeDescriptor::Sequence(desc), Value::Sequence(items)) => {
                    let elem = registry.wire_size(desc.element);
                    if elem > 1 {
                        self.out.write_size(vsize_payload(items.len(), elem))?;
                    }
                }
                (TypeDescriptor::Dictionary(desc), Value::Dictionary(entries)) => {
                    let elem = registry.wire_size(desc.key) + registry.wire_size(desc.value);
                    self.out.write_size(vsize_payload(entries.len(), elem))?;
                }
                // strings carry their own size
                _ => {}
            },
            OptionalFormat::FSize => {
                let pos = self.out.start_size();
                self.write(ty, value)?;
                return self.out.end_size(pos);
            }
            _ => {}
        }
        self.write(ty, value)
    }
}

// =======================================================================
// Decoding
// =======================================================================

impl<'a> Decoder<'a> {
    /// Read an optional operation parameter.
    pub fn read_optional(&mut self, tag: usize, ty: TypeId) -> Result<Option<Value>> {
        let value = self.read_optional_value(tag, ty, OptionalScope::Top)?;
        self.flush_checks()?;
        Ok(value)
    }

    /// Read every declared optional; absent ones are recorded as unset.
    pub(super) fn read_optional_members(
        &mut self,
        optional: &[DataMember],
        members: &mut Members,
        scope: OptionalScope,
    ) -> Result<()> {
        for member in optional {
            let value = self.read_optional_value(member.tag, member.ty, scope)?;
            members.insert(member.name.as_str(), value);
        }
        Ok(())
    }

    fn read_optional_value(
        &mut self,
        tag: usize,
        ty: TypeId,
        scope: OptionalScope,
    ) -> Result<Option<Value>> {
        let registry = self.registry;
        let format = registry.optional_format(ty);
        if !self.find_optional(tag, format, scope)? {
            return Ok(None);
        }

        let value = match format {
            OptionalFormat::VSize => {
                match registry.lookup(ty)? {
                    TypeDescriptor::Struct(_) | TypeDescriptor::Dictionary(_) => {
                        self.input.skip_size()?
                    }
                    TypeDescriptor::Sequence(desc) if registry.wire_size(desc.element) > 1 => {
                        self.input.skip_size()?
                    }
                    _ => {}
                }
                self.read_value(ty)?
            }
            OptionalFormat::FSize => {
                let len = self.input.read_i32()?;
                let len = usize::try_from(len)
                    .map_err(|_| self.input.malformed(format!("negative optional size {}", len)))?;
                if len > self.input.remaining() {
                    return Err(self.input.malformed(format!(
                        "optional tag {} claims {} bytes, {} remain",
                        tag,
                        len,
                        self.input.remaining()
                    )));
                }
                let start = self.input.pos();
                let value = self.read_value(ty)?;
                let consumed = self.input.pos() - start;
                if consumed != len {
                    return Err(self.input.malformed(format!(
                        "optional tag {} framed {} bytes but its value used {}",
                        tag, len, consumed
                    )));
                }
                value
            }
            _ => self.read_value(ty)?,
        };
        Ok(Some(value))
    }

    /// Position the stream on the payload of `tag`, skipping lower unknown
    /// tags. False when the tag is absent.
    fn find_optional(
        &mut self,
        tag: usize,
        expected: OptionalFormat,
        scope: OptionalScope,
    ) -> Result<bool> {
        if !self.input.encoding().supports_optionals() {
            return Ok(false);
        }
        if scope == OptionalScope::Slice {
            let flagged = self
                .current
                .frames
                .last()
                .is_some_and(|frame| frame.flags & FLAG_HAS_OPTIONAL_MEMBERS != 0);
            if !flagged {
                return Ok(false);
            }
        }
        loop {
            let start = self.input.pos();
            let Some(header) = self.input.read_optional_header()? else {
                return Ok(false);
            };
            if header.tag < tag {
                log::trace!("[marshal] skipping unknown optional tag {}", header.tag);
                self.skip_optional(header.format)?;
                continue;
            }
            if header.tag > tag {
                self.input.set_pos(start);
                return Ok(false);
            }
            if header.format != expected {
                return Err(self.input.malformed(format!(
                    "optional tag {} has format {} but {} was expected",
                    tag, header.format, expected
                )));
            }
            return Ok(true);
        }
    }

    pub(super) fn skip_optional(&mut self, format: OptionalFormat) -> Result<()> {
        if format == OptionalFormat::Class {
            self.read_class(TypeId::OBJECT).map(|_| ())
        } else {
            self.input.skip_optional_payload(format)
        }
    }

    /// Skip unknown trailing optional parameters up to the encapsulation end.
    pub(super) fn skip_optionals(&mut self) -> Result<()> {
        while let Some(header) = self.input.read_optional_header()? {
            log::trace!("[marshal] skipping unknown optional tag {}", header.tag);
            self.skip_optional(header.format)?;
        }
        Ok(())
    }

    /// Skip the unknown optionals of a struct or slice, then its end marker.
    pub(super) fn skip_optionals_to_marker(&mut self) -> Result<()> {
        self.skip_optionals()?;
        match self.input.read_u8() {
            Ok(OPTIONAL_END_MARKER) => Ok(()),
            _ => Err(self.input.malformed("missing optional members end marker")),
        }
    }
}
