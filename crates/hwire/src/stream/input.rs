// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked read side of the wire format.
//!
//! Every read validates the remaining length first and fails with
//! [`Error::MalformedData`]; nothing here panics on hostile input.

use super::optional::{OptionalFormat, OptionalHeader};
use crate::config::{
    EncodingVersion, ENCAPS_HEADER_SIZE, OPTIONAL_END_MARKER, OPTIONAL_TAG_ESCAPE, SIZE_SENTINEL,
};
use crate::error::{Error, Result};

/// Generate little-endian read methods for fixed-width primitives.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let bytes = self.read_bytes($size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(<$type>::from_le_bytes(raw))
        }
    };
}

#[derive(Debug, Clone, Copy)]
struct EncapsBound {
    start: usize,
    end: usize,
    encoding: EncodingVersion,
}

/// Running minimum-size estimate for nested sequences.
#[derive(Debug, Clone, Copy)]
struct SeqCheck {
    start: usize,
    min_size: usize,
}

/// Cursor over an immutable byte range.
#[derive(Debug)]
pub struct InputStream<'a> {
    buffer: &'a [u8],
    offset: usize,
    encaps: Vec<EncapsBound>,
    seq_check: Option<SeqCheck>,
}

impl<'a> InputStream<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            encaps: Vec::new(),
            seq_check: None,
        }
    }

    pub fn pos(&self) -> usize {
        self.offset
    }

    /// Rewind (or advance) to an offset previously obtained from [`Self::pos`].
    pub fn set_pos(&mut self, pos: usize) {
        debug_assert!(pos <= self.buffer.len());
        self.offset = pos.min(self.buffer.len());
    }

    /// End of the innermost encapsulation, or of the buffer.
    pub fn limit(&self) -> usize {
        self.encaps.last().map_or(self.buffer.len(), |b| b.end)
    }

    pub fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.offset)
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.limit()
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn encoding(&self) -> EncodingVersion {
        self.encaps
            .last()
            .map_or(EncodingVersion::V1_1, |bound| bound.encoding)
    }

    pub fn encaps_depth(&self) -> usize {
        self.encaps.len()
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.offset, reason)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.malformed(format!(
                "unexpected end of buffer: need {} bytes, {} left",
                len,
                self.remaining()
            )));
        }
        let bytes = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn peek_u8(&self) -> Option<u8> {
        if self.offset < self.limit() {
            Some(self.buffer[self.offset])
        } else {
            None
        }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_i64, i64, 8);
    impl_read_le!(read_f32, f32, 4);
    impl_read_le!(read_f64, f64, 8);

    /// Read a size field; negative values are malformed.
    pub fn read_size(&mut self) -> Result<usize> {
        let first = self.read_u8()?;
        if first != SIZE_SENTINEL {
            return Ok(usize::from(first));
        }
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| self.malformed(format!("negative size {}", value)))
    }

    pub fn skip_size(&mut self) -> Result<()> {
        self.read_size().map(|_| ())
    }

    /// Read a sequence count and check that `count * min_elem_size` bytes
    /// (plus what enclosing sequences still need) fit in the input.
    pub fn read_and_check_seq_size(&mut self, min_elem_size: usize) -> Result<usize> {
        let count = self.read_size()?;
        if count == 0 {
            return Ok(0);
        }

        let needed = count
            .checked_mul(min_elem_size)
            .ok_or_else(|| self.malformed(format!("sequence count {} overflows", count)))?;

        let check = match self.seq_check {
            Some(check) if self.offset <= check.start + check.min_size => SeqCheck {
                start: check.start,
                min_size: check.min_size.saturating_add(needed),
            },
            _ => SeqCheck {
                start: self.offset,
                min_size: needed,
            },
        };
        self.seq_check = Some(check);

        if check.start.saturating_add(check.min_size) > self.limit() {
            return Err(self.malformed(format!(
                "sequence of {} elements cannot fit in {} remaining bytes",
                count,
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_size()?;
        let start = self.offset;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| Error::malformed(start, format!("invalid UTF-8 string: {}", e)))
    }

    pub fn read_string_seq(&mut self) -> Result<Vec<String>> {
        let count = self.read_and_check_seq_size(1)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_string()?);
        }
        Ok(values)
    }

    /// Read the next optional header of the current section.
    ///
    /// Returns `None`, without consuming anything, at the end marker or at the
    /// end of the encapsulation.
    pub fn read_optional_header(&mut self) -> Result<Option<OptionalHeader>> {
        match self.peek_u8() {
            None | Some(OPTIONAL_END_MARKER) => return Ok(None),
            Some(_) => {}
        }
        let value = self.read_u8()?;
        let format = OptionalFormat::from_bits(value);
        let mut tag = usize::from(value >> 3);
        if tag == usize::from(OPTIONAL_TAG_ESCAPE) {
            tag = self.read_size()?;
        }
        Ok(Some(OptionalHeader { tag, format }))
    }

    /// Skip the payload of an optional of any format but `Class`.
    pub fn skip_optional_payload(&mut self, format: OptionalFormat) -> Result<()> {
        if let Some(width) = format.fixed_width() {
            return self.skip(width);
        }
        match format {
            OptionalFormat::Size => self.skip_size(),
            OptionalFormat::VSize => {
                let len = self.read_size()?;
                self.skip(len)
            }
            OptionalFormat::FSize => {
                let len = self.read_i32()?;
                let len = usize::try_from(len)
                    .map_err(|_| self.malformed(format!("negative optional size {}", len)))?;
                self.skip(len)
            }
            _ => Err(self.malformed(format!("cannot skip {} optional here", format))),
        }
    }

    /// Enter an encapsulation; its end becomes the read limit.
    pub fn start_encapsulation(&mut self) -> Result<EncodingVersion> {
        let start = self.offset;
        let size = self.read_i32()?;
        let size = usize::try_from(size)
            .ok()
            .filter(|s| *s >= ENCAPS_HEADER_SIZE)
            .ok_or_else(|| {
                Error::malformed(start, format!("invalid encapsulation size {}", size))
            })?;
        if size - 4 > self.remaining() {
            return Err(Error::malformed(
                start,
                format!("encapsulation of {} bytes exceeds buffer", size),
            ));
        }
        let encoding = EncodingVersion {
            major: self.read_u8()?,
            minor: self.read_u8()?,
        };
        if !encoding.is_supported() {
            return Err(Error::UnsupportedEncoding(encoding));
        }
        self.encaps.push(EncapsBound {
            start,
            end: start + size,
            encoding,
        });
        log::trace!(
            "[stream] encapsulation at {}: {} bytes, encoding {}",
            start,
            size,
            encoding
        );
        Ok(encoding)
    }

    /// Leave the innermost encapsulation; every byte must have been consumed.
    pub fn end_encapsulation(&mut self) -> Result<()> {
        let bound = self
            .encaps
            .last()
            .copied()
            .ok_or_else(|| self.malformed("end_encapsulation without start"))?;
        if self.offset != bound.end {
            return Err(self.malformed(format!(
                "encapsulation at {} ends at {} but decoding stopped at {}",
                bound.start, bound.end, self.offset
            )));
        }
        self.encaps.pop();
        Ok(())
    }

    /// Read a complete encapsulation as opaque bytes.
    pub fn read_encapsulation(&mut self) -> Result<(EncodingVersion, &'a [u8])> {
        let start = self.offset;
        let size = self.read_i32()?;
        let size = usize::try_from(size)
            .ok()
            .filter(|s| *s >= ENCAPS_HEADER_SIZE)
            .ok_or_else(|| {
                Error::malformed(start, format!("invalid encapsulation size {}", size))
            })?;
        let encoding = EncodingVersion {
            major: self.read_u8()?,
            minor: self.read_u8()?,
        };
        let payload = self.read_bytes(size - ENCAPS_HEADER_SIZE)?;
        Ok((encoding, payload))
    }
}
