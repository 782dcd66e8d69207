// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable write side of the wire format.

use super::optional::OptionalFormat;
use crate::config::{
    EncodingVersion, ENCAPS_HEADER_SIZE, OPTIONAL_TAG_ESCAPE, SIZE_INLINE_MAX, SIZE_SENTINEL,
};
use crate::error::{Error, Result};

/// Generate little-endian write methods for fixed-width primitives.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

#[derive(Debug, Clone, Copy)]
struct EncapsFrame {
    start: usize,
    encoding: EncodingVersion,
}

/// Byte buffer writer with size back-patching and encapsulation framing.
#[derive(Debug, Default)]
pub struct OutputStream {
    buffer: Vec<u8>,
    encaps: Vec<EncapsFrame>,
}

impl OutputStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            encaps: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Encoding of the innermost open encapsulation (1.1 outside any).
    pub fn encoding(&self) -> EncodingVersion {
        self.encaps
            .last()
            .map_or(EncodingVersion::V1_1, |frame| frame.encoding)
    }

    pub fn encaps_depth(&self) -> usize {
        self.encaps.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    impl_write_le!(write_i16, i16);
    impl_write_le!(write_i32, i32);
    impl_write_le!(write_i64, i64);
    impl_write_le!(write_f32, f32);
    impl_write_le!(write_f64, f64);

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write a size: one byte up to 254, else `0xFF` + i32.
    pub fn write_size(&mut self, size: usize) -> Result<()> {
        if size <= SIZE_INLINE_MAX {
            self.buffer.push(size as u8);
            return Ok(());
        }
        let value = i32::try_from(size)
            .map_err(|_| Error::Marshal(format!("size {} does not fit the wire format", size)))?;
        self.buffer.push(SIZE_SENTINEL);
        self.write_i32(value);
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_size(value.len())?;
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn write_string_seq(&mut self, values: &[String]) -> Result<()> {
        self.write_size(values.len())?;
        for value in values {
            self.write_string(value)?;
        }
        Ok(())
    }

    /// Reserve a 4-byte length placeholder; pass the result to [`Self::end_size`].
    pub fn start_size(&mut self) -> usize {
        let pos = self.buffer.len();
        self.write_i32(0);
        pos
    }

    /// Back-patch the placeholder at `pos` with the bytes written after it.
    pub fn end_size(&mut self, pos: usize) -> Result<()> {
        let written = self.buffer.len() - pos - 4;
        let value = i32::try_from(written)
            .map_err(|_| Error::Marshal(format!("framed payload of {} bytes too large", written)))?;
        self.rewrite_i32(value, pos);
        Ok(())
    }

    pub fn rewrite_i32(&mut self, value: i32, pos: usize) {
        self.buffer[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn rewrite_u8(&mut self, value: u8, pos: usize) {
        self.buffer[pos] = value;
    }

    /// Write an optional header byte (plus escaped tag).
    pub fn write_optional_header(&mut self, tag: usize, format: OptionalFormat) -> Result<()> {
        let escape = usize::from(OPTIONAL_TAG_ESCAPE);
        if tag < escape {
            self.write_u8(((tag as u8) << 3) | format.bits());
        } else {
            self.write_u8((OPTIONAL_TAG_ESCAPE << 3) | format.bits());
            self.write_size(tag)?;
        }
        Ok(())
    }

    /// Open an encapsulation: placeholder size, then the encoding version.
    pub fn start_encapsulation(&mut self, encoding: EncodingVersion) -> Result<()> {
        if !encoding.is_supported() {
            return Err(Error::UnsupportedEncoding(encoding));
        }
        let start = self.buffer.len();
        self.write_i32(0);
        self.write_u8(encoding.major);
        self.write_u8(encoding.minor);
        self.encaps.push(EncapsFrame { start, encoding });
        Ok(())
    }

    /// Close the innermost encapsulation and patch its size (header included).
    pub fn end_encapsulation(&mut self) -> Result<()> {
        let frame = self
            .encaps
            .pop()
            .ok_or_else(|| Error::Marshal("end_encapsulation without start".into()))?;
        let size = self.buffer.len() - frame.start;
        debug_assert!(size >= ENCAPS_HEADER_SIZE);
        let value = i32::try_from(size)
            .map_err(|_| Error::Marshal(format!("encapsulation of {} bytes too large", size)))?;
        self.rewrite_i32(value, frame.start);
        log::trace!(
            "[stream] encapsulation closed: {} bytes, encoding {}",
            size,
            frame.encoding
        );
        Ok(())
    }

    /// Write a complete encapsulation around opaque bytes.
    pub fn write_encapsulation(&mut self, encoding: EncodingVersion, payload: &[u8]) -> Result<()> {
        let size = payload.len() + ENCAPS_HEADER_SIZE;
        let value = i32::try_from(size)
            .map_err(|_| Error::Marshal(format!("encapsulation of {} bytes too large", size)))?;
        self.write_i32(value);
        self.write_u8(encoding.major);
        self.write_u8(encoding.minor);
        self.write_bytes(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_boundaries() {
        let mut out = OutputStream::new();
        out.write_size(254).expect("size 254");
        assert_eq!(out.as_bytes(), &[254]);

        let mut out = OutputStream::new();
        out.write_size(255).expect("size 255");
        assert_eq!(out.as_bytes(), &[0xFF, 255, 0, 0, 0]);

        let mut out = OutputStream::new();
        out.write_size(256).expect("size 256");
        assert_eq!(out.as_bytes(), &[0xFF, 0, 1, 0, 0]);
    }

    #[test]
    fn test_start_end_size_backpatch() {
        let mut out = OutputStream::new();
        out.write_u8(9);
        let pos = out.start_size();
        out.write_i64(-1);
        out.write_u8(3);
        out.end_size(pos).expect("end_size");
        assert_eq!(&out.as_bytes()[1..5], &9i32.to_le_bytes());
        assert_eq!(out.len(), 1 + 4 + 9);
    }

    #[test]
    fn test_optional_header_escape() {
        let mut out = OutputStream::new();
        out.write_optional_header(3, OptionalFormat::F4).expect("tag 3");
        assert_eq!(out.as_bytes(), &[(3 << 3) | 2]);

        let mut out = OutputStream::new();
        out.write_optional_header(300, OptionalFormat::Class).expect("tag 300");
        assert_eq!(out.as_bytes(), &[0xF7, 0xFF, 44, 1, 0, 0]);
    }

    #[test]
    fn test_encapsulation_size_includes_header() {
        let mut out = OutputStream::new();
        out.start_encapsulation(EncodingVersion::V1_1).expect("start");
        out.write_i32(7);
        out.end_encapsulation().expect("end");
        assert_eq!(out.as_bytes(), &[10, 0, 0, 0, 1, 1, 7, 0, 0, 0]);
        assert!(out.end_encapsulation().is_err());
    }

    #[test]
    fn test_little_endian_primitives() {
        let mut out = OutputStream::new();
        out.write_i16(0x0102);
        out.write_f32(1.0);
        out.write_bool(true);
        assert_eq!(out.as_bytes(), &[0x02, 0x01, 0x00, 0x00, 0x80, 0x3F, 0x01]);
    }
}
