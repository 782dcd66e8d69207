// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagged optional framing formats.
//!
//! An optional header is one byte `(tag << 3) | format` for tags below 30.
//! Larger tags set the tag bits to 30 and follow the header byte with the tag
//! as a size field.

use std::fmt;

/// How a reader finds the end of an optional payload without knowing its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionalFormat {
    /// 1 byte.
    F1 = 0,
    /// 2 bytes.
    F2 = 1,
    /// 4 bytes.
    F4 = 2,
    /// 8 bytes.
    F8 = 3,
    /// One size field.
    Size = 4,
    /// Size field giving the payload length, or the payload's own size prefix.
    VSize = 5,
    /// 4-byte length followed by the payload.
    FSize = 6,
    /// A class value.
    Class = 7,
}

impl OptionalFormat {
    pub fn from_bits(bits: u8) -> OptionalFormat {
        match bits & 0x07 {
            0 => OptionalFormat::F1,
            1 => OptionalFormat::F2,
            2 => OptionalFormat::F4,
            3 => OptionalFormat::F8,
            4 => OptionalFormat::Size,
            5 => OptionalFormat::VSize,
            6 => OptionalFormat::FSize,
            _ => OptionalFormat::Class,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Payload width for the fixed formats.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            OptionalFormat::F1 => Some(1),
            OptionalFormat::F2 => Some(2),
            OptionalFormat::F4 => Some(4),
            OptionalFormat::F8 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for OptionalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionalFormat::F1 => "F1",
            OptionalFormat::F2 => "F2",
            OptionalFormat::F4 => "F4",
            OptionalFormat::F8 => "F8",
            OptionalFormat::Size => "Size",
            OptionalFormat::VSize => "VSize",
            OptionalFormat::FSize => "FSize",
            OptionalFormat::Class => "Class",
        };
        f.write_str(name)
    }
}

/// A decoded optional header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalHeader {
    pub tag: usize,
    pub format: OptionalFormat,
}
