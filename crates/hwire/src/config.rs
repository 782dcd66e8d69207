// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HWIRE Configuration - Single Source of Truth
//!
//! This module centralizes ALL wire constants and codec configuration.
//! **NEVER hardcode flag bits or markers elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: wire constants (slice flags, markers, sentinels)
//! - **Level 2 (Dynamic)**: [`CodecConfig`] chosen per encoder/decoder instance
//!
//! # Example
//!
//! ```
//! use hwire::config::{CodecConfig, FormatType};
//!
//! let config = CodecConfig::default()
//!     .with_format(FormatType::Sliced)
//!     .with_class_graph_depth_max(32);
//! assert_eq!(config.class_graph_depth_max, 32);
//! ```

use std::fmt;

// =======================================================================
// Size fields
// =======================================================================

/// Largest size encoded on a single byte.
pub const SIZE_INLINE_MAX: usize = 254;

/// First byte of a 5-byte size field (followed by an i32 LE).
pub const SIZE_SENTINEL: u8 = 255;

/// Encapsulation header: i32 size + encoding major + encoding minor.
pub const ENCAPS_HEADER_SIZE: usize = 6;

// =======================================================================
// Tagged optionals
// =======================================================================

/// Terminates the optional section of a slice or struct.
pub const OPTIONAL_END_MARKER: u8 = 0xFF;

/// Tags >= this value are written as an escaped size after the header byte.
pub const OPTIONAL_TAG_ESCAPE: u8 = 30;

// =======================================================================
// Slice flags (first byte of every class/exception slice)
// =======================================================================

pub const FLAG_HAS_TYPE_ID_STRING: u8 = 1 << 0;
pub const FLAG_HAS_TYPE_ID_INDEX: u8 = 1 << 1;
pub const FLAG_HAS_TYPE_ID_COMPACT: u8 = (1 << 1) | (1 << 0);
pub const FLAG_HAS_OPTIONAL_MEMBERS: u8 = 1 << 2;
pub const FLAG_HAS_INDIRECTION_TABLE: u8 = 1 << 3;
pub const FLAG_HAS_SLICE_SIZE: u8 = 1 << 4;
pub const FLAG_IS_LAST_SLICE: u8 = 1 << 5;

/// Mask selecting the type id encoding bits of the slice flags.
pub const FLAG_TYPE_ID_MASK: u8 = FLAG_HAS_TYPE_ID_COMPACT;

// =======================================================================
// Class values
// =======================================================================

/// Size field announcing a null class reference.
pub const CLASS_NULL: usize = 0;

/// Size field announcing an inline class instance.
pub const CLASS_INLINE: usize = 1;

/// Type id of the root of every class hierarchy.
pub const OBJECT_TYPE_ID: &str = "::Ice::Object";

/// Type id of the root of every user exception hierarchy.
pub const USER_EXCEPTION_TYPE_ID: &str = "::Ice::UserException";

// =======================================================================
// Proxies
// =======================================================================

/// Protocol version written in every 1.1 proxy.
pub const PROTOCOL_MAJOR: u8 = 1;
pub const PROTOCOL_MINOR: u8 = 0;

// =======================================================================
// Limits
// =======================================================================

/// Default nesting limit for class instances on decode and encode.
pub const DEFAULT_CLASS_GRAPH_DEPTH_MAX: usize = 100;

/// Default cap on a single encoded or decoded message (1 MiB).
pub const DEFAULT_MESSAGE_SIZE_MAX: usize = 1024 * 1024;

// =======================================================================
// Dynamic configuration
// =======================================================================

/// Encoding version carried by every encapsulation header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingVersion {
    pub major: u8,
    pub minor: u8,
}

impl EncodingVersion {
    pub const V1_0: EncodingVersion = EncodingVersion { major: 1, minor: 0 };
    pub const V1_1: EncodingVersion = EncodingVersion { major: 1, minor: 1 };

    /// Tagged optionals, classes and exceptions need 1.1.
    pub fn supports_optionals(self) -> bool {
        self == Self::V1_1
    }

    pub fn is_supported(self) -> bool {
        self == Self::V1_0 || self == Self::V1_1
    }
}

impl Default for EncodingVersion {
    fn default() -> Self {
        Self::V1_1
    }
}

impl fmt::Display for EncodingVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Class value format.
///
/// `Compact` omits slice sizes and repeats no type ids; a receiver must know
/// the most-derived type. `Sliced` lets receivers skip and preserve unknown
/// slices at the cost of a few bytes per slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatType {
    #[default]
    Compact,
    Sliced,
}

impl std::str::FromStr for FormatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(FormatType::Compact),
            "sliced" => Ok(FormatType::Sliced),
            other => Err(format!("unknown class format '{}'", other)),
        }
    }
}

/// Per-codec configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Encoding written by encoders (decoders read it from the header).
    pub encoding: EncodingVersion,
    /// Class format used by encoders.
    pub format: FormatType,
    /// Maximum class instance nesting.
    pub class_graph_depth_max: usize,
    /// Maximum message size in bytes.
    pub message_size_max: usize,
    /// Slice unknown class types instead of failing.
    pub slice_values: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingVersion::V1_1,
            format: FormatType::Compact,
            class_graph_depth_max: DEFAULT_CLASS_GRAPH_DEPTH_MAX,
            message_size_max: DEFAULT_MESSAGE_SIZE_MAX,
            slice_values: true,
        }
    }
}

impl CodecConfig {
    /// Defaults overlaid with `HWIRE_*` environment variables.
    ///
    /// - `HWIRE_FORMAT`: `compact` | `sliced`
    /// - `HWIRE_CLASS_GRAPH_DEPTH_MAX`: integer
    /// - `HWIRE_MESSAGE_SIZE_MAX`: bytes
    /// - `HWIRE_SLICE_VALUES`: `0` | `1`
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("HWIRE_FORMAT") {
            match value.parse() {
                Ok(format) => config.format = format,
                Err(e) => log::warn!("[config] HWIRE_FORMAT ignored: {}", e),
            }
        }
        if let Some(depth) = env_usize("HWIRE_CLASS_GRAPH_DEPTH_MAX") {
            config.class_graph_depth_max = depth;
        }
        if let Some(size) = env_usize("HWIRE_MESSAGE_SIZE_MAX") {
            config.message_size_max = size;
        }
        if let Ok(value) = std::env::var("HWIRE_SLICE_VALUES") {
            config.slice_values = !matches!(value.trim(), "0" | "false" | "no");
        }

        config
    }

    pub fn with_encoding(mut self, encoding: EncodingVersion) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_format(mut self, format: FormatType) -> Self {
        self.format = format;
        self
    }

    pub fn with_class_graph_depth_max(mut self, depth: usize) -> Self {
        self.class_graph_depth_max = depth;
        self
    }

    pub fn with_message_size_max(mut self, size: usize) -> Self {
        self.message_size_max = size;
        self
    }

    pub fn with_slice_values(mut self, enabled: bool) -> Self {
        self.slice_values = enabled;
        self
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse::<usize>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("[config] {}='{}' is not an integer, ignored", name, value);
            None
        }
    }
}
