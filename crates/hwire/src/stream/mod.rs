// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-level wire codec: sizes, fixed-width primitives, strings,
//! back-patched lengths, encapsulations and optional headers.
//!
//! All multi-byte values are little-endian.

pub mod input;
pub mod optional;
pub mod output;

pub use input::InputStream;
pub use optional::{OptionalFormat, OptionalHeader};
pub use output::OutputStream;
