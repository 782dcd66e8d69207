// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for encoding, decoding and type registration.

use crate::config::EncodingVersion;
use std::fmt;

/// Errors raised by the registry, the encoder and the decoder.
///
/// Decode errors abort the whole message: the caller must discard the input
/// buffer. Nothing in this crate retries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Truncated or corrupt input (bad size, out-of-range value, bad framing).
    MalformedData { offset: usize, reason: String },
    /// A forward-declared type was used before being defined.
    SchemaIncomplete(String),
    /// A type definition was rejected by the registry.
    InvalidSchema(String),
    /// An exception chain contained no type known to this registry.
    UnknownUserException { type_id: String },
    /// A decoded class instance is not of the expected type.
    UnexpectedObject { expected: String, actual: String },
    /// A value does not match the type it is marshaled as.
    Validation { type_id: String, reason: String },
    /// An unknown class type could not be sliced.
    NoValueFactory { type_id: String, reason: String },
    /// Encoding version unknown, or too old for the requested operation.
    UnsupportedEncoding(EncodingVersion),
    /// Class instance nesting exceeded `class_graph_depth_max`.
    DepthExceeded { max: usize },
    /// Message exceeded `message_size_max`.
    MessageTooLarge { size: usize, max: usize },
    /// A pre-marshal or post-unmarshal hook failed.
    Hook(String),
    /// Encoder misuse (unbalanced encapsulations, oversized containers).
    Marshal(String),
}

impl Error {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Error::MalformedData {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(type_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            type_id: type_id.into(),
            reason: reason.into(),
        }
    }

    /// True when the failure points at the message or the schema rather than
    /// at application data the caller can react to.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::UnknownUserException { .. }
                | Error::UnexpectedObject { .. }
                | Error::Validation { .. }
                | Error::Hook(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedData { offset, reason } => {
                write!(f, "malformed data at offset {}: {}", offset, reason)
            }
            Error::SchemaIncomplete(type_id) => {
                write!(f, "type '{}' is declared but not defined", type_id)
            }
            Error::InvalidSchema(reason) => write!(f, "invalid schema: {}", reason),
            Error::UnknownUserException { type_id } => {
                write!(f, "unknown user exception '{}'", type_id)
            }
            Error::UnexpectedObject { expected, actual } => write!(
                f,
                "unexpected class instance: expected '{}', received '{}'",
                expected, actual
            ),
            Error::Validation { type_id, reason } => {
                write!(f, "invalid value for '{}': {}", type_id, reason)
            }
            Error::NoValueFactory { type_id, reason } => {
                write!(f, "no value factory for '{}': {}", type_id, reason)
            }
            Error::UnsupportedEncoding(version) => {
                write!(f, "unsupported encoding version {}", version)
            }
            Error::DepthExceeded { max } => {
                write!(f, "class graph depth exceeds limit of {}", max)
            }
            Error::MessageTooLarge { size, max } => {
                write!(f, "message of {} bytes exceeds limit of {}", size, max)
            }
            Error::Hook(reason) => write!(f, "marshal hook failed: {}", reason),
            Error::Marshal(reason) => write!(f, "marshal error: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
