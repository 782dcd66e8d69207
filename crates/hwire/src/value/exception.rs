// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! User exception values.

use super::sliced::SlicedData;
use super::{Members, Value};
use std::fmt;

/// A user exception: most-derived type id plus member values of every level.
#[derive(Debug, Clone, PartialEq)]
pub struct UserException {
    pub type_id: String,
    pub members: Members,
    pub sliced_data: Option<SlicedData>,
}

impl UserException {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            members: Members::new(),
            sliced_data: None,
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.set(name, value);
        self
    }
}

impl fmt::Display for UserException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user exception {}", self.type_id)
    }
}

impl std::error::Error for UserException {}
