// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Application hooks around class instance marshaling.

use crate::value::ClassInstance;

/// Called by the encoder before an instance is written and by the decoder
/// once an instance is fully read. An `Err` aborts the whole operation with
/// [`Error::Hook`](crate::Error::Hook).
pub trait ValueHooks {
    fn pre_marshal(&self, _instance: &ClassInstance) -> Result<(), String> {
        Ok(())
    }

    fn post_unmarshal(&self, _instance: &mut ClassInstance) -> Result<(), String> {
        Ok(())
    }
}
