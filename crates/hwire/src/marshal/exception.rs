// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! User exceptions.
//!
//! An exception is a `usesClasses` flag followed by one slice per type in
//! its hierarchy, most-derived first. Exception slices always carry a
//! string type id and a slice size, so a receiver that does not know the
//! most-derived type can skip to the first base it knows.

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::optional::OptionalScope;
use super::slices::{ReadFrame, SliceType, WriteFrame};
use crate::config::FLAG_IS_LAST_SLICE;
use crate::error::{Error, Result};
use crate::types::TypeId;
use crate::value::{Members, UserException};

impl<'a> Encoder<'a> {
    pub fn write_exception(&mut self, exception: &UserException) -> Result<()> {
        let encoding = self.out.encoding();
        if !encoding.supports_optionals() {
            return Err(Error::UnsupportedEncoding(encoding));
        }
        let registry = self.registry;
        let id = registry
            .exception_by_name(&exception.type_id)
            .ok_or_else(|| {
                Error::validation(&exception.type_id, "exception type is not registered")
            })?;
        let chain = registry.exception_chain(id)?;

        let preserved_instances = exception
            .sliced_data
            .as_ref()
            .is_some_and(|data| data.slices.iter().any(|slice| !slice.instances.is_empty()));
        self.out
            .write_bool(registry.exception(id)?.uses_classes || preserved_instances);

        self.current.frames.push(WriteFrame::new(SliceType::Exception, true));
        let result = self.write_exception_slices(exception, &chain);
        self.current.frames.pop();
        result
    }

    fn write_exception_slices(
        &mut self,
        exception: &UserException,
        chain: &[TypeId],
    ) -> Result<()> {
        let registry = self.registry;
        if let Some(sliced) = &exception.sliced_data {
            self.write_sliced_data(sliced)?;
        }
        for (i, id) in chain.iter().enumerate() {
            let desc = registry.exception(*id)?;
            self.start_slice(&desc.name, None, i + 1 == chain.len())?;
            self.write_required(&desc.name, &desc.members, &exception.members)?;
            self.write_optional_members(
                &desc.optional_members,
                &exception.members,
                OptionalScope::Slice,
            )?;
            self.end_slice()?;
        }
        Ok(())
    }
}

impl<'a> Decoder<'a> {
    /// Decode a user exception.
    ///
    /// Unknown derived slices are skipped until a registered exception is
    /// found; with none, the result is [`Error::UnknownUserException`]
    /// naming the most-derived type id.
    pub fn read_exception(&mut self) -> Result<UserException> {
        let encoding = self.input.encoding();
        if !encoding.supports_optionals() {
            return Err(Error::UnsupportedEncoding(encoding));
        }
        let uses_classes = self.input.read_bool()?;
        let instances_before = self.graph.len();

        self.current.frames.push(ReadFrame::new(SliceType::Exception));
        let result = self.read_exception_body();
        self.current.frames.pop();
        let exception = result?;

        if !uses_classes && self.graph.len() != instances_before {
            return Err(self
                .input
                .malformed("exception without class members carried class instances"));
        }
        self.flush_checks()?;
        Ok(exception)
    }

    fn read_exception_body(&mut self) -> Result<UserException> {
        let registry = self.registry;
        self.start_slice()?;
        let most_derived = self.current.current_frame()?.type_id.clone();

        let known = loop {
            let frame = self.current.current_frame()?;
            if let Some(id) = registry.exception_by_name(&frame.type_id) {
                registry.exception(id)?;
                break id;
            }
            let last = frame.flags & FLAG_IS_LAST_SLICE != 0;
            let slice_type_id = frame.type_id.clone();
            self.skip_slice(&slice_type_id)?;
            if last {
                log::warn!("[marshal] unknown user exception '{}'", most_derived);
                return Err(Error::UnknownUserException {
                    type_id: most_derived,
                });
            }
            self.start_slice()?;
        };
        if registry.name_of(known) != most_derived {
            log::debug!(
                "[marshal] '{}' decoded as base exception '{}'",
                most_derived,
                registry.name_of(known)
            );
        }

        let chain = registry.exception_chain(known)?;
        let mut members = Members::new();
        let mut preserve = false;
        for (i, id) in chain.iter().enumerate() {
            let desc = registry.exception(*id)?;
            preserve |= desc.preserve_slices;
            if i > 0 {
                if self.current.current_frame()?.flags & FLAG_IS_LAST_SLICE != 0 {
                    return Err(self.input.malformed(format!(
                        "slices of '{}' end before base '{}'",
                        registry.name_of(known),
                        desc.name
                    )));
                }
                self.start_slice()?;
                let found = &self.current.current_frame()?.type_id;
                if *found != desc.name {
                    let found = found.clone();
                    return Err(self.input.malformed(format!(
                        "expected slice '{}', found '{}'",
                        desc.name, found
                    )));
                }
            }
            self.read_slice_members(&desc.members, &desc.optional_members, &mut members)?;
            self.end_slice(&mut members)?;
        }
        self.expect_last_slice(registry.name_of(known))?;

        let sliced_data = self.take_sliced(preserve, &most_derived)?;
        Ok(UserException {
            type_id: registry.name_of(known).to_string(),
            members,
            sliced_data,
        })
    }
}
