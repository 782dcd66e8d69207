// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proxy values and their wire form.
//!
//! ```text
//! identity.name  identity.category     (empty name = null proxy)
//! facet          0 or 1 strings
//! mode           u8
//! secure         bool
//! protocol       u8 u8                 (1.1 only)
//! encoding       u8 u8                 (1.1 only)
//! endpoints      size, then { i16 type, encapsulation }*
//! adapter id     string                (only when there are no endpoints)
//! ```

use crate::config::{EncodingVersion, PROTOCOL_MAJOR, PROTOCOL_MINOR};
use crate::error::Result;
use crate::stream::{InputStream, OutputStream};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Identity {
    pub name: String,
    pub category: String,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationMode {
    #[default]
    Twoway = 0,
    Oneway = 1,
    BatchOneway = 2,
    Datagram = 3,
    BatchDatagram = 4,
}

impl InvocationMode {
    pub fn from_u8(value: u8) -> Option<InvocationMode> {
        match value {
            0 => Some(InvocationMode::Twoway),
            1 => Some(InvocationMode::Oneway),
            2 => Some(InvocationMode::BatchOneway),
            3 => Some(InvocationMode::Datagram),
            4 => Some(InvocationMode::BatchDatagram),
            _ => None,
        }
    }
}

/// Transport endpoint carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointData {
    pub kind: i16,
    pub encoding: EncodingVersion,
    pub payload: Vec<u8>,
}

/// A proxy: the address of a remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyValue {
    pub identity: Identity,
    /// Empty for the default facet.
    pub facet: String,
    pub mode: InvocationMode,
    pub secure: bool,
    pub protocol: EncodingVersion,
    pub encoding: EncodingVersion,
    pub endpoints: Vec<EndpointData>,
    /// Used for indirect proxies (no endpoints).
    pub adapter_id: String,
}

impl ProxyValue {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            facet: String::new(),
            mode: InvocationMode::Twoway,
            secure: false,
            protocol: EncodingVersion {
                major: PROTOCOL_MAJOR,
                minor: PROTOCOL_MINOR,
            },
            encoding: EncodingVersion::V1_1,
            endpoints: Vec::new(),
            adapter_id: String::new(),
        }
    }

    pub fn with_adapter_id(mut self, adapter_id: impl Into<String>) -> Self {
        self.adapter_id = adapter_id.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: EndpointData) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_facet(mut self, facet: impl Into<String>) -> Self {
        self.facet = facet.into();
        self
    }
}

pub(crate) fn write_proxy(out: &mut OutputStream, proxy: Option<&ProxyValue>) -> Result<()> {
    let Some(proxy) = proxy else {
        out.write_string("")?;
        out.write_string("")?;
        return Ok(());
    };
    out.write_string(&proxy.identity.name)?;
    out.write_string(&proxy.identity.category)?;
    if proxy.facet.is_empty() {
        out.write_size(0)?;
    } else {
        out.write_size(1)?;
        out.write_string(&proxy.facet)?;
    }
    out.write_u8(proxy.mode as u8);
    out.write_bool(proxy.secure);
    if out.encoding() != EncodingVersion::V1_0 {
        out.write_u8(proxy.protocol.major);
        out.write_u8(proxy.protocol.minor);
        out.write_u8(proxy.encoding.major);
        out.write_u8(proxy.encoding.minor);
    }
    out.write_size(proxy.endpoints.len())?;
    for endpoint in &proxy.endpoints {
        out.write_i16(endpoint.kind);
        out.write_encapsulation(endpoint.encoding, &endpoint.payload)?;
    }
    if proxy.endpoints.is_empty() {
        out.write_string(&proxy.adapter_id)?;
    }
    Ok(())
}

pub(crate) fn read_proxy(input: &mut InputStream<'_>) -> Result<Option<ProxyValue>> {
    let name = input.read_string()?;
    let category = input.read_string()?;
    if name.is_empty() {
        if !category.is_empty() {
            return Err(input.malformed("proxy identity has a category but no name"));
        }
        return Ok(None);
    }

    let facets = input.read_string_seq()?;
    if facets.len() > 1 {
        return Err(input.malformed(format!("proxy carries {} facets", facets.len())));
    }
    let facet = facets.into_iter().next().unwrap_or_default();

    let mode_byte = input.read_u8()?;
    let mode = InvocationMode::from_u8(mode_byte)
        .ok_or_else(|| input.malformed(format!("invalid invocation mode {}", mode_byte)))?;
    let secure = input.read_bool()?;

    let mut protocol = EncodingVersion {
        major: PROTOCOL_MAJOR,
        minor: PROTOCOL_MINOR,
    };
    let mut encoding = EncodingVersion::V1_0;
    if input.encoding() != EncodingVersion::V1_0 {
        protocol = EncodingVersion {
            major: input.read_u8()?,
            minor: input.read_u8()?,
        };
        encoding = EncodingVersion {
            major: input.read_u8()?,
            minor: input.read_u8()?,
        };
    }

    // Each endpoint is at least an i16 plus a 6-byte encapsulation header.
    let count = input.read_and_check_seq_size(8)?;
    let mut endpoints = Vec::with_capacity(count);
    for _ in 0..count {
        let kind = input.read_i16()?;
        let (encoding, payload) = input.read_encapsulation()?;
        endpoints.push(EndpointData {
            kind,
            encoding,
            payload: payload.to_vec(),
        });
    }
    let adapter_id = if endpoints.is_empty() {
        input.read_string()?
    } else {
        String::new()
    };

    Ok(Some(ProxyValue {
        identity: Identity { name, category },
        facet,
        mode,
        secure,
        protocol,
        encoding,
        endpoints,
        adapter_id,
    }))
}
