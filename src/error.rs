// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    cidr::AddressError,
    repository::{StoreError, UniqueKey},
    strings::*,
};
use std::{error, fmt, net::Ipv4Addr};

/// Entity kinds, for error reporting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Entity {
    Network,
    Host,
    DhcpRange,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Network => "Network",
            Entity::Host => "Host",
            Entity::DhcpRange => "DHCP range",
        })
    }
}

#[rustfmt::skip]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IpamError {
    /// malformed IPv4 text or out-of-range prefix
    InvalidAddress(AddressError),
    /// DHCP range endpoint outside its network
    OutOfBounds    { start: Ipv4Addr, end: Ipv4Addr, network: String },
    InvertedRange  { start: Ipv4Addr, end: Ipv4Addr },
    /// carries the first conflicting active range
    Overlap        { id: i64, start: Ipv4Addr, end: Ipv4Addr },
    DuplicateAddress(Ipv4Addr),
    /// explicit owner network does not contain the host address
    NotInNetwork   { ip: Ipv4Addr, network: String },
    DuplicateNetwork(String),
    NoAvailableAddress(String),
    /// lost an allocation race; retrying once is expected to succeed
    NextAddressTaken(Ipv4Addr),
    HasAssignedHosts { network: String, count: u64 },
    NotFound       { entity: Entity, id: i64 },
    InvalidBoolean(String),
    InvalidTimestamp(String),
    InvalidMac(String),
    /// storage failure without a domain meaning
    Store(StoreError),
}

impl IpamError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IpamError::NextAddressTaken(_))
    }
}

impl fmt::Display for IpamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpamError::InvalidAddress(e) => write!(f, "{e}"),
            IpamError::OutOfBounds { start, end, network } => {
                write!(f, "{ERR_OUT_OF_BOUNDS} ({start}-{end} not in {network})")
            }
            IpamError::InvertedRange { start, end } => {
                write!(f, "{ERR_INVERTED} ({start} > {end})")
            }
            IpamError::Overlap { start, end, .. } => {
                write!(f, "{ERR_OVERLAP}: {start}-{end}")
            }
            IpamError::DuplicateAddress(ip) => write!(f, "{ERR_DUP_ADDR}: {ip}"),
            IpamError::NotInNetwork { ip, network } => {
                write!(f, "{ERR_NOT_IN_NET}: {ip} not in {network}")
            }
            IpamError::DuplicateNetwork(net) => write!(f, "{ERR_DUP_NET}: {net}"),
            IpamError::NoAvailableAddress(net) => write!(f, "{ERR_NO_ADDR}: {net}"),
            IpamError::NextAddressTaken(ip) => write!(f, "{ERR_ADDR_TAKEN}: {ip}"),
            IpamError::HasAssignedHosts { network, count } => {
                write!(f, "{ERR_HAS_HOSTS} {count} assigned hosts: {network}")
            }
            IpamError::NotFound { entity, id } => write!(f, "{entity} {id} {ERR_NOT_FOUND}"),
            IpamError::InvalidBoolean(val) => write!(f, "{ERR_BOOL}: '{val}'"),
            IpamError::InvalidTimestamp(val) => write!(f, "{ERR_TIMESTAMP}: '{val}'"),
            IpamError::InvalidMac(val) => write!(f, "{ERR_MAC}: '{val}'"),
            IpamError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl error::Error for IpamError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            IpamError::InvalidAddress(e) => Some(e),
            IpamError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AddressError> for IpamError {
    fn from(e: AddressError) -> Self {
        IpamError::InvalidAddress(e)
    }
}

/// Constraint violations map onto their domain counterparts.
impl From<StoreError> for IpamError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => IpamError::NotFound { entity, id },
            StoreError::UniqueViolation(UniqueKey::HostIp(ip)) => IpamError::DuplicateAddress(ip),
            StoreError::UniqueViolation(UniqueKey::NetworkBlock(block)) => {
                IpamError::DuplicateNetwork(block.to_string())
            }
            other => IpamError::Store(other),
        }
    }
}

/* -------------------------------------------------------------------------- */
