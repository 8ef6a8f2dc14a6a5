// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    structs::{Cidr, HostIterator, IpRange},
    AddressError, IPV4_BITS,
};
use std::net::Ipv4Addr;

/// Parse a dotted-quad IPv4 address. No trimming, no shorthand forms.
pub fn parse_ipv4(text: impl AsRef<str>) -> Result<Ipv4Addr, AddressError> {
    text.as_ref()
        .parse::<Ipv4Addr>()
        .map_err(|source| AddressError::InvalidAddress {
            text: text.as_ref().into(),
            source,
        })
}

/// Parse a prefix length given as text, f.ex. the `cidr` column of an import file.
pub fn parse_prefix(text: impl AsRef<str>) -> Result<u8, AddressError> {
    let val: u32 = text
        .as_ref()
        .parse::<u32>()
        .map_err(|source| AddressError::InvalidPrefix {
            text: text.as_ref().into(),
            source,
        })?;
    if val > IPV4_BITS as u32 {
        return Err(AddressError::PrefixTooLong(val));
    }
    Ok(val as u8)
}

/**
Parse an address and prefix length into a canonical [Cidr].

Host bits in `address` are masked off. The caller's text is left untouched,
so a stored `192.168.1.5` keeps its spelling while all arithmetic runs on
`192.168.1.0/24`.
*/
pub fn parse_network(address: impl AsRef<str>, prefix: u8) -> Result<Cidr, AddressError> {
    let addr: Ipv4Addr = parse_ipv4(address)?;
    if prefix > IPV4_BITS {
        return Err(AddressError::PrefixTooLong(prefix as u32));
    }
    Cidr::new(addr, prefix)
}

/// `base | host-bit mask`.
pub fn broadcast_address(base: Ipv4Addr, prefix: u8) -> Result<Ipv4Addr, AddressError> {
    Ok(Cidr::new(base, prefix)?.broadcast())
}

/// Usable hosts of `cidr` in ascending order. Empty for /31 and /32.
pub fn usable_hosts(cidr: &Cidr) -> HostIterator {
    cidr.hosts()
}

pub fn contains(cidr: &Cidr, address: Ipv4Addr) -> bool {
    cidr.contains(address)
}

/// `!(a.end < b.beg || a.beg > b.end)`
pub fn overlaps(a: &IpRange, b: &IpRange) -> bool {
    a.overlaps(b)
}

/* -------------------------------------------------------------------------- */
