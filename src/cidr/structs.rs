// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{strings::*, AddressError, IPV4_BITS};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::{fmt, net::Ipv4Addr, str::FromStr};

/// Netmask for `prefix` as a host-order integer. Prefixes above 32 saturate.
#[inline]
pub(crate) fn mask_u32(prefix: u8) -> u32 {
    match prefix.min(IPV4_BITS) {
        0 => 0,
        p => u32::MAX << (IPV4_BITS - p),
    }
}

/// Canonical IPv4 network block. `addr` always has its host bits cleared.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Cidr {
    /// network address
    pub addr: Ipv4Addr,
    /// `0..=32`
    pub prefix: u8,
}

impl Cidr {
    /**
    Build a block from any address inside it. Host bits are masked off
    (non-strict), so `192.168.1.5/24` becomes `192.168.1.0/24`.
    */
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, AddressError> {
        let net: Ipv4Net =
            Ipv4Net::new(addr, prefix).map_err(|_| AddressError::PrefixTooLong(prefix as u32))?;
        Ok(Self::from(net.trunc()))
    }

    pub fn network(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) | !mask_u32(self.prefix))
    }

    /// Number of addresses in the block, network and broadcast included.
    pub fn len(&self) -> u64 {
        1u64 << (IPV4_BITS - self.prefix.min(IPV4_BITS))
    }

    /**
    Number of usable host addresses.

    NOTE: /31 and /32 blocks report 0 usable hosts (no RFC 3021 handling).
    */
    pub fn usable_len(&self) -> u64 {
        match self.usable_range() {
            Some(range) => range.len(),
            None => 0,
        }
    }

    /// Inclusive range strictly between network and broadcast address.
    pub fn usable_range(&self) -> Option<IpRange> {
        if self.prefix >= IPV4_BITS - 1 {
            return None;
        }
        let beg: u32 = u32::from(self.addr) + 1;
        let end: u32 = u32::from(self.broadcast()) - 1;
        Some(IpRange {
            beg: Ipv4Addr::from(beg),
            end: Ipv4Addr::from(end),
        })
    }

    /// Whether `ip` falls anywhere in the block (network/broadcast included).
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & mask_u32(self.prefix) == u32::from(self.addr)
    }

    /// Ascending iterator over the usable host addresses.
    pub fn hosts(&self) -> HostIterator {
        HostIterator::new(*self)
    }
}

impl From<Ipv4Net> for Cidr {
    fn from(net: Ipv4Net) -> Self {
        Cidr {
            addr: net.network(),
            prefix: net.prefix_len(),
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SLASH}{}", self.addr, self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = AddressError;

    /// Parse `ADDRESS/PREFIX`. A bare address is taken as a /32.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SLASH).collect();
        match parts.as_slice() {
            [addr] => Cidr::new(super::parse_ipv4(addr.trim())?, IPV4_BITS),
            [addr, prefix] => {
                let addr: Ipv4Addr = super::parse_ipv4(addr.trim())?;
                let prefix: u8 = super::parse_prefix(prefix.trim())?;
                Cidr::new(addr, prefix)
            }
            _ => Err(AddressError::InvalidCidrFmt(s.to_string())),
        }
    }
}

/* ---------------------------------- */

/// Iterator over the usable host addresses of a [Cidr], ascending.
pub struct HostIterator {
    current: u64,
    /// inclusive
    end: u64,
}

impl HostIterator {
    pub fn new(cidr: Cidr) -> Self {
        match cidr.usable_range() {
            Some(range) => HostIterator {
                current: u32::from(range.beg) as u64,
                end: u32::from(range.end) as u64,
            },
            None => HostIterator { current: 1, end: 0 },
        }
    }
}

impl Iterator for HostIterator {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current > self.end {
            return None;
        }
        let ip: Ipv4Addr = Ipv4Addr::from(self.current as u32);
        self.current += 1;
        Some(ip)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left: usize = (self.end + 1).saturating_sub(self.current) as usize;
        (left, Some(left))
    }
}

/* -------------------------------------------------------------------------- */

/// Inclusive range of IPv4 addresses (endpoints are included).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct IpRange {
    pub beg: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl IpRange {
    /// Create a new [IpRange]. Ensures that `beg <= end`.
    pub fn new(beg: Ipv4Addr, end: Ipv4Addr) -> Result<Self, AddressError> {
        if beg > end {
            return Err(AddressError::RangeOrder(beg, end));
        }
        Ok(Self { beg, end })
    }

    pub fn len(&self) -> u64 {
        (u32::from(self.end) as u64).saturating_sub(u32::from(self.beg) as u64) + 1
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.beg <= ip && ip <= self.end
    }

    /// Boundary-inclusive: `[10,20]` and `[20,30]` overlap.
    pub fn overlaps(&self, other: &IpRange) -> bool {
        !(self.end < other.beg || self.beg > other.end)
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.beg, self.end)
    }
}

/* -------------------------------------------------------------------------- */
