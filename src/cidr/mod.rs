// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IPv4 CIDR arithmetic: parsing, masking, usable host ranges and
//! containment/overlap predicates. Pure functions, no state.

mod addresses;
mod strings;
mod structs;

use std::{error, fmt, net::AddrParseError, net::Ipv4Addr, num::ParseIntError};
use strings::*;

pub use addresses::*;
pub use structs::{Cidr, HostIterator, IpRange};

pub(crate) const IPV4_BITS: u8 = 32;

#[rustfmt::skip]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddressError {
    /// not a dotted-quad IPv4 address
    InvalidAddress { text: String, source: AddrParseError },
    /// prefix length is not a number
    InvalidPrefix  { text: String, source: ParseIntError },
    /// prefix length outside `0..=32`
    PrefixTooLong(u32),
    /// missing or superfluous slash
    InvalidCidrFmt(String),
    RangeOrder(Ipv4Addr, Ipv4Addr),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidAddress { text, source } => {
                write!(f, "{ERR_INV_ADDR}: '{text}': {source}")
            }
            AddressError::InvalidPrefix { text, source } => {
                write!(f, "{ERR_INV_PREFIX}: '{text}': {source}")
            }
            AddressError::PrefixTooLong(prefix) => {
                write!(f, "{ERR_PREFIX_RANGE}: {prefix} (max {IPV4_BITS})")
            }
            AddressError::InvalidCidrFmt(text) => {
                write!(f, "{ERR_CIDR_FMT}: '{text}'")
            }
            AddressError::RangeOrder(beg, end) => {
                write!(f, "{ERR_RNG_ORDER} ({beg} > {end})")
            }
        }
    }
}

impl error::Error for AddressError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            AddressError::InvalidAddress { source, .. } => Some(source),
            AddressError::InvalidPrefix { source, .. } => Some(source),
            _ => None,
        }
    }
}
