// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! DHCP range validation against the owning network and its sibling ranges.

use crate::{
    cidr::IpRange,
    error::IpamError,
    model::{DhcpRange, Network, RangeId},
};
use std::net::Ipv4Addr;

/**
Validate a candidate range `[start, end]` of `network`.

Checks run in order and the first failure wins:
1. both endpoints lie inside the network block, else [IpamError::OutOfBounds]
2. `start <= end`, else [IpamError::InvertedRange]
3. no overlap with another *active* range of the same network, else
   [IpamError::Overlap] naming the first conflicting range in the order of
   `siblings`

`exclude` skips the range being updated. Addresses compare numerically.
*/
pub fn validate_range(
    network: &Network,
    start: Ipv4Addr,
    end: Ipv4Addr,
    siblings: &[DhcpRange],
    exclude: Option<RangeId>,
) -> Result<(), IpamError> {
    if !network.contains(start) || !network.contains(end) {
        return Err(IpamError::OutOfBounds {
            start,
            end,
            network: network.block.to_string(),
        });
    }

    let candidate: IpRange =
        IpRange::new(start, end).map_err(|_| IpamError::InvertedRange { start, end })?;

    let conflict: Option<&DhcpRange> = siblings
        .iter()
        .filter(|r| r.network_id == network.id && r.is_active)
        .filter(|r| Some(r.id) != exclude)
        .find(|r| r.range().overlaps(&candidate));

    match conflict {
        Some(r) => Err(IpamError::Overlap {
            id: r.id,
            start: r.start_ip,
            end: r.end_ip,
        }),
        None => Ok(()),
    }
}

/* -------------------------------------------------------------------------- */
