// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Address pool evaluation of a single network.

use crate::{
    cidr::IpRange,
    error::IpamError,
    model::{DhcpRange, Host, Network, NetworkUsage},
    repository::{Store, StoreError},
};
use std::{collections::HashSet, net::Ipv4Addr};

/**
Occupancy of one network at the time it was loaded.

A host counts as used when its `network_id` points at the network, whether
or not its address still lies inside the block. Only active DHCP ranges of
the network are consulted. Nothing is cached between loads.
*/
#[derive(Clone, Debug)]
pub struct AddressPool {
    network: Network,
    assigned: HashSet<Ipv4Addr>,
    used: u64,
    reserved: Vec<IpRange>,
}

impl AddressPool {
    /// Build from already fetched rows. Rows of other networks are ignored.
    pub fn new(network: Network, hosts: &[Host], ranges: &[DhcpRange]) -> Self {
        let mut assigned: HashSet<Ipv4Addr> = HashSet::with_capacity(hosts.len());
        let mut used: u64 = 0;
        for h in hosts.iter().filter(|h| h.network_id == Some(network.id)) {
            assigned.insert(h.ip_address);
            used += 1;
        }
        let reserved: Vec<IpRange> = ranges
            .iter()
            .filter(|r| r.is_active && r.network_id == network.id)
            .map(DhcpRange::range)
            .collect();

        Self {
            network,
            assigned,
            used,
            reserved,
        }
    }

    /// Read the current hosts and active ranges of `network` from `store`.
    pub fn load<S: Store + ?Sized>(store: &S, network: Network) -> Result<Self, StoreError> {
        let hosts: Vec<Host> = store.list_hosts_by_network(network.id)?;
        let ranges: Vec<DhcpRange> = store.list_dhcp_ranges_by_network(network.id, true)?;
        Ok(Self::new(network, &hosts, &ranges))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Usable host count of the block; 0 for /31 and /32.
    pub fn total_hosts(&self) -> u64 {
        self.network.total_hosts()
    }

    pub fn used_hosts(&self) -> u64 {
        self.used
    }

    /// `total - used`, not clamped: negative means over-subscribed.
    pub fn available_hosts(&self) -> i64 {
        self.total_hosts() as i64 - self.used as i64
    }

    /// Neither assigned to a host of this network nor inside an active DHCP range.
    pub fn is_available(&self, ip: Ipv4Addr) -> bool {
        !self.assigned.contains(&ip) && !self.reserved.iter().any(|r| r.contains(ip))
    }

    /// Lazy ascending walk over the available usable addresses.
    pub fn available(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.network
            .block
            .hosts()
            .filter(move |ip| self.is_available(*ip))
    }

    /// First available address in ascending order.
    pub fn next_available(&self) -> Result<Ipv4Addr, IpamError> {
        self.available()
            .next()
            .ok_or_else(|| IpamError::NoAvailableAddress(self.network.label()))
    }

    /// All available addresses, or only the first `limit` of them.
    /// A limit of 0 means no limit.
    pub fn list_available(&self, limit: Option<usize>) -> Vec<Ipv4Addr> {
        match limit {
            Some(n) if n > 0 => self.available().take(n).collect(),
            _ => self.available().collect(),
        }
    }

    pub fn usage(&self) -> NetworkUsage {
        NetworkUsage {
            network_id: self.network.id,
            network_address: self.network.network_address(),
            broadcast_address: self.network.broadcast_address,
            total_hosts: self.total_hosts(),
            used_hosts: self.used_hosts(),
            available_hosts: self.available_hosts(),
        }
    }
}

/* -------------------------------------------------------------------------- */
