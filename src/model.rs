// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory entities: networks, hosts and DHCP ranges.

use crate::cidr::{Cidr, IpRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, net::Ipv4Addr, str::FromStr};

pub type NetworkId = i64;
pub type HostId = i64;
pub type RangeId = i64;

/* ######################################################################### */

/// A CIDR-addressed address pool.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,
    /// Address text exactly as supplied; may carry host bits.
    pub network: String,
    /// Prefix length.
    pub cidr: u8,
    /// Canonical block the arithmetic runs on.
    pub block: Cidr,
    pub broadcast_address: Ipv4Addr,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub vlan_id: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl Network {
    /// Masked network address, f.ex. `192.168.1.0` for a stored `192.168.1.5/24`.
    pub fn network_address(&self) -> Ipv4Addr {
        self.block.network()
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.block.contains(ip)
    }

    /// Usable host count; 0 for /31 and /32.
    pub fn total_hosts(&self) -> u64 {
        self.block.usable_len()
    }

    /// `network/cidr` using the stored address text.
    pub fn label(&self) -> String {
        format!("{}/{}", self.network, self.cidr)
    }
}

/// Caller-supplied network attributes for create/update.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetworkFields {
    pub network: String,
    pub cidr: u8,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub vlan_id: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl NetworkFields {
    pub fn new(network: impl Into<String>, cidr: u8) -> Self {
        Self {
            network: network.into(),
            cidr,
            ..Default::default()
        }
    }
}

/* ######################################################################### */

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    #[default]
    Active,
    Inactive,
    Reserved,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Active => "active",
            HostStatus::Inactive => "inactive",
            HostStatus::Reserved => "reserved",
        }
    }

    /// Lenient parse: anything outside the whitelist becomes [HostStatus::Active].
    pub fn normalize(text: Option<&str>) -> Self {
        text.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostStatus {
    type Err = String;

    /// Exact, case-sensitive match against `active`, `inactive`, `reserved`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(HostStatus::Active),
            "inactive" => Ok(HostStatus::Inactive),
            "reserved" => Ok(HostStatus::Reserved),
            _ => Err(format!("unknown host status: '{s}'")),
        }
    }
}

/// A single IPv4 address assignment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub ip_address: Ipv4Addr,
    pub hostname: Option<String>,
    pub cname: Option<String>,
    pub mac_address: Option<String>,
    pub status: HostStatus,
    /// tri-state: assigned / not assigned / unknown
    pub is_assigned: Option<bool>,
    pub last_seen: Option<DateTime<Utc>>,
    pub discovery_source: Option<String>,
    pub description: Option<String>,
    pub network_id: Option<NetworkId>,
}

/// Caller-supplied host attributes for create/update. The address is kept as
/// text so that syntax validation happens inside the orchestrator.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct HostFields {
    pub ip_address: String,
    pub hostname: Option<String>,
    pub cname: Option<String>,
    pub mac_address: Option<String>,
    pub status: HostStatus,
    pub is_assigned: Option<bool>,
    pub last_seen: Option<DateTime<Utc>>,
    pub discovery_source: Option<String>,
    pub description: Option<String>,
    /// Explicit owner. `None` triggers network auto-detection.
    pub network_id: Option<NetworkId>,
}

impl HostFields {
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            ..Default::default()
        }
    }
}

/* ######################################################################### */

/// Sub-range of a network reserved for dynamic assignment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DhcpRange {
    pub id: RangeId,
    pub network_id: NetworkId,
    pub start_ip: Ipv4Addr,
    pub end_ip: Ipv4Addr,
    pub description: Option<String>,
    pub is_active: bool,
}

impl DhcpRange {
    pub fn range(&self) -> IpRange {
        IpRange {
            beg: self.start_ip,
            end: self.end_ip,
        }
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.start_ip <= ip && ip <= self.end_ip
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DhcpRangeFields {
    pub network_id: NetworkId,
    pub start_ip: String,
    pub end_ip: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl DhcpRangeFields {
    pub fn new(network_id: NetworkId, start_ip: impl Into<String>, end_ip: impl Into<String>) -> Self {
        Self {
            network_id,
            start_ip: start_ip.into(),
            end_ip: end_ip.into(),
            description: None,
            is_active: true,
        }
    }
}

/* ######################################################################### */

/// Pool statistics of one network, as consumed by exporters.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetworkUsage {
    pub network_id: NetworkId,
    pub network_address: Ipv4Addr,
    pub broadcast_address: Ipv4Addr,
    pub total_hosts: u64,
    pub used_hosts: u64,
    /// `total - used`. Negative when a shrunk network is over-subscribed.
    pub available_hosts: i64,
}

/// Result of looking up a single address across the inventory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IpStatus {
    Assigned(Host),
    Dhcp { range: DhcpRange, network: Network },
    Available(Network),
    Unmanaged,
}

impl IpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpStatus::Assigned(_) => "assigned",
            IpStatus::Dhcp { .. } => "dhcp",
            IpStatus::Available(_) => "available",
            IpStatus::Unmanaged => "unmanaged",
        }
    }
}

/* -------------------------------------------------------------------------- */
