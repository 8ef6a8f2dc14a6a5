// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Persistence seam. The engine only talks to a [Store] handed out by a
[Repository] transaction; everything it reads inside one transaction is
consistent with what it writes there.

"Persistence order" throughout the crate means the order in which the store
returns rows from its `list_*` methods.
*/

mod memory;

use crate::{
    cidr::Cidr,
    error::Entity,
    model::{DhcpRange, Host, HostId, Network, NetworkId, RangeId},
    strings::ERR_UNIQUE,
};
use std::{error, fmt, net::Ipv4Addr};

pub use memory::{MemoryRepository, MemoryStore};

/// Which unique index rejected a write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UniqueKey {
    HostIp(Ipv4Addr),
    NetworkBlock(Cidr),
}

#[rustfmt::skip]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreError {
    NotFound   { entity: Entity, id: i64 },
    UniqueViolation(UniqueKey),
    /// referenced row missing, or row still referenced on delete
    ForeignKey { entity: Entity, id: i64 },
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { entity, id } => write!(f, "{entity} {id} not found"),
            StoreError::UniqueViolation(UniqueKey::HostIp(ip)) => {
                write!(f, "{ERR_UNIQUE}: hosts.ip_address = {ip}")
            }
            StoreError::UniqueViolation(UniqueKey::NetworkBlock(block)) => {
                write!(f, "{ERR_UNIQUE}: networks.block = {block}")
            }
            StoreError::ForeignKey { entity, id } => {
                write!(f, "foreign key constraint failed: {entity} {id}")
            }
            StoreError::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl error::Error for StoreError {}

/**
Row-level access to networks, hosts and DHCP ranges.

`insert_*` methods ignore the `id` of the passed row and return the row as
stored, with its assigned id.
*/
pub trait Store {
    fn list_networks(&self) -> Result<Vec<Network>, StoreError>;
    fn get_network(&self, id: NetworkId) -> Result<Network, StoreError>;
    fn insert_network(&mut self, network: Network) -> Result<Network, StoreError>;
    fn update_network(&mut self, network: &Network) -> Result<(), StoreError>;
    fn delete_network(&mut self, id: NetworkId) -> Result<(), StoreError>;

    fn list_all_hosts(&self) -> Result<Vec<Host>, StoreError>;
    fn list_hosts_by_network(&self, id: NetworkId) -> Result<Vec<Host>, StoreError>;
    fn get_host(&self, id: HostId) -> Result<Host, StoreError>;
    fn find_host_by_ip(&self, ip: Ipv4Addr) -> Result<Option<Host>, StoreError>;
    fn insert_host(&mut self, host: Host) -> Result<Host, StoreError>;
    fn update_host(&mut self, host: &Host) -> Result<(), StoreError>;
    fn delete_host(&mut self, id: HostId) -> Result<(), StoreError>;

    fn list_dhcp_ranges(&self) -> Result<Vec<DhcpRange>, StoreError>;
    fn list_dhcp_ranges_by_network(
        &self,
        id: NetworkId,
        active_only: bool,
    ) -> Result<Vec<DhcpRange>, StoreError>;
    fn get_dhcp_range(&self, id: RangeId) -> Result<DhcpRange, StoreError>;
    fn insert_dhcp_range(&mut self, range: DhcpRange) -> Result<DhcpRange, StoreError>;
    fn update_dhcp_range(&mut self, range: &DhcpRange) -> Result<(), StoreError>;
    fn delete_dhcp_range(&mut self, id: RangeId) -> Result<(), StoreError>;
}

/// Hands out [Store] access scoped to a read or a write transaction.
pub trait Repository {
    type Store: Store;

    /// Run `f` against a consistent snapshot.
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self::Store) -> Result<T, E>;

    /// Run `f` atomically. Any `Err` rolls back every write `f` made.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Store) -> Result<T, E>;
}
