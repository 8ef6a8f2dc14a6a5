// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Repository, Store, StoreError, UniqueKey};
use crate::{
    error::Entity,
    model::{DhcpRange, Host, HostId, Network, NetworkId, RangeId},
};
use parking_lot::RwLock;
use std::net::Ipv4Addr;
use tracing::debug;

/// Tables of the in-memory store. Rows keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    networks: Vec<Network>,
    hosts: Vec<Host>,
    ranges: Vec<DhcpRange>,
    seq_network: NetworkId,
    seq_host: HostId,
    seq_range: RangeId,
}

/**
Process-local [Repository]. Writers are serialized by a single lock and a
failed transaction restores the tables from a snapshot taken at its start.

Network deletion is restricted while hosts reference the network; DHCP
ranges of a deleted network are dropped together with it.
*/
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<MemoryStore>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for MemoryRepository {
    type Store = MemoryStore;

    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self::Store) -> Result<T, E>,
    {
        f(&self.tables.read())
    }

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Store) -> Result<T, E>,
    {
        let mut tables = self.tables.write();
        let snapshot: MemoryStore = tables.clone();
        match f(&mut tables) {
            Ok(val) => Ok(val),
            Err(e) => {
                *tables = snapshot;
                debug!("memory store: transaction rolled back");
                Err(e)
            }
        }
    }
}

/* ---------------------------------- */

impl MemoryStore {
    fn network_idx(&self, id: NetworkId) -> Result<usize, StoreError> {
        self.networks
            .iter()
            .position(|n| n.id == id)
            .ok_or(StoreError::NotFound { entity: Entity::Network, id })
    }

    fn host_idx(&self, id: HostId) -> Result<usize, StoreError> {
        self.hosts
            .iter()
            .position(|h| h.id == id)
            .ok_or(StoreError::NotFound { entity: Entity::Host, id })
    }

    fn range_idx(&self, id: RangeId) -> Result<usize, StoreError> {
        self.ranges
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound { entity: Entity::DhcpRange, id })
    }

    fn check_network_unique(&self, network: &Network, own_id: Option<NetworkId>) -> Result<(), StoreError> {
        let clash = self
            .networks
            .iter()
            .any(|n| Some(n.id) != own_id && n.block == network.block);
        match clash {
            true => Err(StoreError::UniqueViolation(UniqueKey::NetworkBlock(network.block))),
            false => Ok(()),
        }
    }

    fn check_host_unique(&self, host: &Host, own_id: Option<HostId>) -> Result<(), StoreError> {
        let clash = self
            .hosts
            .iter()
            .any(|h| Some(h.id) != own_id && h.ip_address == host.ip_address);
        match clash {
            true => Err(StoreError::UniqueViolation(UniqueKey::HostIp(host.ip_address))),
            false => Ok(()),
        }
    }

    fn check_network_ref(&self, id: Option<NetworkId>) -> Result<(), StoreError> {
        match id {
            Some(id) if self.network_idx(id).is_err() => {
                Err(StoreError::ForeignKey { entity: Entity::Network, id })
            }
            _ => Ok(()),
        }
    }
}

impl Store for MemoryStore {
    fn list_networks(&self) -> Result<Vec<Network>, StoreError> {
        Ok(self.networks.clone())
    }

    fn get_network(&self, id: NetworkId) -> Result<Network, StoreError> {
        Ok(self.networks[self.network_idx(id)?].clone())
    }

    fn insert_network(&mut self, mut network: Network) -> Result<Network, StoreError> {
        self.check_network_unique(&network, None)?;
        self.seq_network += 1;
        network.id = self.seq_network;
        self.networks.push(network.clone());
        Ok(network)
    }

    fn update_network(&mut self, network: &Network) -> Result<(), StoreError> {
        let idx: usize = self.network_idx(network.id)?;
        self.check_network_unique(network, Some(network.id))?;
        self.networks[idx] = network.clone();
        Ok(())
    }

    fn delete_network(&mut self, id: NetworkId) -> Result<(), StoreError> {
        let idx: usize = self.network_idx(id)?;
        if self.hosts.iter().any(|h| h.network_id == Some(id)) {
            return Err(StoreError::ForeignKey { entity: Entity::Network, id });
        }
        self.networks.remove(idx);
        self.ranges.retain(|r| r.network_id != id);
        Ok(())
    }

    fn list_all_hosts(&self) -> Result<Vec<Host>, StoreError> {
        Ok(self.hosts.clone())
    }

    fn list_hosts_by_network(&self, id: NetworkId) -> Result<Vec<Host>, StoreError> {
        Ok(self
            .hosts
            .iter()
            .filter(|h| h.network_id == Some(id))
            .cloned()
            .collect())
    }

    fn get_host(&self, id: HostId) -> Result<Host, StoreError> {
        Ok(self.hosts[self.host_idx(id)?].clone())
    }

    fn find_host_by_ip(&self, ip: Ipv4Addr) -> Result<Option<Host>, StoreError> {
        Ok(self.hosts.iter().find(|h| h.ip_address == ip).cloned())
    }

    fn insert_host(&mut self, mut host: Host) -> Result<Host, StoreError> {
        self.check_host_unique(&host, None)?;
        self.check_network_ref(host.network_id)?;
        self.seq_host += 1;
        host.id = self.seq_host;
        self.hosts.push(host.clone());
        Ok(host)
    }

    fn update_host(&mut self, host: &Host) -> Result<(), StoreError> {
        let idx: usize = self.host_idx(host.id)?;
        self.check_host_unique(host, Some(host.id))?;
        self.check_network_ref(host.network_id)?;
        self.hosts[idx] = host.clone();
        Ok(())
    }

    fn delete_host(&mut self, id: HostId) -> Result<(), StoreError> {
        let idx: usize = self.host_idx(id)?;
        self.hosts.remove(idx);
        Ok(())
    }

    fn list_dhcp_ranges(&self) -> Result<Vec<DhcpRange>, StoreError> {
        Ok(self.ranges.clone())
    }

    fn list_dhcp_ranges_by_network(
        &self,
        id: NetworkId,
        active_only: bool,
    ) -> Result<Vec<DhcpRange>, StoreError> {
        Ok(self
            .ranges
            .iter()
            .filter(|r| r.network_id == id && (r.is_active || !active_only))
            .cloned()
            .collect())
    }

    fn get_dhcp_range(&self, id: RangeId) -> Result<DhcpRange, StoreError> {
        Ok(self.ranges[self.range_idx(id)?].clone())
    }

    fn insert_dhcp_range(&mut self, mut range: DhcpRange) -> Result<DhcpRange, StoreError> {
        self.check_network_ref(Some(range.network_id))?;
        self.seq_range += 1;
        range.id = self.seq_range;
        self.ranges.push(range.clone());
        Ok(range)
    }

    fn update_dhcp_range(&mut self, range: &DhcpRange) -> Result<(), StoreError> {
        let idx: usize = self.range_idx(range.id)?;
        self.check_network_ref(Some(range.network_id))?;
        self.ranges[idx] = range.clone();
        Ok(())
    }

    fn delete_dhcp_range(&mut self, id: RangeId) -> Result<(), StoreError> {
        let idx: usize = self.range_idx(id)?;
        self.ranges.remove(idx);
        Ok(())
    }
}

/* -------------------------------------------------------------------------- */
