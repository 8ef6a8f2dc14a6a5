// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Allocation orchestrator: CRUD over networks, hosts and DHCP ranges with the
cross-entity invariants enforced inside one repository transaction each.
*/

use crate::{
    cidr::{parse_ipv4, parse_network, Cidr},
    coerce::{non_blank, normalize_mac},
    config::IpamConfig,
    dhcp::validate_range,
    error::IpamError,
    model::{
        DhcpRange, DhcpRangeFields, Host, HostFields, HostId, HostStatus, IpStatus, Network,
        NetworkFields, NetworkId, NetworkUsage, RangeId,
    },
    pool::AddressPool,
    repository::{Repository, Store, StoreError, UniqueKey},
};
use std::net::Ipv4Addr;
use tracing::{debug, info, warn};

/// How many times [Ipam::allocate_next_host] tries before giving up.
const ALLOC_ATTEMPTS: usize = 2;

/// First network in `networks` (persistence order) whose block contains `address`.
pub fn detect_network(address: Ipv4Addr, networks: &[Network]) -> Option<NetworkId> {
    networks.iter().find(|n| n.contains(address)).map(|n| n.id)
}

/* ######################################################################### */

/// Optional criteria for [Ipam::list_hosts]. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct HostFilter {
    /// case-insensitive substring
    pub hostname: Option<String>,
    /// case-insensitive substring
    pub cname: Option<String>,
    pub status: Option<HostStatus>,
    pub is_assigned: Option<bool>,
    pub mac_address: Option<String>,
    pub network_id: Option<NetworkId>,
}

impl HostFilter {
    pub fn matches(&self, host: &Host) -> bool {
        fn like(needle: &Option<String>, hay: &Option<String>) -> bool {
            match needle {
                None => true,
                Some(n) => hay
                    .as_deref()
                    .is_some_and(|h| h.to_lowercase().contains(&n.to_lowercase())),
            }
        }

        like(&self.hostname, &host.hostname)
            && like(&self.cname, &host.cname)
            && self.status.map_or(true, |s| s == host.status)
            && self.is_assigned.map_or(true, |a| host.is_assigned == Some(a))
            && self
                .mac_address
                .as_ref()
                .map_or(true, |m| host.mac_address.as_ref() == Some(m))
            && self.network_id.map_or(true, |id| host.network_id == Some(id))
    }
}

/* ######################################################################### */

/**
The engine. Holds the repository handle and configuration; there is no
other state, so every call sees the latest committed data.
*/
pub struct Ipam<R: Repository> {
    repo: R,
    config: IpamConfig,
}

impl<R: Repository> Ipam<R> {
    pub fn new(repo: R, config: IpamConfig) -> Self {
        Self { repo, config }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &IpamConfig {
        &self.config
    }

    /// `is_assigned` given to hosts created one at a time.
    fn assign_default(&self) -> Option<bool> {
        Some(self.config.host_assign_on_create)
    }

    /* ---------------------------------- */
    /* networks                           */

    pub fn list_networks(&self) -> Result<Vec<Network>, IpamError> {
        Ok(self.repo.read(|s| s.list_networks())?)
    }

    pub fn get_network(&self, id: NetworkId) -> Result<Network, IpamError> {
        Ok(self.repo.read(|s| s.get_network(id))?)
    }

    pub fn create_network(&self, fields: NetworkFields) -> Result<Network, IpamError> {
        let network: Network = self
            .repo
            .transaction(|s| insert_network(s, fields))?;
        info!(id = network.id, network = %network.label(), "network created");
        Ok(network)
    }

    /// Replace CIDR and metadata. Broadcast is recomputed and uniqueness
    /// re-checked; hosts keep their `network_id` even if they fall outside.
    pub fn update_network(&self, id: NetworkId, fields: NetworkFields) -> Result<Network, IpamError> {
        let network: Network = self.repo.transaction(|s| {
            let current: Network = s.get_network(id)?;
            let block: Cidr = parse_network(&fields.network, fields.cidr)?;
            ensure_unique_block(s, block, Some(id))?;

            let updated: Network = build_network(current.id, fields, block);
            s.update_network(&updated)?;
            Ok::<_, IpamError>(updated)
        })?;
        info!(id, network = %network.label(), "network updated");
        Ok(network)
    }

    /**
    Delete a network that no host references.

    DHCP ranges of the network are left to the repository: the bundled
    [crate::repository::MemoryRepository] drops them with the network.
    */
    pub fn delete_network(&self, id: NetworkId) -> Result<(), IpamError> {
        self.repo.transaction(|s| {
            let network: Network = s.get_network(id)?;
            let count: u64 = s.list_hosts_by_network(id)?.len() as u64;
            if count > 0 {
                return Err(IpamError::HasAssignedHosts {
                    network: network.label(),
                    count,
                });
            }
            s.delete_network(id)?;
            Ok(())
        })?;
        info!(id, "network deleted");
        Ok(())
    }

    /// Current occupancy of one network.
    pub fn pool(&self, id: NetworkId) -> Result<AddressPool, IpamError> {
        Ok(self.repo.read(|s| {
            let network: Network = s.get_network(id)?;
            AddressPool::load(s, network)
        })?)
    }

    pub fn network_usage(&self, id: NetworkId) -> Result<NetworkUsage, IpamError> {
        Ok(self.pool(id)?.usage())
    }

    /// Usage of every network, in persistence order.
    pub fn list_network_usage(&self) -> Result<Vec<(Network, NetworkUsage)>, IpamError> {
        Ok(self.repo.read(|s| {
            let hosts: Vec<Host> = s.list_all_hosts()?;
            let ranges: Vec<DhcpRange> = s.list_dhcp_ranges()?;
            let out: Vec<(Network, NetworkUsage)> = s
                .list_networks()?
                .into_iter()
                .map(|n| {
                    let usage = AddressPool::new(n.clone(), &hosts, &ranges).usage();
                    (n, usage)
                })
                .collect();
            Ok::<_, StoreError>(out)
        })?)
    }

    pub fn next_available(&self, id: NetworkId) -> Result<Ipv4Addr, IpamError> {
        self.pool(id)?.next_available()
    }

    pub fn list_available(&self, id: NetworkId, limit: Option<usize>) -> Result<Vec<Ipv4Addr>, IpamError> {
        Ok(self.pool(id)?.list_available(limit))
    }

    /// Classify a single address: assigned host, active DHCP range,
    /// free address of a managed network, or unmanaged.
    pub fn query_ip(&self, address: &str) -> Result<IpStatus, IpamError> {
        let ip: Ipv4Addr = parse_ipv4(address)?;
        Ok(self.repo.read(|s| {
            if let Some(host) = s.find_host_by_ip(ip)? {
                return Ok(IpStatus::Assigned(host));
            }
            for network in s.list_networks()? {
                if !network.contains(ip) {
                    continue;
                }
                let hit = s
                    .list_dhcp_ranges_by_network(network.id, true)?
                    .into_iter()
                    .find(|r| r.contains(ip));
                return Ok(match hit {
                    Some(range) => IpStatus::Dhcp { range, network },
                    None => IpStatus::Available(network),
                });
            }
            Ok::<_, StoreError>(IpStatus::Unmanaged)
        })?)
    }

    /* ---------------------------------- */
    /* hosts                              */

    pub fn list_hosts(&self, filter: &HostFilter) -> Result<Vec<Host>, IpamError> {
        let hosts: Vec<Host> = self.repo.read(|s| s.list_all_hosts())?;
        Ok(hosts.into_iter().filter(|h| filter.matches(h)).collect())
    }

    pub fn get_host(&self, id: HostId) -> Result<Host, IpamError> {
        Ok(self.repo.read(|s| s.get_host(id))?)
    }

    /**
    Create a host. Address syntax and global uniqueness are checked, and
    the owning network is auto-detected when `fields.network_id` is `None`.
    An explicit network must contain the address.
    */
    pub fn create_host(&self, fields: HostFields) -> Result<Host, IpamError> {
        let host: Host = self
            .repo
            .transaction(|s| insert_host(s, fields, self.assign_default()))?;
        info!(id = host.id, ip = %host.ip_address, network_id = ?host.network_id, "host created");
        Ok(host)
    }

    /**
    Update a host. On an address change the new address is re-validated
    (uniqueness excludes the host itself) and, without an explicit
    `network_id`, the owning network is detected again. Without an address
    change and without an explicit id the current owner is kept.

    `is_assigned`, `last_seen` and `discovery_source` are only overwritten
    when supplied.
    */
    pub fn update_host(&self, id: HostId, fields: HostFields) -> Result<Host, IpamError> {
        let host: Host = self.repo.transaction(|s| {
            let current: Host = s.get_host(id)?;
            let ip: Ipv4Addr = parse_ipv4(&fields.ip_address)?;
            let ip_changed: bool = ip != current.ip_address;

            if ip_changed {
                if let Some(other) = s.find_host_by_ip(ip)? {
                    if other.id != id {
                        return Err(IpamError::DuplicateAddress(ip));
                    }
                }
            }

            let network_id: Option<NetworkId> = match fields.network_id {
                Some(explicit) => Some(check_owner(s, ip, explicit)?),
                None if ip_changed => detect_network(ip, &s.list_networks()?),
                None => current.network_id,
            };

            let updated = Host {
                id,
                ip_address: ip,
                hostname: non_blank(fields.hostname.as_deref()),
                cname: non_blank(fields.cname.as_deref()),
                mac_address: mac_or_none(fields.mac_address.as_deref())?,
                status: fields.status,
                is_assigned: fields.is_assigned.or(current.is_assigned),
                last_seen: fields.last_seen.or(current.last_seen),
                discovery_source: non_blank(fields.discovery_source.as_deref())
                    .or(current.discovery_source),
                description: fields.description,
                network_id,
            };
            s.update_host(&updated)?;
            Ok(updated)
        })?;
        info!(id, ip = %host.ip_address, network_id = ?host.network_id, "host updated");
        Ok(host)
    }

    pub fn delete_host(&self, id: HostId) -> Result<(), IpamError> {
        self.repo.transaction(|s| s.delete_host(id))?;
        info!(id, "host deleted");
        Ok(())
    }

    /**
    Create a host on the next free address of `network_id`. Address choice
    and insert share one transaction. Addresses held by hosts of *any*
    network are skipped, as host addresses are globally unique.

    A uniqueness violation on insert means another writer won the race; it
    surfaces as [IpamError::NextAddressTaken] and is retried once.
    */
    pub fn allocate_next_host(&self, network_id: NetworkId, fields: HostFields) -> Result<Host, IpamError> {
        let mut attempt: usize = 0;
        loop {
            attempt += 1;
            match self.try_allocate(network_id, fields.clone()) {
                Err(e) if e.is_retryable() && attempt < ALLOC_ATTEMPTS => {
                    warn!(network_id, attempt, "{e}; retrying");
                }
                res => return res,
            }
        }
    }

    fn try_allocate(&self, network_id: NetworkId, fields: HostFields) -> Result<Host, IpamError> {
        let host: Host = self.repo.transaction(|s| {
            let network: Network = s.get_network(network_id)?;
            let label: String = network.label();
            let pool: AddressPool = AddressPool::load(s, network)?;

            let mut chosen: Option<Ipv4Addr> = None;
            for ip in pool.available() {
                if s.find_host_by_ip(ip)?.is_none() {
                    chosen = Some(ip);
                    break;
                }
            }
            let ip: Ipv4Addr = chosen.ok_or(IpamError::NoAvailableAddress(label))?;

            let host: Host = new_host(ip, Some(network_id), fields, self.assign_default())?;
            s.insert_host(host).map_err(|e| match e {
                StoreError::UniqueViolation(UniqueKey::HostIp(ip)) => IpamError::NextAddressTaken(ip),
                other => other.into(),
            })
        })?;
        info!(id = host.id, ip = %host.ip_address, network_id, "host allocated");
        Ok(host)
    }

    /* ---------------------------------- */
    /* DHCP ranges                        */

    /// All ranges, or only those of one network, in persistence order.
    pub fn list_dhcp_ranges(&self, network_id: Option<NetworkId>) -> Result<Vec<DhcpRange>, IpamError> {
        Ok(self.repo.read(|s| match network_id {
            Some(id) => s.list_dhcp_ranges_by_network(id, false),
            None => s.list_dhcp_ranges(),
        })?)
    }

    pub fn get_dhcp_range(&self, id: RangeId) -> Result<DhcpRange, IpamError> {
        Ok(self.repo.read(|s| s.get_dhcp_range(id))?)
    }

    /// Validate and insert in one transaction.
    pub fn create_dhcp_range(&self, fields: DhcpRangeFields) -> Result<DhcpRange, IpamError> {
        let range: DhcpRange = self.repo.transaction(|s| {
            let (network, start, end) = resolve_range(s, &fields)?;
            let siblings: Vec<DhcpRange> = s.list_dhcp_ranges_by_network(network.id, true)?;
            validate_range(&network, start, end, &siblings, None)?;

            let range = DhcpRange {
                id: 0,
                network_id: network.id,
                start_ip: start,
                end_ip: end,
                description: fields.description,
                is_active: fields.is_active,
            };
            Ok::<_, IpamError>(s.insert_dhcp_range(range)?)
        })?;
        info!(id = range.id, network_id = range.network_id, range = %range.range(), "DHCP range created");
        Ok(range)
    }

    /// Validate against the sibling ranges, excluding the range itself.
    pub fn update_dhcp_range(&self, id: RangeId, fields: DhcpRangeFields) -> Result<DhcpRange, IpamError> {
        let range: DhcpRange = self.repo.transaction(|s| {
            s.get_dhcp_range(id)?;
            let (network, start, end) = resolve_range(s, &fields)?;
            let siblings: Vec<DhcpRange> = s.list_dhcp_ranges_by_network(network.id, true)?;
            validate_range(&network, start, end, &siblings, Some(id))?;

            let range = DhcpRange {
                id,
                network_id: network.id,
                start_ip: start,
                end_ip: end,
                description: fields.description,
                is_active: fields.is_active,
            };
            s.update_dhcp_range(&range)?;
            Ok::<_, IpamError>(range)
        })?;
        info!(id, network_id = range.network_id, range = %range.range(), "DHCP range updated");
        Ok(range)
    }

    pub fn delete_dhcp_range(&self, id: RangeId) -> Result<(), IpamError> {
        self.repo.transaction(|s| s.delete_dhcp_range(id))?;
        info!(id, "DHCP range deleted");
        Ok(())
    }
}

/* ######################################################################### */
/* transaction bodies, shared with the import pipeline                       */

fn build_network(id: NetworkId, fields: NetworkFields, block: Cidr) -> Network {
    Network {
        id,
        network: fields.network,
        cidr: fields.cidr,
        block,
        broadcast_address: block.broadcast(),
        name: fields.name,
        domain: fields.domain,
        vlan_id: fields.vlan_id,
        location: fields.location,
        description: fields.description,
    }
}

fn ensure_unique_block<S: Store + ?Sized>(
    s: &S,
    block: Cidr,
    own_id: Option<NetworkId>,
) -> Result<(), IpamError> {
    let clash = s
        .list_networks()?
        .into_iter()
        .any(|n| Some(n.id) != own_id && n.block == block);
    match clash {
        true => Err(IpamError::DuplicateNetwork(block.to_string())),
        false => Ok(()),
    }
}

pub(crate) fn insert_network<S: Store + ?Sized>(s: &mut S, fields: NetworkFields) -> Result<Network, IpamError> {
    let block: Cidr = parse_network(&fields.network, fields.cidr)?;
    ensure_unique_block(s, block, None)?;
    Ok(s.insert_network(build_network(0, fields, block))?)
}

/// The explicit owner must exist and contain `ip`.
fn check_owner<S: Store + ?Sized>(s: &S, ip: Ipv4Addr, id: NetworkId) -> Result<NetworkId, IpamError> {
    let network: Network = s.get_network(id)?;
    if !network.contains(ip) {
        return Err(IpamError::NotInNetwork {
            ip,
            network: network.label(),
        });
    }
    Ok(id)
}

fn mac_or_none(text: Option<&str>) -> Result<Option<String>, IpamError> {
    match non_blank(text) {
        Some(mac) => Ok(Some(normalize_mac(&mac)?)),
        None => Ok(None),
    }
}

fn new_host(
    ip: Ipv4Addr,
    network_id: Option<NetworkId>,
    fields: HostFields,
    assign_default: Option<bool>,
) -> Result<Host, IpamError> {
    Ok(Host {
        id: 0,
        ip_address: ip,
        hostname: non_blank(fields.hostname.as_deref()),
        cname: non_blank(fields.cname.as_deref()),
        mac_address: mac_or_none(fields.mac_address.as_deref())?,
        status: fields.status,
        is_assigned: fields.is_assigned.or(assign_default),
        last_seen: fields.last_seen,
        discovery_source: non_blank(fields.discovery_source.as_deref()),
        description: fields.description,
        network_id,
    })
}

pub(crate) fn insert_host<S: Store + ?Sized>(
    s: &mut S,
    fields: HostFields,
    assign_default: Option<bool>,
) -> Result<Host, IpamError> {
    let ip: Ipv4Addr = parse_ipv4(&fields.ip_address)?;
    if s.find_host_by_ip(ip)?.is_some() {
        return Err(IpamError::DuplicateAddress(ip));
    }

    let network_id: Option<NetworkId> = match fields.network_id {
        Some(explicit) => Some(check_owner(s, ip, explicit)?),
        None => {
            let detected = detect_network(ip, &s.list_networks()?);
            debug!(%ip, network_id = ?detected, "network auto-detected");
            detected
        }
    };

    let host: Host = new_host(ip, network_id, fields, assign_default)?;
    Ok(s.insert_host(host)?)
}

fn resolve_range<S: Store + ?Sized>(
    s: &S,
    fields: &DhcpRangeFields,
) -> Result<(Network, Ipv4Addr, Ipv4Addr), IpamError> {
    let network: Network = s.get_network(fields.network_id)?;
    let start: Ipv4Addr = parse_ipv4(&fields.start_ip)?;
    let end: Ipv4Addr = parse_ipv4(&fields.end_ip)?;
    Ok((network, start, end))
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryRepository, MemoryStore};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    const NET_1: &str = "192.168.1.0";
    const NET_2: &str = "10.0.0.0";

    fn ipam() -> Ipam<MemoryRepository> {
        Ipam::new(MemoryRepository::new(), IpamConfig::default())
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_scenario_next_available() {
        let ipam = ipam();
        let net: Network = ipam.create_network(NetworkFields::new(NET_1, 24)).unwrap();
        assert_eq!(ipam.next_available(net.id).unwrap(), ip("192.168.1.1"));
        assert_eq!(ipam.next_available(net.id).unwrap(), ip("192.168.1.1"));

        ipam.create_host(HostFields::new("192.168.1.1")).unwrap();
        assert_eq!(ipam.next_available(net.id).unwrap(), ip("192.168.1.2"));

        ipam.create_dhcp_range(DhcpRangeFields::new(net.id, "192.168.1.2", "192.168.1.10"))
            .unwrap();
        assert_eq!(ipam.next_available(net.id).unwrap(), ip("192.168.1.11"));
        assert_eq!(
            ipam.list_available(net.id, Some(2)).unwrap(),
            vec![ip("192.168.1.11"), ip("192.168.1.12")]
        );
    }

    #[test]
    fn test_delete_network() {
        let ipam = ipam();
        let empty: Network = ipam.create_network(NetworkFields::new(NET_2, 24)).unwrap();
        ipam.delete_network(empty.id).unwrap();
        assert!(matches!(ipam.get_network(empty.id), Err(IpamError::NotFound { .. })));

        let net: Network = ipam.create_network(NetworkFields::new(NET_1, 24)).unwrap();
        let host: Host = ipam.create_host(HostFields::new("192.168.1.50")).unwrap();
        assert_eq!(
            ipam.delete_network(net.id),
            Err(IpamError::HasAssignedHosts { network: "192.168.1.0/24".into(), count: 1 })
        );

        ipam.delete_host(host.id).unwrap();
        ipam.delete_network(net.id).unwrap();
        assert!(matches!(ipam.delete_network(net.id), Err(IpamError::NotFound { .. })));
    }

    #[test]
    fn test_create_host_rules() {
        let ipam = ipam();
        let net: Network = ipam.create_network(NetworkFields::new(NET_1, 24)).unwrap();

        let host: Host = ipam.create_host(HostFields::new("192.168.1.20")).unwrap();
        assert_eq!(host.network_id, Some(net.id));
        assert_eq!(host.status, HostStatus::Active);
        assert_eq!(host.is_assigned, Some(true));

        let outside: Host = ipam.create_host(HostFields::new("172.16.0.1")).unwrap();
        assert_eq!(outside.network_id, None);

        assert_eq!(
            ipam.create_host(HostFields::new("192.168.1.20")),
            Err(IpamError::DuplicateAddress(ip("192.168.1.20")))
        );
        assert!(matches!(
            ipam.create_host(HostFields::new("192.168.1.300")),
            Err(IpamError::InvalidAddress(_))
        ));

        let mut fields = HostFields::new("172.16.0.2");
        fields.network_id = Some(net.id);
        assert!(matches!(ipam.create_host(fields), Err(IpamError::NotInNetwork { .. })));

        let mut fields = HostFields::new("192.168.1.21");
        fields.mac_address = Some("AA-BB-CC-DD-EE-FF".into());
        fields.is_assigned = Some(false);
        let host: Host = ipam.create_host(fields).unwrap();
        assert_eq!(host.mac_address.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(host.is_assigned, Some(false));
    }

    #[test]
    fn test_assign_default_from_config() {
        let cfg = IpamConfig { host_assign_on_create: false };
        let ipam = Ipam::new(MemoryRepository::new(), cfg);
        let host: Host = ipam.create_host(HostFields::new("10.1.1.1")).unwrap();
        assert_eq!(host.is_assigned, Some(false));
    }

    #[test]
    fn test_detect_first_match_wins() {
        let ipam = ipam();
        let wide: Network = ipam.create_network(NetworkFields::new(NET_2, 8)).unwrap();
        let narrow: Network = ipam.create_network(NetworkFields::new("10.1.0.0", 16)).unwrap();
        let networks: Vec<Network> = ipam.list_networks().unwrap();
        assert_eq!(detect_network(ip("10.1.2.3"), &networks), Some(wide.id));
        assert_eq!(detect_network(ip("11.0.0.1"), &networks), None);
        assert_ne!(wide.id, narrow.id);
    }

    #[test]
    fn test_update_host_redetects_on_ip_change() {
        let ipam = ipam();
        let a: Network = ipam.create_network(NetworkFields::new(NET_1, 24)).unwrap();
        let b: Network = ipam.create_network(NetworkFields::new(NET_2, 24)).unwrap();
        let mut fields = HostFields::new("192.168.1.5");
        fields.last_seen = crate::coerce::parse_timestamp("2024-05-01T00:00:00Z").unwrap();
        let host: Host = ipam.create_host(fields).unwrap();
        assert_eq!(host.network_id, Some(a.id));

        // same address, no explicit id: owner kept, unsupplied fields kept
        let mut same = HostFields::new("192.168.1.5");
        same.hostname = Some("web".into());
        let updated: Host = ipam.update_host(host.id, same).unwrap();
        assert_eq!(updated.network_id, Some(a.id));
        assert_eq!(updated.hostname.as_deref(), Some("web"));
        assert_eq!(updated.last_seen, host.last_seen);
        assert_eq!(updated.is_assigned, Some(true));

        let moved: Host = ipam.update_host(host.id, HostFields::new("10.0.0.5")).unwrap();
        assert_eq!(moved.network_id, Some(b.id));

        let gone: Host = ipam.update_host(host.id, HostFields::new("172.16.0.5")).unwrap();
        assert_eq!(gone.network_id, None);

        ipam.create_host(HostFields::new("10.0.0.6")).unwrap();
        assert_eq!(
            ipam.update_host(host.id, HostFields::new("10.0.0.6")),
            Err(IpamError::DuplicateAddress(ip("10.0.0.6")))
        );
        assert!(matches!(
            ipam.update_host(999, HostFields::new("10.0.0.7")),
            Err(IpamError::NotFound { .. })
        ));
    }

    #[test]
    fn test_network_uniqueness_and_shrink() {
        let ipam = ipam();
        let net: Network = ipam.create_network(NetworkFields::new("192.168.1.5", 24)).unwrap();
        assert_eq!(net.network, "192.168.1.5");
        assert_eq!(net.broadcast_address, ip("192.168.1.255"));
        assert_eq!(
            ipam.create_network(NetworkFields::new(NET_1, 24)),
            Err(IpamError::DuplicateNetwork("192.168.1.0/24".into()))
        );
        // same base, other prefix is a different block
        ipam.create_network(NetworkFields::new(NET_1, 25)).unwrap();

        for last in 1..=3 {
            let mut f = HostFields::new(format!("192.168.1.{last}"));
            f.network_id = Some(net.id);
            ipam.create_host(f).unwrap();
        }
        let shrunk: Network = ipam.update_network(net.id, NetworkFields::new(NET_1, 30)).unwrap();
        assert_eq!(shrunk.broadcast_address, ip("192.168.1.3"));
        let usage: NetworkUsage = ipam.network_usage(net.id).unwrap();
        assert_eq!((usage.total_hosts, usage.used_hosts, usage.available_hosts), (2, 3, -1));
    }

    #[test]
    fn test_dhcp_ranges() {
        let ipam = ipam();
        let net: Network = ipam.create_network(NetworkFields::new(NET_2, 24)).unwrap();
        let r1: DhcpRange = ipam
            .create_dhcp_range(DhcpRangeFields::new(net.id, "10.0.0.10", "10.0.0.20"))
            .unwrap();

        let res = ipam.create_dhcp_range(DhcpRangeFields::new(net.id, "10.0.0.20", "10.0.0.30"));
        assert!(matches!(res, Err(IpamError::Overlap { id, .. }) if id == r1.id));
        ipam.create_dhcp_range(DhcpRangeFields::new(net.id, "10.0.0.21", "10.0.0.30"))
            .unwrap();
        assert_eq!(ipam.list_dhcp_ranges(Some(net.id)).unwrap().len(), 2);

        // growing r1 in place is fine until it hits the sibling
        ipam.update_dhcp_range(r1.id, DhcpRangeFields::new(net.id, "10.0.0.5", "10.0.0.20"))
            .unwrap();
        let res = ipam.update_dhcp_range(r1.id, DhcpRangeFields::new(net.id, "10.0.0.5", "10.0.0.25"));
        assert!(matches!(res, Err(IpamError::Overlap { .. })));
        assert_eq!(ipam.get_dhcp_range(r1.id).unwrap().start_ip, ip("10.0.0.5"));

        let res = ipam.create_dhcp_range(DhcpRangeFields::new(net.id, "10.0.1.1", "10.0.1.5"));
        assert!(matches!(res, Err(IpamError::OutOfBounds { .. })));
        let res = ipam.create_dhcp_range(DhcpRangeFields::new(net.id, "10.0.0.90", "10.0.0.80"));
        assert!(matches!(res, Err(IpamError::InvertedRange { .. })));
        let res = ipam.create_dhcp_range(DhcpRangeFields::new(42, "10.0.0.90", "10.0.0.99"));
        assert!(matches!(res, Err(IpamError::NotFound { id: 42, .. })));

        ipam.delete_dhcp_range(r1.id).unwrap();
        assert_eq!(ipam.list_dhcp_ranges(None).unwrap().len(), 1);
    }

    #[test]
    fn test_allocate_next_host() {
        let ipam = ipam();
        let a: Network = ipam.create_network(NetworkFields::new(NET_2, 29)).unwrap();

        // unowned host on .1 blocks the address globally
        ipam.repository()
            .transaction(|s| {
                let h = new_host(ip("10.0.0.1"), None, HostFields::new("10.0.0.1"), None)?;
                Ok::<_, IpamError>(s.insert_host(h)?)
            })
            .unwrap();
        assert!(ipam.pool(a.id).unwrap().is_available(ip("10.0.0.1")));

        let host: Host = ipam.allocate_next_host(a.id, HostFields::default()).unwrap();
        assert_eq!(host.ip_address, ip("10.0.0.2"));
        assert_eq!(host.network_id, Some(a.id));

        for _ in 3..=6 {
            ipam.allocate_next_host(a.id, HostFields::default()).unwrap();
        }
        assert!(matches!(
            ipam.allocate_next_host(a.id, HostFields::default()),
            Err(IpamError::NoAvailableAddress(_))
        ));
    }

    #[test]
    fn test_query_ip() {
        let ipam = ipam();
        let net: Network = ipam.create_network(NetworkFields::new(NET_1, 24)).unwrap();
        ipam.create_host(HostFields::new("192.168.1.1")).unwrap();
        ipam.create_dhcp_range(DhcpRangeFields::new(net.id, "192.168.1.100", "192.168.1.200"))
            .unwrap();

        assert_eq!(ipam.query_ip("192.168.1.1").unwrap().as_str(), "assigned");
        assert_eq!(ipam.query_ip("192.168.1.150").unwrap().as_str(), "dhcp");
        assert_eq!(ipam.query_ip("192.168.1.2").unwrap().as_str(), "available");
        assert_eq!(ipam.query_ip("8.8.8.8").unwrap(), IpStatus::Unmanaged);
        assert!(ipam.query_ip("nope").is_err());
    }

    #[test]
    fn test_list_hosts_filter() {
        let ipam = ipam();
        let net: Network = ipam.create_network(NetworkFields::new(NET_1, 24)).unwrap();
        for (addr, name, status) in [
            ("192.168.1.1", "Web-01", HostStatus::Active),
            ("192.168.1.2", "db-01", HostStatus::Reserved),
            ("10.9.9.9", "web-02", HostStatus::Active),
        ] {
            let mut f = HostFields::new(addr);
            f.hostname = Some(name.into());
            f.status = status;
            ipam.create_host(f).unwrap();
        }

        let web = HostFilter { hostname: Some("web".into()), ..Default::default() };
        assert_eq!(ipam.list_hosts(&web).unwrap().len(), 2);

        let in_net = HostFilter { network_id: Some(net.id), status: Some(HostStatus::Reserved), ..Default::default() };
        let found: Vec<Host> = ipam.list_hosts(&in_net).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].hostname.as_deref(), Some("db-01"));
    }

    /* ---------------------------------- */

    /// Memory store whose next `failures` host inserts hit the address index.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failures: usize,
    }

    #[rustfmt::skip]
    impl Store for FlakyStore {
        fn list_networks(&self) -> Result<Vec<Network>, StoreError> { self.inner.list_networks() }
        fn get_network(&self, id: NetworkId) -> Result<Network, StoreError> { self.inner.get_network(id) }
        fn insert_network(&mut self, network: Network) -> Result<Network, StoreError> { self.inner.insert_network(network) }
        fn update_network(&mut self, network: &Network) -> Result<(), StoreError> { self.inner.update_network(network) }
        fn delete_network(&mut self, id: NetworkId) -> Result<(), StoreError> { self.inner.delete_network(id) }

        fn list_all_hosts(&self) -> Result<Vec<Host>, StoreError> { self.inner.list_all_hosts() }
        fn list_hosts_by_network(&self, id: NetworkId) -> Result<Vec<Host>, StoreError> { self.inner.list_hosts_by_network(id) }
        fn get_host(&self, id: HostId) -> Result<Host, StoreError> { self.inner.get_host(id) }
        fn find_host_by_ip(&self, ip: Ipv4Addr) -> Result<Option<Host>, StoreError> { self.inner.find_host_by_ip(ip) }
        fn update_host(&mut self, host: &Host) -> Result<(), StoreError> { self.inner.update_host(host) }
        fn delete_host(&mut self, id: HostId) -> Result<(), StoreError> { self.inner.delete_host(id) }

        fn insert_host(&mut self, host: Host) -> Result<Host, StoreError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(StoreError::UniqueViolation(UniqueKey::HostIp(host.ip_address)));
            }
            self.inner.insert_host(host)
        }

        fn list_dhcp_ranges(&self) -> Result<Vec<DhcpRange>, StoreError> { self.inner.list_dhcp_ranges() }
        fn list_dhcp_ranges_by_network(&self, id: NetworkId, active_only: bool) -> Result<Vec<DhcpRange>, StoreError> {
            self.inner.list_dhcp_ranges_by_network(id, active_only)
        }
        fn get_dhcp_range(&self, id: RangeId) -> Result<DhcpRange, StoreError> { self.inner.get_dhcp_range(id) }
        fn insert_dhcp_range(&mut self, range: DhcpRange) -> Result<DhcpRange, StoreError> { self.inner.insert_dhcp_range(range) }
        fn update_dhcp_range(&mut self, range: &DhcpRange) -> Result<(), StoreError> { self.inner.update_dhcp_range(range) }
        fn delete_dhcp_range(&mut self, id: RangeId) -> Result<(), StoreError> { self.inner.delete_dhcp_range(id) }
    }

    /// Like [MemoryRepository], but the failure counter survives rollback.
    #[derive(Default)]
    struct FlakyRepository {
        store: Mutex<FlakyStore>,
    }

    impl FlakyRepository {
        fn fail_host_inserts(&self, n: usize) {
            self.store.lock().failures = n;
        }
    }

    impl Repository for FlakyRepository {
        type Store = FlakyStore;

        fn read<T, E, F>(&self, f: F) -> Result<T, E>
        where
            F: FnOnce(&Self::Store) -> Result<T, E>,
        {
            f(&*self.store.lock())
        }

        fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
        where
            F: FnOnce(&mut Self::Store) -> Result<T, E>,
        {
            let mut store = self.store.lock();
            let snapshot: MemoryStore = store.inner.clone();
            let res = f(&mut *store);
            if res.is_err() {
                store.inner = snapshot;
            }
            res
        }
    }

    fn flaky_ipam(failures: usize) -> (Ipam<FlakyRepository>, NetworkId) {
        let ipam = Ipam::new(FlakyRepository::default(), IpamConfig::default());
        let net: Network = ipam.create_network(NetworkFields::new(NET_2, 29)).unwrap();
        ipam.repository().fail_host_inserts(failures);
        (ipam, net.id)
    }

    #[test]
    fn test_allocate_retries_after_lost_race() {
        let (ipam, net_id) = flaky_ipam(1);
        let host: Host = ipam.allocate_next_host(net_id, HostFields::default()).unwrap();
        assert_eq!(host.ip_address, ip("10.0.0.1"));
        assert_eq!(host.network_id, Some(net_id));
        assert_eq!(ipam.list_hosts(&HostFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_allocate_gives_up_after_second_race() {
        let (ipam, net_id) = flaky_ipam(2);
        let err: IpamError = ipam.allocate_next_host(net_id, HostFields::default()).unwrap_err();
        assert_eq!(err, IpamError::NextAddressTaken(ip("10.0.0.1")));
        assert!(err.is_retryable());
        assert!(ipam.list_hosts(&HostFilter::default()).unwrap().is_empty());

        // counter exhausted, next call goes through
        let host: Host = ipam.allocate_next_host(net_id, HostFields::default()).unwrap();
        assert_eq!(host.ip_address, ip("10.0.0.1"));
    }
}
