// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Format-agnostic validation of bulk network and host records.

Every record ends up either valid or rejected with a message tagged by its
row (CSV, 1-based with the header counted, so the first data row is `Row 2`)
or entry (JSON, 1-based). One bad record never aborts the batch.
*/

use crate::{
    cidr::{parse_ipv4, parse_network, parse_prefix, AddressError, Cidr},
    coerce::{non_blank, normalize_mac, parse_bool, parse_timestamp},
    error::IpamError,
    ipam::{insert_host, insert_network, Ipam},
    model::{HostFields, HostStatus, NetworkFields},
    repository::{Repository, Store},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, net::Ipv4Addr};
use tracing::{debug, info, warn};

/// Where records came from; decides row numbering and field names in messages.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordFormat {
    Csv,
    Json,
}

impl RecordFormat {
    /// 1-based row/entry number of the record at `index`.
    pub fn number(&self, index: usize) -> usize {
        match self {
            RecordFormat::Csv => index + 2,
            RecordFormat::Json => index + 1,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            RecordFormat::Csv => "Row",
            RecordFormat::Json => "Entry",
        }
    }

    #[rustfmt::skip]
    fn field(&self, field: Field) -> &'static str {
        match (self, field) {
            (RecordFormat::Csv,  Field::NetworkCidr) => "Network, CIDR",
            (RecordFormat::Json, Field::NetworkCidr) => "network, cidr",
            (RecordFormat::Csv,  Field::IpAddress)   => "IP Address",
            (RecordFormat::Json, Field::IpAddress)   => "ip_address",
            (RecordFormat::Csv,  Field::IsAssigned)  => "Is Assigned",
            (RecordFormat::Json, Field::IsAssigned)  => "is_assigned",
            (RecordFormat::Csv,  Field::LastSeen)    => "Last Seen",
            (RecordFormat::Json, Field::LastSeen)    => "last_seen",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Field {
    NetworkCidr,
    IpAddress,
    IsAssigned,
    LastSeen,
}

/* ######################################################################### */

/// A network row as read from a file, all text. Missing columns are empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawNetworkRecord {
    pub network: String,
    pub cidr: String,
    pub vlan_id: String,
    pub location: String,
    pub description: String,
}

/// A network row ready for persistence.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidNetworkRecord {
    pub network: String,
    pub cidr: u8,
    pub block: Cidr,
    pub broadcast_address: Ipv4Addr,
    pub vlan_id: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl From<ValidNetworkRecord> for NetworkFields {
    fn from(r: ValidNetworkRecord) -> Self {
        NetworkFields {
            network: r.network,
            cidr: r.cidr,
            name: None,
            domain: None,
            vlan_id: r.vlan_id,
            location: r.location,
            description: r.description,
        }
    }
}

/// Boolean-ish input as it appeared in the source file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum RawFlag {
    /// absent, null or a blank CSV cell
    #[default]
    Unset,
    Bool(bool),
    Text(String),
    /// any other JSON value, always rejected
    Other(String),
}

/// A host row as read from a file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawHostRecord {
    pub ip_address: String,
    pub hostname: String,
    pub cname: String,
    pub mac_address: String,
    pub status: Option<String>,
    pub is_assigned: RawFlag,
    pub last_seen: Option<String>,
    pub discovery_source: String,
    pub description: String,
}

/// A host row ready for persistence.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidHostRecord {
    pub ip_address: Ipv4Addr,
    pub hostname: Option<String>,
    pub cname: Option<String>,
    pub mac_address: Option<String>,
    pub status: HostStatus,
    pub is_assigned: Option<bool>,
    pub last_seen: Option<DateTime<Utc>>,
    pub discovery_source: Option<String>,
    pub description: Option<String>,
}

impl From<ValidHostRecord> for HostFields {
    fn from(r: ValidHostRecord) -> Self {
        HostFields {
            ip_address: r.ip_address.to_string(),
            hostname: r.hostname,
            cname: r.cname,
            mac_address: r.mac_address,
            status: r.status,
            is_assigned: r.is_assigned,
            last_seen: r.last_seen,
            discovery_source: r.discovery_source,
            description: r.description,
            network_id: None,
        }
    }
}

/* ######################################################################### */

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordErrorKind {
    MissingNetworkFields,
    InvalidNetwork(AddressError),
    MissingIpAddress,
    InvalidIpAddress(AddressError),
    InvalidBoolean,
    InvalidTimestamp,
    InvalidMac,
}

/// Why one record was rejected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordError {
    pub format: RecordFormat,
    /// 1-based row/entry number
    pub number: usize,
    pub kind: RecordErrorKind,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_ = self.format;
        write!(f, "{} {}: ", fmt_.tag(), self.number)?;
        match &self.kind {
            RecordErrorKind::MissingNetworkFields => {
                write!(f, "Missing required fields ({})", fmt_.field(Field::NetworkCidr))
            }
            RecordErrorKind::InvalidNetwork(e) => write!(f, "Invalid network format - {e}"),
            RecordErrorKind::MissingIpAddress => {
                write!(f, "Missing required field ({})", fmt_.field(Field::IpAddress))
            }
            RecordErrorKind::InvalidIpAddress(e) => write!(f, "Invalid IP address - {e}"),
            RecordErrorKind::InvalidBoolean => {
                write!(f, "Invalid {} value", fmt_.field(Field::IsAssigned))
            }
            RecordErrorKind::InvalidTimestamp => {
                write!(f, "Invalid {} timestamp", fmt_.field(Field::LastSeen))
            }
            RecordErrorKind::InvalidMac => write!(f, "Invalid MAC address"),
        }
    }
}

/// Partition of a batch into accepted records and per-record rejections.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Validated<T> {
    pub valid: Vec<T>,
    pub errors: Vec<RecordError>,
}

impl<T> Validated<T> {
    /// Rejections as human-readable strings.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

/* ---------------------------------- */

/**
Validate one network record: both `network` and `cidr` present, the pair
parses as an IPv4 network, and `vlan_id` coerces to an integer. A VLAN id
that doesn't parse is dropped, not rejected.
*/
pub fn validate_network(raw: RawNetworkRecord) -> Result<ValidNetworkRecord, RecordErrorKind> {
    let network: String = raw.network.trim().to_string();
    let cidr_text: &str = raw.cidr.trim();
    if network.is_empty() || cidr_text.is_empty() {
        return Err(RecordErrorKind::MissingNetworkFields);
    }

    let cidr: u8 = parse_prefix(cidr_text).map_err(RecordErrorKind::InvalidNetwork)?;
    let block: Cidr = parse_network(&network, cidr).map_err(RecordErrorKind::InvalidNetwork)?;

    Ok(ValidNetworkRecord {
        network,
        cidr,
        block,
        broadcast_address: block.broadcast(),
        vlan_id: raw.vlan_id.trim().parse::<i32>().ok(),
        location: non_blank(Some(raw.location.as_str())),
        description: non_blank(Some(raw.description.as_str())),
    })
}

/**
Validate one host record. Status outside the whitelist silently becomes
`active`; `is_assigned` and `last_seen` must coerce or the record is
rejected, as is a malformed MAC; a blank discovery source becomes `None`.
*/
pub fn validate_host(raw: RawHostRecord) -> Result<ValidHostRecord, RecordErrorKind> {
    let ip_text: &str = raw.ip_address.trim();
    if ip_text.is_empty() {
        return Err(RecordErrorKind::MissingIpAddress);
    }
    let ip_address: Ipv4Addr = parse_ipv4(ip_text).map_err(RecordErrorKind::InvalidIpAddress)?;

    let status: HostStatus = HostStatus::normalize(raw.status.as_deref().map(str::trim));

    let is_assigned: Option<bool> = match raw.is_assigned {
        RawFlag::Unset => None,
        RawFlag::Bool(b) => Some(b),
        // present but blank text is not "unset" here
        RawFlag::Text(t) => match parse_bool(&t) {
            Ok(Some(b)) => Some(b),
            _ => return Err(RecordErrorKind::InvalidBoolean),
        },
        RawFlag::Other(_) => return Err(RecordErrorKind::InvalidBoolean),
    };

    let mac_address: Option<String> = match non_blank(Some(raw.mac_address.as_str())) {
        Some(mac) => Some(normalize_mac(&mac).map_err(|_| RecordErrorKind::InvalidMac)?),
        None => None,
    };

    let last_seen: Option<DateTime<Utc>> = match raw.last_seen.as_deref() {
        None => None,
        Some(text) => parse_timestamp(text).map_err(|_| RecordErrorKind::InvalidTimestamp)?,
    };

    Ok(ValidHostRecord {
        ip_address,
        hostname: non_blank(Some(raw.hostname.as_str())),
        cname: non_blank(Some(raw.cname.as_str())),
        mac_address,
        status,
        is_assigned,
        last_seen,
        discovery_source: non_blank(Some(raw.discovery_source.as_str())),
        description: non_blank(Some(raw.description.as_str())),
    })
}

fn partition<R, T>(
    data: Vec<R>,
    format: RecordFormat,
    check: impl Fn(R) -> Result<T, RecordErrorKind>,
) -> Validated<T> {
    let mut valid: Vec<T> = Vec::with_capacity(data.len());
    let mut errors: Vec<RecordError> = Vec::new();
    for (i, raw) in data.into_iter().enumerate() {
        match check(raw) {
            Ok(rec) => valid.push(rec),
            Err(kind) => {
                let err = RecordError {
                    format,
                    number: format.number(i),
                    kind,
                };
                warn!("import: {err}");
                errors.push(err);
            }
        }
    }
    Validated { valid, errors }
}

pub fn validate_networks_data(data: Vec<RawNetworkRecord>, format: RecordFormat) -> Validated<ValidNetworkRecord> {
    partition(data, format, validate_network)
}

pub fn validate_hosts_data(data: Vec<RawHostRecord>, format: RecordFormat) -> Validated<ValidHostRecord> {
    partition(data, format, validate_host)
}

/* ######################################################################### */

/// Outcome of persisting a validated batch.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// already present, left untouched
    pub skipped: usize,
    /// per-record rejections, reported as warnings
    pub errors: Vec<String>,
}

impl<R: Repository> Ipam<R> {
    /**
    Persist the valid subset of a network batch in one transaction.
    Networks whose address text or canonical block already exists are
    skipped.
    */
    pub fn import_networks(&self, batch: Validated<ValidNetworkRecord>) -> Result<ImportReport, IpamError> {
        let mut report = ImportReport {
            errors: batch.messages(),
            ..Default::default()
        };
        self.repository().transaction(|s| {
            for rec in batch.valid {
                let exists = s
                    .list_networks()?
                    .iter()
                    .any(|n| n.network == rec.network || n.block == rec.block);
                if exists {
                    debug!(network = %rec.block, "import: network exists, skipped");
                    report.skipped += 1;
                    continue;
                }
                insert_network(s, rec.into())?;
                report.imported += 1;
            }
            Ok::<_, IpamError>(())
        })?;
        info!(imported = report.imported, skipped = report.skipped, errors = report.errors.len(), "networks imported");
        Ok(report)
    }

    /**
    Persist the valid subset of a host batch in one transaction. Hosts whose
    address already exists are skipped; the rest get their network
    auto-detected.
    */
    pub fn import_hosts(&self, batch: Validated<ValidHostRecord>) -> Result<ImportReport, IpamError> {
        let mut report = ImportReport {
            errors: batch.messages(),
            ..Default::default()
        };
        self.repository().transaction(|s| {
            for rec in batch.valid {
                if s.find_host_by_ip(rec.ip_address)?.is_some() {
                    debug!(ip = %rec.ip_address, "import: host exists, skipped");
                    report.skipped += 1;
                    continue;
                }
                // imported rows keep a blank is_assigned unset
                insert_host(s, rec.into(), None)?;
                report.imported += 1;
            }
            Ok::<_, IpamError>(())
        })?;
        info!(imported = report.imported, skipped = report.skipped, errors = report.errors.len(), "hosts imported");
        Ok(report)
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::IpamConfig, repository::MemoryRepository};

    fn net(network: &str, cidr: &str) -> RawNetworkRecord {
        RawNetworkRecord {
            network: network.into(),
            cidr: cidr.into(),
            ..Default::default()
        }
    }

    fn host(ip: &str) -> RawHostRecord {
        RawHostRecord {
            ip_address: ip.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_networks_partition_and_numbering() {
        let data = vec![
            net("192.168.1.0", "24"),
            net("", "24"),
            net("192.168.2.0", "40"),
            net("192.168.300.0", "24"),
        ];
        let csv = validate_networks_data(data.clone(), RecordFormat::Csv);
        assert_eq!(csv.valid.len(), 1);
        assert_eq!(csv.valid[0].broadcast_address, Ipv4Addr::new(192, 168, 1, 255));
        let msgs: Vec<String> = csv.messages();
        assert_eq!(msgs[0], "Row 3: Missing required fields (Network, CIDR)");
        assert!(msgs[1].starts_with("Row 4: Invalid network format - "));
        assert!(msgs[2].starts_with("Row 5: Invalid network format - "));

        let json = validate_networks_data(data, RecordFormat::Json);
        assert_eq!(json.messages()[0], "Entry 2: Missing required fields (network, cidr)");
        assert_eq!(json.errors[2].number, 4);
    }

    #[test]
    fn test_network_vlan_coercion() {
        let mut raw = net("10.0.0.5", "8");
        raw.vlan_id = " 42 ".into();
        let rec = validate_network(raw.clone()).unwrap();
        assert_eq!(rec.vlan_id, Some(42));
        assert_eq!(rec.network, "10.0.0.5");
        assert_eq!(rec.block.to_string(), "10.0.0.0/8");

        raw.vlan_id = "vlan-7".into();
        assert_eq!(validate_network(raw).unwrap().vlan_id, None);
    }

    #[test]
    fn test_host_defaults() {
        let rec = validate_host(host("192.168.1.10")).unwrap();
        assert_eq!(rec.status, HostStatus::Active);
        assert_eq!(rec.is_assigned, None);
        assert_eq!(rec.last_seen, None);
        assert_eq!(rec.discovery_source, None);

        let mut raw = host("192.168.1.10");
        raw.status = Some("decommissioned".into());
        raw.discovery_source = "   ".into();
        let rec = validate_host(raw).unwrap();
        assert_eq!(rec.status, HostStatus::Active);
        assert_eq!(rec.discovery_source, None);

        let mut raw = host("192.168.1.11");
        raw.status = Some("reserved".into());
        raw.is_assigned = RawFlag::Text("Yes".into());
        raw.last_seen = Some("2024-03-01T12:00:00Z".into());
        let rec = validate_host(raw).unwrap();
        assert_eq!(rec.status, HostStatus::Reserved);
        assert_eq!(rec.is_assigned, Some(true));
        assert!(rec.last_seen.is_some());

        let mut raw = host("192.168.1.12");
        raw.mac_address = "AA-BB-CC-00-11-22".into();
        assert_eq!(validate_host(raw.clone()).unwrap().mac_address.as_deref(), Some("aa:bb:cc:00:11:22"));
        raw.mac_address = "aa:bb:cc".into();
        assert_eq!(validate_host(raw), Err(RecordErrorKind::InvalidMac));
    }

    #[test]
    fn test_host_rejections() {
        let mut bad_bool = host("192.168.1.12");
        bad_bool.is_assigned = RawFlag::Text("maybe".into());
        let mut bad_ts = host("192.168.1.13");
        bad_ts.last_seen = Some("last tuesday".into());
        let mut other = host("192.168.1.14");
        other.is_assigned = RawFlag::Other("3".into());

        let data = vec![host("192.168.1.10"), bad_bool, host(""), bad_ts, host("1.2.3.4.5"), other];
        let res = validate_hosts_data(data, RecordFormat::Csv);
        assert_eq!(res.valid.len(), 1);
        let kinds: Vec<&RecordErrorKind> = res.errors.iter().map(|e| &e.kind).collect();
        assert_eq!(kinds[0], &RecordErrorKind::InvalidBoolean);
        assert_eq!(kinds[1], &RecordErrorKind::MissingIpAddress);
        assert_eq!(kinds[2], &RecordErrorKind::InvalidTimestamp);
        assert!(matches!(kinds[3], RecordErrorKind::InvalidIpAddress(_)));
        assert_eq!(kinds[4], &RecordErrorKind::InvalidBoolean);
        assert_eq!(
            res.messages()[..3].to_vec(),
            vec![
                "Row 3: Invalid Is Assigned value".to_string(),
                "Row 4: Missing required field (IP Address)".to_string(),
                "Row 5: Invalid Last Seen timestamp".to_string(),
            ]
        );
    }

    #[test]
    fn test_import_persists_valid_subset() {
        let ipam = Ipam::new(MemoryRepository::new(), IpamConfig::default());

        let nets = validate_networks_data(
            vec![net("192.168.1.0", "24"), net("192.168.1.0", "24"), net("x", "24")],
            RecordFormat::Json,
        );
        let report = ipam.import_networks(nets).unwrap();
        assert_eq!((report.imported, report.skipped, report.errors.len()), (1, 1, 1));

        let mut bad = host("192.168.1.11");
        bad.is_assigned = RawFlag::Text("maybe".into());
        let hosts = validate_hosts_data(
            vec![host("192.168.1.10"), bad, host("10.1.1.1"), host("192.168.1.10")],
            RecordFormat::Csv,
        );
        let report = ipam.import_hosts(hosts).unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors, vec!["Row 3: Invalid Is Assigned value".to_string()]);

        let stored = ipam.query_ip("192.168.1.10").unwrap();
        match stored {
            crate::model::IpStatus::Assigned(h) => {
                assert_eq!(h.network_id, Some(1));
                assert_eq!(h.status, HostStatus::Active);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(ipam.query_ip("192.168.1.11").unwrap() != crate::model::IpStatus::Unmanaged);
    }
}
