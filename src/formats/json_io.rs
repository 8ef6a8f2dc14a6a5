// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{owner, Exporter, FormatError, Importer};
use crate::{
    import::{RawFlag, RawHostRecord, RawNetworkRecord, RecordFormat},
    model::{Host, HostStatus, Network, NetworkUsage},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::net::Ipv4Addr;

const EXPORT_VERSION: &str = "1.0";

/// Accepts the export envelope (`{"data": [...]}`) or a bare array.
fn entries(content: &[u8]) -> Result<Vec<Value>, FormatError> {
    let doc: Value = serde_json::from_slice(content)?;
    match doc {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(FormatError::Shape),
        },
        _ => Err(FormatError::Shape),
    }
}

/// Scalar field as trimmed text; absent or `null` is empty.
fn text(item: &Value, key: &str) -> String {
    match item.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

fn flag(item: &Value, key: &str) -> RawFlag {
    match item.get(key) {
        None | Some(Value::Null) => RawFlag::Unset,
        Some(Value::Bool(b)) => RawFlag::Bool(*b),
        Some(Value::String(s)) => RawFlag::Text(s.clone()),
        Some(other) => RawFlag::Other(other.to_string()),
    }
}

/* ######################################################################### */

pub struct JsonImporter;

impl Importer for JsonImporter {
    fn format_name(&self) -> &'static str {
        "JSON"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn record_format(&self) -> RecordFormat {
        RecordFormat::Json
    }

    fn import_networks(&self, content: &[u8]) -> Result<Vec<RawNetworkRecord>, FormatError> {
        Ok(entries(content)?
            .iter()
            .map(|item| RawNetworkRecord {
                network: text(item, "network"),
                cidr: text(item, "cidr"),
                vlan_id: text(item, "vlan_id"),
                location: text(item, "location"),
                description: text(item, "description"),
            })
            .collect())
    }

    fn import_hosts(&self, content: &[u8]) -> Result<Vec<RawHostRecord>, FormatError> {
        Ok(entries(content)?
            .iter()
            .map(|item| RawHostRecord {
                ip_address: text(item, "ip_address"),
                hostname: text(item, "hostname"),
                cname: text(item, "cname"),
                mac_address: text(item, "mac_address"),
                status: item.get("status").map(|_| text(item, "status")),
                is_assigned: flag(item, "is_assigned"),
                last_seen: Some(text(item, "last_seen")).filter(|s| !s.is_empty()),
                discovery_source: text(item, "discovery_source"),
                description: text(item, "description"),
            })
            .collect())
    }
}

/* ---------------------------------- */

#[derive(Serialize)]
struct Envelope<T> {
    export_type: &'static str,
    export_version: &'static str,
    data: Vec<T>,
}

#[derive(Serialize)]
struct Statistics {
    total_hosts: u64,
    used_hosts: u64,
    available_hosts: i64,
}

#[derive(Serialize)]
struct NetworkEntry<'a> {
    network: &'a str,
    cidr: u8,
    broadcast_address: Ipv4Addr,
    vlan_id: Option<i32>,
    location: Option<&'a str>,
    description: Option<&'a str>,
    statistics: Statistics,
}

#[derive(Serialize)]
struct OwnerRef<'a> {
    network: &'a str,
    cidr: u8,
    vlan_id: Option<i32>,
}

#[derive(Serialize)]
struct HostEntry<'a> {
    ip_address: Ipv4Addr,
    hostname: Option<&'a str>,
    cname: Option<&'a str>,
    mac_address: Option<&'a str>,
    status: HostStatus,
    is_assigned: Option<bool>,
    last_seen: Option<DateTime<Utc>>,
    discovery_source: Option<&'a str>,
    description: Option<&'a str>,
    network: Option<OwnerRef<'a>>,
}

/// Pretty-printed, two-space indented, wrapped in a versioned envelope.
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format_name(&self) -> &'static str {
        "JSON"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }

    fn export_networks(&self, networks: &[(Network, NetworkUsage)]) -> Result<Vec<u8>, FormatError> {
        let data: Vec<NetworkEntry> = networks
            .iter()
            .map(|(net, usage)| NetworkEntry {
                network: &net.network,
                cidr: net.cidr,
                broadcast_address: net.broadcast_address,
                vlan_id: net.vlan_id,
                location: net.location.as_deref(),
                description: net.description.as_deref(),
                statistics: Statistics {
                    total_hosts: usage.total_hosts,
                    used_hosts: usage.used_hosts,
                    available_hosts: usage.available_hosts,
                },
            })
            .collect();
        let env = Envelope {
            export_type: "networks",
            export_version: EXPORT_VERSION,
            data,
        };
        Ok(serde_json::to_vec_pretty(&env)?)
    }

    fn export_hosts(&self, hosts: &[Host], networks: &[Network]) -> Result<Vec<u8>, FormatError> {
        let data: Vec<HostEntry> = hosts
            .iter()
            .map(|h| HostEntry {
                ip_address: h.ip_address,
                hostname: h.hostname.as_deref(),
                cname: h.cname.as_deref(),
                mac_address: h.mac_address.as_deref(),
                status: h.status,
                is_assigned: h.is_assigned,
                last_seen: h.last_seen,
                discovery_source: h.discovery_source.as_deref(),
                description: h.description.as_deref(),
                network: owner(h, networks).map(|n| OwnerRef {
                    network: &n.network,
                    cidr: n.cidr,
                    vlan_id: n.vlan_id,
                }),
            })
            .collect();
        let env = Envelope {
            export_type: "hosts",
            export_version: EXPORT_VERSION,
            data,
        };
        Ok(serde_json::to_vec_pretty(&env)?)
    }
}

/* -------------------------------------------------------------------------- */
