// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{owner, Exporter, FormatError, Importer};
use crate::{
    import::{RawFlag, RawHostRecord, RawNetworkRecord, RecordFormat},
    model::{Host, Network, NetworkUsage},
};
use csv::{ReaderBuilder, StringRecord, Writer};

#[rustfmt::skip]
const NETWORK_HEADER: [&str; 9] = [
    "Network", "CIDR", "Broadcast Address", "VLAN ID", "Location", "Description",
    "Total Hosts", "Used Hosts", "Available Hosts",
];

#[rustfmt::skip]
const HOST_HEADER: [&str; 9] = [
    "IP Address", "Hostname", "MAC Address", "Status", "Is Assigned", "Last Seen",
    "Discovery Source", "Network", "Description",
];

/// Header-keyed view of one data row. Missing columns yield the default.
struct Row<'a> {
    headers: &'a StringRecord,
    record: &'a StringRecord,
}

impl Row<'_> {
    fn get(&self, column: &str, default: &str) -> String {
        self.headers
            .iter()
            .position(|h| h == column)
            .map(|i| self.record.get(i).unwrap_or_default())
            .unwrap_or(default)
            .trim()
            .to_string()
    }
}

fn read_rows<T>(content: &[u8], mut map: impl FnMut(Row) -> T) -> Result<Vec<T>, FormatError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(content);
    let headers: StringRecord = rdr.headers()?.clone();
    let mut out: Vec<T> = Vec::new();
    for result in rdr.records() {
        let record: StringRecord = result?;
        out.push(map(Row {
            headers: &headers,
            record: &record,
        }));
    }
    Ok(out)
}

fn opt_text(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or_default()
}

/* ######################################################################### */

/// Comma-separated values with a header row.
pub struct CsvImporter;

impl Importer for CsvImporter {
    fn format_name(&self) -> &'static str {
        "CSV"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn record_format(&self) -> RecordFormat {
        RecordFormat::Csv
    }

    fn import_networks(&self, content: &[u8]) -> Result<Vec<RawNetworkRecord>, FormatError> {
        read_rows(content, |row| RawNetworkRecord {
            network: row.get("Network", ""),
            cidr: row.get("CIDR", ""),
            vlan_id: row.get("VLAN ID", ""),
            location: row.get("Location", ""),
            description: row.get("Description", ""),
        })
    }

    fn import_hosts(&self, content: &[u8]) -> Result<Vec<RawHostRecord>, FormatError> {
        read_rows(content, |row| {
            let assigned: String = row.get("Is Assigned", "");
            let last_seen: String = row.get("Last Seen", "");
            RawHostRecord {
                ip_address: row.get("IP Address", ""),
                hostname: row.get("Hostname", ""),
                cname: String::new(),
                mac_address: row.get("MAC Address", ""),
                status: Some(row.get("Status", "active")),
                is_assigned: match assigned.is_empty() {
                    true => RawFlag::Unset,
                    false => RawFlag::Text(assigned),
                },
                last_seen: Some(last_seen).filter(|s| !s.is_empty()),
                discovery_source: row.get("Discovery Source", ""),
                description: row.get("Description", ""),
            }
        })
    }
}

/* ---------------------------------- */

pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format_name(&self) -> &'static str {
        "CSV"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }

    fn export_networks(&self, networks: &[(Network, NetworkUsage)]) -> Result<Vec<u8>, FormatError> {
        let mut wtr = Writer::from_writer(Vec::new());
        wtr.write_record(NETWORK_HEADER)?;
        for (net, usage) in networks {
            wtr.write_record([
                net.network.clone(),
                net.cidr.to_string(),
                net.broadcast_address.to_string(),
                net.vlan_id.map(|v| v.to_string()).unwrap_or_default(),
                opt_text(&net.location).to_string(),
                opt_text(&net.description).to_string(),
                usage.total_hosts.to_string(),
                usage.used_hosts.to_string(),
                usage.available_hosts.to_string(),
            ])?;
        }
        wtr.into_inner().map_err(|e| FormatError::Io(e.into_error()))
    }

    fn export_hosts(&self, hosts: &[Host], networks: &[Network]) -> Result<Vec<u8>, FormatError> {
        let mut wtr = Writer::from_writer(Vec::new());
        wtr.write_record(HOST_HEADER)?;
        for host in hosts {
            let assigned: &str = match host.is_assigned {
                Some(true) => "True",
                Some(false) => "False",
                None => "",
            };
            wtr.write_record([
                host.ip_address.to_string(),
                opt_text(&host.hostname).to_string(),
                opt_text(&host.mac_address).to_string(),
                host.status.to_string(),
                assigned.to_string(),
                host.last_seen.map(|t| t.to_rfc3339()).unwrap_or_default(),
                opt_text(&host.discovery_source).to_string(),
                owner(host, networks).map(Network::label).unwrap_or_default(),
                opt_text(&host.description).to_string(),
            ])?;
        }
        wtr.into_inner().map_err(|e| FormatError::Io(e.into_error()))
    }
}

/* -------------------------------------------------------------------------- */
