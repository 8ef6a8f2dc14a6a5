// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
File formats for bulk import and export.

An [Importer] turns file bytes into raw records and validates them; an
[Exporter] turns entities into file bytes. Handlers are looked up by name
in a [FormatRegistry] built once at startup and passed to whoever needs it.
*/

mod csv_io;
mod dnsmasq;
mod json_io;

use crate::{
    error::IpamError,
    import::{
        validate_hosts_data, validate_networks_data, ImportReport, RawHostRecord,
        RawNetworkRecord, RecordFormat, Validated, ValidHostRecord, ValidNetworkRecord,
    },
    ipam::{HostFilter, Ipam},
    model::{Host, Network, NetworkUsage},
    repository::Repository,
    strings::*,
};
use std::{error, fmt, io};
use tracing::debug;

pub use csv_io::{CsvExporter, CsvImporter};
pub use dnsmasq::{DnsmasqExporter, DnsmasqMode};
pub use json_io::{JsonExporter, JsonImporter};

#[rustfmt::skip]
#[derive(Debug)]
pub enum FormatError {
    Csv(csv::Error),
    Json(serde_json::Error),
    Io(io::Error),
    /// JSON document is neither an array nor an object with `data`
    Shape,
    Unsupported      { format: &'static str, operation: &'static str },
    UnknownFormat(String),
    UnknownExtension(String),
    Ipam(IpamError),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Csv(e) => write!(f, "CSV: {e}"),
            FormatError::Json(e) => write!(f, "JSON: {e}"),
            FormatError::Io(e) => write!(f, "{e}"),
            FormatError::Shape => write!(f, "{ERR_JSON_SHAPE}"),
            FormatError::Unsupported { format, operation } => {
                write!(f, "{format} {ERR_UNSUPPORTED} {operation}")
            }
            FormatError::UnknownFormat(name) => write!(f, "{ERR_UNKNOWN_FMT}: {name}"),
            FormatError::UnknownExtension(ext) => write!(f, "{ERR_UNKNOWN_EXT}: {ext}"),
            FormatError::Ipam(e) => write!(f, "{e}"),
        }
    }
}

impl error::Error for FormatError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            FormatError::Csv(e) => Some(e),
            FormatError::Json(e) => Some(e),
            FormatError::Io(e) => Some(e),
            FormatError::Ipam(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for FormatError {
    fn from(e: csv::Error) -> Self {
        FormatError::Csv(e)
    }
}

impl From<serde_json::Error> for FormatError {
    fn from(e: serde_json::Error) -> Self {
        FormatError::Json(e)
    }
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        FormatError::Io(e)
    }
}

impl From<IpamError> for FormatError {
    fn from(e: IpamError) -> Self {
        FormatError::Ipam(e)
    }
}

/* ######################################################################### */

/// Reads networks and hosts from file bytes.
pub trait Importer: Send + Sync {
    fn format_name(&self) -> &'static str;
    /// Lowercase, without the dot.
    fn file_extensions(&self) -> &'static [&'static str];
    /// Decides how rejected records are numbered and named.
    fn record_format(&self) -> RecordFormat;
    fn import_networks(&self, content: &[u8]) -> Result<Vec<RawNetworkRecord>, FormatError>;
    fn import_hosts(&self, content: &[u8]) -> Result<Vec<RawHostRecord>, FormatError>;

    fn validate_networks_data(&self, data: Vec<RawNetworkRecord>) -> Validated<ValidNetworkRecord> {
        validate_networks_data(data, self.record_format())
    }

    fn validate_hosts_data(&self, data: Vec<RawHostRecord>) -> Validated<ValidHostRecord> {
        validate_hosts_data(data, self.record_format())
    }
}

/// Writes networks and hosts as file bytes.
pub trait Exporter: Send + Sync {
    fn format_name(&self) -> &'static str;
    /// Without the dot.
    fn file_extension(&self) -> &'static str;
    fn mime_type(&self) -> &'static str;
    /// Networks paired with their usage, in persistence order.
    fn export_networks(&self, networks: &[(Network, NetworkUsage)]) -> Result<Vec<u8>, FormatError>;
    /// `networks` resolves each host's owner, if any.
    fn export_hosts(&self, hosts: &[Host], networks: &[Network]) -> Result<Vec<u8>, FormatError>;
}

/// Owner network of `host`, looked up in `networks`.
fn owner<'a>(host: &Host, networks: &'a [Network]) -> Option<&'a Network> {
    host.network_id
        .and_then(|id| networks.iter().find(|n| n.id == id))
}

/* ######################################################################### */

/**
Named import and export handlers. [FormatRegistry::default] registers the
built-in formats: importers `csv` and `json`; exporters `csv`, `json`,
`dnsmasq` (combined), `dnsmasq-dns` and `dnsmasq-dhcp`.

Lookups preserve registration order; registering an existing name replaces
the handler in place.
*/
pub struct FormatRegistry {
    importers: Vec<(String, Box<dyn Importer>)>,
    exporters: Vec<(String, Box<dyn Exporter>)>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.register_importer("csv", Box::new(CsvImporter));
        reg.register_importer("json", Box::new(JsonImporter));
        reg.register_exporter("csv", Box::new(CsvExporter));
        reg.register_exporter("json", Box::new(JsonExporter));
        reg.register_exporter("dnsmasq", Box::new(DnsmasqExporter::new(DnsmasqMode::Combined)));
        reg.register_exporter("dnsmasq-dns", Box::new(DnsmasqExporter::new(DnsmasqMode::Dns)));
        reg.register_exporter("dnsmasq-dhcp", Box::new(DnsmasqExporter::new(DnsmasqMode::Dhcp)));
        reg
    }
}

impl FormatRegistry {
    /// A registry with no handlers.
    pub fn empty() -> Self {
        Self {
            importers: Vec::new(),
            exporters: Vec::new(),
        }
    }

    pub fn register_importer(&mut self, name: &str, importer: Box<dyn Importer>) {
        debug!(name, format = importer.format_name(), "importer registered");
        match self.importers.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = importer,
            None => self.importers.push((name.to_string(), importer)),
        }
    }

    pub fn register_exporter(&mut self, name: &str, exporter: Box<dyn Exporter>) {
        debug!(name, format = exporter.format_name(), "exporter registered");
        match self.exporters.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = exporter,
            None => self.exporters.push((name.to_string(), exporter)),
        }
    }

    pub fn importer(&self, name: &str) -> Result<&dyn Importer, FormatError> {
        self.importers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, i)| i.as_ref())
            .ok_or_else(|| FormatError::UnknownFormat(name.to_string()))
    }

    pub fn exporter(&self, name: &str) -> Result<&dyn Exporter, FormatError> {
        self.exporters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e.as_ref())
            .ok_or_else(|| FormatError::UnknownFormat(name.to_string()))
    }

    pub fn importer_names(&self) -> impl Iterator<Item = &str> {
        self.importers.iter().map(|(n, _)| n.as_str())
    }

    pub fn exporter_names(&self) -> impl Iterator<Item = &str> {
        self.exporters.iter().map(|(n, _)| n.as_str())
    }

    /**
    Name of the first registered importer claiming the extension of
    `filename` (text after the last dot, case-insensitive; the whole name
    when there is no dot).
    */
    pub fn detect_format_by_extension(&self, filename: &str) -> Result<&str, FormatError> {
        let lower: String = filename.to_lowercase();
        let ext: &str = lower.rsplit('.').next().unwrap_or_default();
        self.importers
            .iter()
            .find(|(_, i)| i.file_extensions().contains(&ext))
            .map(|(n, _)| n.as_str())
            .ok_or_else(|| FormatError::UnknownExtension(ext.to_string()))
    }
}

/* ######################################################################### */

impl<R: Repository> Ipam<R> {
    /// Parse, validate and persist networks from `content`.
    pub fn import_networks_from(&self, importer: &dyn Importer, content: &[u8]) -> Result<ImportReport, FormatError> {
        let raw: Vec<RawNetworkRecord> = importer.import_networks(content)?;
        let batch = importer.validate_networks_data(raw);
        Ok(self.import_networks(batch)?)
    }

    /// Parse, validate and persist hosts from `content`.
    pub fn import_hosts_from(&self, importer: &dyn Importer, content: &[u8]) -> Result<ImportReport, FormatError> {
        let raw: Vec<RawHostRecord> = importer.import_hosts(content)?;
        let batch = importer.validate_hosts_data(raw);
        Ok(self.import_hosts(batch)?)
    }

    pub fn export_networks_with(&self, exporter: &dyn Exporter) -> Result<Vec<u8>, FormatError> {
        exporter.export_networks(&self.list_network_usage()?)
    }

    pub fn export_hosts_with(&self, exporter: &dyn Exporter) -> Result<Vec<u8>, FormatError> {
        let hosts: Vec<Host> = self.list_hosts(&HostFilter::default())?;
        exporter.export_hosts(&hosts, &self.list_networks()?)
    }
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::IpamConfig,
        model::{HostFields, NetworkFields},
        repository::MemoryRepository,
    };

    #[test]
    fn test_registry_defaults() {
        let reg = FormatRegistry::default();
        assert_eq!(reg.importer_names().collect::<Vec<_>>(), vec!["csv", "json"]);
        assert_eq!(
            reg.exporter_names().collect::<Vec<_>>(),
            vec!["csv", "json", "dnsmasq", "dnsmasq-dns", "dnsmasq-dhcp"]
        );
        assert_eq!(reg.exporter("dnsmasq-dhcp").unwrap().file_extension(), "conf");
        assert!(matches!(reg.importer("xml"), Err(FormatError::UnknownFormat(_))));
        assert!(matches!(reg.importer("dnsmasq"), Err(FormatError::UnknownFormat(_))));
    }

    #[test]
    fn test_detect_format_by_extension() {
        let reg = FormatRegistry::default();
        assert_eq!(reg.detect_format_by_extension("hosts.CSV").unwrap(), "csv");
        assert_eq!(reg.detect_format_by_extension("backup.2024.json").unwrap(), "json");
        match reg.detect_format_by_extension("networks.xlsx") {
            Err(FormatError::UnknownExtension(ext)) => assert_eq!(ext, "xlsx"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(reg.detect_format_by_extension("json").is_ok());
        assert!(FormatRegistry::empty().detect_format_by_extension("a.csv").is_err());
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut reg = FormatRegistry::default();
        reg.register_exporter("csv", Box::new(JsonExporter));
        assert_eq!(reg.exporter("csv").unwrap().mime_type(), "application/json");
        assert_eq!(reg.exporter_names().next(), Some("csv"));
    }

    #[test]
    fn test_export_then_import_through_engine() {
        let reg = FormatRegistry::default();
        let src = Ipam::new(MemoryRepository::new(), IpamConfig::default());
        src.create_network(NetworkFields::new("192.168.10.0", 24)).unwrap();
        let mut fields = HostFields::new("192.168.10.5");
        fields.hostname = Some("web01".into());
        src.create_host(fields).unwrap();

        for name in ["csv", "json"] {
            let nets = src.export_networks_with(reg.exporter(name).unwrap()).unwrap();
            let hosts = src.export_hosts_with(reg.exporter(name).unwrap()).unwrap();

            let dst = Ipam::new(MemoryRepository::new(), IpamConfig::default());
            let importer = reg.importer(name).unwrap();
            let r = dst.import_networks_from(importer, &nets).unwrap();
            assert_eq!((r.imported, r.skipped), (1, 0), "{name}");
            let r = dst.import_hosts_from(importer, &hosts).unwrap();
            assert_eq!((r.imported, r.errors.len()), (1, 0), "{name}");

            let copied: Vec<Host> = dst.list_hosts(&HostFilter::default()).unwrap();
            assert_eq!(copied[0].hostname.as_deref(), Some("web01"));
            assert_eq!(copied[0].network_id, Some(1));
            assert_eq!(copied[0].is_assigned, Some(true));
        }
    }

    #[test]
    fn test_dnsmasq_refuses_networks() {
        let reg = FormatRegistry::default();
        let ipam = Ipam::new(MemoryRepository::new(), IpamConfig::default());
        ipam.create_network(NetworkFields::new("10.0.0.0", 8)).unwrap();
        let err = ipam
            .export_networks_with(reg.exporter("dnsmasq").unwrap())
            .unwrap_err();
        assert!(matches!(err, FormatError::Unsupported { .. }));
        assert_eq!(err.to_string(), "DNSmasq does not support network export");
    }
}
