// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Exporter, FormatError};
use crate::model::{Host, HostStatus, Network, NetworkUsage};

/// Which dnsmasq directives to emit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DnsmasqMode {
    /// `dhcp-host` for hosts with a MAC, `host-record` for the rest
    #[default]
    Combined,
    /// `host-record` for every host, MACs ignored
    Dns,
    /// `dhcp-host` only; hosts without a MAC are left out
    Dhcp,
}

impl DnsmasqMode {
    fn label(&self) -> &'static str {
        match self {
            DnsmasqMode::Combined => "COMBINED",
            DnsmasqMode::Dns => "DNS",
            DnsmasqMode::Dhcp => "DHCP",
        }
    }

    fn legend(&self) -> &'static str {
        match self {
            DnsmasqMode::Combined => {
                "# Combined mode: dhcp-host=MAC,IP,hostname + host-record=hostname,IP"
            }
            DnsmasqMode::Dns => "# DNS-only mode: host-record=hostname,IP",
            DnsmasqMode::Dhcp => "# DHCP-only mode: dhcp-host=MAC,IP,hostname",
        }
    }
}

enum Directive<'a> {
    DhcpHost { mac: &'a str, hostname: &'a str },
    HostRecord { hostname: &'a str },
}

/**
dnsmasq host configuration. Only active hosts with a hostname are exported;
everything else is skipped. Networks cannot be exported in this format.
*/
#[derive(Clone, Copy, Debug, Default)]
pub struct DnsmasqExporter {
    mode: DnsmasqMode,
}

impl DnsmasqExporter {
    pub fn new(mode: DnsmasqMode) -> Self {
        Self { mode }
    }

    fn directive<'a>(&self, host: &'a Host) -> Option<Directive<'a>> {
        if host.status != HostStatus::Active {
            return None;
        }
        let hostname: &str = host.hostname.as_deref().filter(|h| !h.trim().is_empty())?;
        let mac: Option<&str> = host.mac_address.as_deref();
        match (self.mode, mac) {
            (DnsmasqMode::Dns, _) | (DnsmasqMode::Combined, None) => {
                Some(Directive::HostRecord { hostname })
            }
            (DnsmasqMode::Combined | DnsmasqMode::Dhcp, Some(mac)) => {
                Some(Directive::DhcpHost { mac, hostname })
            }
            (DnsmasqMode::Dhcp, None) => None,
        }
    }

    /// Render the configuration file as text.
    pub fn render(&self, hosts: &[Host]) -> String {
        let (mut dhcp, mut dns) = (0usize, 0usize);
        let mut lines: Vec<String> = vec![
            format!("# DNSmasq host configuration - {} mode", self.mode.label()),
            format!("# Generated by {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            self.mode.legend().to_string(),
            String::new(),
            "# Active hosts".to_string(),
        ];

        for host in hosts {
            match self.directive(host) {
                Some(Directive::DhcpHost { mac, hostname }) => {
                    lines.push(format!("dhcp-host={mac},{},{hostname}", host.ip_address));
                    dhcp += 1;
                }
                Some(Directive::HostRecord { hostname }) => {
                    lines.push(format!("host-record={hostname},{}", host.ip_address));
                    dns += 1;
                }
                None => {}
            }
        }

        lines.push(String::new());
        lines.push(format!("# Total exported entries: {}", dhcp + dns));
        match self.mode {
            DnsmasqMode::Combined => {
                lines.push(format!("# DHCP reservations: {dhcp}"));
                lines.push(format!("# DNS-only records: {dns}"));
            }
            DnsmasqMode::Dns => lines.push(format!("# DNS records: {dns}")),
            DnsmasqMode::Dhcp => lines.push(format!("# DHCP reservations: {dhcp}")),
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

impl Exporter for DnsmasqExporter {
    fn format_name(&self) -> &'static str {
        "DNSmasq"
    }

    fn file_extension(&self) -> &'static str {
        "conf"
    }

    fn mime_type(&self) -> &'static str {
        "text/plain"
    }

    fn export_networks(&self, _networks: &[(Network, NetworkUsage)]) -> Result<Vec<u8>, FormatError> {
        Err(FormatError::Unsupported {
            format: self.format_name(),
            operation: "network export",
        })
    }

    fn export_hosts(&self, hosts: &[Host], _networks: &[Network]) -> Result<Vec<u8>, FormatError> {
        Ok(self.render(hosts).into_bytes())
    }
}

/* -------------------------------------------------------------------------- */
