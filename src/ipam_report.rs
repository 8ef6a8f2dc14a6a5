// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use ipamcore::{
    FormatRegistry, ImportReport, Importer, Ipam, IpamConfig, IpamError, MemoryRepository,
};
use std::{env, error::Error, fs, process::ExitCode};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: ipam-report <networks.(csv|json)> [hosts.(csv|json)]";

type Engine = Ipam<MemoryRepository>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.len() > 2 {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }

    match run(&args[0], args.get(1).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(networks: &str, hosts: Option<&str>) -> Result<(), Box<dyn Error>> {
    let registry: FormatRegistry = FormatRegistry::default();
    let ipam: Engine = Ipam::new(MemoryRepository::new(), IpamConfig::from_env()?);

    load(&registry, networks, |imp, content| ipam.import_networks_from(imp, content))?;
    if let Some(path) = hosts {
        load(&registry, path, |imp, content| ipam.import_hosts_from(imp, content))?;
    }

    println!(
        "{:<20} {:>10} {:>10} {:>10}  {:<16}",
        "NETWORK", "TOTAL", "USED", "AVAILABLE", "NEXT FREE"
    );
    for (net, usage) in ipam.list_network_usage()? {
        let next: String = match ipam.next_available(net.id) {
            Ok(ip) => ip.to_string(),
            Err(IpamError::NoAvailableAddress(_)) => "-".to_string(),
            Err(e) => return Err(e.into()),
        };
        println!(
            "{:<20} {:>10} {:>10} {:>10}  {:<16}",
            net.label(),
            usage.total_hosts,
            usage.used_hosts,
            usage.available_hosts,
            next
        );
    }
    Ok(())
}

fn load<F, E>(registry: &FormatRegistry, path: &str, import: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&dyn Importer, &[u8]) -> Result<ImportReport, E>,
    E: Error + 'static,
{
    let format: &str = registry.detect_format_by_extension(path)?;
    let content: Vec<u8> = fs::read(path)?;
    let report: ImportReport = import(registry.importer(format)?, &content)?;
    for msg in &report.errors {
        warn!(file = path, "{msg}");
    }
    eprintln!(
        "{path}: {} imported, {} skipped, {} rejected",
        report.imported,
        report.skipped,
        report.errors.len()
    );
    Ok(())
}
