// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
IPv4 address space allocation and consistency engine.

Each [Network] is a finite pool of usable addresses. [Host]s consume
addresses, active [DhcpRange]s reserve them, and the [Ipam] engine keeps the
three consistent: ranges stay inside their network and never overlap, host
addresses are unique, and the next free address is always the numerically
lowest one that is neither assigned nor reserved.

```ignore
use ipamcore::{Ipam, IpamConfig, MemoryRepository, NetworkFields};

let ipam = Ipam::new(MemoryRepository::new(), IpamConfig::from_env()?);
let net = ipam.create_network(NetworkFields::new("192.168.1.0", 24))?;
assert_eq!(ipam.next_available(net.id)?.to_string(), "192.168.1.1");
```
*/

pub mod cidr;
mod coerce;
mod config;
mod dhcp;
mod error;
pub mod formats;
pub mod import;
mod ipam;
mod model;
mod pool;
pub mod repository;
mod strings;

pub use coerce::{normalize_mac, parse_bool, parse_timestamp};
pub use config::{IpamConfig, ENV_HOST_ASSIGN_ON_CREATE};
pub use dhcp::validate_range;
pub use error::{Entity, IpamError};
pub use formats::{Exporter, FormatError, FormatRegistry, Importer};
pub use import::ImportReport;
pub use ipam::{detect_network, HostFilter, Ipam};
pub use model::*;
pub use pool::AddressPool;
pub use repository::{MemoryRepository, Repository, Store, StoreError};
