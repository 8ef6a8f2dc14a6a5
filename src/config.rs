// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{coerce::parse_bool, error::IpamError};
use serde::{Deserialize, Serialize};
use std::env;

pub const ENV_HOST_ASSIGN_ON_CREATE: &str = "IPAM_HOST_ASSIGN_ON_CREATE";

/// Engine configuration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpamConfig {
    /// `is_assigned` given to hosts created without an explicit value.
    pub host_assign_on_create: bool,
}

impl Default for IpamConfig {
    fn default() -> Self {
        Self {
            host_assign_on_create: true,
        }
    }
}

impl IpamConfig {
    /// Defaults, overridden by `IPAM_*` environment variables when set.
    pub fn from_env() -> Result<Self, IpamError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IpamError> {
        let mut cfg: IpamConfig = IpamConfig::default();
        if let Some(val) = lookup(ENV_HOST_ASSIGN_ON_CREATE) {
            if let Some(flag) = parse_bool(&val)? {
                cfg.host_assign_on_create = flag;
            }
        }
        Ok(cfg)
    }
}
