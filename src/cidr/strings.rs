// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

pub(crate) static SLASH: &str = "/";

pub(crate) static ERR_INV_ADDR: &str = "invalid IPv4 address";
pub(crate) static ERR_INV_PREFIX: &str = "invalid prefix length";
pub(crate) static ERR_PREFIX_RANGE: &str = "prefix length out of range";
pub(crate) static ERR_CIDR_FMT: &str = "invalid CIDR format (expected ADDRESS/PREFIX)";
pub(crate) static ERR_RNG_ORDER: &str = "start IP is greater than end IP";
