// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

// error.rs
pub(crate) static ERR_OUT_OF_BOUNDS: &str = "DHCP range must be within the selected network";
pub(crate) static ERR_INVERTED: &str = "Start IP must be less than or equal to End IP";
pub(crate) static ERR_OVERLAP: &str = "DHCP range overlaps an existing range";
pub(crate) static ERR_DUP_ADDR: &str = "IP address already exists";
pub(crate) static ERR_NOT_IN_NET: &str = "IP address is outside the selected network";
pub(crate) static ERR_DUP_NET: &str = "Network already exists";
pub(crate) static ERR_NO_ADDR: &str = "No available IP addresses in this network";
pub(crate) static ERR_ADDR_TAKEN: &str = "next available address was taken concurrently";
pub(crate) static ERR_HAS_HOSTS: &str = "Cannot delete network with";
pub(crate) static ERR_NOT_FOUND: &str = "not found";
pub(crate) static ERR_BOOL: &str = "Expected a boolean value";
pub(crate) static ERR_TIMESTAMP: &str = "Expected an ISO 8601 timestamp";
pub(crate) static ERR_MAC: &str = "invalid MAC address";

// repository
pub(crate) static ERR_UNIQUE: &str = "unique constraint violated";

// formats
pub(crate) static ERR_UNSUPPORTED: &str = "does not support";
pub(crate) static ERR_UNKNOWN_FMT: &str = "Unknown format";
pub(crate) static ERR_UNKNOWN_EXT: &str = "Unsupported file extension";
pub(crate) static ERR_JSON_SHAPE: &str =
    "Invalid JSON format: expected array or object with 'data' field";
