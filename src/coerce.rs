// Copyright (c) 2026 Mikko Tanner. All rights reserved.
// Licensed under the MIT License or the Apache License, Version 2.0.
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lenient text-to-value coercions shared by the import pipeline, the
//! orchestrator and configuration loading.

use crate::error::IpamError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref BOOL_TOKENS: HashMap<&'static str, bool> = {
        let mut m = HashMap::new();
        for t in ["1", "true", "yes", "on"] {
            m.insert(t, true);
        }
        for f in ["0", "false", "no", "off"] {
            m.insert(f, false);
        }
        m
    };

    static ref MAC_RE: Regex =
        Regex::new(r"^[0-9A-Fa-f]{2}([:-])[0-9A-Fa-f]{2}(?:[:-][0-9A-Fa-f]{2}){4}$").unwrap();
}

#[rustfmt::skip]
static OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

#[rustfmt::skip]
static NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/**
Boolean-like text: `1/true/yes/on` and `0/false/no/off`, case-insensitive,
surrounding whitespace ignored. Blank text is "unset".
*/
pub fn parse_bool(text: &str) -> Result<Option<bool>, IpamError> {
    let norm: String = text.trim().to_lowercase();
    if norm.is_empty() {
        return Ok(None);
    }
    match BOOL_TOKENS.get(norm.as_str()) {
        Some(&val) => Ok(Some(val)),
        None => Err(IpamError::InvalidBoolean(text.to_string())),
    }
}

/**
ISO-8601 timestamp. A trailing `Z` is rewritten to `+00:00` before parsing.
Timestamps without an offset, and bare dates, are taken as UTC.
Blank text is "unset".
*/
pub fn parse_timestamp(text: &str) -> Result<Option<DateTime<Utc>>, IpamError> {
    let trimmed: &str = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let norm: String = match trimmed.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => trimmed.to_string(),
    };

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&norm, fmt) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&norm, fmt) {
            return Ok(Some(Utc.from_utc_datetime(&dt)));
        }
    }
    NaiveDate::parse_from_str(&norm, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(Utc.from_utc_datetime(&dt)))
        .ok_or_else(|| IpamError::InvalidTimestamp(text.to_string()))
}

/// Six hex octets separated consistently by `:` or `-`. Returned lowercase
/// and colon-separated, the form dnsmasq expects.
pub fn normalize_mac(text: &str) -> Result<String, IpamError> {
    let trimmed: &str = text.trim();
    let caps = MAC_RE
        .captures(trimmed)
        .ok_or_else(|| IpamError::InvalidMac(text.to_string()))?;
    let sep: &str = caps.get(1).map_or(":", |m| m.as_str());
    if trimmed.matches(sep).count() != 5 {
        return Err(IpamError::InvalidMac(text.to_string()));
    }
    Ok(trimmed.replace('-', ":").to_lowercase())
}

/// `None` for blank text, trimmed text otherwise.
pub fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[rustfmt::skip]
    #[test]
    fn test_parse_bool() {
        let tests: Vec<(&str, Option<bool>)> = vec![
            ("1", Some(true)),      ("true", Some(true)),
            (" YES ", Some(true)),  ("On", Some(true)),
            ("0", Some(false)),     ("FALSE", Some(false)),
            ("no", Some(false)),    ("off", Some(false)),
            ("", None),             ("   ", None),
        ];
        for (input, expected) in tests {
            assert_eq!(parse_bool(input).unwrap(), expected, "Failed: '{input}'");
        }
        assert!(matches!(parse_bool("maybe"), Err(IpamError::InvalidBoolean(_))));
        assert!(matches!(parse_bool("2"), Err(IpamError::InvalidBoolean(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        let zulu = parse_timestamp("2024-01-02T03:04:05Z").unwrap().unwrap();
        let offs = parse_timestamp("2024-01-02T05:04:05+02:00").unwrap().unwrap();
        assert_eq!(zulu, offs);
        assert_eq!((zulu.year(), zulu.month(), zulu.day()), (2024, 1, 2));
        assert_eq!((zulu.hour(), zulu.minute(), zulu.second()), (3, 4, 5));

        let naive = parse_timestamp("2024-01-02 03:04:05.250").unwrap().unwrap();
        assert_eq!(naive.timestamp_subsec_millis(), 250);

        let date = parse_timestamp("2024-01-02").unwrap().unwrap();
        assert_eq!(date.hour(), 0);

        assert_eq!(parse_timestamp("").unwrap(), None);
        assert!(matches!(parse_timestamp("yesterday"), Err(IpamError::InvalidTimestamp(_))));
        assert!(matches!(parse_timestamp("2024-13-01"), Err(IpamError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_normalize_mac() {
        assert_eq!(normalize_mac("AA:BB:CC:DD:EE:FF").unwrap(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(normalize_mac("aa-bb-cc-dd-ee-0f").unwrap(), "aa:bb:cc:dd:ee:0f");
        for bad in ["aa:bb:cc:dd:ee", "aa:bb-cc:dd:ee:ff", "gg:bb:cc:dd:ee:ff", "aabbccddeeff"] {
            assert!(normalize_mac(bad).is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ")), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
