// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Permissive parsing of the date prefix that opens a log header.
//!
//! A header begins with two space-separated columns, a date and a time:
//!
//! ```text
//! 2014/07/10 11:04:20.653185 filter_fluentd.go:16: [DEBUG] message
//! ^^^^^^^^^^^^^^^^^^^^^^^^^^
//! ```
//!
//! The candidate (everything before the second space) is tried against a table
//! of strftime patterns. Patterns without an offset are read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Patterns for candidates without a UTC offset.
const NAIVE_PATTERNS: &[&str] = &[
    // 2014/07/10 11:04:20.653185 (Go's log package)
    "%Y/%m/%d %H:%M:%S%.f",
    // 2013-05-25 13:25:32.475
    "%Y-%m-%d %H:%M:%S%.f",
    // 2013-05-25 13:25:32,475 (log4j, python logging)
    "%Y-%m-%d %H:%M:%S,%3f",
    "%Y.%m.%d %H:%M:%S%.f",
    "%Y%m%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Patterns for candidates carrying an offset on the time column.
const OFFSET_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y/%m/%d %H:%M:%S%.f%z",
    "%Y/%m/%d %H:%M:%S%.f%:z",
];

/// Date prefix found at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadingDate {
    /// The parsed point in time.
    pub timestamp: DateTime<Utc>,
    /// The exact text that was parsed.
    pub literal: String,
}

/// Parses `candidate` as a date and time, trying every known pattern.
#[must_use]
pub fn parse_datetime(candidate: &str) -> Option<DateTime<Utc>> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    // every known pattern starts with a digit
    if !candidate.as_bytes()[0].is_ascii_digit() {
        return None;
    }

    for pattern in OFFSET_PATTERNS {
        if let Ok(dt) = DateTime::parse_from_str(candidate, pattern) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    NAIVE_PATTERNS.iter().find_map(|pattern| {
        NaiveDateTime::parse_from_str(candidate, pattern)
            .ok()
            .map(|naive| naive.and_utc())
    })
}

/// Returns the date formed by the first two space-separated columns of `line`.
///
/// Lines with fewer than two spaces never start with a date.
#[must_use]
pub fn leading_date(line: &str) -> Option<LeadingDate> {
    let second_space = line.match_indices(' ').nth(1).map(|(idx, _)| idx)?;
    let literal = &line[..second_space];
    parse_datetime(literal).map(|timestamp| LeadingDate {
        timestamp,
        literal: literal.to_string(),
    })
}
