// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Severity tags recognized inside a header's brackets.

use serde::Serialize;
use std::fmt;

/// Every token accepted as a level tag. Matching is exact and case-sensitive.
pub const VOCABULARY: [&str; 11] = [
    "DEBU", "DEBG", "DEBUG", "INFO", "ERROR", "ERRO", "WARN", "FATAL", "FATA", "METRIC", "METR",
];

const METRIC_TOKENS: [&str; 2] = ["METRIC", "METR"];

/// A level tag taken from the vocabulary, or [`Level::NA`] when a record had none.
///
/// The token is kept as written (`ERRO` stays `ERRO`) since that is what gets
/// forwarded in the event's `level` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Level(&'static str);

impl Level {
    /// Sentinel for records whose header had no usable bracketed tag.
    pub const NA: Level = Level("NA");

    /// Looks `token` up in the vocabulary.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Level> {
        VOCABULARY
            .iter()
            .find(|known| **known == token)
            .map(|known| Level(*known))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Metric records are routed away from the log output.
    #[must_use]
    pub fn is_metric(&self) -> bool {
        METRIC_TOKENS.contains(&self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
