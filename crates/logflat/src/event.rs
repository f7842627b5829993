// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Records produced by the flattener and events produced by the formatter.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::value::RawValue;
use std::sync::Arc;

use crate::level::Level;

/// One reassembled log record, handed from the flattener to the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEvent {
    /// Message body: the header's text after the level tag, followed by any
    /// continuation lines.
    pub data: String,
    /// Source location written before the level tag, e.g. `entity.go:179`.
    pub prefix: String,
    /// Time parsed from the header that opened this record. `None` when no
    /// date had been seen yet.
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Level,
    /// Name of the stream the record was read from.
    pub source: Arc<str>,
    /// Number of failed attempts to write this record downstream.
    pub write_errs: u32,
}

impl LineEvent {
    #[must_use]
    pub fn is_metric(&self) -> bool {
        self.level.is_metric()
    }

    /// Whether the payload looks like a JSON object. This is only a hint; the
    /// formatter still has to parse it.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.data.trim_start().starts_with('{')
    }
}

/// Fields attached to every forwarded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventFields {
    pub host: String,
    pub codefile: String,
    pub level: Level,
    #[serde(rename = "WriteErrs")]
    pub write_errs: u32,
}

/// A logstash-style document ready for the sink.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "@source")]
    pub source: String,
    #[serde(rename = "@type")]
    pub event_type: String,
    #[serde(rename = "@tags", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "@message")]
    pub message: String,
    #[serde(rename = "@fields")]
    pub fields: EventFields,
    /// The record's payload when it was a JSON document, kept byte for byte.
    #[serde(rename = "@raw", skip_serializing_if = "Option::is_none")]
    pub raw: Option<Box<RawValue>>,
}

impl Event {
    #[must_use]
    pub fn raw_json(&self) -> Option<&str> {
        self.raw.as_deref().map(RawValue::get)
    }
}
