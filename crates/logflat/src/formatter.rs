// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns completed records into events for the sink.
//!
//! Metric records, records too short to be real log lines and records without
//! a timestamp produce no event. A payload holding a JSON object is forwarded
//! untouched in `@raw`; anything else becomes the text message.

use serde_json::value::RawValue;
use tracing::{debug, trace, warn};

use crate::constants::MIN_PAYLOAD_LEN;
use crate::event::{Event, EventFields, LineEvent};

/// Formats [`LineEvent`]s for one logstash type and tag set.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    host: String,
    event_type: String,
    tags: Vec<String>,
}

impl LineFormatter {
    #[must_use]
    pub fn new(host: impl Into<String>, event_type: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            host: host.into(),
            event_type: event_type.into(),
            tags,
        }
    }

    /// Returns `None` when the record should not be forwarded.
    #[must_use]
    pub fn format(&self, line: &LineEvent) -> Option<Event> {
        if line.is_metric() {
            trace!("Skipping metric record from {}", line.source);
            return None;
        }
        if line.data.len() < MIN_PAYLOAD_LEN {
            warn!("Invalid line? {:?}", line.data);
            return None;
        }
        let Some(timestamp) = line.timestamp else {
            debug!(
                "Dropping record without timestamp from {}: {:?}",
                line.source, line.data
            );
            return None;
        };

        let fields = EventFields {
            host: self.host.clone(),
            codefile: line.prefix.clone(),
            level: line.level,
            write_errs: line.write_errs,
        };

        let (message, raw) = match parse_json_payload(line) {
            Some(raw) => (String::new(), Some(raw)),
            None if line.prefix.is_empty() => (line.data.clone(), None),
            None => (format!("{} {}", line.prefix, line.data), None),
        };

        Some(Event {
            timestamp,
            source: line.source.to_string(),
            event_type: self.event_type.clone(),
            tags: self.tags.clone(),
            message,
            fields,
            raw,
        })
    }
}

fn parse_json_payload(line: &LineEvent) -> Option<Box<RawValue>> {
    if !line.is_json() {
        return None;
    }
    match serde_json::from_str::<Box<RawValue>>(line.data.trim()) {
        Ok(raw) => Some(raw),
        Err(e) => {
            trace!("Payload from {} is not JSON: {}", line.source, e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::datetime::parse_datetime;
    use crate::level::Level;
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn formatter() -> LineFormatter {
        LineFormatter::new("web-1", "golog", vec!["prod".to_string()])
    }

    fn record(level: &str, data: &str) -> LineEvent {
        LineEvent {
            data: data.to_string(),
            prefix: "entity.go:179".to_string(),
            timestamp: parse_datetime("2016/09/14 02:33:01.465711"),
            level: Level::from_token(level).unwrap_or(Level::NA),
            source: Arc::from("app.log"),
            write_errs: 0,
        }
    }

    #[test]
    fn test_text_record() {
        let event = formatter()
            .format(&record("ERROR", "disk failure on write"))
            .unwrap();

        assert_eq!(event.message, "entity.go:179 disk failure on write");
        assert!(event.raw.is_none());
        assert_eq!(event.source, "app.log");
        assert_eq!(event.event_type, "golog");
        assert_eq!(event.tags, vec!["prod".to_string()]);
        assert_eq!(event.timestamp, parse_datetime("2016/09/14 02:33:01.465711").unwrap());
        assert_eq!(event.fields.host, "web-1");
        assert_eq!(event.fields.codefile, "entity.go:179");
        assert_eq!(event.fields.level.as_str(), "ERROR");
        assert_eq!(event.fields.write_errs, 0);
    }

    #[test]
    fn test_text_record_without_prefix() {
        let mut line = record("INFO", "service started on :8080");
        line.prefix.clear();
        let event = formatter().format(&line).unwrap();
        assert_eq!(event.message, "service started on :8080");
    }

    #[test]
    fn test_json_record_is_kept_verbatim() {
        let payload = r#"{"user":"ann", "ms": 12.50,"tags":["a","b"]}"#;
        let event = formatter().format(&record("INFO", payload)).unwrap();

        assert_eq!(event.raw_json(), Some(payload));
        assert_eq!(event.message, "");
        assert_eq!(event.fields.codefile, "entity.go:179");
    }

    #[test]
    fn test_broken_json_falls_back_to_text() {
        let payload = r#"{"user":"ann", "ms": "#;
        let event = formatter().format(&record("INFO", payload)).unwrap();

        assert!(event.raw.is_none());
        assert_eq!(event.message, format!("entity.go:179 {payload}"));
    }

    #[test]
    fn test_metric_record_is_suppressed() {
        assert!(formatter()
            .format(&record("METRIC", "requests.count=1234 host=web-1"))
            .is_none());
        assert!(formatter()
            .format(&record("METR", "requests.count=1234 host=web-1"))
            .is_none());
    }

    #[test]
    #[traced_test]
    fn test_short_record_is_suppressed_with_warning() {
        assert!(formatter().format(&record("INFO", "ok")).is_none());
        assert!(logs_contain("Invalid line?"));
    }

    #[test]
    fn test_record_without_timestamp_is_suppressed() {
        let mut line = record("INFO", "a perfectly good message");
        line.timestamp = None;
        assert!(formatter().format(&line).is_none());
    }

    #[test]
    fn test_write_errs_are_reported() {
        let mut line = record("WARN", "slow request to upstream");
        line.write_errs = 2;
        let event = formatter().format(&line).unwrap();
        assert_eq!(event.fields.write_errs, 2);
    }
}
