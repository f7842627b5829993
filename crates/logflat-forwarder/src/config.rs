// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;

use logflat::constants::{DEFAULT_EVENT_TYPE, DEFAULT_MAX_WRITE_RETRIES, DEFAULT_QUEUE_CAPACITY};
use logflat::util::parse_tags;

use crate::error::ForwarderError;
use crate::hostname::resolve_hostname;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Static inputs of the forwarder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Host identifier stamped on every event
    pub hostname: String,
    /// Logstash `@type` of every event
    pub event_type: String,
    /// Routing tags attached to every event
    pub tags: Vec<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// Bound of the record queue between the streams and the formatter
    pub queue_capacity: usize,
    pub max_write_retries: u32,
    /// Keep reading inputs after EOF
    pub follow: bool,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            hostname: "unknown".to_string(),
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            tags: Vec::new(),
            log_level: "info".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
            follow: false,
        }
    }
}

impl ForwarderConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ForwarderError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from any key lookup, validating the result.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ForwarderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let event_type = lookup("LOGFLAT_TYPE")
            .filter(|val| !val.trim().is_empty())
            .unwrap_or(defaults.event_type);
        let tags = lookup("LOGFLAT_TAGS")
            .map(|val| parse_tags(&val))
            .unwrap_or_default();
        let log_level = lookup("LOGFLAT_LOG_LEVEL")
            .map(|val| val.trim().to_lowercase())
            .unwrap_or(defaults.log_level);
        let queue_capacity =
            parse_number(&lookup, "LOGFLAT_QUEUE_CAPACITY")?.unwrap_or(defaults.queue_capacity);
        let max_write_retries = parse_number(&lookup, "LOGFLAT_MAX_WRITE_RETRIES")?
            .unwrap_or(defaults.max_write_retries);
        let follow = lookup("LOGFLAT_FOLLOW")
            .map(|val| matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(defaults.follow);

        let config = Self {
            hostname: resolve_hostname(&lookup),
            event_type,
            tags,
            log_level,
            queue_capacity,
            max_write_retries,
            follow,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ForwarderError> {
        if self.queue_capacity == 0 {
            return Err(ForwarderError::InvalidConfig(
                "LOGFLAT_QUEUE_CAPACITY must be greater than 0".to_string(),
            ));
        }

        if self.hostname.trim().is_empty() {
            return Err(ForwarderError::InvalidConfig(
                "hostname cannot be empty".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ForwarderError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

fn parse_number<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ForwarderError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ForwarderError::InvalidConfig(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
    }
}
