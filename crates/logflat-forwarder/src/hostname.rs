// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname detection for the `@fields.host` of every event.

use tracing::warn;

/// Resolves the host identifier:
/// 1. `LOGFLAT_HOSTNAME`
/// 2. `HOSTNAME`
/// 3. the system hostname
/// 4. `"unknown"`
///
/// Empty values count as unset.
pub fn resolve_hostname<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    for key in ["LOGFLAT_HOSTNAME", "HOSTNAME"] {
        if let Some(hostname) = lookup(key).filter(|h| !h.trim().is_empty()) {
            return hostname.trim().to_string();
        }
    }

    match nix::unistd::gethostname() {
        Ok(hostname) => {
            if let Some(hostname) = hostname.to_str().filter(|h| !h.is_empty()) {
                return hostname.to_string();
            }
            warn!("System hostname is not valid UTF-8");
        }
        Err(e) => warn!("Failed to get system hostname: {}", e),
    }

    warn!("Could not determine hostname, using 'unknown'");
    "unknown".to_string()
}
