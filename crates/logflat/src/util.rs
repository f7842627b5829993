// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helpers for reading the static inputs attached to every event.

/// Parses a comma-separated list of routing tags.
///
/// Entries are trimmed and empty entries skipped. A valid tag contains only
/// ASCII alphanumerics, underscores, periods, colons, slashes or dashes;
/// invalid tags are logged and left out.
///
/// # Examples
///
/// ```
/// use logflat::util::parse_tags;
///
/// assert_eq!(parse_tags("web, env:prod"), vec!["web", "env:prod"]);
/// assert_eq!(parse_tags("ok,not ok"), vec!["ok"]);
/// assert!(parse_tags("").is_empty());
/// ```
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .filter(|tag| {
            if let Some(invalid_char) = tag.chars().find(|&ch| !is_tag_char(ch)) {
                tracing::error!(
                    "Tag '{}' contains invalid character '{}'. Only ASCII alphanumerics and '_', '.', ':', '/', '-' are allowed. Ignoring tag.",
                    tag, invalid_char
                );
                return false;
            }
            true
        })
        .map(str::to_string)
        .collect()
}

fn is_tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | ':' | '/' | '-')
}
