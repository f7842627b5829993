// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Thresholds used by the line flattener and the formatter.
//!
//! The flattener's header heuristics are tuned for lines shaped like
//!
//! ```text
//! 2016/09/14 02:33:01.465711 entity.go:179: [ERROR] disk failure on write
//! ```
//!
//! and are collected here so they can be audited and overridden through
//! [`FlattenerConfig`](crate::flattener::FlattenerConfig).

/// Lines shorter than this (in bytes) can't carry a date and a level tag, so they
/// are always folded into the record being accumulated.
pub const MIN_HEADER_LINE_LEN: usize = 8;

/// Largest byte offset at which a header's opening `[` may appear.
pub const MAX_TAG_START: usize = 80;

/// Largest distance between a header's `[` and `]`. Anything wider is an
/// incidental bracket inside a message, not a level tag.
pub const MAX_TAG_SPAN: usize = 8;

/// Completed records with a payload shorter than this are dropped by the formatter.
pub const MIN_PAYLOAD_LEN: usize = 10;

/// Separator written after every line held in the accumulation buffer.
pub const LINE_DELIMITER: &str = "\n";

/// Default bound of the queue between the stream drivers and the formatter service.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1_000;

/// Default number of times a failed sink write is retried before the event is dropped.
pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 3;

/// Logstash type attached to events when none is configured.
pub const DEFAULT_EVENT_TYPE: &str = "golog";
