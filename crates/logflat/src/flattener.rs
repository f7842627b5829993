// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reassembles multi-line log output into one record per logical entry.
//!
//! Producers such as Go's `log` package write headers shaped like
//!
//! ```text
//!    [DATE]                  [SOURCE]              [LEVEL] [MESSAGE]
//! 2014/07/10 11:04:20.653185 filter_fluentd.go:16: [DEBUG] message
//! ```
//!
//! but panics, stack traces and multi-line messages spill over onto lines that
//! carry no header at all. The flattener buffers lines until it sees the next
//! header, then emits everything buffered so far as a single [`LineEvent`].
//! There is no end-of-record marker, so the decision is made from the current
//! line alone plus whether the previous line started with a date.
//!
//! A flattener belongs to exactly one stream and must be fed from one task.

use std::mem;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::constants::{LINE_DELIMITER, MAX_TAG_SPAN, MAX_TAG_START, MIN_HEADER_LINE_LEN};
use crate::datetime::{leading_date, LeadingDate};
use crate::event::LineEvent;
use crate::level::Level;

/// Header detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenerConfig {
    /// Shorter lines are always continuations.
    pub min_line_len: usize,
    /// Largest offset of the level tag's `[`.
    pub max_tag_start: usize,
    /// Largest distance from the level tag's `[` to its `]`.
    pub max_tag_span: usize,
}

impl Default for FlattenerConfig {
    fn default() -> Self {
        Self {
            min_line_len: MIN_HEADER_LINE_LEN,
            max_tag_start: MAX_TAG_START,
            max_tag_span: MAX_TAG_SPAN,
        }
    }
}

/// Positions of the first `[` and the first `]` in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BracketSpan {
    open: Option<usize>,
    close: Option<usize>,
}

impl BracketSpan {
    fn locate(text: &str) -> Self {
        Self {
            open: text.find('['),
            close: text.find(']'),
        }
    }

    /// Bounds of the tag when the brackets enclose one.
    fn tag_bounds(&self) -> Option<(usize, usize)> {
        match (self.open, self.close) {
            (Some(open), Some(close)) if open > 0 && open < close => Some((open, close)),
            _ => None,
        }
    }

    /// A `]` further than `max_span` past the `[` (or past the start of the
    /// text when there is no `[`) can't be closing a level tag.
    fn is_too_wide(&self, max_span: usize) -> bool {
        match (self.open, self.close) {
            (Some(open), Some(close)) => close > open + max_span,
            (None, Some(close)) => close >= max_span,
            _ => false,
        }
    }
}

/// Line reassembly state for a single stream.
#[derive(Debug)]
pub struct LineFlattener {
    source: Arc<str>,
    config: FlattenerConfig,
    buf: String,
    prev_was_date: bool,
    /// Date of the most recent dated line, committed only after that line's
    /// step has finished.
    prev_date: Option<LeadingDate>,
    line_count: u64,
}

impl LineFlattener {
    #[must_use]
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self::with_config(source, FlattenerConfig::default())
    }

    #[must_use]
    pub fn with_config(source: impl Into<Arc<str>>, config: FlattenerConfig) -> Self {
        Self {
            source: source.into(),
            config,
            buf: String::new(),
            prev_was_date: false,
            prev_date: None,
            line_count: 0,
        }
    }

    /// Number of lines pushed so far.
    #[must_use]
    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    /// Whether lines are waiting for the next header.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Consumes one raw line. Returns the previous record when this line opens
    /// a new one.
    pub fn push_line(&mut self, raw: &str) -> Option<LineEvent> {
        self.line_count += 1;
        let line = strip_line_ending(raw);

        if line.len() < self.config.min_line_len {
            self.append(line);
            return None;
        }

        let date = leading_date(line);
        let emitted = self.step(line, date.is_some());

        // The record emitted above must carry the date of the header that
        // opened it, so this line's date only becomes "previous" now.
        if let Some(date) = date {
            self.prev_date = Some(date);
        }
        emitted
    }

    /// Emits whatever is still buffered as a final record. Called when the
    /// stream ends and no further header will arrive.
    pub fn flush(&mut self) -> Option<LineEvent> {
        self.prev_was_date = false;
        let data = mem::take(&mut self.buf);
        self.record_from(&data)
    }

    fn step(&mut self, line: &str, starts_date: bool) -> Option<LineEvent> {
        let span = BracketSpan::locate(line);

        if let Some((open, close)) = span.tag_bounds() {
            if Level::from_token(&line[open + 1..close]).is_none() {
                trace!(
                    "{}:{} unknown level tag, folding line",
                    self.source,
                    self.line_count
                );
                self.append(line);
                return None;
            }
        }

        if !self.is_header(&span, starts_date) {
            self.append(line);
            self.prev_was_date = starts_date;
            return None;
        }

        if self.buf.is_empty() {
            // first header of the stream
            self.append(line);
            return None;
        }

        let data = mem::take(&mut self.buf);
        let emitted = self.record_from(&data);
        self.append(line);
        self.prev_was_date = starts_date;
        emitted
    }

    fn is_header(&self, span: &BracketSpan, starts_date: bool) -> bool {
        (span.open.is_some() || self.prev_was_date)
            && starts_date
            && !span.is_too_wide(self.config.max_tag_span)
            && span
                .open
                .map_or(true, |open| open <= self.config.max_tag_start)
    }

    /// Builds a record from drained buffer contents.
    fn record_from(&self, data: &str) -> Option<LineEvent> {
        if data.trim().is_empty() {
            return None;
        }

        let span = BracketSpan::locate(data);
        if span.is_too_wide(self.config.max_tag_span) {
            debug!(
                "{}:{} dropping record with malformed header: {:?}",
                self.source,
                self.line_count,
                first_line(data)
            );
            return None;
        }

        let (level, prefix, payload) = match span.tag_bounds() {
            Some((open, close)) => (
                Level::from_token(&data[open + 1..close]).unwrap_or(Level::NA),
                self.prefix_before(data, open),
                &data[close + 1..],
            ),
            None => {
                let body = self
                    .prev_date
                    .as_ref()
                    .and_then(|date| data.strip_prefix(date.literal.as_str()))
                    .unwrap_or(data);
                (Level::NA, String::new(), body)
            }
        };

        Some(LineEvent {
            data: payload
                .trim_start_matches(' ')
                .trim_end_matches(LINE_DELIMITER)
                .to_string(),
            prefix,
            timestamp: self.prev_date.as_ref().map(|date| date.timestamp),
            level,
            source: Arc::clone(&self.source),
            write_errs: 0,
        })
    }

    /// The `file:line` token between the header's date and its level tag.
    ///
    /// ```text
    /// 2016/09/14 02:33:01.465711 entity.go:179: [ERROR]
    ///                            ^^^^^^^^^^^^^
    /// ```
    fn prefix_before(&self, data: &str, open: usize) -> String {
        let start = self.prev_date.as_ref().map_or(0, |date| date.literal.len() + 1);
        let Some(between) = data.get(start..open) else {
            return String::new();
        };
        between
            .split(": ")
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    fn append(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push_str(LINE_DELIMITER);
    }
}

fn strip_line_ending(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}

fn first_line(data: &str) -> &str {
    data.split(LINE_DELIMITER).next().unwrap_or_default()
}
