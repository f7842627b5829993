// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stream driver: reads raw lines from one source and feeds them to a
//! [`LineFlattener`], forwarding every completed record to the formatter queue.
//!
//! Each source gets its own driver and flattener. Records from one source keep
//! their input order since a single driver is the only producer for them.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::errors::StreamError;
use crate::event::LineEvent;
use crate::flattener::{FlattenerConfig, LineFlattener};
use crate::formatter_service::RecordSender;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Where raw lines come from.
#[derive(Debug, Clone)]
pub enum LineSource {
    File(PathBuf),
    Stdin,
    /// Replays fixed lines, for tests.
    MirrorTest(Vec<String>),
}

impl fmt::Display for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdin => write!(f, "stdin"),
            Self::MirrorTest(_) => write!(f, "mirror"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Keep reading after EOF, like `tail -f`, until cancelled.
    pub follow: bool,
    /// How long to wait at EOF before reading again in follow mode.
    pub poll_interval: Duration,
    pub flattener: FlattenerConfig,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            follow: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            flattener: FlattenerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub lines: u64,
    pub records: u64,
}

// LineReader abstracts the sources raw lines are read from.
enum LineReader {
    Buffered {
        reader: Box<dyn AsyncBufRead + Unpin + Send>,
        /// Bytes of a line whose `\n` has not arrived yet.
        partial: Vec<u8>,
    },
    MirrorTest(VecDeque<String>),
}

impl LineReader {
    fn buffered(reader: Box<dyn AsyncBufRead + Unpin + Send>) -> Self {
        LineReader::Buffered {
            reader,
            partial: Vec::new(),
        }
    }

    /// Reads the next complete line, terminator included. `None` at EOF; a
    /// trailing unterminated line is kept back until its `\n` arrives or
    /// [`LineReader::take_partial`] is called.
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        match self {
            LineReader::Buffered { reader, partial } => {
                // read_until appends to `partial`, so bytes read before a
                // cancellation or an EOF are kept for the next call
                reader.read_until(b'\n', partial).await?;
                if partial.last() != Some(&b'\n') {
                    return Ok(None);
                }
                let line = String::from_utf8_lossy(partial).into_owned();
                partial.clear();
                Ok(Some(line))
            }
            LineReader::MirrorTest(lines) => Ok(lines.pop_front()),
        }
    }

    /// Hands out the unterminated tail of the input, if any.
    fn take_partial(&mut self) -> Option<String> {
        match self {
            LineReader::Buffered { partial, .. } if !partial.is_empty() => {
                let line = String::from_utf8_lossy(partial).into_owned();
                partial.clear();
                Some(line)
            }
            _ => None,
        }
    }
}

/// Drives one source through its own flattener.
pub struct StreamDriver {
    source_name: String,
    reader: LineReader,
    flattener: LineFlattener,
    tx: RecordSender,
    cancel_token: CancellationToken,
    options: StreamOptions,
    records: u64,
}

impl StreamDriver {
    /// Opens `source`. Records are sent on `tx`; the driver stops at EOF (or,
    /// when following, once `cancel_token` fires).
    pub async fn open(
        source: LineSource,
        tx: RecordSender,
        cancel_token: CancellationToken,
        options: StreamOptions,
    ) -> Result<StreamDriver, StreamError> {
        let source_name = source.to_string();
        let reader = match source {
            LineSource::File(path) => {
                let file =
                    tokio::fs::File::open(&path)
                        .await
                        .map_err(|source| StreamError::Open {
                            path: path.display().to_string(),
                            source,
                        })?;
                LineReader::buffered(Box::new(BufReader::new(file)))
            }
            LineSource::Stdin => LineReader::buffered(Box::new(BufReader::new(tokio::io::stdin()))),
            LineSource::MirrorTest(lines) => LineReader::MirrorTest(lines.into()),
        };

        Ok(StreamDriver::new(source_name, reader, tx, cancel_token, options))
    }

    fn new(
        source_name: String,
        reader: LineReader,
        tx: RecordSender,
        cancel_token: CancellationToken,
        options: StreamOptions,
    ) -> StreamDriver {
        StreamDriver {
            flattener: LineFlattener::with_config(source_name.as_str(), options.flattener),
            source_name,
            reader,
            tx,
            cancel_token,
            options,
            records: 0,
        }
    }

    /// Main loop: reads until EOF or cancellation, then flushes the last
    /// buffered record and releases the queue sender. A read error also
    /// flushes before it is returned.
    pub async fn spin(mut self) -> Result<StreamSummary, StreamError> {
        debug!("Reading {}", self.source_name);

        loop {
            let line = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!("{}: cancelled", self.source_name);
                    break;
                }
                line = self.reader.next_line() => line,
            };

            match line {
                Ok(Some(line)) => self.push(&line).await?,
                Ok(None) if self.options.follow => {
                    tokio::select! {
                        _ = self.cancel_token.cancelled() => break,
                        _ = tokio::time::sleep(self.options.poll_interval) => {}
                    }
                }
                Ok(None) => break,
                Err(source) => {
                    self.finish().await?;
                    return Err(StreamError::Read {
                        source_name: self.source_name,
                        source,
                    });
                }
            }
        }

        self.finish().await?;

        let summary = StreamSummary {
            lines: self.flattener.line_count(),
            records: self.records,
        };
        info!(
            "{}: finished after {} lines, {} records",
            self.source_name, summary.lines, summary.records
        );
        Ok(summary)
    }

    async fn push(&mut self, line: &str) -> Result<(), StreamError> {
        if let Some(record) = self.flattener.push_line(line) {
            self.forward(record).await?;
        }
        Ok(())
    }

    /// Feeds any unterminated last line, then emits the open record.
    async fn finish(&mut self) -> Result<(), StreamError> {
        if let Some(line) = self.reader.take_partial() {
            self.push(&line).await?;
        }
        if let Some(record) = self.flattener.flush() {
            self.forward(record).await?;
        }
        Ok(())
    }

    async fn forward(&mut self, record: LineEvent) -> Result<(), StreamError> {
        trace!("{}: record {:?}", self.source_name, record.level);
        // waits while the queue is full
        self.tx
            .send(record)
            .await
            .map_err(|_| StreamError::HandoffClosed)?;
        self.records += 1;
        Ok(())
    }
}
