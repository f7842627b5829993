// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Destinations for formatted events.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::SinkError;
use crate::event::Event;

#[async_trait]
pub trait EventSink: Send {
    /// Delivers one event. On error the caller decides whether to retry.
    async fn send(&mut self, event: &Event) -> Result<(), SinkError>;

    /// Pushes out anything the sink buffers internally.
    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes one JSON document per line, e.g. to stdout or a file.
///
/// When a write fails after part of a document went out, the rest of that
/// document is written before anything else, so every output line stays a
/// complete document. A retried event may then appear twice.
pub struct JsonLinesSink<W> {
    writer: W,
    written: u64,
    /// Unwritten tail of a document cut short by a write error.
    unfinished: Vec<u8>,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            unfinished: Vec::new(),
        }
    }

    /// Number of documents written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn finish_unfinished(&mut self) -> Result<(), SinkError> {
        if self.unfinished.is_empty() {
            return Ok(());
        }
        let tail = std::mem::take(&mut self.unfinished);
        debug!("Completing document cut short by an earlier write error");
        self.write_document(tail).await
    }

    /// Writes `document` fully, keeping whatever remains when a write fails
    /// part way through.
    async fn write_document(&mut self, mut document: Vec<u8>) -> Result<(), SinkError> {
        let mut offset = 0;
        while offset < document.len() {
            let err = match self.writer.write(&document[offset..]).await {
                Ok(0) => io::Error::from(io::ErrorKind::WriteZero),
                Ok(n) => {
                    offset += n;
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => e,
            };
            if offset > 0 {
                document.drain(..offset);
                self.unfinished = document;
            }
            return Err(err.into());
        }
        self.written += 1;
        Ok(())
    }
}

#[async_trait]
impl<W> EventSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, event: &Event) -> Result<(), SinkError> {
        let mut payload = serde_json::to_vec(event)?;
        payload.push(b'\n');
        self.finish_unfinished().await?;
        self.write_document(payload).await
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.finish_unfinished().await?;
        debug!("Flushing {} events written so far", self.written);
        self.writer.flush().await?;
        Ok(())
    }
}

/// Hands events to another task, for embedding the pipeline in a larger program.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send(&mut self, event: &Event) -> Result<(), SinkError> {
        self.tx.send(event.clone()).map_err(|_| SinkError::Closed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::event::EventFields;
    use crate::level::Level;
    use chrono::{TimeZone, Utc};
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Accepts `fail_at` bytes, fails one write, then accepts everything.
    struct TornWriter {
        out: Vec<u8>,
        fail_at: Option<usize>,
    }

    impl AsyncWrite for TornWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let so_far = self.out.len();
            let accepted = match self.fail_at {
                Some(limit) if so_far >= limit => {
                    self.fail_at = None;
                    return Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)));
                }
                Some(limit) => buf.len().min(limit - so_far),
                None => buf.len(),
            };
            self.out.extend_from_slice(&buf[..accepted]);
            Poll::Ready(Ok(accepted))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn event(message: &str) -> Event {
        Event {
            timestamp: Utc.with_ymd_and_hms(2016, 9, 14, 2, 33, 1).unwrap(),
            source: "app.log".to_string(),
            event_type: "golog".to_string(),
            tags: vec![],
            message: message.to_string(),
            fields: EventFields {
                host: "web-1".to_string(),
                codefile: "entity.go:179".to_string(),
                level: Level::from_token("INFO").unwrap(),
                write_errs: 0,
            },
            raw: None,
        }
    }

    #[tokio::test]
    async fn test_json_lines_sink_writes_one_document_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.send(&event("first message")).await.unwrap();
        sink.send(&event("second message")).await.unwrap();
        sink.flush().await.unwrap();
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["@message"], "first message");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["@message"], "second message");
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (mut sink, mut rx) = ChannelSink::new();
        sink.send(&event("hello there")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().message, "hello there");

        drop(rx);
        assert!(matches!(
            sink.send(&event("nobody listening")).await,
            Err(SinkError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_torn_document_is_completed_before_the_next() {
        let mut sink = JsonLinesSink::new(TornWriter {
            out: Vec::new(),
            fail_at: Some(10),
        });

        let result = sink.send(&event("first message")).await;
        assert!(matches!(result, Err(SinkError::Io(_))));
        assert_eq!(sink.written(), 0);

        sink.send(&event("second message")).await.unwrap();
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner().out).unwrap();
        let messages: Vec<String> = output
            .lines()
            .map(|line| {
                let doc: serde_json::Value = serde_json::from_str(line).unwrap();
                doc["@message"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(messages, vec!["first message", "second message"]);
    }

    #[tokio::test]
    async fn test_flush_completes_torn_document() {
        let mut sink = JsonLinesSink::new(TornWriter {
            out: Vec::new(),
            fail_at: Some(10),
        });
        assert!(sink.send(&event("only message")).await.is_err());

        sink.flush().await.unwrap();
        let output = String::from_utf8(sink.into_inner().out).unwrap();
        assert!(output.ends_with('\n'));
        let doc: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(doc["@message"], "only message");
    }
}
