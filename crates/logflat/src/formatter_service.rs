// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::constants::{DEFAULT_MAX_WRITE_RETRIES, DEFAULT_QUEUE_CAPACITY};
use crate::event::LineEvent;
use crate::formatter::LineFormatter;
use crate::sink::EventSink;

/// Producer end of the record queue. Clone one per stream.
pub type RecordSender = mpsc::Sender<LineEvent>;

#[derive(Debug, Clone)]
pub struct FormatterOptions {
    /// Bound of the record queue; stream drivers wait when it is full.
    pub queue_capacity: usize,
    pub max_write_retries: u32,
    /// Where METRIC records go. They are dropped when unset.
    pub metrics_tx: Option<mpsc::Sender<LineEvent>>,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
            metrics_tx: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatterStats {
    pub received: u64,
    pub emitted: u64,
    /// Records the formatter declined: too short, no timestamp, or an
    /// unrouted metric.
    pub suppressed: u64,
    pub metrics_routed: u64,
    /// Events dropped after exhausting write retries.
    pub failed: u64,
}

/// Consumes completed records, formats them and writes them to a sink.
pub struct FormatterService<S> {
    formatter: LineFormatter,
    sink: S,
    rx: mpsc::Receiver<LineEvent>,
    max_write_retries: u32,
    metrics_tx: Option<mpsc::Sender<LineEvent>>,
    stats: FormatterStats,
}

impl<S: EventSink> FormatterService<S> {
    pub fn new(formatter: LineFormatter, sink: S, options: FormatterOptions) -> (Self, RecordSender) {
        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));

        let service = Self {
            formatter,
            sink,
            rx,
            max_write_retries: options.max_write_retries,
            metrics_tx: options.metrics_tx,
            stats: FormatterStats::default(),
        };

        (service, tx)
    }

    /// Runs until every [`RecordSender`] has been dropped and the queue is empty.
    pub async fn run(mut self) -> FormatterStats {
        debug!("Formatter service started");

        while let Some(record) = self.rx.recv().await {
            self.stats.received += 1;

            if record.is_metric() {
                self.route_metric(record).await;
                continue;
            }
            self.deliver(record).await;
        }

        if let Err(e) = self.sink.flush().await {
            error!("Failed to flush sink on shutdown: {}", e);
        }
        debug!("Formatter service stopped: {:?}", self.stats);
        self.stats
    }

    async fn route_metric(&mut self, record: LineEvent) {
        match &self.metrics_tx {
            Some(tx) => {
                if tx.send(record).await.is_err() {
                    warn!("Metrics receiver dropped, discarding metric record");
                    self.stats.suppressed += 1;
                } else {
                    self.stats.metrics_routed += 1;
                }
            }
            None => self.stats.suppressed += 1,
        }
    }

    async fn deliver(&mut self, mut record: LineEvent) {
        loop {
            let Some(event) = self.formatter.format(&record) else {
                self.stats.suppressed += 1;
                return;
            };

            match self.sink.send(&event).await {
                Ok(()) => {
                    self.stats.emitted += 1;
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    error!("Dropping record from {}: {}", record.source, e);
                    self.stats.failed += 1;
                    return;
                }
                Err(e) => {
                    record.write_errs += 1;
                    if record.write_errs > self.max_write_retries {
                        error!(
                            "Dropping record from {} after {} failed writes: {}",
                            record.source, record.write_errs, e
                        );
                        self.stats.failed += 1;
                        return;
                    }
                    warn!(
                        "Failed to write record from {} (attempt {}): {}",
                        record.source, record.write_errs, e
                    );
                }
            }
        }
    }
}
