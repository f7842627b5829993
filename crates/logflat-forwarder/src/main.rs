// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod config;
mod error;
mod hostname;

use std::{env, path::PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use logflat::{
    event::LineEvent,
    formatter::LineFormatter,
    formatter_service::{FormatterOptions, FormatterService},
    sink::JsonLinesSink,
    stream::{LineSource, StreamDriver, StreamOptions},
};

use crate::{config::ForwarderConfig, error::ForwarderError};

const METRICS_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
pub async fn main() {
    let config = match ForwarderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!("Error creating config on logflat-forwarder startup: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.log_level);
    debug!("Logging subsystem enabled");

    let inputs: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(config, inputs).await {
        error!("logflat-forwarder stopped: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_level).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Maps command line arguments to sources; `-` or no arguments mean stdin.
fn input_sources(args: Vec<String>) -> Vec<LineSource> {
    if args.is_empty() {
        return vec![LineSource::Stdin];
    }
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-" => LineSource::Stdin,
            _ => LineSource::File(PathBuf::from(arg)),
        })
        .collect()
}

async fn run(config: ForwarderConfig, inputs: Vec<String>) -> Result<(), ForwarderError> {
    info!(
        "Forwarding as host {} with type {}",
        config.hostname, config.event_type
    );

    let (metrics_tx, metrics_rx) = mpsc::channel(METRICS_QUEUE_CAPACITY);
    let metrics_task = tokio::spawn(log_metrics(metrics_rx));

    let formatter = LineFormatter::new(
        config.hostname.clone(),
        config.event_type.clone(),
        config.tags.clone(),
    );
    let options = FormatterOptions {
        queue_capacity: config.queue_capacity,
        max_write_retries: config.max_write_retries,
        metrics_tx: Some(metrics_tx),
    };
    let (service, tx) =
        FormatterService::new(formatter, JsonLinesSink::new(tokio::io::stdout()), options);
    let service_task = tokio::spawn(service.run());

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, stopping streams");
            signal_token.cancel();
        }
    });

    let stream_options = StreamOptions {
        follow: config.follow,
        ..StreamOptions::default()
    };
    let mut drivers = Vec::new();
    for source in input_sources(inputs) {
        match StreamDriver::open(source, tx.clone(), cancel_token.clone(), stream_options).await {
            Ok(driver) => drivers.push(tokio::spawn(driver.spin())),
            Err(e) => error!("{e}"),
        }
    }
    // the service stops once every driver has released its sender
    drop(tx);

    let no_inputs = drivers.is_empty();
    let mut failure = None;
    for driver in drivers {
        match driver.await {
            Ok(Ok(summary)) => debug!("Stream done: {:?}", summary),
            Ok(Err(e)) => {
                error!("{e}");
                failure = Some(ForwarderError::Stream(e));
            }
            Err(e) => failure = Some(ForwarderError::Runtime(e.to_string())),
        }
    }

    let stats = service_task
        .await
        .map_err(|e| ForwarderError::Runtime(e.to_string()))?;
    info!(
        "Emitted {} events ({} suppressed, {} metrics, {} failed)",
        stats.emitted, stats.suppressed, stats.metrics_routed, stats.failed
    );
    metrics_task
        .await
        .map_err(|e| ForwarderError::Runtime(e.to_string()))?;

    if no_inputs {
        return Err(ForwarderError::NoInputs);
    }
    failure.map_or(Ok(()), Err)
}

async fn log_metrics(mut rx: mpsc::Receiver<LineEvent>) {
    while let Some(record) = rx.recv().await {
        info!(target: "logflat::metrics", "{}: {}", record.source, record.data);
    }
}
