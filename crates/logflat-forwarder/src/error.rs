// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use logflat::errors::StreamError;

/// Errors that stop the forwarder.
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No readable inputs")]
    NoInputs,

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
