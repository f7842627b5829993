// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reassembles line-oriented application logs into discrete records and
//! formats them as logstash-style events.
//!
//! ```text
//! raw lines ─► StreamDriver ─► LineFlattener ─► record queue ─► FormatterService ─► EventSink
//!              (one per source)                 (bounded mpsc)   (LineFormatter)
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod constants;
pub mod datetime;
pub mod errors;
pub mod event;
pub mod flattener;
pub mod formatter;
pub mod formatter_service;
pub mod level;
pub mod sink;
pub mod stream;
pub mod util;
