// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Event Log, metrics and span-tree tracing (spec §4.10), grounded on the
//! teacher's `infrastructure::event_bus` broadcast-channel pattern.

pub mod event_log;
pub mod metrics;
pub mod tracing_spans;

pub use event_log::EventLog;
pub use metrics::HubMetrics;
pub use tracing_spans::{Span, SpanTracer};
