// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Span-tree tracing (spec §4.10). Spans are linked by parent reference
//! within a `traceId`; `getTrace` returns them in start-time order.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Span {
    pub span_id: String,
    pub trace_id: String,
    pub name: String,
    pub parent_span_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpanEvent {
    pub name: String,
    pub attributes: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SpanRecord {
    pub span: Span,
    pub attributes: Value,
    pub events: Vec<SpanEvent>,
    pub status: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

pub struct SpanTracer {
    spans: DashMap<String, Mutex<SpanRecord>>,
    trace_order: DashMap<String, Mutex<Vec<String>>>,
}

impl SpanTracer {
    pub fn new() -> Self {
        Self { spans: DashMap::new(), trace_order: DashMap::new() }
    }

    pub fn start_span(&self, name: impl Into<String>, trace_id: Option<String>, parent_span_id: Option<String>, attributes: Value) -> Span {
        let trace_id = trace_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = Span { span_id: Uuid::new_v4().to_string(), trace_id: trace_id.clone(), name: name.into(), parent_span_id };
        let record = SpanRecord { span: span.clone(), attributes, events: Vec::new(), status: None, started_at: Utc::now(), ended_at: None };
        self.spans.insert(span.span_id.clone(), Mutex::new(record));
        self.trace_order.entry(trace_id).or_insert_with(|| Mutex::new(Vec::new())).lock().unwrap().push(span.span_id.clone());
        span
    }

    pub fn add_event(&self, span_id: &str, name: impl Into<String>, attributes: Value) {
        if let Some(entry) = self.spans.get(span_id) {
            entry.lock().unwrap().events.push(SpanEvent { name: name.into(), attributes, timestamp: Utc::now() });
        }
    }

    pub fn set_attributes(&self, span_id: &str, attributes: Value) {
        if let Some(entry) = self.spans.get(span_id) {
            let mut record = entry.lock().unwrap();
            if let (Value::Object(existing), Value::Object(incoming)) = (&mut record.attributes, attributes) {
                existing.extend(incoming);
            }
        }
    }

    pub fn end_span(&self, span_id: &str, status: impl Into<String>) {
        if let Some(entry) = self.spans.get(span_id) {
            let mut record = entry.lock().unwrap();
            record.status = Some(status.into());
            record.ended_at = Some(Utc::now());
        }
    }

    /// Spans for `trace_id` in start-time order (insertion order, since
    /// spans are appended to the trace index as they start).
    pub fn get_trace(&self, trace_id: &str) -> Vec<SpanRecord> {
        let Some(order) = self.trace_order.get(trace_id) else { return Vec::new() };
        order
            .lock()
            .unwrap()
            .iter()
            .filter_map(|span_id| self.spans.get(span_id).map(|e| e.lock().unwrap().clone()))
            .collect()
    }
}

impl Default for SpanTracer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trace_returns_spans_in_start_order() {
        let tracer = SpanTracer::new();
        let root = tracer.start_span("invoke", None, None, json!({}));
        let child = tracer.start_span("adapter.invoke", Some(root.trace_id.clone()), Some(root.span_id.clone()), json!({}));
        tracer.end_span(&child.span_id, "ok");
        tracer.end_span(&root.span_id, "ok");

        let trace = tracer.get_trace(&root.trace_id);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].span.name, "invoke");
        assert_eq!(trace[1].span.parent_span_id.as_deref(), Some(root.span_id.as_str()));
    }
}
