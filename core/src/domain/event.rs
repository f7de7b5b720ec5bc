// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::result::ErrorKind;

/// Variant-specific payload for an `Event` (spec §3, §4.10). Tagged so
/// external sinks can deserialize without a lookup table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    ToolCalled {
        args_preview: Value,
    },
    ToolResult {
        ok: bool,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
    },
    PolicyDenied {
        reason: String,
        #[serde(default)]
        missing_capabilities: Vec<String>,
    },
    Retry {
        attempt: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
    },
    JobSubmitted {
        job_id: String,
    },
    JobCompleted {
        job_id: String,
    },
    JobFailed {
        job_id: String,
        message: String,
    },
}

/// One append-only record in the Event Log (spec §4.10). `seq` is assigned
/// atomically by the log itself, not by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub seq: u64,
    pub request_id: String,
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(seq: u64, request_id: impl Into<String>, task_id: impl Into<String>, tool_name: Option<String>, trace_id: Option<String>, payload: EventPayload) -> Self {
        Self {
            seq,
            request_id: request_id.into(),
            task_id: task_id.into(),
            tool_name,
            trace_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_flattened_tag() {
        let ev = Event::new(1, "r1", "t1", Some("fs/read".into()), None, EventPayload::PolicyDenied { reason: "missing capability".into(), missing_capabilities: vec!["write:fs".into()] });
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "POLICY_DENIED");
        assert_eq!(v["seq"], 1);
    }
}
