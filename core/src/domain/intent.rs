// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the caller wants invoked (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolIntent {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
    pub purpose: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl ToolIntent {
    pub fn new(tool: impl Into<String>, args: Value, purpose: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            purpose: purpose.into(),
            idempotency_key: None,
        }
    }

    /// Default idempotency key, spec §3 GLOSSARY: `requestId:taskId:toolName`.
    pub fn effective_idempotency_key(&self, request_id: &str, task_id: &str) -> String {
        self.idempotency_key
            .clone()
            .unwrap_or_else(|| format!("{}:{}:{}", request_id, task_id, self.tool))
    }
}
