// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::evidence::Evidence;

/// The closed `error.kind` taxonomy (spec §7). Never escapes `invoke` as
/// a Rust panic or `Err` — always carried inside a `ToolResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ToolNotFound,
    InputSchemaInvalid,
    OutputSchemaInvalid,
    PolicyDenied,
    BudgetExceeded,
    Timeout,
    PathOutsideSandbox,
    FileTooLarge,
    HttpDisallowedHost,
    HttpTooLarge,
    HttpTimeout,
    UpstreamError,
    Validation,
}

impl ErrorKind {
    /// Non-retryable kinds (spec §4.8): everything else is attempted
    /// `maxRetries + 1` times by the Retry Engine.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ErrorKind::ToolNotFound
                | ErrorKind::InputSchemaInvalid
                | ErrorKind::PolicyDenied
                | ErrorKind::OutputSchemaInvalid
                | ErrorKind::PathOutsideSandbox
                | ErrorKind::FileTooLarge
                | ErrorKind::HttpDisallowedHost
                | ErrorKind::HttpTooLarge
                | ErrorKind::Timeout
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

/// What comes back from `invoke` (spec §3). Pipeline totality invariant
/// (spec §8): every call produces one of these, never a panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ToolResult {
    pub fn success(result: Value, evidence: Vec<Evidence>) -> Self {
        Self { ok: true, result: Some(result), evidence, error: None, raw: None }
    }

    pub fn failure(error: ToolError) -> Self {
        Self { ok: false, result: None, evidence: Vec::new(), error: Some(error), raw: None }
    }

    pub fn failure_with_evidence(error: ToolError, evidence: Vec<Evidence>) -> Self {
        Self { ok: false, result: None, evidence, error: Some(error), raw: None }
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }
}
