// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::tool_spec::Capability;

/// Per-call budget overrides (spec §3). `None` fields fall back to the
/// Budget Manager's per-tool/global defaults (§4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tool_calls: Option<u32>,
}

/// Per-call authority and budget threaded through the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecContext {
    pub request_id: String,
    pub task_id: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Capability>,
    #[serde(default)]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub dry_run: bool,
}

impl ExecContext {
    pub fn new(request_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            task_id: task_id.into(),
            trace_id: None,
            user_id: None,
            permissions: Vec::new(),
            budget: None,
            dry_run: false,
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<Capability>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Superset check used by the Policy Engine's capability gate
    /// (spec §4.7 step 1): `permissions ⊇ required`.
    pub fn grants_all(&self, required: &[Capability]) -> bool {
        required.iter().all(|c| self.permissions.contains(c))
    }

    pub fn missing_capabilities(&self, required: &[Capability]) -> Vec<Capability> {
        required
            .iter()
            .copied()
            .filter(|c| !self.permissions.contains(c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_all_is_superset_check() {
        let ctx = ExecContext::new("r1", "t1").with_permissions(vec![Capability::ReadFs, Capability::Network]);
        assert!(ctx.grants_all(&[Capability::ReadFs]));
        assert!(ctx.grants_all(&[]));
        assert!(!ctx.grants_all(&[Capability::WriteFs]));
        assert_eq!(ctx.missing_capabilities(&[Capability::ReadFs, Capability::WriteFs]), vec![Capability::WriteFs]);
    }
}
