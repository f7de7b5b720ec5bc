// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One typed provenance record attached to a `ToolResult` (spec §3, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceType {
    Tool,
    File,
    Url,
    Text,
    Metric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub r#type: EvidenceType,
    pub r#ref: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl Evidence {
    pub fn new(r#type: EvidenceType, r#ref: impl Into<String>, summary: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self { r#type, r#ref: r#ref.into(), summary: summary.into(), created_at }
    }
}
