// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! `ToolSpec` and the closed `ToolKind` / `Capability` enums (spec §3, §9).
//!
//! `ToolKind` is modeled as a closed tagged enum rather than an
//! open-ended trait-object hierarchy, per spec §9's design note: dispatch
//! goes through a `kind → adapter` map built once at `ToolHub`
//! construction (`application::hub`), never through inheritance.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminates which adapter handles invocation. Closed set — adding a
/// new kind requires updating every `match` on it, which is the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Core,
    LocalFn,
    RpcTool,
    Workflow,
    ImagePipeline,
    Skill,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Core => "core",
            ToolKind::LocalFn => "local-fn",
            ToolKind::RpcTool => "rpc-tool",
            ToolKind::Workflow => "workflow",
            ToolKind::ImagePipeline => "image-pipeline",
            ToolKind::Skill => "skill",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of capability tokens (GLOSSARY). `ExecContext::permissions`
/// and `ToolSpec::capabilities` are both sets of these. Wire form is the
/// colon-separated token (`read:fs`), not the default kebab-case serde
/// would otherwise produce — each variant is renamed explicitly to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "read:fs")]
    ReadFs,
    #[serde(rename = "write:fs")]
    WriteFs,
    #[serde(rename = "read:web")]
    ReadWeb,
    #[serde(rename = "read:db")]
    ReadDb,
    #[serde(rename = "write:db")]
    WriteDb,
    #[serde(rename = "network")]
    Network,
    #[serde(rename = "gpu")]
    Gpu,
    #[serde(rename = "workflow")]
    Workflow,
    #[serde(rename = "danger:destructive")]
    DangerDestructive,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadFs => "read:fs",
            Capability::WriteFs => "write:fs",
            Capability::ReadWeb => "read:web",
            Capability::ReadDb => "read:db",
            Capability::WriteDb => "write:db",
            Capability::Network => "network",
            Capability::Gpu => "gpu",
            Capability::Workflow => "workflow",
            Capability::DangerDestructive => "danger:destructive",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse performance/async hints a caller may use for scheduling; never
/// enforced by the Runtime itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50_latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<u64>,
    #[serde(default)]
    pub is_async: bool,
}

/// Kind-private payload. Only one variant is populated, matching
/// `ToolSpec.kind`; the Adapter for that kind is the only reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ToolImpl {
    Core,
    LocalFn { entry_point: String },
    RpcTool { command: Option<String>, args: Vec<String>, url: Option<String>, env: std::collections::HashMap<String, String> },
    Workflow { definition: Value, embedded: bool },
    ImagePipeline { queue_endpoint: String, history_endpoint: String },
    Skill { manifest_path: String },
}

/// Immutable declaration of a tool (spec §3).
///
/// `name`, `version`, `kind`, `inputSchema`, `outputSchema`, `capabilities`
/// are all required by the register-time invariant enforced in
/// `application::registry::ToolRegistry::register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Globally unique, convention `namespace/leaf`.
    pub name: String,
    pub version: String,
    pub kind: ToolKind,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub capabilities: Vec<Capability>,
    pub input_schema: Value,
    pub output_schema: Value,
    #[serde(default)]
    pub cost_hints: Option<CostHints>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub r#impl: Option<ToolImpl>,
}

impl ToolSpec {
    /// Does this spec declare `cap`?
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    /// True if `tags` is a superset of `required` (conjunctive match used
    /// by Registry search, spec §4.2).
    pub fn has_all_tags(&self, required: &[String]) -> bool {
        required.iter().all(|t| self.tags.iter().any(|own| own == t))
    }

    pub fn has_all_capabilities(&self, required: &[Capability]) -> bool {
        required.iter().all(|c| self.capabilities.contains(c))
    }

    /// Substring, case-insensitive match over `name` ∪ `description`.
    pub fn matches_text(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.name.to_lowercase().contains(&q) || self.description.to_lowercase().contains(&q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ToolSpec {
        ToolSpec {
            name: "fs/read".into(),
            version: "1.0.0".into(),
            kind: ToolKind::Core,
            description: "Read a text file from the sandbox".into(),
            tags: vec!["filesystem".into(), "read".into()],
            capabilities: vec![Capability::ReadFs],
            input_schema: serde_json::json!({"type": "object"}),
            output_schema: serde_json::json!({"type": "object"}),
            cost_hints: None,
            endpoint: None,
            resource_id: None,
            r#impl: None,
        }
    }

    #[test]
    fn text_match_is_case_insensitive_substring() {
        let s = spec();
        assert!(s.matches_text("FS/read"));
        assert!(s.matches_text("sandbox"));
        assert!(!s.matches_text("workflow"));
    }

    #[test]
    fn tag_and_capability_conjunction() {
        let s = spec();
        assert!(s.has_all_tags(&["filesystem".into()]));
        assert!(!s.has_all_tags(&["filesystem".into(), "write".into()]));
        assert!(s.has_all_capabilities(&[Capability::ReadFs]));
        assert!(!s.has_all_capabilities(&[Capability::ReadFs, Capability::WriteFs]));
    }
}
