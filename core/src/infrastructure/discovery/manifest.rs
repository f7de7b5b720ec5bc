// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! `tool.json` manifest shape and the merge-with-inferred-values rules
//! (spec §4.4).

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Capability, ToolKind};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolManifest {
    pub name: Option<String>,
    /// Explicit kind; required when the directory has no inference
    /// marker the scanner can use instead.
    #[serde(default)]
    pub kind: Option<ToolKind>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// `enabled: false` skips the directory entirely.
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
    #[serde(default, rename = "outputSchema")]
    pub output_schema: Option<Value>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, rename = "resourceId")]
    pub resource_id: Option<String>,
}

impl ToolManifest {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        serde_json::from_str(&raw).map_err(|e| format!("failed to parse {}: {e}", path.display()))
    }
}

/// `namespace/leaf` default name, with a `-<kind>` suffix when the
/// directory is itself a kind-named subfolder (e.g. `langchain/`) so
/// sibling kinds under the same toolset don't collide (spec §4.4).
pub fn default_name(namespace: &str, leaf: &str, kind_named_subfolder: bool, kind_suffix: &str) -> String {
    if kind_named_subfolder {
        format!("{namespace}/{leaf}-{kind_suffix}")
    } else {
        format!("{namespace}/{leaf}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_without_kind_subfolder() {
        assert_eq!(default_name("search", "leaf", false, "rpc-tool"), "search/leaf");
    }

    #[test]
    fn default_name_appends_kind_suffix_for_kind_subfolder() {
        assert_eq!(default_name("search", "langchain", true, "local-fn"), "search/langchain-local-fn");
    }

    #[test]
    fn manifest_defaults_to_enabled() {
        let manifest = ToolManifest::default();
        assert!(manifest.is_enabled());
    }
}
