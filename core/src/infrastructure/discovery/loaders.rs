// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Kind loaders (spec §4.4): turn a `DiscoveredTool` into a `ToolSpec`.
//! Local-fn's "dynamically loads the entry module" step has no Rust
//! equivalent (see `infrastructure::adapters::local_fn`) — the loader
//! here builds the spec and leaves the executable side to whatever
//! handler gets registered against the resulting tool name.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::domain::{Capability, CostHints, ToolImpl, ToolKind, ToolSpec};

use super::manifest::{default_name, ToolManifest};
use super::scanner::{DiscoveredTool, InferredKind, ScanPhase};
use super::skill_parser::parse_skill_directory;

pub struct LoadError {
    pub phase: ScanPhase,
    pub message: String,
}

impl LoadError {
    fn new(phase: ScanPhase, message: impl Into<String>) -> Self {
        Self { phase, message: message.into() }
    }
}

fn default_io_schema() -> (Value, Value) {
    (serde_json::json!({"type": "object"}), serde_json::json!({"type": "object"}))
}

fn build_spec(discovered: &DiscoveredTool, kind: ToolKind, kind_suffix: &str, endpoint: Option<String>, resource_id: Option<String>, r#impl: ToolImpl) -> ToolSpec {
    let manifest = discovered.manifest.clone().unwrap_or_default();
    let name = manifest.name.clone().unwrap_or_else(|| default_name(&discovered.namespace, &discovered.leaf, discovered.kind_named_subfolder, kind_suffix));
    let (default_input, default_output) = default_io_schema();
    ToolSpec {
        name,
        version: manifest.version.unwrap_or_else(|| "0.0.0".into()),
        kind,
        description: manifest.description.unwrap_or_default(),
        tags: manifest.tags,
        capabilities: manifest.capabilities,
        input_schema: manifest.input_schema.unwrap_or(default_input),
        output_schema: manifest.output_schema.unwrap_or(default_output),
        cost_hints: Some(CostHints::default()),
        endpoint: manifest.endpoint.or(endpoint),
        resource_id: manifest.resource_id.or(resource_id),
        r#impl: Some(r#impl),
    }
}

/// Loads an rpc-tool directory's `mcp.json`: bare `{command,args,env?}` /
/// `{url}`, or a server-map wrapper `{ mcpServers: { <name>: {…} } }`
/// (picks the entry whose key equals the tool's leaf name, else the
/// first entry).
pub fn load_rpc_tool(discovered: &DiscoveredTool) -> Result<ToolSpec, LoadError> {
    let manifest_path = discovered.dir.join("mcp.json");
    let raw = std::fs::read_to_string(&manifest_path).map_err(|e| LoadError::new(ScanPhase::Load, format!("failed to read mcp.json: {e}")))?;
    let doc: Value = serde_json::from_str(&raw).map_err(|e| LoadError::new(ScanPhase::Load, format!("invalid mcp.json: {e}")))?;

    let entry = if let Some(servers) = doc.get("mcpServers").and_then(Value::as_object) {
        servers
            .get(&discovered.leaf)
            .or_else(|| servers.values().next())
            .cloned()
            .ok_or_else(|| LoadError::new(ScanPhase::Load, "mcpServers map is empty"))?
    } else {
        doc
    };

    let command = entry.get("command").and_then(Value::as_str).map(str::to_string);
    let url = entry.get("url").and_then(Value::as_str).map(str::to_string);
    if command.is_none() && url.is_none() {
        return Err(LoadError::new(ScanPhase::Validate, "rpc-tool entry must declare `command` or `url`"));
    }
    let args = entry.get("args").and_then(Value::as_array).map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()).unwrap_or_default();
    let env: HashMap<String, String> = entry
        .get("env")
        .and_then(Value::as_object)
        .map(|m| m.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect())
        .unwrap_or_default();

    Ok(build_spec(discovered, ToolKind::RpcTool, "rpc-tool", url.clone(), None, ToolImpl::RpcTool { command, args, url, env }))
}

/// Loads a workflow directory's `workflow.json`: requires a `nodes`
/// array; `id` becomes `resourceId`.
pub fn load_workflow(discovered: &DiscoveredTool) -> Result<ToolSpec, LoadError> {
    let manifest_path = discovered.dir.join("workflow.json");
    let raw = std::fs::read_to_string(&manifest_path).map_err(|e| LoadError::new(ScanPhase::Load, format!("failed to read workflow.json: {e}")))?;
    let doc: Value = serde_json::from_str(&raw).map_err(|e| LoadError::new(ScanPhase::Load, format!("invalid workflow.json: {e}")))?;

    if !doc.get("nodes").is_some_and(Value::is_array) {
        return Err(LoadError::new(ScanPhase::Validate, "workflow.json must contain a `nodes` array"));
    }
    let resource_id = doc.get("id").and_then(Value::as_str).map(str::to_string);
    let embedded = doc.get("embedded").and_then(Value::as_bool).unwrap_or(false);

    Ok(build_spec(discovered, ToolKind::Workflow, "workflow", None, resource_id, ToolImpl::Workflow { definition: doc, embedded }))
}

/// Loads a local-fn directory: locates the entry file, accepts `schema`
/// as a stand-in `inputSchema` when the manifest omits one.
pub fn load_local_fn(discovered: &DiscoveredTool) -> Result<ToolSpec, LoadError> {
    let entry_path = super::scanner::entry_file(&discovered.dir).ok_or_else(|| LoadError::new(ScanPhase::Load, "no index.js/index.mjs entry file found"))?;
    let mut spec = build_spec(
        discovered,
        ToolKind::LocalFn,
        "local-fn",
        None,
        None,
        ToolImpl::LocalFn { entry_point: entry_path.to_string_lossy().to_string() },
    );

    if discovered.manifest.as_ref().and_then(|m| m.input_schema.clone()).is_none() {
        if let Some(schema_path) = sibling_schema_file(&discovered.dir) {
            if let Ok(raw) = std::fs::read_to_string(&schema_path) {
                if let Ok(schema) = serde_json::from_str::<Value>(&raw) {
                    spec.input_schema = schema;
                }
            }
        }
    }
    Ok(spec)
}

fn sibling_schema_file(dir: &Path) -> Option<std::path::PathBuf> {
    let candidate = dir.join("schema.json");
    candidate.is_file().then_some(candidate)
}

/// Loads a skill directory's `SKILL.md` plus its resources.
pub fn load_skill(discovered: &DiscoveredTool) -> Result<(ToolSpec, crate::domain::SkillDefinition), LoadError> {
    let definition = parse_skill_directory(&discovered.dir).map_err(|e| LoadError::new(ScanPhase::Load, e))?;
    let manifest = discovered.manifest.clone().unwrap_or_default();
    let name = manifest.name.clone().unwrap_or_else(|| default_name(&discovered.namespace, &discovered.leaf, discovered.kind_named_subfolder, "skill"));
    let (default_input, default_output) = default_io_schema();
    let spec = ToolSpec {
        name,
        version: manifest.version.unwrap_or_else(|| "0.0.0".into()),
        kind: ToolKind::Skill,
        description: manifest.description.unwrap_or_else(|| definition.frontmatter.description.clone()),
        tags: manifest.tags,
        capabilities: manifest.capabilities,
        input_schema: manifest.input_schema.unwrap_or(default_input),
        output_schema: manifest.output_schema.unwrap_or(default_output),
        cost_hints: Some(CostHints::default()),
        endpoint: None,
        resource_id: None,
        r#impl: Some(ToolImpl::Skill { manifest_path: definition.manifest_path.to_string_lossy().to_string() }),
    };
    Ok((spec, definition))
}

/// Dispatches to the right loader for a discovered tool's manifest-or-
/// inferred kind. Returns `None` only for skill tools, which additionally
/// need the parsed `SkillDefinition` returned by `load_skill`.
pub fn load(discovered: &DiscoveredTool) -> Result<ToolSpec, LoadError> {
    let kind = resolve_kind(discovered)?;
    match kind {
        ToolKind::RpcTool => load_rpc_tool(discovered),
        ToolKind::Workflow => load_workflow(discovered),
        ToolKind::LocalFn => load_local_fn(discovered),
        ToolKind::Skill => load_skill(discovered).map(|(spec, _)| spec),
        ToolKind::Core | ToolKind::ImagePipeline => Err(LoadError::new(ScanPhase::Manifest, format!("directory discovery does not support kind `{kind}`"))),
    }
}

fn resolve_kind(discovered: &DiscoveredTool) -> Result<ToolKind, LoadError> {
    if let Some(kind) = discovered.manifest.as_ref().and_then(|m| m.kind) {
        return Ok(kind);
    }
    if let Some(kind) = discovered.inferred_kind {
        return Ok(kind.as_tool_kind());
    }
    Err(LoadError::new(ScanPhase::Manifest, "tool directory has a manifest but no inferrable kind; `kind` must be set explicitly"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::discovery::scanner::DiscoveredTool;

    fn discovered(dir: std::path::PathBuf, leaf: &str, inferred: InferredKind) -> DiscoveredTool {
        DiscoveredTool { dir, namespace: "search".into(), leaf: leaf.into(), kind_named_subfolder: false, manifest: None, inferred_kind: Some(inferred) }
    }

    #[test]
    fn rpc_tool_loader_supports_bare_shape() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mcp.json"), r#"{"command": "mcp-weather", "args": ["--stdio"]}"#).unwrap();
        let spec = load_rpc_tool(&discovered(dir.path().to_path_buf(), "weather", InferredKind::RpcTool)).unwrap();
        assert_eq!(spec.name, "search/weather");
        match spec.r#impl {
            Some(ToolImpl::RpcTool { command, .. }) => assert_eq!(command, Some("mcp-weather".to_string())),
            _ => panic!("expected RpcTool impl"),
        }
    }

    #[test]
    fn rpc_tool_loader_picks_wrapper_entry_by_leaf_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mcp.json"), r#"{"mcpServers": {"weather": {"url": "http://localhost:8080"}, "other": {"url": "http://x"}}}"#).unwrap();
        let spec = load_rpc_tool(&discovered(dir.path().to_path_buf(), "weather", InferredKind::RpcTool)).unwrap();
        match spec.r#impl {
            Some(ToolImpl::RpcTool { url, .. }) => assert_eq!(url, Some("http://localhost:8080".to_string())),
            _ => panic!("expected RpcTool impl"),
        }
    }

    #[test]
    fn workflow_loader_requires_nodes_array() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("workflow.json"), r#"{"id": "wf-1"}"#).unwrap();
        let err = load_workflow(&discovered(dir.path().to_path_buf(), "report", InferredKind::Workflow)).err().unwrap();
        assert_eq!(err.phase, ScanPhase::Validate);
    }

    #[test]
    fn workflow_loader_maps_id_to_resource_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("workflow.json"), r#"{"id": "wf-1", "nodes": []}"#).unwrap();
        let spec = load_workflow(&discovered(dir.path().to_path_buf(), "report", InferredKind::Workflow)).unwrap();
        assert_eq!(spec.resource_id, Some("wf-1".to_string()));
    }
}
