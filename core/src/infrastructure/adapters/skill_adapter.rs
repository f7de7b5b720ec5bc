// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Skill adapter (spec §4.3): if a handler is attached to a skill, runs
//! it with a `SkillContext` exposing resource access and gated sub-tool
//! invocation; otherwise returns an instruction-only result built
//! straight from the parsed `SkillDefinition`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};

use crate::application::ptc_runtime::{AdapterOutcome, ToolAdapter};
use crate::domain::{ErrorKind, ExecContext, SkillDefinition, SkillResource, SkillResourceType, ToolError, ToolKind, ToolResult, ToolSpec};

/// Lets a skill handler call back into the Runtime to invoke another
/// tool. Implemented by `application::hub::ToolHub`; kept as a trait
/// here so the adapter layer doesn't depend on the hub type.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke_tool(&self, name: &str, args: Value, ctx: &ExecContext) -> Result<ToolResult, ToolError>;
}

pub struct SkillContext<'a> {
    definition: &'a SkillDefinition,
    exec_ctx: &'a ExecContext,
    invoker: Option<&'a Arc<dyn ToolInvoker>>,
}

impl<'a> SkillContext<'a> {
    /// Reads a resource's file contents by its path relative to the
    /// skill directory.
    pub fn read_resource(&self, rel_path: &str) -> Result<String, ToolError> {
        let resource = self
            .definition
            .resources
            .iter()
            .find(|r| r.relative_path == rel_path)
            .ok_or_else(|| ToolError::new(ErrorKind::Validation, format!("skill `{}` has no resource at `{rel_path}`", self.definition.frontmatter.name)))?;
        std::fs::read_to_string(&resource.absolute_path).map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("failed to read resource `{rel_path}`: {e}")))
    }

    pub fn get_resources_by_type(&self, r#type: SkillResourceType) -> Vec<&SkillResource> {
        self.definition.resources_by_type(r#type)
    }

    /// Invokes another registered tool, gated against the skill's
    /// `allowedTools` frontmatter when present (spec §4.3).
    pub async fn invoke_tool(&self, name: &str, args: Value) -> Result<ToolResult, ToolError> {
        if let Some(allowed) = &self.definition.frontmatter.allowed_tools {
            if !allowed.iter().any(|t| t == name) {
                return Err(ToolError::new(ErrorKind::PolicyDenied, format!("skill `{}` is not allowed to invoke `{name}`", self.definition.frontmatter.name)));
            }
        }
        let invoker = self.invoker.ok_or_else(|| ToolError::new(ErrorKind::UpstreamError, "no tool invoker available to this skill context"))?;
        invoker.invoke_tool(name, args, self.exec_ctx).await
    }
}

#[async_trait]
pub trait SkillHandler: Send + Sync {
    async fn invoke(&self, ctx: &SkillContext<'_>, args: Value) -> Result<Value, ToolError>;
}

pub struct SkillAdapter {
    definitions: DashMap<String, Arc<SkillDefinition>>,
    handlers: DashMap<String, Arc<dyn SkillHandler>>,
    invoker: Option<Arc<dyn ToolInvoker>>,
}

impl SkillAdapter {
    pub fn new(invoker: Option<Arc<dyn ToolInvoker>>) -> Self {
        Self { definitions: DashMap::new(), handlers: DashMap::new(), invoker }
    }

    pub fn register_definition(&self, tool_name: impl Into<String>, definition: Arc<SkillDefinition>) {
        self.definitions.insert(tool_name.into(), definition);
    }

    pub fn register_handler(&self, tool_name: impl Into<String>, handler: Arc<dyn SkillHandler>) {
        self.handlers.insert(tool_name.into(), handler);
    }

    fn instruction_only_result(definition: &SkillDefinition) -> Value {
        let resources: Vec<Value> = definition
            .resources
            .iter()
            .map(|r| json!({"relativePath": r.relative_path, "type": r.r#type}))
            .collect();
        json!({
            "name": definition.frontmatter.name,
            "description": definition.frontmatter.description,
            "instructions": definition.instructions,
            "resources": resources,
            "dirPath": definition.dir_path.to_string_lossy(),
        })
    }
}

#[async_trait]
impl ToolAdapter for SkillAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Skill
    }

    async fn invoke(&self, spec: &ToolSpec, args: Value, ctx: &ExecContext) -> Result<AdapterOutcome, ToolError> {
        let definition = self
            .definitions
            .get(&spec.name)
            .map(|d| d.clone())
            .ok_or_else(|| ToolError::new(ErrorKind::ToolNotFound, format!("no skill definition loaded for `{}`", spec.name)))?;

        if let Some(handler) = self.handlers.get(&spec.name).map(|h| h.clone()) {
            let skill_ctx = SkillContext { definition: &definition, exec_ctx: ctx, invoker: self.invoker.as_ref() };
            let result = handler.invoke(&skill_ctx, args).await?;
            return Ok(AdapterOutcome { result, raw: None, evidence: Vec::new() });
        }

        Ok(AdapterOutcome { result: Self::instruction_only_result(&definition), raw: None, evidence: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SkillFrontmatter;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn definition() -> SkillDefinition {
        SkillDefinition::new(
            SkillFrontmatter {
                name: "pdf-summarizer".into(),
                description: "Summarizes PDF documents".into(),
                license: None,
                compatibility: None,
                allowed_tools: Some(vec!["core/http-fetch-text".into()]),
                metadata: HashMap::new(),
            },
            "Read the attached PDF and produce a one-paragraph summary.",
            Vec::new(),
            PathBuf::from("/skills/pdf-summarizer"),
            PathBuf::from("/skills/pdf-summarizer/SKILL.md"),
        )
        .unwrap()
    }

    fn spec() -> ToolSpec {
        ToolSpec {
            name: "skill/pdf-summarizer".into(),
            version: "1.0.0".into(),
            kind: ToolKind::Skill,
            description: "d".into(),
            tags: vec![],
            capabilities: vec![],
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            cost_hints: None,
            endpoint: None,
            resource_id: None,
            r#impl: None,
        }
    }

    #[tokio::test]
    async fn no_handler_returns_instruction_only_result() {
        let adapter = SkillAdapter::new(None);
        adapter.register_definition("skill/pdf-summarizer", Arc::new(definition()));
        let ctx = ExecContext::new("r1", "t1");
        let outcome = adapter.invoke(&spec(), json!({}), &ctx).await.unwrap();
        assert_eq!(outcome.result["name"], "pdf-summarizer");
        assert!(outcome.result["instructions"].as_str().unwrap().contains("summary"));
    }

    #[tokio::test]
    async fn sub_tool_invocation_is_gated_by_allowed_tools() {
        struct EchoHandler;
        #[async_trait]
        impl SkillHandler for EchoHandler {
            async fn invoke(&self, ctx: &SkillContext<'_>, _args: Value) -> Result<Value, ToolError> {
                ctx.invoke_tool("core/fs-write-text", json!({})).await.map(|r| r.result.unwrap_or(Value::Null))
            }
        }
        let adapter = SkillAdapter::new(None);
        adapter.register_definition("skill/pdf-summarizer", Arc::new(definition()));
        adapter.register_handler("skill/pdf-summarizer", Arc::new(EchoHandler));
        let ctx = ExecContext::new("r1", "t1");
        let err = adapter.invoke(&spec(), json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PolicyDenied);
    }
}
