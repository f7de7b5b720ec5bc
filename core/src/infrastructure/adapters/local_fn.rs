// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Local-function adapter (spec §4.3). The source language dynamically
//! imports a JS/TS entry module per tool directory; this runtime has no
//! equivalent dynamic-import primitive, so local-fn handlers are
//! registered programmatically (closures/trait objects) by the embedding
//! process instead of loaded from disk at invoke time — the discovery
//! loader still builds the `ToolSpec` from the directory, it just can't
//! supply the executable side on its own (see `DESIGN.md`).

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};

use crate::application::ptc_runtime::{AdapterOutcome, ToolAdapter};
use crate::domain::{Evidence, ExecContext, ErrorKind, ToolError, ToolKind, ToolSpec};

#[async_trait]
pub trait LocalFnHandler: Send + Sync {
    /// `meta` carries the subset of `ExecContext` a local function may
    /// need (request/task id) without exposing the whole pipeline.
    async fn invoke(&self, input: Value, meta: Option<Value>) -> Result<Value, ToolError>;
}

pub struct LocalFnAdapter {
    handlers: DashMap<String, std::sync::Arc<dyn LocalFnHandler>>,
}

impl LocalFnAdapter {
    pub fn new() -> Self {
        Self { handlers: DashMap::new() }
    }

    pub fn register(&self, tool_name: impl Into<String>, handler: std::sync::Arc<dyn LocalFnHandler>) {
        self.handlers.insert(tool_name.into(), handler);
    }

    pub fn unregister(&self, tool_name: &str) {
        self.handlers.remove(tool_name);
    }

    /// Accepts a bare result value or a `{ result, evidence[] }` wrapper;
    /// non-object results are boxed as `{ output: <value> }`.
    fn normalize(raw: Value) -> (Value, Vec<Evidence>) {
        let (mut result, evidence) = match raw {
            Value::Object(ref map) if map.contains_key("result") => {
                let evidence: Vec<Evidence> = map.get("evidence").and_then(|e| serde_json::from_value(e.clone()).ok()).unwrap_or_default();
                (map.get("result").cloned().unwrap_or(Value::Null), evidence)
            }
            other => (other, Vec::new()),
        };
        if !result.is_object() {
            result = json!({"output": result});
        }
        (result, evidence)
    }
}

impl Default for LocalFnAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for LocalFnAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::LocalFn
    }

    async fn invoke(&self, spec: &ToolSpec, args: Value, ctx: &ExecContext) -> Result<AdapterOutcome, ToolError> {
        let handler = self
            .handlers
            .get(&spec.name)
            .map(|h| h.clone())
            .ok_or_else(|| ToolError::new(ErrorKind::ToolNotFound, format!("no local-fn handler registered for `{}`", spec.name)))?;

        let meta = json!({"requestId": ctx.request_id, "taskId": ctx.task_id});
        let raw = handler.invoke(args, Some(meta)).await?;
        let (result, evidence) = Self::normalize(raw);
        Ok(AdapterOutcome { result, raw: None, evidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    struct Calculator;

    #[async_trait]
    impl LocalFnHandler for Calculator {
        async fn invoke(&self, input: Value, _meta: Option<Value>) -> Result<Value, ToolError> {
            let a = input["a"].as_f64().unwrap_or(0.0);
            let b = input["b"].as_f64().unwrap_or(0.0);
            Ok(json!({"result": a + b}))
        }
    }

    #[tokio::test]
    async fn invokes_registered_handler_and_wraps_primitive_result() {
        let adapter = LocalFnAdapter::new();
        adapter.register("calc/add", Arc::new(Calculator));
        let spec = ToolSpec {
            name: "calc/add".into(),
            version: "1.0.0".into(),
            kind: ToolKind::LocalFn,
            description: "d".into(),
            tags: vec![],
            capabilities: vec![],
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            cost_hints: None,
            endpoint: None,
            resource_id: None,
            r#impl: None,
        };
        let ctx = ExecContext::new("r1", "t1");
        let outcome = adapter.invoke(&spec, json!({"a": 2, "b": 3}), &ctx).await.unwrap();
        assert_eq!(outcome.result["output"], json!(5.0));
    }

    #[tokio::test]
    async fn missing_handler_is_tool_not_found() {
        let adapter = LocalFnAdapter::new();
        let spec = ToolSpec {
            name: "missing/tool".into(),
            version: "1.0.0".into(),
            kind: ToolKind::LocalFn,
            description: "d".into(),
            tags: vec![],
            capabilities: vec![],
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            cost_hints: None,
            endpoint: None,
            resource_id: None,
            r#impl: None,
        };
        let ctx = ExecContext::new("r1", "t1");
        let err = adapter.invoke(&spec, json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ToolNotFound);
    }
}
