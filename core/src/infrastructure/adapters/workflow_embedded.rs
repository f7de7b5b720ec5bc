// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Embedded workflow adapter (spec §4.3): drives an in-process workflow
//! engine. On first invoke it lazily starts the engine — concurrent
//! first-invokes share one startup future (spec §9 concurrency note) —
//! then imports/updates the workflow definition (matching by id, falling
//! back to name), caches the returned internal id per tool name, and
//! executes in-process.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::{Mutex, OnceCell};

use crate::application::ptc_runtime::AdapterOutcome;
use crate::domain::{ErrorKind, ExecContext, ToolError, ToolImpl, ToolKind, ToolSpec};

/// The thing an embedded engine needs to be able to do. A real
/// implementation would wrap a concrete in-process engine crate; tests
/// exercise the adapter against a fake.
#[async_trait]
pub trait EmbeddedWorkflowEngine: Send + Sync {
    async fn start(&self) -> Result<(), ToolError>;
    /// Import or update a workflow definition, matching existing
    /// definitions by id and falling back to name. Returns the engine's
    /// internal id for the (possibly newly created) definition.
    async fn import_or_update(&self, id: Option<&str>, name: &str, definition: &Value) -> Result<String, ToolError>;
    async fn execute(&self, internal_id: &str, args: &Value) -> Result<Value, ToolError>;
}

pub struct WorkflowEmbeddedAdapter {
    engine: Arc<dyn EmbeddedWorkflowEngine>,
    started: OnceCell<()>,
    internal_ids: DashMap<String, String>,
    import_lock: Mutex<()>,
}

impl WorkflowEmbeddedAdapter {
    pub fn new(engine: Arc<dyn EmbeddedWorkflowEngine>) -> Self {
        Self { engine, started: OnceCell::new(), internal_ids: DashMap::new(), import_lock: Mutex::new(()) }
    }

    async fn ensure_started(&self) -> Result<(), ToolError> {
        self.started.get_or_try_init(|| async { self.engine.start().await }).await?;
        Ok(())
    }

    async fn resolve_internal_id(&self, spec: &ToolSpec) -> Result<String, ToolError> {
        if let Some(cached) = self.internal_ids.get(&spec.name) {
            return Ok(cached.clone());
        }
        let _guard = self.import_lock.lock().await;
        if let Some(cached) = self.internal_ids.get(&spec.name) {
            return Ok(cached.clone());
        }
        let (resource_id, definition) = match &spec.r#impl {
            Some(ToolImpl::Workflow { definition, .. }) => (spec.resource_id.as_deref(), definition),
            _ => return Err(ToolError::new(ErrorKind::UpstreamError, format!("`{}` has no workflow definition attached", spec.name))),
        };
        let internal_id = self.engine.import_or_update(resource_id, &spec.name, definition).await?;
        self.internal_ids.insert(spec.name.clone(), internal_id.clone());
        Ok(internal_id)
    }
}

impl WorkflowEmbeddedAdapter {
    /// Invoked by the composite `WorkflowAdapter`, not registered in the
    /// kind→adapter map directly.
    pub async fn invoke(&self, spec: &ToolSpec, args: Value, _ctx: &ExecContext) -> Result<AdapterOutcome, ToolError> {
        self.ensure_started().await?;
        let internal_id = self.resolve_internal_id(spec).await?;
        let result = self.engine.execute(&internal_id, &args).await?;
        Ok(AdapterOutcome { result, raw: None, evidence: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEngine {
        start_calls: AtomicUsize,
        import_calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddedWorkflowEngine for FakeEngine {
        async fn start(&self) -> Result<(), ToolError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn import_or_update(&self, _id: Option<&str>, name: &str, _definition: &Value) -> Result<String, ToolError> {
            self.import_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("internal-{name}"))
        }

        async fn execute(&self, internal_id: &str, args: &Value) -> Result<Value, ToolError> {
            Ok(json!({"ranWith": internal_id, "args": args}))
        }
    }

    fn workflow_spec() -> ToolSpec {
        ToolSpec {
            name: "wf/report".into(),
            version: "1.0.0".into(),
            kind: ToolKind::Workflow,
            description: "d".into(),
            tags: vec![],
            capabilities: vec![],
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            cost_hints: None,
            endpoint: None,
            resource_id: None,
            r#impl: Some(ToolImpl::Workflow { definition: json!({"nodes": []}), embedded: true }),
        }
    }

    #[tokio::test]
    async fn caches_internal_id_and_starts_engine_once() {
        let engine = Arc::new(FakeEngine { start_calls: AtomicUsize::new(0), import_calls: AtomicUsize::new(0) });
        let adapter = WorkflowEmbeddedAdapter::new(engine.clone());
        let spec = workflow_spec();
        let ctx = ExecContext::new("r1", "t1");

        adapter.invoke(&spec, json!({"a": 1}), &ctx).await.unwrap();
        adapter.invoke(&spec, json!({"a": 2}), &ctx).await.unwrap();

        assert_eq!(engine.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.import_calls.load(Ordering::SeqCst), 1);
    }
}
