// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Composite workflow adapter registered for `ToolKind::Workflow`.
//! `ToolImpl::Workflow.embedded` decides which of the two concrete
//! strategies (spec §4.3) runs a given tool; both share one slot in the
//! kind→adapter map since the Registry only ever stores one adapter per
//! kind (spec §9).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::workflow_embedded::WorkflowEmbeddedAdapter;
use super::workflow_remote::WorkflowRemoteAdapter;
use crate::application::ptc_runtime::{AdapterOutcome, ToolAdapter};
use crate::domain::{ErrorKind, ExecContext, ToolError, ToolImpl, ToolKind, ToolSpec};

pub struct WorkflowAdapter {
    embedded: Option<Arc<WorkflowEmbeddedAdapter>>,
    remote: Option<Arc<WorkflowRemoteAdapter>>,
}

impl WorkflowAdapter {
    pub fn new(embedded: Option<Arc<WorkflowEmbeddedAdapter>>, remote: Option<Arc<WorkflowRemoteAdapter>>) -> Self {
        Self { embedded, remote }
    }
}

#[async_trait]
impl ToolAdapter for WorkflowAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Workflow
    }

    async fn invoke(&self, spec: &ToolSpec, args: Value, ctx: &ExecContext) -> Result<AdapterOutcome, ToolError> {
        let embedded = matches!(&spec.r#impl, Some(ToolImpl::Workflow { embedded: true, .. }));
        if embedded {
            let adapter = self.embedded.as_ref().ok_or_else(|| ToolError::new(ErrorKind::UpstreamError, "no embedded workflow engine configured"))?;
            adapter.invoke(spec, args, ctx).await
        } else {
            let adapter = self.remote.as_ref().ok_or_else(|| ToolError::new(ErrorKind::UpstreamError, "no remote workflow client configured"))?;
            adapter.invoke(spec, args, ctx).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(embedded: bool) -> ToolSpec {
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
            endpoint: Some("http://example.invalid/hook".into()),
            resource_id: None,
            r#impl: Some(ToolImpl::Workflow { definition: json!({"nodes": []}), embedded }),
        }
    }

    #[tokio::test]
    async fn routes_to_remote_when_not_embedded_and_none_configured() {
        let adapter = WorkflowAdapter::new(None, None);
        let ctx = ExecContext::new("r1", "t1");
        let err = adapter.invoke(&spec(false), json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamError);
    }

    #[tokio::test]
    async fn routes_to_embedded_when_embedded_and_none_configured() {
        let adapter = WorkflowAdapter::new(None, None);
        let ctx = ExecContext::new("r1", "t1");
        let err = adapter.invoke(&spec(true), json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamError);
    }
}
