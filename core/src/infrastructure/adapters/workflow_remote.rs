// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Remote workflow adapter (spec §4.3): invokes a workflow engine over an
//! HTTP webhook / API. Concurrent calls sharing an idempotency key
//! dedupe against a one-hour cache of the first call's result; large or
//! async workflows come back as `{ jobId, status: "queued", queueNumber }`
//! and get registered with the Job Manager.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::{json, Value};

use crate::application::job_manager::JobManager;
use crate::application::ptc_runtime::AdapterOutcome;
use crate::domain::{ErrorKind, ExecContext, ToolError, ToolImpl, ToolKind, ToolSpec};

const DEDUPE_TTL: Duration = Duration::from_secs(60 * 60);

struct CachedResult {
    value: Value,
    stored_at: Instant,
}

pub struct WorkflowRemoteAdapter {
    http: reqwest::Client,
    jobs: Arc<JobManager>,
    dedupe_cache: DashMap<String, CachedResult>,
}

impl WorkflowRemoteAdapter {
    pub fn new(jobs: Arc<JobManager>) -> Self {
        Self { http: reqwest::Client::new(), jobs, dedupe_cache: DashMap::new() }
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let entry = self.dedupe_cache.get(key)?;
        if entry.stored_at.elapsed() <= DEDUPE_TTL {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn store(&self, key: String, value: Value) {
        self.dedupe_cache.insert(key, CachedResult { value, stored_at: Instant::now() });
    }

    async fn call_webhook(&self, endpoint: &str, args: &Value) -> Result<Value, ToolError> {
        let response = self
            .http
            .post(endpoint)
            .json(&json!({"arguments": args}))
            .send()
            .await
            .map_err(|e| if e.is_timeout() { ToolError::new(ErrorKind::HttpTimeout, e.to_string()) } else { ToolError::new(ErrorKind::UpstreamError, e.to_string()) })?;
        response.json::<Value>().await.map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("invalid json from workflow engine: {e}")))
    }
}

impl WorkflowRemoteAdapter {
    /// Invoked by the composite `WorkflowAdapter`, not registered in the
    /// kind→adapter map directly — a tool's `ToolImpl::Workflow.embedded`
    /// flag decides whether this or `WorkflowEmbeddedAdapter` runs.
    pub async fn invoke(&self, spec: &ToolSpec, args: Value, ctx: &ExecContext) -> Result<AdapterOutcome, ToolError> {
        let endpoint = spec.endpoint.as_deref().ok_or_else(|| ToolError::new(ErrorKind::UpstreamError, format!("`{}` has no workflow endpoint configured", spec.name)))?;

        let idempotency_key = format!("{}:{}:{}", ctx.request_id, ctx.task_id, spec.name);
        if let Some(cached) = self.cached(&idempotency_key) {
            return Ok(AdapterOutcome { result: cached, raw: None, evidence: Vec::new() });
        }

        let body = self.call_webhook(endpoint, &args).await?;

        let is_async = matches!(&spec.r#impl, Some(ToolImpl::Workflow { embedded: false, .. })) || spec.cost_hints.as_ref().map(|h| h.is_async).unwrap_or(false);

        if is_async {
            if let Some(upstream_job_id) = body.get("jobId").and_then(Value::as_str) {
                let queue_number = body.get("queueNumber").and_then(Value::as_u64);
                let metadata = json!({"upstreamJobId": upstream_job_id});
                let job = self.jobs.submit(spec.name.clone(), ctx.request_id.clone(), ctx.task_id.clone(), Some(metadata));
                let result = json!({"jobId": job.job_id.as_str(), "status": "queued", "queueNumber": queue_number});
                return Ok(AdapterOutcome { result, raw: Some(body), evidence: Vec::new() });
            }
        }

        self.store(idempotency_key, body.clone());
        Ok(AdapterOutcome { result: body, raw: None, evidence: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::observability::EventLog;

    fn spec_with_endpoint(endpoint: &str) -> ToolSpec {
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
            endpoint: Some(endpoint.into()),
            resource_id: None,
            r#impl: Some(ToolImpl::Workflow { definition: json!({"nodes": []}), embedded: false }),
        }
    }

    #[tokio::test]
    async fn missing_endpoint_is_upstream_error() {
        let event_log = Arc::new(EventLog::new(16));
        let jobs = JobManager::new(Duration::from_secs(60), event_log);
        let adapter = WorkflowRemoteAdapter::new(jobs);
        let mut spec = spec_with_endpoint("http://example.invalid");
        spec.endpoint = None;
        let ctx = ExecContext::new("r1", "t1");
        let err = adapter.invoke(&spec, json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamError);
    }

    #[test]
    fn dedupe_cache_honors_ttl() {
        let event_log = Arc::new(EventLog::new(16));
        let jobs = JobManager::new(Duration::from_secs(60), event_log);
        let adapter = WorkflowRemoteAdapter::new(jobs);
        adapter.store("k1".into(), json!({"ok": true}));
        assert!(adapter.cached("k1").is_some());
        assert!(adapter.cached("k2").is_none());
    }
}
