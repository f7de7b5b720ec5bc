// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Image-pipeline adapter (spec §4.3): POSTs prompt JSON to a queueing
//! endpoint and gets back a `promptId`. Async specs return
//! `{ jobId, status, queueNumber }` immediately and register with the Job
//! Manager; sync specs poll a history endpoint at a fixed interval up to
//! a max attempt count and extract image URLs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::application::job_manager::JobManager;
use crate::application::ptc_runtime::{AdapterOutcome, ToolAdapter};
use crate::domain::{ErrorKind, ExecContext, ToolError, ToolKind, ToolSpec};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLL_ATTEMPTS: u32 = 60;

pub struct ImagePipelineAdapter {
    http: reqwest::Client,
    jobs: Arc<JobManager>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl ImagePipelineAdapter {
    pub fn new(jobs: Arc<JobManager>) -> Self {
        Self { http: reqwest::Client::new(), jobs, poll_interval: POLL_INTERVAL, max_poll_attempts: MAX_POLL_ATTEMPTS }
    }

    async fn enqueue(&self, queue_endpoint: &str, prompt: &Value) -> Result<String, ToolError> {
        let response = self.http.post(queue_endpoint).json(prompt).send().await.map_err(classify_reqwest_error)?;
        let body: Value = response.json().await.map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("invalid json from queue endpoint: {e}")))?;
        body.get("promptId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ToolError::new(ErrorKind::UpstreamError, "queue endpoint response is missing promptId"))
    }

    async fn poll_history(&self, history_endpoint: &str, prompt_id: &str) -> Result<Vec<String>, ToolError> {
        for _ in 0..self.max_poll_attempts {
            let url = format!("{history_endpoint}/{prompt_id}");
            let response = self.http.get(&url).send().await.map_err(classify_reqwest_error)?;
            if response.status().is_success() {
                let body: Value = response.json().await.map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("invalid json from history endpoint: {e}")))?;
                if let Some(entry) = body.get(prompt_id) {
                    let urls = extract_image_urls(entry);
                    if !urls.is_empty() {
                        return Ok(urls);
                    }
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(ToolError::new(ErrorKind::Timeout, format!("image pipeline did not produce a result for {prompt_id} within {} attempts", self.max_poll_attempts)))
    }
}

fn extract_image_urls(history_entry: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    if let Some(outputs) = history_entry.get("outputs").and_then(Value::as_object) {
        for node in outputs.values() {
            if let Some(images) = node.get("images").and_then(Value::as_array) {
                for image in images {
                    if let Some(url) = image.get("url").and_then(Value::as_str) {
                        urls.push(url.to_string());
                    }
                }
            }
        }
    }
    urls
}

fn classify_reqwest_error(err: reqwest::Error) -> ToolError {
    if err.is_timeout() {
        ToolError::new(ErrorKind::HttpTimeout, err.to_string())
    } else {
        ToolError::new(ErrorKind::UpstreamError, err.to_string())
    }
}

#[async_trait]
impl ToolAdapter for ImagePipelineAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::ImagePipeline
    }

    async fn invoke(&self, spec: &ToolSpec, args: Value, ctx: &ExecContext) -> Result<AdapterOutcome, ToolError> {
        let (queue_endpoint, history_endpoint) = match &spec.r#impl {
            Some(crate::domain::ToolImpl::ImagePipeline { queue_endpoint, history_endpoint }) => (queue_endpoint.as_str(), history_endpoint.as_str()),
            _ => return Err(ToolError::new(ErrorKind::UpstreamError, format!("`{}` has no image-pipeline endpoints configured", spec.name))),
        };

        let prompt_id = self.enqueue(queue_endpoint, &args).await?;
        let is_async = spec.cost_hints.as_ref().map(|h| h.is_async).unwrap_or(false);

        if is_async {
            let metadata = json!({"promptId": prompt_id});
            let job = self.jobs.submit(spec.name.clone(), ctx.request_id.clone(), ctx.task_id.clone(), Some(metadata));
            let result = json!({"jobId": job.job_id.as_str(), "status": "queued", "queueNumber": Value::Null});
            return Ok(AdapterOutcome { result, raw: None, evidence: Vec::new() });
        }

        let urls = self.poll_history(history_endpoint, &prompt_id).await?;
        Ok(AdapterOutcome { result: json!({"promptId": prompt_id, "images": urls}), raw: None, evidence: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::observability::EventLog;
    use crate::domain::ToolImpl;

    fn spec_with(queue_endpoint: &str, history_endpoint: &str, is_async: bool) -> ToolSpec {
        ToolSpec {
            name: "image/generate".into(),
            version: "1.0.0".into(),
            kind: ToolKind::ImagePipeline,
            description: "d".into(),
            tags: vec![],
            capabilities: vec![],
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            cost_hints: Some(crate::domain::CostHints { p50_latency_ms: None, p95_latency_ms: None, is_async }),
            endpoint: None,
            resource_id: None,
            r#impl: Some(ToolImpl::ImagePipeline { queue_endpoint: queue_endpoint.into(), history_endpoint: history_endpoint.into() }),
        }
    }

    #[tokio::test]
    async fn missing_impl_config_is_upstream_error() {
        let log = Arc::new(EventLog::new(16));
        let jobs = JobManager::new(Duration::from_secs(60), log);
        let adapter = ImagePipelineAdapter::new(jobs);
        let mut spec = spec_with("http://example.invalid/queue", "http://example.invalid/history", false);
        spec.r#impl = None;
        let ctx = ExecContext::new("r1", "t1");
        let err = adapter.invoke(&spec, json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamError);
    }

    #[test]
    fn extracts_urls_from_history_entry() {
        let entry = json!({"outputs": {"9": {"images": [{"url": "https://example.com/a.png"}, {"url": "https://example.com/b.png"}]}}});
        assert_eq!(extract_image_urls(&entry), vec!["https://example.com/a.png", "https://example.com/b.png"]);
    }
}
