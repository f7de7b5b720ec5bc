// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Core tools adapter (spec §4.3): sandboxed file/HTTP/util tools
//! registered as first-class tools. Each handler receives the already
//! policy-checked args and returns `{ result, evidence[] }`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::application::ptc_runtime::{AdapterOutcome, ToolAdapter};
use crate::domain::{Capability, CostHints, ErrorKind, ExecContext, ToolError, ToolImpl, ToolKind, ToolSpec};

const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_HTTP_BYTES: u64 = 10 * 1024 * 1024;

pub struct CoreToolsAdapter {
    http: reqwest::Client,
}

impl CoreToolsAdapter {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    /// Built-in specs this adapter answers for; registered by the hub at
    /// `initAllTools` time alongside whatever discovery finds.
    pub fn builtin_specs() -> Vec<ToolSpec> {
        vec![
            spec(
                "core/fs-read-text",
                "Read a UTF-8 text file from the sandbox",
                vec!["filesystem".into(), "read".into()],
                vec![Capability::ReadFs],
                json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"]}),
                json!({"type": "object", "properties": {"content": {"type": "string"}}, "required": ["content"]}),
            ),
            spec(
                "core/fs-write-text",
                "Write a UTF-8 text file into the sandbox",
                vec!["filesystem".into(), "write".into()],
                vec![Capability::WriteFs],
                json!({"type": "object", "properties": {"path": {"type": "string"}, "content": {"type": "string"}}, "required": ["path", "content"]}),
                json!({"type": "object", "properties": {"bytesWritten": {"type": "integer"}}, "required": ["bytesWritten"]}),
            ),
            spec(
                "core/http-fetch-text",
                "Fetch a URL and return its body as text",
                vec!["http".into(), "read".into()],
                vec![Capability::Network, Capability::ReadWeb],
                json!({"type": "object", "properties": {"url": {"type": "string"}}, "required": ["url"]}),
                json!({"type": "object", "properties": {"body": {"type": "string"}, "status": {"type": "integer"}}, "required": ["body", "status"]}),
            ),
            spec(
                "core/http-fetch-json",
                "Fetch a URL and parse its body as JSON",
                vec!["http".into(), "read".into()],
                vec![Capability::Network, Capability::ReadWeb],
                json!({"type": "object", "properties": {"url": {"type": "string"}}, "required": ["url"]}),
                json!({"type": "object", "properties": {"body": {}, "status": {"type": "integer"}}, "required": ["body", "status"]}),
            ),
        ]
    }

    fn read_text(&self, args: &Value) -> Result<AdapterOutcome, ToolError> {
        let path = args_str(args, "path")?;
        let metadata = std::fs::metadata(path).map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("stat failed: {e}")))?;
        if metadata.len() > MAX_FILE_BYTES {
            return Err(ToolError::new(ErrorKind::FileTooLarge, format!("{path} exceeds {MAX_FILE_BYTES} bytes")));
        }
        let content = std::fs::read_to_string(path).map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("read failed: {e}")))?;
        Ok(AdapterOutcome { result: json!({"content": content}), raw: None, evidence: Vec::new() })
    }

    fn write_text(&self, args: &Value) -> Result<AdapterOutcome, ToolError> {
        let path = args_str(args, "path")?;
        let content = args_str(args, "content")?;
        if content.len() as u64 > MAX_FILE_BYTES {
            return Err(ToolError::new(ErrorKind::FileTooLarge, format!("content exceeds {MAX_FILE_BYTES} bytes")));
        }
        std::fs::write(path, content).map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("write failed: {e}")))?;
        Ok(AdapterOutcome { result: json!({"bytesWritten": content.len()}), raw: None, evidence: Vec::new() })
    }

    async fn fetch_text(&self, args: &Value) -> Result<AdapterOutcome, ToolError> {
        let url = args_str(args, "url")?;
        let response = self.http.get(url).send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;
        if body.len() as u64 > MAX_HTTP_BYTES {
            return Err(ToolError::new(ErrorKind::HttpTooLarge, format!("response exceeds {MAX_HTTP_BYTES} bytes")));
        }
        Ok(AdapterOutcome { result: json!({"body": body, "status": status}), raw: None, evidence: Vec::new() })
    }

    async fn fetch_json(&self, args: &Value) -> Result<AdapterOutcome, ToolError> {
        let url = args_str(args, "url")?;
        let response = self.http.get(url).send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("invalid json in response: {e}")))?;
        Ok(AdapterOutcome { result: json!({"body": body, "status": status}), raw: None, evidence: Vec::new() })
    }
}

impl Default for CoreToolsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for CoreToolsAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Core
    }

    async fn invoke(&self, spec: &ToolSpec, args: Value, _ctx: &ExecContext) -> Result<AdapterOutcome, ToolError> {
        match spec.name.as_str() {
            "core/fs-read-text" => self.read_text(&args),
            "core/fs-write-text" => self.write_text(&args),
            "core/http-fetch-text" => self.fetch_text(&args).await,
            "core/http-fetch-json" => self.fetch_json(&args).await,
            other => Err(ToolError::new(ErrorKind::ToolNotFound, format!("no core handler for `{other}`"))),
        }
    }
}

fn args_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::new(ErrorKind::Validation, format!("missing string arg `{key}`")))
}

fn classify_reqwest_error(err: reqwest::Error) -> ToolError {
    if err.is_timeout() {
        ToolError::new(ErrorKind::HttpTimeout, err.to_string())
    } else {
        ToolError::new(ErrorKind::UpstreamError, err.to_string())
    }
}

fn spec(name: &str, description: &str, tags: Vec<String>, capabilities: Vec<Capability>, input_schema: Value, output_schema: Value) -> ToolSpec {
    ToolSpec {
        name: name.into(),
        version: "1.0.0".into(),
        kind: ToolKind::Core,
        description: description.into(),
        tags,
        capabilities,
        input_schema,
        output_schema,
        cost_hints: Some(CostHints { p50_latency_ms: Some(5), p95_latency_ms: Some(50), is_async: false }),
        endpoint: None,
        resource_id: None,
        r#impl: Some(ToolImpl::Core),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExecContext;

    #[tokio::test]
    async fn read_text_rejects_oversized_file() {
        let adapter = CoreToolsAdapter::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'a'; (MAX_FILE_BYTES + 1) as usize]).unwrap();
        let spec = &CoreToolsAdapter::builtin_specs()[0];
        let ctx = ExecContext::new("r1", "t1");
        let err = adapter.invoke(spec, json!({"path": path.to_str().unwrap()}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileTooLarge);
    }

    #[tokio::test]
    async fn read_text_round_trips_small_file() {
        let adapter = CoreToolsAdapter::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.txt");
        std::fs::write(&path, "hello").unwrap();
        let spec = &CoreToolsAdapter::builtin_specs()[0];
        let ctx = ExecContext::new("r1", "t1");
        let outcome = adapter.invoke(spec, json!({"path": path.to_str().unwrap()}), &ctx).await.unwrap();
        assert_eq!(outcome.result["content"], "hello");
    }
}
