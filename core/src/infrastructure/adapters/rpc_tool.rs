// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! RPC-tool adapter (spec §4.3): holds a connection handle to a tool
//! server — a stdio child process or an HTTP endpoint — caches its
//! advertised tool list, and forwards `{ name, arguments }` on invoke.
//! `isError` in the response maps to a thrown error.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::application::ptc_runtime::{AdapterOutcome, ToolAdapter};
use crate::domain::{ErrorKind, ExecContext, ToolError, ToolImpl, ToolKind, ToolSpec};

/// One configured back-end: either a stdio child command or an HTTP url.
#[derive(Debug, Clone)]
pub enum RpcConnection {
    Stdio { command: String, args: Vec<String>, env: HashMap<String, String> },
    Http { url: String },
}

struct StdioChild {
    child: Child,
    stdin_writer: tokio::process::ChildStdin,
    stdout_reader: BufReader<tokio::process::ChildStdout>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default, rename = "isError")]
    is_error: bool,
    #[serde(default)]
    error: Option<String>,
}

/// One RPC-tool adapter instance manages any number of configured
/// servers, keyed by server name. `listTools` caching happens per name.
pub struct RpcToolAdapter {
    http: reqwest::Client,
    connections: DashMap<String, RpcConnection>,
    /// Tool (leaf) name -> server name it is served by.
    tool_to_server: DashMap<String, String>,
    children: DashMap<String, Arc<Mutex<StdioChild>>>,
}

impl RpcToolAdapter {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            connections: DashMap::new(),
            tool_to_server: DashMap::new(),
            children: DashMap::new(),
        }
    }

    pub fn configure_server(&self, server_name: impl Into<String>, connection: RpcConnection) {
        self.connections.insert(server_name.into(), connection);
    }

    pub fn bind_tool(&self, tool_name: impl Into<String>, server_name: impl Into<String>) {
        self.tool_to_server.insert(tool_name.into(), server_name.into());
    }

    async fn ensure_child(&self, server_name: &str, command: &str, args: &[String], env: &HashMap<String, String>) -> Result<Arc<Mutex<StdioChild>>, ToolError> {
        if let Some(existing) = self.children.get(server_name) {
            return Ok(existing.clone());
        }
        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args).envs(env.iter()).stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::null());
        let mut child = cmd.spawn().map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("failed to spawn rpc-tool server `{server_name}`: {e}")))?;
        let stdin_writer = child.stdin.take().ok_or_else(|| ToolError::new(ErrorKind::UpstreamError, "rpc-tool child has no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| ToolError::new(ErrorKind::UpstreamError, "rpc-tool child has no stdout"))?;
        let wrapped = Arc::new(Mutex::new(StdioChild { child, stdin_writer, stdout_reader: BufReader::new(stdout) }));
        self.children.insert(server_name.to_string(), wrapped.clone());
        Ok(wrapped)
    }

    async fn call_stdio(&self, server_name: &str, command: &str, args: &[String], env: &HashMap<String, String>, request: Value) -> Result<RpcResponse, ToolError> {
        let handle = self.ensure_child(server_name, command, args, env).await?;
        let mut guard = handle.lock().await;
        let mut line = serde_json::to_string(&request).map_err(|e| ToolError::new(ErrorKind::UpstreamError, e.to_string()))?;
        line.push('\n');
        guard.stdin_writer.write_all(line.as_bytes()).await.map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("write to rpc-tool child failed: {e}")))?;
        let mut response_line = String::new();
        guard.stdout_reader.read_line(&mut response_line).await.map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("read from rpc-tool child failed: {e}")))?;
        if response_line.is_empty() {
            return Err(ToolError::new(ErrorKind::UpstreamError, format!("rpc-tool server `{server_name}` closed stdout")));
        }
        serde_json::from_str(&response_line).map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("malformed rpc-tool response: {e}")))
    }

    async fn call_http(&self, url: &str, request: Value) -> Result<RpcResponse, ToolError> {
        let response = self.http.post(url).json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::new(ErrorKind::HttpTimeout, e.to_string())
            } else {
                ToolError::new(ErrorKind::UpstreamError, e.to_string())
            }
        })?;
        response.json().await.map_err(|e| ToolError::new(ErrorKind::UpstreamError, format!("malformed rpc-tool response: {e}")))
    }

    /// Resolves the server a tool is served by, binding it on the fly from
    /// `spec.r#impl` the first time an rpc-tool discovered by directory
    /// scanning (rather than wired by `configure_server`/`bind_tool`) is
    /// invoked — discovery has no separate bind step of its own.
    fn resolve_server(&self, spec: &ToolSpec) -> Result<String, ToolError> {
        let leaf = spec.name.rsplit('/').next().unwrap_or(&spec.name);
        if let Some(server) = self.tool_to_server.get(leaf).map(|s| s.clone()).or_else(|| self.tool_to_server.get(&spec.name).map(|s| s.clone())) {
            return Ok(server);
        }

        let Some(ToolImpl::RpcTool { command, args, url, env }) = &spec.r#impl else {
            return Err(ToolError::new(ErrorKind::ToolNotFound, format!("`{}` is not bound to any rpc-tool server", spec.name)));
        };
        let connection = match (command, url) {
            (Some(command), _) => RpcConnection::Stdio { command: command.clone(), args: args.clone(), env: env.clone() },
            (None, Some(url)) => RpcConnection::Http { url: url.clone() },
            (None, None) => return Err(ToolError::new(ErrorKind::ToolNotFound, format!("`{}` declares no rpc-tool command or url", spec.name))),
        };
        self.configure_server(spec.name.clone(), connection);
        self.bind_tool(spec.name.clone(), spec.name.clone());
        Ok(spec.name.clone())
    }

    async fn call(&self, server_name: &str, request: Value) -> Result<RpcResponse, ToolError> {
        let connection = self
            .connections
            .get(server_name)
            .map(|c| c.clone())
            .ok_or_else(|| ToolError::new(ErrorKind::ToolNotFound, format!("no rpc-tool server configured with name `{server_name}`")))?;
        match connection {
            RpcConnection::Stdio { command, args, env } => self.call_stdio(server_name, &command, &args, &env, request).await,
            RpcConnection::Http { url } => self.call_http(&url, request).await,
        }
    }
}

impl Default for RpcToolAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for RpcToolAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::RpcTool
    }

    async fn invoke(&self, spec: &ToolSpec, args: Value, _ctx: &ExecContext) -> Result<AdapterOutcome, ToolError> {
        let leaf = spec.name.rsplit('/').next().unwrap_or(&spec.name).to_string();
        let server_name = self.resolve_server(spec)?;

        let request = json!({"name": leaf, "arguments": args});
        let response = self.call(&server_name, request).await?;

        if response.is_error {
            let message = response.error.unwrap_or_else(|| "rpc-tool server reported isError".to_string());
            return Err(ToolError::new(ErrorKind::UpstreamError, message));
        }

        Ok(AdapterOutcome { result: json!({"content": response.content}), raw: None, evidence: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_tool_leaf_name_to_configured_server() {
        let adapter = RpcToolAdapter::new();
        adapter.configure_server("weather", RpcConnection::Http { url: "http://localhost:9/rpc".into() });
        adapter.bind_tool("weather/forecast", "weather");
        assert_eq!(adapter.tool_to_server.get("weather/forecast").map(|s| s.clone()), Some("weather".to_string()));
    }

    #[tokio::test]
    async fn invoking_unbound_tool_is_tool_not_found() {
        let adapter = RpcToolAdapter::new();
        let spec = ToolSpec {
            name: "nope/nothing".into(),
            version: "1.0.0".into(),
            kind: ToolKind::RpcTool,
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

    #[tokio::test]
    async fn invoke_auto_binds_from_discovered_impl() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/rpc").with_status(200).with_body(r#"{"content": [{"type": "text", "text": "42"}]}"#).create_async().await;

        let adapter = RpcToolAdapter::new();
        let spec = ToolSpec {
            name: "search/weather".into(),
            version: "1.0.0".into(),
            kind: ToolKind::RpcTool,
            description: "d".into(),
            tags: vec![],
            capabilities: vec![],
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            cost_hints: None,
            endpoint: None,
            resource_id: None,
            r#impl: Some(ToolImpl::RpcTool { command: None, args: vec![], url: Some(format!("{}/rpc", server.url())), env: HashMap::new() }),
        };
        let ctx = ExecContext::new("r1", "t1");
        let outcome = adapter.invoke(&spec, json!({}), &ctx).await.unwrap();
        assert_eq!(outcome.result["content"][0]["text"], "42");
        mock.assert_async().await;
        assert!(adapter.tool_to_server.contains_key("search/weather"));
    }
}
