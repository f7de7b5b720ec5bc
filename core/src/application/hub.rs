// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! `ToolHub` facade (spec §6): the one type an embedding process talks
//! to. Owns every application-layer service plus the adapter map,
//! drives directory discovery and the hot-reload watcher, and answers
//! `invokeTool`/`invokeIntent` by delegating to the PTC Runtime.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{info, warn};

use crate::domain::{ExecContext, ToolError, ToolIntent, ToolKind, ToolResult, ToolSpec};

use super::budget_manager::BudgetManager;
use super::job_manager::JobManager;
use super::observability::{EventLog, HubMetrics, SpanTracer};
use super::policy_engine::PolicyEngine;
use super::ptc_runtime::{PtcRuntime, ToolAdapter};
use super::registry::ToolRegistry;
use super::retry_engine::RetryOptions;
use super::schema_validator::SchemaValidator;

use crate::infrastructure::adapters::skill_adapter::ToolInvoker;
use crate::infrastructure::adapters::{CoreToolsAdapter, EmbeddedWorkflowEngine, ImagePipelineAdapter, LocalFnAdapter, RpcToolAdapter, SkillAdapter, WorkflowAdapter, WorkflowEmbeddedAdapter, WorkflowRemoteAdapter};
use crate::infrastructure::config::HubConfig;
use crate::infrastructure::discovery::{load, load_skill, RootWatcher, Scanner};

/// Summary line returned by `listToolMetadata` (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
}

/// Full declaration returned by `getToolDescription` (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescription {
    pub name: String,
    pub version: String,
    pub kind: ToolKind,
    pub description: String,
    pub tags: Vec<String>,
    pub capabilities: Vec<crate::domain::Capability>,
    pub input_schema: Value,
    pub output_schema: Value,
}

impl From<&ToolSpec> for ToolDescription {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            name: spec.name.clone(),
            version: spec.version.clone(),
            kind: spec.kind,
            description: spec.description.clone(),
            tags: spec.tags.clone(),
            capabilities: spec.capabilities.clone(),
            input_schema: spec.input_schema.clone(),
            output_schema: spec.output_schema.clone(),
        }
    }
}

/// Health snapshot (SPEC_FULL.md §C supplement, grounded on the
/// teacher's `cli/src/daemon/server.rs` status endpoint): tool/job
/// counts and whether the hot-reload watcher is currently active.
#[derive(Debug, Clone, Serialize)]
pub struct HubHealth {
    pub tool_count: usize,
    pub job_count: usize,
    pub watching: bool,
    pub discovery_roots: usize,
}

/// Options accepted by `invokeTool` (spec §6): an explicit `ExecContext`
/// override, falling back to an anonymous one scoped to a fresh
/// request/task id when omitted.
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    pub ctx: Option<ExecContext>,
}

/// Options accepted by `watchRoots` (spec §6): an optional debounce
/// override, falling back to the configured default.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub debounce: Option<Duration>,
}

/// Forwards `ToolInvoker` calls back into the owning `ToolHub` through a
/// weak reference, so the `SkillAdapter` can hold a strong
/// `Arc<dyn ToolInvoker>` without keeping the hub itself alive (spec §4.3
/// "gated sub-tool invocation"; see `DESIGN.md` for why this is a `Weak`
/// handle rather than a direct cyclic `Arc`).
struct HubInvokerHandle(Weak<ToolHub>);

#[async_trait]
impl ToolInvoker for HubInvokerHandle {
    async fn invoke_tool(&self, name: &str, args: Value, ctx: &ExecContext) -> Result<ToolResult, ToolError> {
        let hub = self.0.upgrade().ok_or_else(|| ToolError::new(crate::domain::ErrorKind::UpstreamError, "tool hub has been shut down"))?;
        Ok(hub.invoke_tool(name, args, ctx.clone()).await)
    }
}

struct WatchState {
    _watcher: RootWatcher,
    stop: mpsc::UnboundedSender<()>,
}

/// The facade. Every method here mirrors one entry of spec §6's CLI
/// surface; construction wires every application-layer service plus the
/// kind→adapter map once, in `ToolHub::new`.
pub struct ToolHub {
    config: AsyncMutex<HubConfig>,
    registry: Arc<ToolRegistry>,
    runtime: PtcRuntime,
    jobs: Arc<JobManager>,
    event_log: Arc<EventLog>,
    local_fn: Arc<LocalFnAdapter>,
    rpc_tool: Arc<RpcToolAdapter>,
    skill: Arc<SkillAdapter>,
    watch: AsyncMutex<Option<WatchState>>,
}

impl ToolHub {
    /// Builds every application-layer service and the kind→adapter map,
    /// and registers the Core built-ins. Does not scan or watch roots —
    /// call `initAllTools`/`watchRoots` after construction.
    pub fn new(config: HubConfig) -> Arc<Self> {
        Self::new_with_embedded_engine(config, None)
    }

    /// Like `new`, but additionally wires an in-process workflow engine
    /// for `ToolImpl::Workflow { embedded: true, .. }` tools.
    pub fn new_with_embedded_engine(config: HubConfig, embedded_engine: Option<Arc<dyn EmbeddedWorkflowEngine>>) -> Arc<Self> {
        let registry = Arc::new(ToolRegistry::new());
        let schema_validator = Arc::new(SchemaValidator::new());
        let policy_engine = Arc::new(PolicyEngine::new(
            config.sandbox_roots.clone(),
            HubConfig::compiled_url_patterns(&config.url_allowlist),
            HubConfig::compiled_url_patterns(&config.url_denylist),
            config.compiled_blocked_cidrs(),
        ));
        let budget_config = super::budget_manager::BudgetManagerConfig {
            default_rate_per_sec: config.budget.default_rate_per_sec,
            breaker_failure_threshold: config.budget.breaker_failure_threshold,
            breaker_cooldown: config.budget.breaker_cooldown,
            global_default_timeout: config.budget.global_default_timeout,
        };
        let budget_manager = Arc::new(BudgetManager::new(budget_config, HashMap::new()));
        let event_log = Arc::new(EventLog::new(config.event_log_capacity));
        let metrics = Arc::new(if config.prometheus_export {
            HubMetrics::with_prometheus_export().unwrap_or_else(|err| {
                warn!(error = %err, "failed to install prometheus recorder, falling back to bare metrics");
                HubMetrics::new()
            })
        } else {
            HubMetrics::new()
        });
        let tracer = Arc::new(SpanTracer::new());
        let jobs = JobManager::new(config.job_ttl, event_log.clone());

        let core_tools = Arc::new(CoreToolsAdapter::new());
        let local_fn = Arc::new(LocalFnAdapter::new());
        let rpc_tool = Arc::new(RpcToolAdapter::new());
        let image_pipeline = Arc::new(ImagePipelineAdapter::new(jobs.clone()));
        let workflow_remote = Arc::new(WorkflowRemoteAdapter::new(jobs.clone()));
        let workflow_embedded = embedded_engine.map(|engine| Arc::new(WorkflowEmbeddedAdapter::new(engine)));
        let workflow = Arc::new(WorkflowAdapter::new(workflow_embedded, Some(workflow_remote)));

        registry
            .bulk_register(CoreToolsAdapter::builtin_specs())
            .expect("built-in core tool specs are always well-formed");

        Arc::new_cyclic(move |weak: &Weak<ToolHub>| {
            let invoker: Arc<dyn ToolInvoker> = Arc::new(HubInvokerHandle(weak.clone()));
            let skill = Arc::new(SkillAdapter::new(Some(invoker)));

            let mut adapters: HashMap<ToolKind, Arc<dyn ToolAdapter>> = HashMap::new();
            adapters.insert(ToolKind::Core, core_tools.clone());
            adapters.insert(ToolKind::LocalFn, local_fn.clone());
            adapters.insert(ToolKind::RpcTool, rpc_tool.clone());
            adapters.insert(ToolKind::Workflow, workflow.clone());
            adapters.insert(ToolKind::ImagePipeline, image_pipeline.clone());
            adapters.insert(ToolKind::Skill, skill.clone());

            let runtime = PtcRuntime::new(registry.clone(), schema_validator, policy_engine, budget_manager, event_log.clone(), metrics, tracer, adapters, RetryOptions::default());

            Self { config: AsyncMutex::new(config), registry, runtime, jobs, event_log, local_fn, rpc_tool, skill, watch: AsyncMutex::new(None) }
        })
    }

    /// Registers a local-fn handler so a discovered local-fn tool
    /// directory becomes callable (spec §4.3: the loader builds the
    /// spec, the embedding process supplies the executable side).
    pub fn register_local_fn(&self, tool_name: impl Into<String>, handler: Arc<dyn crate::infrastructure::adapters::local_fn::LocalFnHandler>) {
        self.local_fn.register(tool_name, handler);
    }

    /// Configures an rpc-tool back-end server ahead of discovery binding
    /// a leaf tool name to it.
    pub fn configure_rpc_server(&self, server_name: impl Into<String>, connection: crate::infrastructure::adapters::rpc_tool::RpcConnection) {
        self.rpc_tool.configure_server(server_name, connection);
    }

    /// Attaches a handler to a discovered skill so it runs code instead
    /// of returning an instruction-only result.
    pub fn register_skill_handler(&self, tool_name: impl Into<String>, handler: Arc<dyn crate::infrastructure::adapters::skill_adapter::SkillHandler>) {
        self.skill.register_handler(tool_name, handler);
    }

    /// Full scan of the configured discovery roots plus the Core
    /// built-ins, registering everything found (spec §6 `initAllTools`).
    pub async fn init_all_tools(&self) -> Vec<crate::infrastructure::discovery::ScanError> {
        self.scan_and_register().await
    }

    /// Re-scans the configured roots and re-registers what's found,
    /// preserving Core built-ins (spec §6 `refreshTools`). Idempotent:
    /// an unchanged filesystem yields the same `snapshot()` afterward.
    pub async fn refresh_tools(&self) -> Vec<crate::infrastructure::discovery::ScanError> {
        self.registry.clear_except(ToolKind::Core);
        self.scan_and_register().await
    }

    async fn scan_and_register(&self) -> Vec<crate::infrastructure::discovery::ScanError> {
        let roots = self.config.lock().await.discovery_roots.clone();
        let (discovered, mut errors) = Scanner::scan(&roots);
        for tool in &discovered {
            if tool.inferred_kind == Some(crate::infrastructure::discovery::InferredKind::Skill) {
                match load_skill(tool) {
                    Ok((spec, definition)) => {
                        let name = spec.name.clone();
                        if let Err(err) = self.registry.register(spec) {
                            errors.push(scan_err(&tool.dir, err));
                            continue;
                        }
                        self.skill.register_definition(name, Arc::new(definition));
                    }
                    Err(err) => errors.push(crate::infrastructure::discovery::ScanError { dir: tool.dir.clone(), phase: err.phase, message: err.message }),
                }
                continue;
            }
            match load(tool) {
                Ok(spec) => {
                    if let Err(err) = self.registry.register(spec) {
                        errors.push(scan_err(&tool.dir, err));
                    }
                }
                Err(err) => errors.push(crate::infrastructure::discovery::ScanError { dir: tool.dir.clone(), phase: err.phase, message: err.message }),
            }
        }
        info!(found = discovered.len(), errors = errors.len(), "discovery scan complete");
        errors
    }

    /// Appends discovery roots, optionally triggering a refresh (spec §6
    /// `addRoots`).
    pub async fn add_roots(&self, roots: Vec<crate::infrastructure::config::DiscoveryRoot>, refresh: bool) -> Vec<crate::infrastructure::discovery::ScanError> {
        self.config.lock().await.discovery_roots.extend(roots);
        if refresh {
            self.refresh_tools().await
        } else {
            Vec::new()
        }
    }

    /// Replaces the discovery roots wholesale, optionally triggering a
    /// refresh (spec §6 `setRoots`).
    pub async fn set_roots(&self, roots: Vec<crate::infrastructure::config::DiscoveryRoot>, refresh: bool) -> Vec<crate::infrastructure::discovery::ScanError> {
        self.config.lock().await.discovery_roots = roots;
        if refresh {
            self.refresh_tools().await
        } else {
            Vec::new()
        }
    }

    /// Starts the hot-reload watcher over the configured roots (spec §6
    /// `watchRoots`). Replaces any watcher already running.
    pub async fn watch_roots(self: &Arc<Self>, opts: WatchOptions) -> notify::Result<()> {
        let (roots, debounce) = {
            let config = self.config.lock().await;
            (config.discovery_roots.clone(), opts.debounce.unwrap_or(config.watch_debounce))
        };
        let (watcher, mut rx) = RootWatcher::start(&roots, debounce)?;
        let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();

        let hub = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    signal = rx.recv() => {
                        if signal.is_none() {
                            break;
                        }
                        let Some(hub) = hub.upgrade() else { break };
                        let errors = hub.refresh_tools().await;
                        if !errors.is_empty() {
                            warn!(count = errors.len(), "hot-reload refresh reported scan errors");
                        }
                    }
                    _ = stop_rx.recv() => break,
                }
            }
        });

        *self.watch.lock().await = Some(WatchState { _watcher: watcher, stop: stop_tx });
        Ok(())
    }

    /// Stops the hot-reload watcher if one is running (spec §6
    /// `unwatchRoots`).
    pub async fn unwatch_roots(&self) {
        if let Some(state) = self.watch.lock().await.take() {
            let _ = state.stop.send(());
        }
    }

    /// `{name, description}` for every registered tool (spec §6
    /// `listToolMetadata`).
    pub fn list_tool_metadata(&self) -> Vec<ToolMetadata> {
        self.registry.list().into_iter().map(|s| ToolMetadata { name: s.name, description: s.description }).collect()
    }

    /// Full declaration for one tool, or `None` if unregistered (spec §6
    /// `getToolDescription`).
    pub fn get_tool_description(&self, name: &str) -> Option<ToolDescription> {
        self.registry.get(name).as_ref().map(ToolDescription::from)
    }

    /// Invokes a tool by name with an `ExecContext` sourced from `opts`,
    /// or a fresh anonymous one (spec §6 `invokeTool`).
    pub async fn invoke_tool(&self, name: &str, args: Value, ctx: ExecContext) -> ToolResult {
        self.invoke_intent(ToolIntent::new(name, args, "direct invocation"), ctx).await
    }

    /// Invokes a `ToolIntent` through the PTC Runtime (spec §6
    /// `invokeIntent`).
    pub async fn invoke_intent(&self, intent: ToolIntent, ctx: ExecContext) -> ToolResult {
        self.runtime.invoke(intent, ctx).await
    }

    /// Tool/job counts and watcher status (SPEC_FULL.md §C supplement).
    pub async fn health(&self) -> HubHealth {
        HubHealth {
            tool_count: self.registry.size(),
            job_count: self.jobs.list(&Default::default()).len(),
            watching: self.watch.lock().await.is_some(),
            discovery_roots: self.config.lock().await.discovery_roots.len(),
        }
    }

    /// Stops the watcher and the job manager's TTL sweeper (spec §6
    /// `shutdown`). Safe to call more than once.
    pub async fn shutdown(&self) {
        self.unwatch_roots().await;
        self.jobs.dispose();
    }
}

#[async_trait]
impl ToolInvoker for ToolHub {
    async fn invoke_tool(&self, name: &str, args: Value, ctx: &ExecContext) -> Result<ToolResult, ToolError> {
        Ok(self.invoke_intent(ToolIntent::new(name, args, "sub-tool invocation"), ctx.clone()).await)
    }
}

fn scan_err(dir: &std::path::Path, err: crate::domain::DomainError) -> crate::infrastructure::discovery::ScanError {
    crate::infrastructure::discovery::ScanError { dir: dir.to_path_buf(), phase: crate::infrastructure::discovery::ScanPhase::Validate, message: err.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::DiscoveryRoot;
    use serde_json::json;

    fn test_config(discovery_roots: Vec<DiscoveryRoot>) -> HubConfig {
        HubConfig { discovery_roots, ..HubConfig::default() }
    }

    #[tokio::test]
    async fn core_builtins_are_registered_on_construction() {
        let hub = ToolHub::new(test_config(vec![]));
        let names: Vec<_> = hub.list_tool_metadata().into_iter().map(|m| m.name).collect();
        assert!(names.contains(&"core/fs-read-text".to_string()));
    }

    #[tokio::test]
    async fn refresh_twice_on_unchanged_filesystem_yields_same_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let tool_dir = dir.path().join("translate");
        std::fs::create_dir_all(&tool_dir).unwrap();
        std::fs::write(tool_dir.join("index.js"), "module.exports = {};").unwrap();

        let hub = ToolHub::new(test_config(vec![DiscoveryRoot { path: dir.path().to_path_buf(), namespace: "ns".into() }]));
        hub.init_all_tools().await;
        let first: Vec<_> = hub.list_tool_metadata().into_iter().map(|m| m.name).collect();
        hub.refresh_tools().await;
        let second: Vec<_> = hub.list_tool_metadata().into_iter().map(|m| m.name).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn invoke_tool_runs_a_registered_core_builtin() {
        let hub = ToolHub::new(test_config(vec![]));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "hi").unwrap();
        let ctx = ExecContext::new("r1", "t1").with_permissions(vec![crate::domain::Capability::ReadFs]);
        let result = hub.invoke_tool("core/fs-read-text", json!({"path": path.to_str().unwrap()}), ctx).await;
        assert!(result.ok);
        assert_eq!(result.result.unwrap()["content"], "hi");
    }

    #[tokio::test]
    async fn skill_handler_can_invoke_core_tool_back_through_the_hub() {
        use crate::infrastructure::adapters::skill_adapter::{SkillContext, SkillHandler};
        use crate::domain::{SkillDefinition, SkillFrontmatter};
        use std::collections::HashMap as StdHashMap;

        struct Relay;
        #[async_trait]
        impl SkillHandler for Relay {
            async fn invoke(&self, ctx: &SkillContext<'_>, args: Value) -> Result<Value, ToolError> {
                ctx.invoke_tool("core/fs-read-text", args).await.map(|r| r.result.unwrap_or(Value::Null))
            }
        }

        let hub = ToolHub::new(test_config(vec![]));
        let definition = SkillDefinition::new(
            SkillFrontmatter { name: "relay".into(), description: "relays to core".into(), license: None, compatibility: None, allowed_tools: Some(vec!["core/fs-read-text".into()]), metadata: StdHashMap::new() },
            "Relay reads.",
            Vec::new(),
            dirpath(),
            dirpath().join("SKILL.md"),
        )
        .unwrap();
        hub.skill.register_definition("skill/relay", Arc::new(definition));
        hub.register_skill_handler("skill/relay", Arc::new(Relay));
        hub.registry
            .register(ToolSpec {
                name: "skill/relay".into(),
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
            })
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "relayed").unwrap();
        let ctx = ExecContext::new("r1", "t1").with_permissions(vec![crate::domain::Capability::ReadFs]);
        let result = hub.invoke_tool("skill/relay", json!({"path": path.to_str().unwrap()}), ctx).await;
        assert!(result.ok);
        assert_eq!(result.result.unwrap()["content"], "relayed");
    }

    fn dirpath() -> std::path::PathBuf {
        std::path::PathBuf::from("/skills/relay")
    }
}
