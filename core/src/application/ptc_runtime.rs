// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! The Policy-Typed-Call Runtime (spec §4.1): the ordered 9-step pipeline
//! that turns an untrusted `(toolName, args)` pair into a validated,
//! authorized, bounded, observable `ToolResult`. Dispatch to adapters
//! goes through a `kind → adapter` map (spec §9), never trait-object
//! inheritance beyond the one `ToolAdapter` seam.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::{Capability, ErrorKind, Evidence, ExecContext, ToolError, ToolIntent, ToolKind, ToolResult, ToolSpec};

use super::budget_manager::{BudgetDecision, BudgetError, BudgetManager};
use super::evidence_builder::EvidenceBuilder;
use super::observability::{EventLog, HubMetrics, SpanTracer};
use super::policy_engine::PolicyEngine;
use super::registry::ToolRegistry;
use super::retry_engine::{retry_with_backoff, RetryOptions};
use super::schema_validator::SchemaValidator;
use crate::domain::EventPayload;

/// What an adapter hands back on success (spec §4.3, §9 "evidence
/// channel"): the normalized result plus whatever extra evidence and
/// raw payload the back-end wants to surface.
#[derive(Debug, Clone, Default)]
pub struct AdapterOutcome {
    pub result: Value,
    pub raw: Option<Value>,
    pub evidence: Vec<Evidence>,
}

#[async_trait]
pub trait ToolAdapter: Send + Sync {
    fn kind(&self) -> ToolKind;
    async fn invoke(&self, spec: &ToolSpec, args: Value, ctx: &ExecContext) -> Result<AdapterOutcome, ToolError>;
}

pub struct PtcRuntime {
    registry: Arc<ToolRegistry>,
    schema_validator: Arc<SchemaValidator>,
    policy_engine: Arc<PolicyEngine>,
    budget_manager: Arc<BudgetManager>,
    event_log: Arc<EventLog>,
    metrics: Arc<HubMetrics>,
    tracer: Arc<SpanTracer>,
    adapters: HashMap<ToolKind, Arc<dyn ToolAdapter>>,
    retry_opts: RetryOptions,
}

impl PtcRuntime {
    pub fn new(
        registry: Arc<ToolRegistry>,
        schema_validator: Arc<SchemaValidator>,
        policy_engine: Arc<PolicyEngine>,
        budget_manager: Arc<BudgetManager>,
        event_log: Arc<EventLog>,
        metrics: Arc<HubMetrics>,
        tracer: Arc<SpanTracer>,
        adapters: HashMap<ToolKind, Arc<dyn ToolAdapter>>,
        retry_opts: RetryOptions,
    ) -> Self {
        Self { registry, schema_validator, policy_engine, budget_manager, event_log, metrics, tracer, adapters, retry_opts }
    }

    pub async fn invoke(&self, intent: ToolIntent, ctx: ExecContext) -> ToolResult {
        let span = self.tracer.start_span("invoke", ctx.trace_id.clone(), None, json!({"tool": intent.tool}));
        let result = self.invoke_inner(intent, &ctx, &span.span_id).await;
        self.tracer.end_span(&span.span_id, if result.ok { "ok" } else { "error" });
        result
    }

    async fn invoke_inner(&self, intent: ToolIntent, ctx: &ExecContext, span_id: &str) -> ToolResult {
        let started = Instant::now();

        // 1. Resolve.
        let Some(spec) = self.registry.get(&intent.tool) else {
            let available: Vec<String> = self.registry.list().into_iter().take(20).map(|s| s.name).collect();
            return self.finish_failure(&intent, ctx, ErrorKind::ToolNotFound, format!("unknown tool `{}`", intent.tool), Some(json!({"availableTools": available})), started);
        };

        self.tracer.add_event(span_id, "resolved", json!({"kind": spec.kind.as_str()}));

        // 2. Validate input.
        let validated = match self.schema_validator.validate(&spec.input_schema, &intent.args) {
            Ok(outcome) if outcome.valid => outcome.data,
            Ok(outcome) => {
                return self.finish_failure(&intent, ctx, ErrorKind::InputSchemaInvalid, "input failed schema validation", Some(json!({"errors": outcome.errors})), started);
            }
            Err(err) => {
                return self.finish_failure(&intent, ctx, ErrorKind::InputSchemaInvalid, err.to_string(), None, started);
            }
        };

        // 3. Enrich defaults (validate() already default-fills; this is
        // the named step the result is carried under from here on).
        let enriched_args = self.schema_validator.fill_defaults(&spec.input_schema, &validated);

        self.event_log.append(ctx.request_id.clone(), ctx.task_id.clone(), Some(spec.name.clone()), ctx.trace_id.clone(), EventPayload::ToolCalled { args_preview: enriched_args.clone() });

        // 4. Policy gate.
        let decision = self.policy_engine.check(&spec, &enriched_args, ctx).await;
        if !decision.allowed {
            let reason = decision.reason.clone().unwrap_or_else(|| "denied".into());
            self.event_log.append(ctx.request_id.clone(), ctx.task_id.clone(), Some(spec.name.clone()), ctx.trace_id.clone(), EventPayload::PolicyDenied { reason: reason.clone(), missing_capabilities: decision.missing_capabilities.iter().map(Capability::to_string).collect() });
            self.metrics.record_policy_denied(&spec.name, &reason);
            return self.finish_failure(&intent, ctx, ErrorKind::PolicyDenied, reason, Some(json!({"missingCapabilities": decision.missing_capabilities})), started);
        }

        if ctx.dry_run {
            let synthetic = json!({"dryRun": true, "tool": spec.name, "kind": spec.kind.as_str(), "args": enriched_args, "capabilities": spec.capabilities});
            return self.finish_success(&intent, &spec, ctx, enriched_args, synthetic, Vec::new(), started);
        }

        // 5. Budget admission.
        match self.budget_manager.admit(&spec.name) {
            BudgetDecision::Admitted => {}
            BudgetDecision::RateLimited | BudgetDecision::CircuitOpen => {
                return self.finish_failure(&intent, ctx, ErrorKind::BudgetExceeded, "budget admission refused", None, started);
            }
        }

        // 6. Execute: adapter lookup -> breaker -> retry, all under one
        // overall timeout (spec §5: a single per-call timeout wraps steps
        // 5-7 and cancels any in-flight retries on expiry).
        let Some(adapter) = self.adapters.get(&spec.kind).cloned() else {
            return self.finish_failure(&intent, ctx, ErrorKind::ToolNotFound, format!("no adapter registered for kind `{}`", spec.kind), None, started);
        };
        let timeout = self.budget_manager.get_timeout(&spec.name, ctx.budget.as_ref().and_then(|b| b.timeout_ms).map(Duration::from_millis));
        let retry_opts = RetryOptions { max_retries: ctx.budget.as_ref().and_then(|b| b.max_retries).unwrap_or(self.retry_opts.max_retries), ..self.retry_opts.clone() };

        let attempted = self.budget_manager.execute(&spec.name, || async {
            let attempt_spec = spec.clone();
            let attempt_args = enriched_args.clone();
            retry_with_backoff(
                &retry_opts,
                || {
                    let adapter = adapter.clone();
                    let spec = attempt_spec.clone();
                    let args = attempt_args.clone();
                    async move { adapter.invoke(&spec, args, ctx).await }
                },
                |e: &ToolError| e.kind,
                |err, attempt| {
                    self.metrics.record_retry(&spec.name);
                    self.event_log.append(ctx.request_id.clone(), ctx.task_id.clone(), Some(spec.name.clone()), ctx.trace_id.clone(), EventPayload::Retry { attempt, error_kind: Some(err.kind) });
                },
            )
            .await
        });

        let exec_result = match tokio::time::timeout(timeout, attempted).await {
            Ok(result) => result,
            Err(_) => {
                return self.finish_failure(&intent, ctx, ErrorKind::Timeout, "tool call exceeded its timeout", None, started);
            }
        };

        let outcome = match exec_result {
            Ok(outcome) => outcome,
            Err(BudgetError::Rejected(_)) => {
                return self.finish_failure(&intent, ctx, ErrorKind::BudgetExceeded, "circuit breaker rejected the trial call", None, started);
            }
            Err(BudgetError::Inner(tool_err)) => {
                return self.finish_failure(&intent, ctx, tool_err.kind, tool_err.message, tool_err.details, started);
            }
        };

        // 7. Validate output.
        let validated_output = match self.schema_validator.validate(&spec.output_schema, &outcome.result) {
            Ok(out) if out.valid => out.data,
            Ok(out) => return self.finish_failure(&intent, ctx, ErrorKind::OutputSchemaInvalid, "output failed schema validation", Some(json!({"errors": out.errors})), started),
            Err(err) => return self.finish_failure(&intent, ctx, ErrorKind::OutputSchemaInvalid, err.to_string(), None, started),
        };

        self.finish_success(&intent, &spec, ctx, enriched_args, validated_output, outcome.evidence, started)
    }

    fn finish_success(&self, intent: &ToolIntent, spec: &ToolSpec, ctx: &ExecContext, args: Value, result: Value, adapter_evidence: Vec<Evidence>, started: Instant) -> ToolResult {
        let duration_ms = started.elapsed().as_millis() as u64;
        let mut evidence = adapter_evidence;
        evidence.extend(EvidenceBuilder::build(&spec.name, &spec.version, &args, &result, duration_ms));

        self.event_log.append(ctx.request_id.clone(), ctx.task_id.clone(), Some(spec.name.clone()), ctx.trace_id.clone(), EventPayload::ToolResult { ok: true, duration_ms, error_kind: None });
        self.metrics.record_invocation(&spec.name, true);
        self.metrics.record_latency(&spec.name, duration_ms as f64);

        let _ = intent;
        ToolResult::success(result, evidence)
    }

    fn finish_failure(&self, intent: &ToolIntent, ctx: &ExecContext, kind: ErrorKind, message: impl Into<String>, details: Option<Value>, started: Instant) -> ToolResult {
        let duration_ms = started.elapsed().as_millis() as u64;
        let mut error = ToolError::new(kind, message);
        if let Some(details) = details {
            error = error.with_details(details);
        }
        self.event_log.append(ctx.request_id.clone(), ctx.task_id.clone(), Some(intent.tool.clone()), ctx.trace_id.clone(), EventPayload::ToolResult { ok: false, duration_ms, error_kind: Some(kind) });
        self.metrics.record_invocation(&intent.tool, false);
        self.metrics.record_latency(&intent.tool, duration_ms as f64);
        ToolResult::failure(error)
    }
}
