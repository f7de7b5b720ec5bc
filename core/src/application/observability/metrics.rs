// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Counters and histograms named in spec §4.10, recorded through the
//! `metrics` facade so any installed recorder (including the optional
//! Prometheus exporter below) receives them.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct HubMetrics {
    prometheus: Option<PrometheusHandle>,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self { prometheus: None }
    }

    /// Installs a process-wide Prometheus recorder and keeps the handle
    /// for text rendering. Optional per spec §4.10 ("text export is
    /// optional") — callers that don't need `/metrics` skip this.
    pub fn with_prometheus_export() -> Result<Self, metrics_exporter_prometheus::BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Ok(Self { prometheus: Some(handle) })
    }

    pub fn render_prometheus(&self) -> Option<String> {
        self.prometheus.as_ref().map(|h| h.render())
    }

    pub fn record_invocation(&self, tool: &str, ok: bool) {
        counter!("tool_invocations_total", "tool" => tool.to_string(), "ok" => ok.to_string()).increment(1);
    }

    pub fn record_retry(&self, tool: &str) {
        counter!("tool_retries_total", "tool" => tool.to_string()).increment(1);
    }

    pub fn record_policy_denied(&self, tool: &str, reason: &str) {
        counter!("policy_denied_total", "tool" => tool.to_string(), "reason" => reason.to_string()).increment(1);
    }

    pub fn record_job(&self, tool: &str, status: &str) {
        counter!("jobs_total", "tool" => tool.to_string(), "status" => status.to_string()).increment(1);
    }

    pub fn record_latency(&self, tool: &str, duration_ms: f64) {
        histogram!("tool_latency_ms", "tool" => tool.to_string()).record(duration_ms);
    }
}

impl Default for HubMetrics {
    fn default() -> Self {
        Self::new()
    }
}
