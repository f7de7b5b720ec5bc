// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Hub configuration (spec §9 "global state" note): a handful of
//! environment variables read once at startup into a plain struct. No
//! process-wide singleton — every `ToolHub` owns its own `HubConfig`.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::budget_manager::BudgetManagerConfig;
use crate::application::policy_engine::BlockedCidr;

#[derive(Debug, Clone)]
pub struct DiscoveryRoot {
    pub path: PathBuf,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub discovery_roots: Vec<DiscoveryRoot>,
    pub watch_debounce: Duration,
    pub job_ttl: Duration,
    pub sandbox_roots: Vec<PathBuf>,
    pub url_allowlist: Vec<String>,
    pub url_denylist: Vec<String>,
    pub blocked_cidrs: Vec<String>,
    pub budget: BudgetManagerConfig,
    pub prometheus_export: bool,
    pub event_log_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            discovery_roots: Vec::new(),
            watch_debounce: Duration::from_millis(200),
            job_ttl: Duration::from_secs(60),
            sandbox_roots: Vec::new(),
            url_allowlist: Vec::new(),
            url_denylist: Vec::new(),
            blocked_cidrs: Vec::new(),
            budget: BudgetManagerConfig::default(),
            prometheus_export: false,
            event_log_capacity: 1024,
        }
    }
}

impl HubConfig {
    /// Reads `TOOLHUB_*` overrides on top of the defaults. Malformed
    /// values are logged and ignored rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TOOLHUB_DISCOVERY_ROOTS") {
            config.discovery_roots = val
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .filter_map(|entry| {
                    let (path, namespace) = entry.split_once('=')?;
                    Some(DiscoveryRoot { path: PathBuf::from(path.trim()), namespace: namespace.trim().to_string() })
                })
                .collect();
        }

        if let Ok(val) = std::env::var("TOOLHUB_WATCH_DEBOUNCE_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.watch_debounce = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %val, "ignoring invalid TOOLHUB_WATCH_DEBOUNCE_MS"),
            }
        }

        if let Ok(val) = std::env::var("TOOLHUB_JOB_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.job_ttl = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %val, "ignoring invalid TOOLHUB_JOB_TTL_SECS"),
            }
        }

        if let Ok(val) = std::env::var("TOOLHUB_SANDBOX_ROOTS") {
            config.sandbox_roots = val.split(',').filter(|s| !s.trim().is_empty()).map(|s| PathBuf::from(s.trim())).collect();
        }

        if let Ok(val) = std::env::var("TOOLHUB_URL_ALLOWLIST") {
            config.url_allowlist = split_nonempty(&val);
        }
        if let Ok(val) = std::env::var("TOOLHUB_URL_DENYLIST") {
            config.url_denylist = split_nonempty(&val);
        }
        if let Ok(val) = std::env::var("TOOLHUB_BLOCKED_CIDRS") {
            config.blocked_cidrs = split_nonempty(&val);
        }

        if let Ok(val) = std::env::var("TOOLHUB_RATE_LIMIT_PER_SEC") {
            match val.parse::<u32>() {
                Ok(n) => config.budget.default_rate_per_sec = n,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid TOOLHUB_RATE_LIMIT_PER_SEC"),
            }
        }

        if let Ok(val) = std::env::var("TOOLHUB_PROMETHEUS_EXPORT") {
            config.prometheus_export = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes" | "on");
        }

        config
    }

    pub fn compiled_blocked_cidrs(&self) -> Vec<BlockedCidr> {
        self.blocked_cidrs
            .iter()
            .filter_map(|raw| {
                let parsed = BlockedCidr::parse(raw);
                if parsed.is_none() {
                    tracing::warn!(cidr = %raw, "ignoring unparsable blocked CIDR");
                }
                parsed
            })
            .collect()
    }

    pub fn compiled_url_patterns(patterns: &[String]) -> Vec<regex::Regex> {
        patterns
            .iter()
            .filter_map(|p| match regex::Regex::new(p) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!(pattern = %p, error = %err, "ignoring unparsable url pattern");
                    None
                }
            })
            .collect()
    }
}

fn split_nonempty(val: &str) -> Vec<String> {
    val.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}
