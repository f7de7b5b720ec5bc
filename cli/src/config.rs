// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! On-disk CLI configuration (spec §6): a JSON file mirroring
//! `toolhub_core::infrastructure::config::HubConfig`, read once before the
//! hub is constructed. Separate from `HubConfig::from_env()` — the CLI is
//! an external collaborator and gets its own explicit, discoverable
//! config file rather than relying on ambient environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use toolhub_core::infrastructure::config::{DiscoveryRoot, HubConfig};

/// Default location the CLI looks for when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "toolhub.json";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawDiscoveryRoot {
    path: PathBuf,
    namespace: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    discovery_roots: Vec<RawDiscoveryRoot>,
    #[serde(default)]
    watch_debounce_ms: Option<u64>,
    #[serde(default)]
    job_ttl_secs: Option<u64>,
    #[serde(default)]
    sandbox_roots: Vec<PathBuf>,
    #[serde(default)]
    url_allowlist: Vec<String>,
    #[serde(default)]
    url_denylist: Vec<String>,
    #[serde(default)]
    blocked_cidrs: Vec<String>,
    #[serde(default)]
    rate_limit_per_sec: Option<u32>,
    #[serde(default)]
    prometheus_export: bool,
    #[serde(default)]
    event_log_capacity: Option<usize>,
}

/// Loads a `HubConfig` for the CLI: an explicit `--config` path must
/// exist (`ConfigLoadError::NotFound` otherwise); when omitted, falls
/// back to `DEFAULT_CONFIG_FILE` in the current directory if present,
/// else to `HubConfig::from_env()` with no config file at all.
pub fn load_hub_config(explicit_path: Option<&Path>) -> Result<HubConfig, ConfigLoadError> {
    let path = match explicit_path {
        Some(p) => {
            if !p.is_file() {
                return Err(ConfigLoadError::NotFound(p.to_path_buf()));
            }
            Some(p.to_path_buf())
        }
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    };

    let Some(path) = path else {
        return Ok(HubConfig::from_env());
    };

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigLoadError::Read { path: path.clone(), source })?;
    let parsed: RawConfig = serde_json::from_str(&raw).map_err(|source| ConfigLoadError::Parse { path: path.clone(), source })?;

    let mut config = HubConfig::from_env();
    if !parsed.discovery_roots.is_empty() {
        config.discovery_roots = parsed.discovery_roots.into_iter().map(|r| DiscoveryRoot { path: r.path, namespace: r.namespace }).collect();
    }
    if let Some(ms) = parsed.watch_debounce_ms {
        config.watch_debounce = std::time::Duration::from_millis(ms);
    }
    if let Some(secs) = parsed.job_ttl_secs {
        config.job_ttl = std::time::Duration::from_secs(secs);
    }
    if !parsed.sandbox_roots.is_empty() {
        config.sandbox_roots = parsed.sandbox_roots;
    }
    if !parsed.url_allowlist.is_empty() {
        config.url_allowlist = parsed.url_allowlist;
    }
    if !parsed.url_denylist.is_empty() {
        config.url_denylist = parsed.url_denylist;
    }
    if !parsed.blocked_cidrs.is_empty() {
        config.blocked_cidrs = parsed.blocked_cidrs;
    }
    if let Some(rate) = parsed.rate_limit_per_sec {
        config.budget.default_rate_per_sec = rate;
    }
    if parsed.prometheus_export {
        config.prometheus_export = true;
    }
    if let Some(capacity) = parsed.event_log_capacity {
        config.event_log_capacity = capacity;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_path_is_not_found() {
        let err = load_hub_config(Some(Path::new("/no/such/toolhub.json"))).unwrap_err();
        assert!(matches!(err, ConfigLoadError::NotFound(_)));
    }

    #[test]
    fn absent_default_falls_back_to_env() {
        let dir = tempfile::tempdir().unwrap();
        let prior = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = load_hub_config(None);
        std::env::set_current_dir(prior).unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn parses_discovery_roots_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolhub.json");
        std::fs::write(&path, r#"{"discoveryRoots":[{"path":"/tools/search","namespace":"search"}]}"#).unwrap();
        let config = load_hub_config(Some(&path)).unwrap();
        assert_eq!(config.discovery_roots.len(), 1);
        assert_eq!(config.discovery_roots[0].namespace, "search");
    }
}
