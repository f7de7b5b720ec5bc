// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Policy Engine (spec §4.7): capability gate, path sandboxing, URL
//! allow/deny plus SSRF CIDR blocking, and SQL-keyword parameter
//! inspection. Path containment follows the teacher's `path_sanitizer`
//! real-path-resolution discipline; CIDR matching is hand-rolled since no
//! crate in the pack carries an IP-network type.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Capability, ExecContext, ToolSpec};

const PATH_ARG_KEYS: &[&str] = &["path", "dest", "file"];
const SQL_ARG_KEYS: &[&str] = &["sql", "query"];
const SQL_DENYLIST: &[&str] = &["DROP", "TRUNCATE"];

#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    pub missing_capabilities: Vec<Capability>,
}

impl PolicyDecision {
    fn allow() -> Self {
        Self { allowed: true, reason: None, missing_capabilities: Vec::new() }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()), missing_capabilities: Vec::new() }
    }

    fn deny_missing_capabilities(missing: Vec<Capability>) -> Self {
        Self { allowed: false, reason: Some("missing required capabilities".into()), missing_capabilities: missing }
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{0}")]
    Denied(String),
}

#[derive(Clone)]
pub struct BlockedCidr {
    network: IpAddr,
    prefix_len: u8,
}

impl BlockedCidr {
    pub fn parse(cidr: &str) -> Option<Self> {
        let (addr, prefix) = cidr.split_once('/')?;
        let network = addr.parse().ok()?;
        let prefix_len: u8 = prefix.parse().ok()?;
        Some(Self { network, prefix_len })
    }

    fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(candidate)) => {
                let mask = if self.prefix_len == 0 { 0 } else { u32::MAX << (32 - self.prefix_len.min(32)) };
                (u32::from(net) & mask) == (u32::from(candidate) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(candidate)) => {
                let mask = if self.prefix_len == 0 { 0 } else { u128::MAX << (128 - self.prefix_len.min(128)) };
                (u128::from(net) & mask) == (u128::from(candidate) & mask)
            }
            _ => false,
        }
    }
}

pub struct PolicyEngine {
    sandbox_roots: Vec<PathBuf>,
    url_allowlist: Vec<Regex>,
    url_denylist: Vec<Regex>,
    blocked_cidrs: Vec<BlockedCidr>,
}

impl PolicyEngine {
    pub fn new(sandbox_roots: Vec<PathBuf>, url_allowlist: Vec<Regex>, url_denylist: Vec<Regex>, blocked_cidrs: Vec<BlockedCidr>) -> Self {
        Self { sandbox_roots, url_allowlist, url_denylist, blocked_cidrs }
    }

    pub async fn check(&self, spec: &ToolSpec, args: &Value, ctx: &ExecContext) -> PolicyDecision {
        let missing = ctx.missing_capabilities(&spec.capabilities);
        if !missing.is_empty() {
            return PolicyDecision::deny_missing_capabilities(missing);
        }

        if let Some(decision) = self.check_paths(args) {
            return decision;
        }

        if spec.has_capability(Capability::Network) {
            if let Some(decision) = self.check_urls(args).await {
                return decision;
            }
        }

        let danger_granted = ctx.permissions.contains(&Capability::DangerDestructive);
        if let Some(decision) = self.check_sql(args, danger_granted) {
            return decision;
        }

        PolicyDecision::allow()
    }

    pub async fn enforce(&self, spec: &ToolSpec, args: &Value, ctx: &ExecContext) -> Result<(), PolicyError> {
        let decision = self.check(spec, args, ctx).await;
        if decision.allowed {
            Ok(())
        } else {
            Err(PolicyError::Denied(decision.reason.unwrap_or_else(|| "denied".into())))
        }
    }

    fn check_paths(&self, args: &Value) -> Option<PolicyDecision> {
        let Value::Object(map) = args else { return None };
        for key in PATH_ARG_KEYS {
            let Some(Value::String(raw)) = map.get(*key) else { continue };
            if raw.split(['/', '\\']).any(|seg| seg == "..") {
                return Some(PolicyDecision::deny(format!("path traversal attempt in `{key}`")));
            }
            if !self.within_sandbox(raw) {
                return Some(PolicyDecision::deny(format!("`{key}` resolves outside the sandbox")));
            }
        }
        None
    }

    fn within_sandbox(&self, raw: &str) -> bool {
        if self.sandbox_roots.is_empty() {
            return true;
        }
        let resolved = resolve_real_path(Path::new(raw));
        self.sandbox_roots.iter().any(|root| {
            let root = resolve_real_path(root);
            resolved.starts_with(&root)
        })
    }

    async fn check_urls(&self, args: &Value) -> Option<PolicyDecision> {
        let Value::Object(map) = args else { return None };
        let Some(Value::String(raw)) = map.get("url") else { return None };

        let Ok(parsed) = url::Url::parse(raw) else {
            return Some(PolicyDecision::deny("malformed url"));
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Some(PolicyDecision::deny("only http/https urls are allowed"));
        }
        if self.url_denylist.iter().any(|re| re.is_match(raw)) {
            return Some(PolicyDecision::deny("url matches deny-list"));
        }
        if !self.url_allowlist.is_empty() && !self.url_allowlist.iter().any(|re| re.is_match(raw)) {
            return Some(PolicyDecision::deny("url does not match allow-list"));
        }

        let Some(host) = parsed.host_str() else {
            return Some(PolicyDecision::deny("url has no host"));
        };
        if self.blocked_cidrs.is_empty() {
            return None;
        }
        let port = parsed.port_or_known_default().unwrap_or(443);
        match tokio::net::lookup_host((host, port)).await {
            Ok(addrs) => {
                for addr in addrs {
                    let ip = addr.ip();
                    if self.blocked_cidrs.iter().any(|cidr| cidr.contains(ip)) {
                        return Some(PolicyDecision::deny(format!("resolved address {ip} is in a blocked range")));
                    }
                }
                None
            }
            Err(_) => Some(PolicyDecision::deny("dns resolution failed")),
        }
    }

    fn check_sql(&self, args: &Value, danger_granted: bool) -> Option<PolicyDecision> {
        if danger_granted {
            return None;
        }
        let Value::Object(map) = args else { return None };
        for key in SQL_ARG_KEYS {
            let Some(Value::String(raw)) = map.get(*key) else { continue };
            let upper = raw.to_uppercase();
            if SQL_DENYLIST.iter().any(|kw| upper.contains(kw)) {
                return Some(PolicyDecision::deny(format!("`{key}` contains a destructive SQL keyword")));
            }
        }
        None
    }
}

/// Resolves `..` and symlinks; for a path that doesn't exist yet,
/// resolves its parent and rejoins the leaf (spec §9 design note).
fn resolve_real_path(path: &Path) -> PathBuf {
    if let Ok(canon) = path.canonicalize() {
        return canon;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(leaf)) if !parent.as_os_str().is_empty() => {
            if let Ok(canon_parent) = parent.canonicalize() {
                return canon_parent.join(leaf);
            }
            path.to_path_buf()
        }
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec_with_caps(caps: Vec<Capability>) -> ToolSpec {
        ToolSpec {
            name: "t".into(),
            version: "1.0.0".into(),
            kind: crate::domain::ToolKind::Core,
            description: "d".into(),
            tags: vec![],
            capabilities: caps,
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            cost_hints: None,
            endpoint: None,
            resource_id: None,
            r#impl: None,
        }
    }

    #[tokio::test]
    async fn denies_missing_capability() {
        let engine = PolicyEngine::new(vec![], vec![], vec![], vec![]);
        let spec = spec_with_caps(vec![Capability::WriteFs]);
        let ctx = ExecContext::new("r1", "t1").with_permissions(vec![Capability::ReadWeb]);
        let decision = engine.check(&spec, &json!({}), &ctx).await;
        assert!(!decision.allowed);
        assert_eq!(decision.missing_capabilities, vec![Capability::WriteFs]);
    }

    #[tokio::test]
    async fn rejects_raw_traversal_segment() {
        let root = std::env::temp_dir();
        let engine = PolicyEngine::new(vec![root], vec![], vec![], vec![]);
        let spec = spec_with_caps(vec![Capability::ReadFs]);
        let ctx = ExecContext::new("r1", "t1").with_permissions(vec![Capability::ReadFs]);
        let decision = engine.check(&spec, &json!({"path": "../../../etc/passwd"}), &ctx).await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn denies_destructive_sql_without_explicit_grant() {
        let engine = PolicyEngine::new(vec![], vec![], vec![], vec![]);
        let spec = spec_with_caps(vec![Capability::ReadDb]);
        let ctx = ExecContext::new("r1", "t1").with_permissions(vec![Capability::ReadDb]);
        let decision = engine.check(&spec, &json!({"sql": "DROP TABLE users"}), &ctx).await;
        assert!(!decision.allowed);
    }

    #[test]
    fn cidr_matches_ipv4_prefix() {
        let cidr = BlockedCidr::parse("169.254.0.0/16").unwrap();
        assert!(cidr.contains("169.254.169.254".parse().unwrap()));
        assert!(!cidr.contains("10.0.0.1".parse().unwrap()));
    }
}
