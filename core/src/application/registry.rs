// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! In-memory Tool Registry (spec §4.2). Backed by `dashmap` for
//! lock-free concurrent reads, with a single writer at a time on the
//! register/clear path enforced by the map's own sharded locking.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::domain::{Capability, DomainError, ToolKind, ToolSpec};

struct Entry {
    seq: u64,
    spec: ToolSpec,
}

/// Conjunctive search filter (spec §4.2): all present fields must match.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub text: Option<String>,
    pub kind: Option<ToolKind>,
    pub tags: Vec<String>,
    pub capabilities: Vec<Capability>,
}

pub struct ToolRegistry {
    entries: DashMap<String, Entry>,
    seq: AtomicU64,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// Register-time invariant (spec §4.2): non-empty name/version, a
    /// valid kind (always true for the closed enum), schemas present.
    fn validate(spec: &ToolSpec) -> Result<(), DomainError> {
        if spec.name.trim().is_empty() {
            return Err(DomainError::InvalidField { field: "name".into(), reason: "must not be empty".into() });
        }
        if spec.version.trim().is_empty() {
            return Err(DomainError::InvalidField { field: "version".into(), reason: "must not be empty".into() });
        }
        if !spec.input_schema.is_object() {
            return Err(DomainError::InvalidField { field: "inputSchema".into(), reason: "must be a JSON-Schema object".into() });
        }
        if !spec.output_schema.is_object() {
            return Err(DomainError::InvalidField { field: "outputSchema".into(), reason: "must be a JSON-Schema object".into() });
        }
        Ok(())
    }

    /// Overwrites on name clash, preserving the original registration
    /// order so re-registration doesn't reshuffle search results.
    pub fn register(&self, spec: ToolSpec) -> Result<(), DomainError> {
        Self::validate(&spec)?;
        let seq = match self.entries.get(&spec.name) {
            Some(existing) => existing.seq,
            None => self.seq.fetch_add(1, Ordering::Relaxed),
        };
        self.entries.insert(spec.name.clone(), Entry { seq, spec });
        Ok(())
    }

    pub fn bulk_register(&self, specs: Vec<ToolSpec>) -> Result<(), DomainError> {
        for spec in specs {
            self.register(spec)?;
        }
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<ToolSpec> {
        self.entries.get(name).map(|e| e.spec.clone())
    }

    /// All specs, stable by registration order.
    pub fn list(&self) -> Vec<ToolSpec> {
        let mut items: Vec<(u64, ToolSpec)> = self.entries.iter().map(|e| (e.seq, e.spec.clone())).collect();
        items.sort_by_key(|(seq, _)| *seq);
        items.into_iter().map(|(_, spec)| spec).collect()
    }

    pub fn snapshot(&self) -> Vec<ToolSpec> {
        self.list()
    }

    pub fn search(&self, filter: &SearchFilter) -> Vec<ToolSpec> {
        self.list()
            .into_iter()
            .filter(|spec| {
                filter.text.as_deref().is_none_or(|q| spec.matches_text(q))
                    && filter.kind.is_none_or(|k| spec.kind == k)
                    && spec.has_all_tags(&filter.tags)
                    && spec.has_all_capabilities(&filter.capabilities)
            })
            .collect()
    }

    /// Drops all entries except those belonging to `kind` (used on
    /// hot-reload re-scan to preserve the core adapter's built-ins).
    pub fn clear_except(&self, kind: ToolKind) {
        self.entries.retain(|_, e| e.spec.kind == kind);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str, kind: ToolKind, tags: &[&str], caps: &[Capability]) -> ToolSpec {
        ToolSpec {
            name: name.into(),
            version: "1.0.0".into(),
            kind,
            description: format!("tool {name}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            capabilities: caps.to_vec(),
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            cost_hints: None,
            endpoint: None,
            resource_id: None,
            r#impl: None,
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let reg = ToolRegistry::new();
        reg.register(spec("fs/read", ToolKind::Core, &["fs"], &[Capability::ReadFs])).unwrap();
        let got = reg.get("fs/read").unwrap();
        assert_eq!(got.name, "fs/read");
    }

    #[test]
    fn rejects_empty_name() {
        let reg = ToolRegistry::new();
        let mut bad = spec("fs/read", ToolKind::Core, &[], &[]);
        bad.name = "".into();
        assert!(reg.register(bad).is_err());
    }

    #[test]
    fn reregistration_preserves_order() {
        let reg = ToolRegistry::new();
        reg.register(spec("a", ToolKind::Core, &[], &[])).unwrap();
        reg.register(spec("b", ToolKind::Core, &[], &[])).unwrap();
        reg.register(spec("a", ToolKind::Core, &["updated"], &[])).unwrap();
        let names: Vec<_> = reg.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn search_is_conjunctive() {
        let reg = ToolRegistry::new();
        reg.register(spec("fs/read", ToolKind::Core, &["fs", "read"], &[Capability::ReadFs])).unwrap();
        reg.register(spec("fs/write", ToolKind::Core, &["fs", "write"], &[Capability::WriteFs])).unwrap();
        let results = reg.search(&SearchFilter { tags: vec!["fs".into(), "read".into()], ..Default::default() });
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "fs/read");
    }

    #[test]
    fn clear_except_preserves_core_builtins() {
        let reg = ToolRegistry::new();
        reg.register(spec("core/fs", ToolKind::Core, &[], &[])).unwrap();
        reg.register(spec("rpc/tool", ToolKind::RpcTool, &[], &[])).unwrap();
        reg.clear_except(ToolKind::Core);
        assert_eq!(reg.size(), 1);
        assert!(reg.get("core/fs").is_some());
    }
}
