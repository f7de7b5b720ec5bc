// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Evidence Builder (spec §4.9): turns a completed invocation into typed
//! provenance records, auto-extracting `url`/`file` references from the
//! result by a stable object-walk order (spec §4.1 determinism note).

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::domain::{Evidence, EvidenceType};

const MAX_AUTO_EVIDENCE: usize = 10;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());
static FILE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\.?/|[A-Za-z]:\\)[^\s]*\.[A-Za-z0-9]+$").unwrap());

pub struct EvidenceBuilder;

impl EvidenceBuilder {
    /// Builds the evidence set for one call (spec §4.9 steps 1-3).
    pub fn build(tool_name: &str, tool_version: &str, args: &Value, result: &Value, duration_ms: u64) -> Vec<Evidence> {
        let now = Utc::now();
        let mut evidence = vec![Self::tool_evidence(tool_name, tool_version, args, result, duration_ms, now)];

        let (urls, files) = Self::walk(result);
        for url in urls.into_iter().take(MAX_AUTO_EVIDENCE) {
            evidence.push(Evidence::new(EvidenceType::Url, url.clone(), format!("referenced url: {url}"), now));
        }
        for file in files.into_iter().take(MAX_AUTO_EVIDENCE) {
            evidence.push(Evidence::new(EvidenceType::File, file.clone(), format!("referenced file: {file}"), now));
        }
        if duration_ms > 0 {
            evidence.push(Evidence::new(EvidenceType::Metric, format!("latency:{tool_name}"), format!("{duration_ms}ms"), now));
        }
        evidence
    }

    fn tool_evidence(name: &str, version: &str, args: &Value, result: &Value, duration_ms: u64, now: chrono::DateTime<Utc>) -> Evidence {
        let arg_keys: Vec<&str> = args.as_object().map(|m| m.keys().map(String::as_str).collect()).unwrap_or_default();
        let preview = result.to_string();
        let preview = if preview.chars().count() > 100 { preview.chars().take(100).collect::<String>() + "…" } else { preview };
        Evidence::new(EvidenceType::Tool, format!("{name}@{version}"), format!("args=[{}] duration={duration_ms}ms result={preview}", arg_keys.join(",")), now)
    }

    /// Recursive walk in object/array order, collecting URL- and
    /// file-path-looking strings in encounter order.
    fn walk(value: &Value) -> (Vec<String>, Vec<String>) {
        let mut urls = Vec::new();
        let mut files = Vec::new();
        Self::walk_into(value, &mut urls, &mut files);
        (urls, files)
    }

    fn walk_into(value: &Value, urls: &mut Vec<String>, files: &mut Vec<String>) {
        match value {
            Value::String(s) => {
                if URL_RE.is_match(s) {
                    urls.push(s.clone());
                } else if FILE_PATH_RE.is_match(s) {
                    files.push(s.clone());
                }
            }
            Value::Array(items) => {
                for item in items {
                    Self::walk_into(item, urls, files);
                }
            }
            Value::Object(map) => {
                for (_, v) in map {
                    Self::walk_into(v, urls, files);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_urls_and_files_capped_at_ten() {
        let mut items = Vec::new();
        for i in 0..15 {
            items.push(json!(format!("https://example.com/{i}")));
        }
        let result = json!({ "links": items });
        let evidence = EvidenceBuilder::build("img/gen", "1.0.0", &json!({}), &result, 42);
        let url_count = evidence.iter().filter(|e| e.r#type == EvidenceType::Url).count();
        assert_eq!(url_count, 10);
    }

    #[test]
    fn always_emits_tool_evidence_and_metric_when_duration_positive() {
        let evidence = EvidenceBuilder::build("calc/add", "1.0.0", &json!({"a": 2}), &json!({"result": 5}), 12);
        assert!(evidence.iter().any(|e| e.r#type == EvidenceType::Tool));
        assert!(evidence.iter().any(|e| e.r#type == EvidenceType::Metric));
    }
}
