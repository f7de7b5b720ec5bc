// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! `SKILL.md` loader (spec §4.4, §9 design note): frontmatter is a
//! `---`-delimited block using a small YAML subset — bare and quoted
//! scalars, one-level `metadata` nesting, and a block literal (`|`) for
//! multi-line values. No YAML crate is in the pack for this one format,
//! so it's hand-rolled rather than pulled in for a single call site.

use std::collections::HashMap;
use std::path::Path;

use crate::domain::{SkillDefinition, SkillFrontmatter, SkillResource, SkillResourceType};

const EXCLUDED_DIR_NAMES: &[&str] = &["node_modules"];

pub fn parse_skill_directory(dir: &Path) -> Result<SkillDefinition, String> {
    let manifest_path = dir.join("SKILL.md");
    let raw = std::fs::read_to_string(&manifest_path).map_err(|e| format!("failed to read SKILL.md: {e}"))?;
    let (frontmatter, instructions) = parse_frontmatter(&raw)?;
    let resources = scan_resources(dir, &manifest_path)?;
    SkillDefinition::new(frontmatter, instructions, resources, dir.to_path_buf(), manifest_path).map_err(|e| e.to_string())
}

fn parse_frontmatter(raw: &str) -> Result<(SkillFrontmatter, String), String> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let lines: Vec<&str> = raw.lines().collect();
    if lines.first().map(|l| l.trim()) != Some("---") {
        return Err("SKILL.md must start with a `---` frontmatter block".into());
    }

    let mut fields: HashMap<String, String> = HashMap::new();
    let mut metadata: HashMap<String, String> = HashMap::new();
    let mut in_metadata = false;
    let mut i = 1;
    let mut closed = false;

    while i < lines.len() {
        let line = lines[i];
        if line.trim() == "---" {
            closed = true;
            i += 1;
            break;
        }
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        if line.starts_with("  ") || line.starts_with('\t') {
            if !in_metadata {
                return Err(format!("unexpected indented line outside `metadata`: {line}"));
            }
            if let Some((key, value)) = split_kv(line.trim()) {
                metadata.insert(key, value);
            }
            i += 1;
            continue;
        }
        in_metadata = false;
        let trimmed = line.trim_end();
        if let Some(key) = trimmed.strip_suffix(':').map(str::trim) {
            if key == "metadata" {
                in_metadata = true;
                i += 1;
                continue;
            }
        }
        if let Some((key, value)) = split_kv(trimmed) {
            if value == "|" {
                let mut block = Vec::new();
                i += 1;
                while i < lines.len() && (lines[i].starts_with("  ") || lines[i].trim().is_empty()) {
                    block.push(lines[i].strip_prefix("  ").unwrap_or(lines[i]));
                    i += 1;
                }
                fields.insert(key, block.join("\n").trim_end().to_string());
            } else {
                fields.insert(key, value);
                i += 1;
            }
        } else {
            i += 1;
        }
    }

    if !closed {
        return Err("SKILL.md frontmatter block is never closed with `---`".into());
    }

    let instructions = lines[i..].join("\n").trim().to_string();

    let name = fields.remove("name").ok_or("SKILL.md frontmatter missing required `name`")?;
    let description = fields.remove("description").ok_or("SKILL.md frontmatter missing required `description`")?;
    let license = fields.remove("license");
    let compatibility = fields.remove("compatibility");
    let allowed_tools = fields.remove("allowed-tools").map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect());

    let frontmatter = SkillFrontmatter { name, description, license, compatibility, allowed_tools, metadata };
    Ok((frontmatter, instructions))
}

fn split_kv(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().to_string();
    let mut value = value.trim().to_string();
    if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2) || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2) {
        value = value[1..value.len() - 1].to_string();
    }
    Some((key, value))
}

fn scan_resources(dir: &Path, manifest_path: &Path) -> Result<Vec<SkillResource>, String> {
    let mut resources = Vec::new();
    for entry in walkdir::WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| format!("failed to walk skill directory: {e}"))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path == manifest_path {
            continue;
        }
        if path.components().any(|c| {
            let s = c.as_os_str().to_string_lossy();
            s.starts_with('.') || EXCLUDED_DIR_NAMES.contains(&s.as_ref())
        }) {
            continue;
        }
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_string();
        let relative_path = path.strip_prefix(dir).unwrap_or(path).to_string_lossy().to_string();
        resources.push(SkillResource {
            relative_path,
            absolute_path: path.to_path_buf(),
            r#type: SkillResourceType::from_extension(&extension),
            extension,
        });
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_frontmatter_and_body() {
        let raw = "---\nname: pdf-summarizer\ndescription: Summarizes PDF documents\n---\nRead the PDF and summarize it.\n";
        let (frontmatter, body) = parse_frontmatter(raw).unwrap();
        assert_eq!(frontmatter.name, "pdf-summarizer");
        assert_eq!(body, "Read the PDF and summarize it.");
    }

    #[test]
    fn parses_metadata_block_and_allowed_tools() {
        let raw = "---\nname: x\ndescription: y\nallowed-tools: core/http-fetch-text, core/fs-read-text\nmetadata:\n  author: jane\n  team: search\n---\nBody\n";
        let (frontmatter, _) = parse_frontmatter(raw).unwrap();
        assert_eq!(frontmatter.allowed_tools, Some(vec!["core/http-fetch-text".to_string(), "core/fs-read-text".to_string()]));
        assert_eq!(frontmatter.metadata.get("author"), Some(&"jane".to_string()));
        assert_eq!(frontmatter.metadata.get("team"), Some(&"search".to_string()));
    }

    #[test]
    fn missing_closing_delimiter_is_an_error() {
        let raw = "---\nname: x\ndescription: y\n";
        assert!(parse_frontmatter(raw).is_err());
    }

    #[test]
    fn scans_resources_excluding_manifest_and_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SKILL.md"), "---\nname: x\ndescription: y\n---\nBody").unwrap();
        std::fs::write(dir.path().join("helper.py"), "print(1)").unwrap();
        std::fs::write(dir.path().join(".hidden"), "secret").unwrap();
        let definition = parse_skill_directory(dir.path()).unwrap();
        assert_eq!(definition.resources.len(), 1);
        assert_eq!(definition.resources[0].r#type, SkillResourceType::Code);
    }
}
