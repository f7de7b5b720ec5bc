// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

const MAX_NAME_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 1024;
const MAX_COMPATIBILITY_LEN: usize = 500;

/// Vendor-reserved leaf tokens a skill name may not contain, to keep the
/// namespace clear of back-end-specific branding.
const RESERVED_NAME_WORDS: &[&str] = &["vendor", "internal", "system"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillResourceType {
    Instructions,
    Code,
    Data,
}

impl SkillResourceType {
    /// Classification by extension (spec §4.4 skill loader).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "md" => SkillResourceType::Instructions,
            "py" | "sh" | "js" | "ts" => SkillResourceType::Code,
            "json" | "yaml" | "yml" => SkillResourceType::Data,
            _ => SkillResourceType::Data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillResource {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub extension: String,
    pub r#type: SkillResourceType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillFrontmatter {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub compatibility: Option<String>,
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl SkillFrontmatter {
    /// Validation rules (spec §3 SkillDefinition). Returns the first
    /// violation found rather than accumulating all of them.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(&self.name)?;
        validate_description(&self.description)?;
        if let Some(compat) = &self.compatibility {
            if compat.chars().count() > MAX_COMPATIBILITY_LEN {
                return Err(DomainError::InvalidField {
                    field: "compatibility".into(),
                    reason: format!("exceeds {MAX_COMPATIBILITY_LEN} characters"),
                });
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(DomainError::InvalidField {
            field: "name".into(),
            reason: format!("must be 1-{MAX_NAME_LEN} characters"),
        });
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(DomainError::InvalidField {
            field: "name".into(),
            reason: "must not start or end with a hyphen".into(),
        });
    }
    if name.contains("--") {
        return Err(DomainError::InvalidField {
            field: "name".into(),
            reason: "must not contain consecutive hyphens".into(),
        });
    }
    if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(DomainError::InvalidField {
            field: "name".into(),
            reason: "must be lowercase kebab-case".into(),
        });
    }
    if contains_xml_tag(name) {
        return Err(DomainError::InvalidField {
            field: "name".into(),
            reason: "must not contain XML tags".into(),
        });
    }
    if RESERVED_NAME_WORDS.iter().any(|w| name.split('-').any(|part| part == *w)) {
        return Err(DomainError::InvalidField {
            field: "name".into(),
            reason: "must not contain a reserved word".into(),
        });
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), DomainError> {
    if description.is_empty() {
        return Err(DomainError::InvalidField {
            field: "description".into(),
            reason: "must not be empty".into(),
        });
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::InvalidField {
            field: "description".into(),
            reason: format!("exceeds {MAX_DESCRIPTION_LEN} characters"),
        });
    }
    if contains_xml_tag(description) {
        return Err(DomainError::InvalidField {
            field: "description".into(),
            reason: "must not contain XML tags".into(),
        });
    }
    Ok(())
}

fn contains_xml_tag(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            if let Some(close) = s[i..].find('>') {
                let inner = &s[i + 1..i + close];
                if !inner.is_empty() && (inner.starts_with('/') || inner.chars().next().is_some_and(|c| c.is_ascii_alphabetic())) {
                    return true;
                }
            }
        }
        i += 1;
    }
    false
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub frontmatter: SkillFrontmatter,
    pub instructions: String,
    pub resources: Vec<SkillResource>,
    pub dir_path: PathBuf,
    pub manifest_path: PathBuf,
}

impl SkillDefinition {
    pub fn new(frontmatter: SkillFrontmatter, instructions: impl Into<String>, resources: Vec<SkillResource>, dir_path: PathBuf, manifest_path: PathBuf) -> Result<Self, DomainError> {
        frontmatter.validate()?;
        Ok(Self {
            frontmatter,
            instructions: instructions.into(),
            resources,
            dir_path,
            manifest_path,
        })
    }

    pub fn resources_by_type(&self, r#type: SkillResourceType) -> Vec<&SkillResource> {
        self.resources.iter().filter(|r| r.r#type == r#type).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontmatter(name: &str, description: &str) -> SkillFrontmatter {
        SkillFrontmatter {
            name: name.into(),
            description: description.into(),
            license: None,
            compatibility: None,
            allowed_tools: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn valid_frontmatter_passes() {
        assert!(frontmatter("pdf-summarizer", "Summarizes PDF documents").validate().is_ok());
    }

    #[test]
    fn rejects_consecutive_hyphens_and_edges() {
        assert!(frontmatter("pdf--summarizer", "x").validate().is_err());
        assert!(frontmatter("-pdf-summarizer", "x").validate().is_err());
        assert!(frontmatter("pdf-summarizer-", "x").validate().is_err());
    }

    #[test]
    fn rejects_uppercase_and_xml() {
        assert!(frontmatter("PDF-Summarizer", "x").validate().is_err());
        assert!(frontmatter("pdf-summarizer", "Summarizes <script>alert(1)</script>").validate().is_err());
    }

    #[test]
    fn rejects_empty_description_and_overlong_name() {
        assert!(frontmatter("pdf-summarizer", "").validate().is_err());
        let long_name = "a".repeat(65);
        assert!(frontmatter(&long_name, "x").validate().is_err());
    }

    #[test]
    fn resource_type_inferred_from_extension() {
        assert_eq!(SkillResourceType::from_extension("md"), SkillResourceType::Instructions);
        assert_eq!(SkillResourceType::from_extension("PY"), SkillResourceType::Code);
        assert_eq!(SkillResourceType::from_extension("json"), SkillResourceType::Data);
    }
}
