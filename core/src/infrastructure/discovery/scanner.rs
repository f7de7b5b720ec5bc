// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Recursive root walk and tool-directory classification (spec §4.4).
//! Grounded on the teacher's `infrastructure::context_loader::ContextLoader`
//! `WalkDir` usage, generalized from "concatenate file contents" to
//! "classify directories into tool candidates".

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::ToolKind;
use crate::infrastructure::config::DiscoveryRoot;

use super::manifest::ToolManifest;

const MANIFEST_FILE: &str = "tool.json";

/// Kind-specific subfolder names a toolset directory may contain, each
/// hosting many same-kind tools (one child directory per tool) rather
/// than being a tool directory itself.
const KIND_SUBFOLDER_NAMES: &[(&str, ToolKind)] = &[
    ("local-fn", ToolKind::LocalFn),
    ("rpc-tool", ToolKind::RpcTool),
    ("workflow", ToolKind::Workflow),
    ("skill", ToolKind::Skill),
    ("image-pipeline", ToolKind::ImagePipeline),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferredKind {
    Skill,
    Workflow,
    RpcTool,
    LocalFn,
}

impl InferredKind {
    pub fn as_tool_kind(&self) -> ToolKind {
        match self {
            InferredKind::Skill => ToolKind::Skill,
            InferredKind::Workflow => ToolKind::Workflow,
            InferredKind::RpcTool => ToolKind::RpcTool,
            InferredKind::LocalFn => ToolKind::LocalFn,
        }
    }

    fn marker_file(&self) -> &'static str {
        match self {
            InferredKind::Skill => "SKILL.md",
            InferredKind::Workflow => "workflow.json",
            InferredKind::RpcTool => "mcp.json",
            InferredKind::LocalFn => "index.js",
        }
    }
}

const ENTRY_FILE_CANDIDATES: &[&str] = &["index.js", "index.mjs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Manifest,
    Load,
    Validate,
}

#[derive(Debug, Clone)]
pub struct ScanError {
    pub dir: PathBuf,
    pub phase: ScanPhase,
    pub message: String,
}

/// One tool directory found by the scanner, not yet loaded into a
/// `ToolSpec` — that's the loaders' job.
#[derive(Debug, Clone)]
pub struct DiscoveredTool {
    pub dir: PathBuf,
    pub namespace: String,
    pub leaf: String,
    pub kind_named_subfolder: bool,
    pub manifest: Option<ToolManifest>,
    pub inferred_kind: Option<InferredKind>,
}

pub struct Scanner;

impl Scanner {
    /// Walks every root, returning the tool directories found and any
    /// per-directory manifest-phase errors. Never aborts sibling
    /// directories on error (spec §4.4).
    pub fn scan(roots: &[DiscoveryRoot]) -> (Vec<DiscoveredTool>, Vec<ScanError>) {
        let mut found = Vec::new();
        let mut errors = Vec::new();
        for root in roots {
            Self::scan_root(root, &mut found, &mut errors);
        }
        (found, errors)
    }

    fn scan_root(root: &DiscoveryRoot, found: &mut Vec<DiscoveredTool>, errors: &mut Vec<ScanError>) {
        let mut walker = WalkDir::new(&root.path).follow_links(false).into_iter();
        loop {
            let entry = match walker.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    errors.push(ScanError { dir: root.path.clone(), phase: ScanPhase::Manifest, message: format!("walk error: {err}") });
                    continue;
                }
                None => break,
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let dir = entry.path();
            if dir == root.path {
                continue;
            }

            if let Some(kind_subfolder) = kind_subfolder_name(dir) {
                Self::scan_kind_subfolder(dir, &root.namespace, kind_subfolder, found, errors);
                walker.skip_current_dir();
                continue;
            }

            match classify(dir, errors) {
                Some((manifest, inferred_kind)) => {
                    let leaf = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
                    found.push(DiscoveredTool { dir: dir.to_path_buf(), namespace: root.namespace.clone(), leaf, kind_named_subfolder: false, manifest, inferred_kind });
                    walker.skip_current_dir();
                }
                None => continue,
            }
        }
    }

    /// A `local-fn`/`rpc-tool`/etc-named subfolder hosts one tool per
    /// immediate child directory (spec §4.4 `langchain`-style example).
    fn scan_kind_subfolder(dir: &Path, namespace: &str, kind: ToolKind, found: &mut Vec<DiscoveredTool>, errors: &mut Vec<ScanError>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                errors.push(ScanError { dir: dir.to_path_buf(), phase: ScanPhase::Manifest, message: format!("failed to read kind subfolder: {err}") });
                return;
            }
        };
        for entry in entries.flatten() {
            let child = entry.path();
            if !child.is_dir() {
                continue;
            }
            let (manifest, inferred_kind) = match classify(&child, errors) {
                Some(result) => result,
                None => (None, Some(kind_to_inferred(kind))),
            };
            let leaf = child.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
            found.push(DiscoveredTool { dir: child, namespace: namespace.to_string(), leaf, kind_named_subfolder: true, manifest, inferred_kind });
        }
    }
}

fn kind_to_inferred(kind: ToolKind) -> InferredKind {
    match kind {
        ToolKind::Skill => InferredKind::Skill,
        ToolKind::Workflow => InferredKind::Workflow,
        ToolKind::RpcTool => InferredKind::RpcTool,
        _ => InferredKind::LocalFn,
    }
}

fn kind_subfolder_name(dir: &Path) -> Option<ToolKind> {
    let name = dir.file_name()?.to_str()?;
    KIND_SUBFOLDER_NAMES.iter().find(|(marker, _)| *marker == name).map(|(_, kind)| *kind)
}

/// Returns `None` when `dir` is not a tool directory at all (no manifest,
/// no inference marker) — the scanner should keep recursing into it.
fn classify(dir: &Path, errors: &mut Vec<ScanError>) -> Option<(Option<ToolManifest>, Option<InferredKind>)> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest = if manifest_path.is_file() {
        match ToolManifest::load(&manifest_path) {
            Ok(manifest) => Some(manifest),
            Err(message) => {
                errors.push(ScanError { dir: dir.to_path_buf(), phase: ScanPhase::Manifest, message });
                None
            }
        }
    } else {
        None
    };

    let markers = present_inference_markers(dir);
    if markers.len() > 1 {
        errors.push(ScanError {
            dir: dir.to_path_buf(),
            phase: ScanPhase::Manifest,
            message: format!("ambiguous tool directory: multiple inference markers present ({:?})", markers),
        });
        return manifest.map(|m| (Some(m), None));
    }

    let inferred_kind = markers.first().copied();
    if manifest.is_none() && inferred_kind.is_none() {
        return None;
    }
    Some((manifest, inferred_kind))
}

fn present_inference_markers(dir: &Path) -> Vec<InferredKind> {
    let mut markers = Vec::new();
    if dir.join(InferredKind::Skill.marker_file()).is_file() {
        markers.push(InferredKind::Skill);
    }
    if dir.join(InferredKind::Workflow.marker_file()).is_file() {
        markers.push(InferredKind::Workflow);
    }
    if dir.join(InferredKind::RpcTool.marker_file()).is_file() {
        markers.push(InferredKind::RpcTool);
    }
    if ENTRY_FILE_CANDIDATES.iter().any(|f| dir.join(f).is_file()) {
        markers.push(InferredKind::LocalFn);
    }
    markers
}

/// Unused outside tests but kept for loaders that need to locate the
/// concrete entry file a local-fn tool directory declares.
pub fn entry_file(dir: &Path) -> Option<PathBuf> {
    ENTRY_FILE_CANDIDATES.iter().map(|f| dir.join(f)).find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(path: PathBuf, namespace: &str) -> DiscoveryRoot {
        DiscoveryRoot { path, namespace: namespace.into() }
    }

    #[test]
    fn finds_skill_directory_by_marker() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("pdf-summarizer");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "---\nname: pdf-summarizer\ndescription: x\n---\nBody").unwrap();

        let (found, errors) = Scanner::scan(&[root(dir.path().to_path_buf(), "search")]);
        assert!(errors.is_empty());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].inferred_kind, Some(InferredKind::Skill));
        assert_eq!(found[0].namespace, "search");
    }

    #[test]
    fn ambiguous_markers_are_reported_as_errors() {
        let dir = tempfile::tempdir().unwrap();
        let tool_dir = dir.path().join("ambiguous");
        std::fs::create_dir_all(&tool_dir).unwrap();
        std::fs::write(tool_dir.join("SKILL.md"), "---\nname: a\ndescription: b\n---\n").unwrap();
        std::fs::write(tool_dir.join("workflow.json"), "{}").unwrap();

        let (_, errors) = Scanner::scan(&[root(dir.path().to_path_buf(), "ns")]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].phase, ScanPhase::Manifest);
    }

    #[test]
    fn kind_named_subfolder_yields_one_tool_per_child() {
        let dir = tempfile::tempdir().unwrap();
        let subfolder = dir.path().join("local-fn");
        std::fs::create_dir_all(subfolder.join("summarize")).unwrap();
        std::fs::create_dir_all(subfolder.join("translate")).unwrap();
        std::fs::write(subfolder.join("summarize").join("index.js"), "module.exports = {};").unwrap();
        std::fs::write(subfolder.join("translate").join("index.js"), "module.exports = {};").unwrap();

        let (found, errors) = Scanner::scan(&[root(dir.path().to_path_buf(), "ns")]);
        assert!(errors.is_empty());
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|t| t.kind_named_subfolder));
    }
}
