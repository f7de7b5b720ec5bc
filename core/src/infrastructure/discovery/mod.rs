// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Directory discovery (spec §4.4): scan configured roots, classify each
//! tool directory by manifest or inference marker, load it into a
//! `ToolSpec` via the matching kind loader, and optionally watch for
//! changes.

pub mod scanner;
pub mod manifest;
pub mod loaders;
pub mod skill_parser;
pub mod watcher;

pub use loaders::{load, load_local_fn, load_rpc_tool, load_skill, load_workflow, LoadError};
pub use manifest::ToolManifest;
pub use scanner::{DiscoveredTool, InferredKind, ScanError, ScanPhase, Scanner};
pub use skill_parser::parse_skill_directory;
pub use watcher::RootWatcher;
