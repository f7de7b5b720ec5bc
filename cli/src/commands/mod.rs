// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Command implementations for the `toolhub` CLI (spec §6: `scan`,
//! `list`, `verify` — deliberately minimal).

pub mod list;
pub mod scan;
pub mod verify;

pub use list::{run as list, Detail};
pub use scan::run as scan;
pub use verify::run as verify;
