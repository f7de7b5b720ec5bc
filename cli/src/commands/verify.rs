// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! `toolhub verify` (spec §6): scans the configured roots and fails
//! loudly on any discovery error, so it can gate a deploy the way
//! `scan`'s always-zero exit can't.

use toolhub_core::infrastructure::config::HubConfig;

/// `Ok(true)` when the scan was clean; `Ok(false)` when discovery
/// errors were found (caller maps this to a non-zero, non-config exit
/// code — `1` is reserved for config-not-found per spec §6).
pub async fn run(config: HubConfig) -> anyhow::Result<bool> {
    let hub = toolhub_core::ToolHub::new(config);
    let errors = hub.init_all_tools().await;

    for err in &errors {
        eprintln!("{}: [{:?}] {}", err.dir.display(), err.phase, err.message);
    }
    let clean = errors.is_empty();
    if clean {
        println!("ok: {} tool(s), no discovery errors", hub.list_tool_metadata().len());
    } else {
        println!("failed: {} discovery error(s)", errors.len());
    }

    hub.shutdown().await;
    Ok(clean)
}
