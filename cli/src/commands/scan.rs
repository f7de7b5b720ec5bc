// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! `toolhub scan` (spec §6): runs `initAllTools` once and reports
//! per-directory discovery errors. Scan errors never fail the process —
//! per spec §7 they're routed to `onError` and never abort a scan.

use toolhub_core::infrastructure::config::HubConfig;
use tracing::warn;

pub async fn run(config: HubConfig) -> anyhow::Result<()> {
    let hub = toolhub_core::ToolHub::new(config);
    let errors = hub.init_all_tools().await;

    let tool_count = hub.list_tool_metadata().len();
    println!("scanned {tool_count} tool(s), {} error(s)", errors.len());
    for err in &errors {
        warn!(dir = %err.dir.display(), phase = ?err.phase, message = %err.message, "discovery error");
        eprintln!("{}: [{:?}] {}", err.dir.display(), err.phase, err.message);
    }

    hub.shutdown().await;
    Ok(())
}
