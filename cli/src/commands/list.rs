// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! `toolhub list [--detail short|normal|full]` (spec §6): `normal` emits
//! tab-separated `name\tkind\tdescription`, `full` emits one JSON object
//! per tool, `short` emits bare names.

use clap::ValueEnum;
use toolhub_core::infrastructure::config::HubConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Detail {
    Short,
    Normal,
    Full,
}

pub async fn run(config: HubConfig, detail: Detail) -> anyhow::Result<()> {
    let hub = toolhub_core::ToolHub::new(config);
    hub.init_all_tools().await;

    let mut names: Vec<_> = hub.list_tool_metadata().into_iter().map(|m| m.name).collect();
    names.sort();

    for name in names {
        let Some(description) = hub.get_tool_description(&name) else { continue };
        match detail {
            Detail::Short => println!("{}", description.name),
            Detail::Normal => println!("{}\t{}\t{}", description.name, description.kind, description.description),
            Detail::Full => println!("{}", serde_json::to_string(&description)?),
        }
    }

    hub.shutdown().await;
    Ok(())
}
