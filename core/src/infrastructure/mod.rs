// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Infrastructure layer: concrete adapters, directory discovery, config
//! and the observability wiring that touches the outside world.

pub mod adapters;
pub mod config;
pub mod discovery;

pub use config::HubConfig;
