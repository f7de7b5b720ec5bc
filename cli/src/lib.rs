// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Library surface of the `toolhub` CLI, exposed so the binary's command
//! implementations and config loader are independently testable.

pub mod commands;
pub mod config;
