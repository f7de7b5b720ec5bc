// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! # toolhub-core
//!
//! The runtime heart of the Tool Execution Hub: a unified invocation layer
//! that registers heterogeneous tools (local functions, remote tool
//! servers, workflow engines, image-pipeline back-ends, instruction-only
//! skill bundles) behind one call contract.
//!
//! ## Layer Structure
//!
//! ```text
//! application/    ← PTC Runtime, Registry, Schema/Policy/Budget/Retry/
//!                   Evidence subsystems, Async Job Manager, ToolHub facade
//!     ↓
//! domain/         ← ToolSpec, ExecContext, ToolIntent, ToolResult, Evidence,
//!                   Job, Event, SkillDefinition — value objects and errors
//!     ↓
//! infrastructure/ ← One adapter per tool kind, directory discovery +
//!                   hot-reload watcher, event log / metrics / tracing
//! ```
//!
//! ## Modules
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`domain`] | Immutable data model shared by every layer |
//! | [`application::registry`] | In-memory `ToolSpec` store + search |
//! | [`application::schema_validator`] | JSON-Schema compile cache, coercion, default-fill |
//! | [`application::policy_engine`] | Capability gate, path sandbox, URL/SQL inspection |
//! | [`application::budget_manager`] | Per-tool rate limiting, circuit breaker, timeouts |
//! | [`application::retry_engine`] | Exponential backoff with jitter |
//! | [`application::evidence_builder`] | Summarizes a call into typed evidence |
//! | [`application::job_manager`] | Async job state machine + TTL eviction |
//! | [`application::ptc_runtime`] | The 9-step Policy-Typed-Call pipeline |
//! | [`application::hub`] | `ToolHub` facade: lifecycle, invoke, discovery wiring |
//! | [`infrastructure::adapters`] | One adapter implementation per `ToolKind` |
//! | [`infrastructure::discovery`] | Filesystem scanner, manifest loaders, watcher |
//! | [`infrastructure::observability`] | Event log, metrics, span tree |

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
