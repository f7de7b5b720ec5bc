// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Invariant violation on a domain aggregate (illegal state transition,
/// malformed construction). Mirrors the teacher's `DomainError` in
/// `domain/mcp.rs` — kept narrow on purpose, one variant per class of
/// violation rather than one per call site.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },
}
