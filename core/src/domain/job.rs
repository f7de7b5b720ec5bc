// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

static JOB_SEQ: AtomicU16 = AtomicU16::new(0);

/// ULID-like identifier (spec §3): 48-bit millisecond timestamp + 16-bit
/// monotonic counter + 64 bits of randomness, Crockford base32 encoded so
/// job IDs sort lexically by creation time. Hand-rolled rather than a new
/// dependency, per `SPEC_FULL.md` §B.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let seq = JOB_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut rand_bytes = [0u8; 8];
        rand::Rng::fill(&mut rand::rng(), &mut rand_bytes);
        let random = u64::from_be_bytes(rand_bytes);

        let mut bytes = [0u8; 16];
        bytes[0..6].copy_from_slice(&millis.to_be_bytes()[2..8]);
        bytes[6..8].copy_from_slice(&seq.to_be_bytes());
        bytes[8..16].copy_from_slice(&random.to_be_bytes());

        JobId(encode_crockford(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode_crockford(bytes: &[u8; 16]) -> String {
    // 16 bytes = 128 bits -> 26 base32 characters (last char carries 2 bits).
    let mut bits: u128 = 0;
    for b in bytes {
        bits = (bits << 8) | *b as u128;
    }
    let mut out = vec![0u8; 26];
    let mut remaining = bits;
    for i in (0..26).rev() {
        out[i] = CROCKFORD[(remaining & 0x1F) as usize];
        remaining >>= 5;
    }
    String::from_utf8(out).expect("crockford alphabet is ascii")
}

/// Job lifecycle (spec §4.5). Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled)
    }

    /// Allowed edges (spec §4.5): queued→running, queued→canceled,
    /// running→completed, running→failed, running→canceled.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Canceled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Canceled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub tool_name: String,
    pub request_id: String,
    pub task_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Job {
    pub fn new(tool_name: impl Into<String>, request_id: impl Into<String>, task_id: impl Into<String>, metadata: Option<Value>) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            tool_name: tool_name.into(),
            request_id: request_id.into(),
            task_id: task_id.into(),
            status: JobStatus::Queued,
            metadata,
            created_at: now,
            updated_at: now,
        result: None,
            error: None,
        }
    }

    /// Apply a status transition, validating it against the allowed edge
    /// set. Rejects illegal transitions instead of silently clamping.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
