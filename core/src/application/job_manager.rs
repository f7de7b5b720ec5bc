// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Async Job Manager (spec §4.5): state machine + store, TTL eviction
//! sweep, event fan-out. The default store is in-memory (`dashmap`); a
//! persistent store can sit behind the same methods.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::domain::{Job, JobId, JobStatus};

use super::observability::EventLog;
use crate::domain::EventPayload;

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub tool_name: Option<String>,
    pub status: Option<JobStatus>,
    pub request_id: Option<String>,
}

struct Inner {
    jobs: DashMap<String, Job>,
    ttl: Duration,
    event_log: Arc<EventLog>,
}

/// Owns the sweeper task; dropping or calling `dispose` stops it.
pub struct JobManager {
    inner: Arc<Inner>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl JobManager {
    pub fn new(ttl: Duration, event_log: Arc<EventLog>) -> Arc<Self> {
        let manager = Arc::new(Self {
            inner: Arc::new(Inner { jobs: DashMap::new(), ttl, event_log }),
            sweeper: Mutex::new(None),
        });
        manager.start_sweeper();
        manager
    }

    fn start_sweeper(self: &Arc<Self>) {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                interval.tick().await;
                sweep(&inner);
            }
        });
        *self.sweeper.lock().unwrap() = Some(handle);
    }

    pub fn submit(&self, tool_name: impl Into<String>, request_id: impl Into<String>, task_id: impl Into<String>, metadata: Option<Value>) -> Job {
        let tool_name = tool_name.into();
        let request_id = request_id.into();
        let task_id = task_id.into();
        let job = Job::new(tool_name.clone(), request_id.clone(), task_id.clone(), metadata);
        self.inner.jobs.insert(job.job_id.as_str().to_string(), job.clone());
        self.inner.event_log.append(request_id, task_id, Some(tool_name), None, EventPayload::JobSubmitted { job_id: job.job_id.as_str().to_string() });
        job
    }

    pub fn mark_running(&self, job_id: &JobId) -> Option<()> {
        self.update(job_id, |job| job.transition(JobStatus::Running))
    }

    pub fn complete(&self, job_id: &JobId, result: Value) -> Option<()> {
        let outcome = self.update(job_id, |job| {
            job.transition(JobStatus::Completed)?;
            job.result = Some(result);
            Ok(())
        });
        if outcome.is_some() {
            if let Some(job) = self.inner.jobs.get(job_id.as_str()) {
                self.inner.event_log.append(job.request_id.clone(), job.task_id.clone(), Some(job.tool_name.clone()), None, EventPayload::JobCompleted { job_id: job_id.as_str().to_string() });
            }
        }
        outcome
    }

    pub fn fail(&self, job_id: &JobId, error: Value) -> Option<()> {
        let outcome = self.update(job_id, |job| {
            job.transition(JobStatus::Failed)?;
            job.error = Some(error.clone());
            Ok(())
        });
        if outcome.is_some() {
            if let Some(job) = self.inner.jobs.get(job_id.as_str()) {
                self.inner.event_log.append(
                    job.request_id.clone(),
                    job.task_id.clone(),
                    Some(job.tool_name.clone()),
                    None,
                    EventPayload::JobFailed { job_id: job_id.as_str().to_string(), message: error.to_string() },
                );
            }
        }
        outcome
    }

    pub fn cancel(&self, job_id: &JobId) -> Option<()> {
        self.update(job_id, |job| job.transition(JobStatus::Canceled))
    }

    fn update(&self, job_id: &JobId, f: impl FnOnce(&mut Job) -> Result<(), crate::domain::DomainError>) -> Option<()> {
        let mut entry = self.inner.jobs.get_mut(job_id.as_str())?;
        f(&mut entry).ok()
    }

    pub fn get_job(&self, job_id: &JobId) -> Option<Job> {
        self.inner.jobs.get(job_id.as_str()).map(|e| e.clone())
    }

    pub fn get_status(&self, job_id: &JobId) -> Option<JobStatus> {
        self.inner.jobs.get(job_id.as_str()).map(|e| e.status)
    }

    /// Result only for `completed` jobs; `None` for any other status or
    /// an unknown id (spec §4.5).
    pub fn get_result(&self, job_id: &JobId) -> Option<Value> {
        let entry = self.inner.jobs.get(job_id.as_str())?;
        if entry.status == JobStatus::Completed {
            entry.result.clone()
        } else {
            None
        }
    }

    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        self.inner
            .jobs
            .iter()
            .map(|e| e.clone())
            .filter(|job| {
                filter.tool_name.as_deref().is_none_or(|t| job.tool_name == t)
                    && filter.status.is_none_or(|s| job.status == s)
                    && filter.request_id.as_deref().is_none_or(|r| job.request_id == r)
            })
            .collect()
    }

    pub fn dispose(&self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn sweep(inner: &Arc<Inner>) {
    let now = chrono::Utc::now();
    inner.jobs.retain(|_, job| {
        if !job.status.is_terminal() {
            return true;
        }
        let age = now.signed_duration_since(job.updated_at);
        age.to_std().map(|d| d < inner.ttl).unwrap_or(true)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle_transitions_and_result_visibility() {
        let log = Arc::new(EventLog::new(16));
        let manager = JobManager::new(Duration::from_secs(60), log);

        let job = manager.submit("img/gen", "r1", "t1", None);
        assert!(manager.get_result(&job.job_id).is_none());

        manager.mark_running(&job.job_id).unwrap();
        manager.complete(&job.job_id, serde_json::json!({"url": "https://example.com/x.png"})).unwrap();

        let result = manager.get_result(&job.job_id).unwrap();
        assert_eq!(result["url"], "https://example.com/x.png");
        manager.dispose();
    }

    #[tokio::test]
    async fn unknown_job_returns_none_everywhere() {
        let log = Arc::new(EventLog::new(16));
        let manager = JobManager::new(Duration::from_secs(60), log);
        let unknown = JobId::new();
        assert!(manager.get_job(&unknown).is_none());
        assert!(manager.get_result(&unknown).is_none());
        manager.dispose();
    }
}
