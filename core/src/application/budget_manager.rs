// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Budget Manager (spec §4.7): per-tool token-bucket rate limiting via
//! `governor`, a hand-rolled circuit breaker (`governor` has no breaker
//! primitive), and per-tool timeout resolution.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Breaker {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Breaker {
    fn new() -> Self {
        Self { state: BreakerState::Closed, consecutive_failures: 0, opened_at: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetDecision {
    Admitted,
    RateLimited,
    CircuitOpen,
}

pub enum BudgetError<E> {
    Rejected(BudgetDecision),
    Inner(E),
}

pub struct BudgetManagerConfig {
    pub default_rate_per_sec: u32,
    pub breaker_failure_threshold: u32,
    pub breaker_cooldown: Duration,
    pub global_default_timeout: Duration,
}

impl Default for BudgetManagerConfig {
    fn default() -> Self {
        Self {
            default_rate_per_sec: 50,
            breaker_failure_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
            global_default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BudgetManager {
    config: BudgetManagerConfig,
    limiter: RateLimiter<String, DashMapStateStore<String>, governor::clock::DefaultClock>,
    breakers: DashMap<String, Mutex<Breaker>>,
    per_tool_timeout: HashMap<String, Duration>,
}

impl BudgetManager {
    pub fn new(config: BudgetManagerConfig, per_tool_timeout: HashMap<String, Duration>) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(config.default_rate_per_sec.max(1)).expect("rate > 0"));
        Self {
            limiter: RateLimiter::dashmap(quota),
            config,
            breakers: DashMap::new(),
            per_tool_timeout,
        }
    }

    pub fn check_rate_limit(&self, name: &str) -> bool {
        self.limiter.check_key(&name.to_string()).is_ok()
    }

    fn breaker_entry(&self, name: &str) -> dashmap::mapref::one::RefMut<'_, String, Mutex<Breaker>> {
        self.breakers.entry(name.to_string()).or_insert_with(|| Mutex::new(Breaker::new()))
    }

    /// Rate limit + breaker admission check (spec §4.1 step 5), without
    /// mutating breaker state. This is the *only* place a rate-limit cell
    /// is consumed — `execute`'s own breaker check must not call this, or
    /// every trial consumes a second cell on top of the caller's.
    pub fn admit(&self, name: &str) -> BudgetDecision {
        if !self.check_rate_limit(name) {
            return BudgetDecision::RateLimited;
        }
        self.breaker_decision(name)
    }

    /// Breaker-only admission check (no rate-limit consumption): closed
    /// or half-open allows the trial, open rejects unless the cooldown
    /// has elapsed.
    fn breaker_decision(&self, name: &str) -> BudgetDecision {
        let entry = self.breaker_entry(name);
        let breaker = entry.lock().unwrap();
        match breaker.state {
            BreakerState::Closed | BreakerState::HalfOpen => BudgetDecision::Admitted,
            BreakerState::Open => {
                if breaker.opened_at.map(|t| t.elapsed() >= self.config.breaker_cooldown).unwrap_or(false) {
                    BudgetDecision::Admitted
                } else {
                    BudgetDecision::CircuitOpen
                }
            }
        }
    }

    pub fn get_timeout(&self, name: &str, r#override: Option<Duration>) -> Duration {
        r#override
            .or_else(|| self.per_tool_timeout.get(name).copied())
            .unwrap_or(self.config.global_default_timeout)
    }

    fn record_success(&self, name: &str) {
        let entry = self.breaker_entry(name);
        let mut breaker = entry.lock().unwrap();
        breaker.state = BreakerState::Closed;
        breaker.consecutive_failures = 0;
        breaker.opened_at = None;
    }

    fn record_failure(&self, name: &str) {
        let entry = self.breaker_entry(name);
        let mut breaker = entry.lock().unwrap();
        match breaker.state {
            BreakerState::HalfOpen => {
                breaker.state = BreakerState::Open;
                breaker.opened_at = Some(Instant::now());
            }
            BreakerState::Closed => {
                breaker.consecutive_failures += 1;
                if breaker.consecutive_failures >= self.config.breaker_failure_threshold {
                    breaker.state = BreakerState::Open;
                    breaker.opened_at = Some(Instant::now());
                }
            }
            BreakerState::Open => {}
        }
    }

    fn enter_half_open_if_due(&self, name: &str) {
        let entry = self.breaker_entry(name);
        let mut breaker = entry.lock().unwrap();
        if breaker.state == BreakerState::Open && breaker.opened_at.map(|t| t.elapsed() >= self.config.breaker_cooldown).unwrap_or(false) {
            breaker.state = BreakerState::HalfOpen;
        }
    }

    /// Wraps `fn_` in the breaker's state transitions (spec §4.7
    /// `execute(name, fn)`). Rate-limit admission is the caller's job via
    /// `admit` (spec §4.1 step 5); this only gates on breaker state so a
    /// trial never consumes a second rate-limit cell.
    pub async fn execute<F, Fut, T, E>(&self, name: &str, fn_: F) -> Result<T, BudgetError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.enter_half_open_if_due(name);
        match self.breaker_decision(name) {
            BudgetDecision::CircuitOpen => return Err(BudgetError::Rejected(BudgetDecision::CircuitOpen)),
            BudgetDecision::RateLimited => return Err(BudgetError::Rejected(BudgetDecision::RateLimited)),
            BudgetDecision::Admitted => {}
        }
        match fn_().await {
            Ok(v) => {
                self.record_success(name);
                Ok(v)
            }
            Err(e) => {
                self.record_failure(name);
                Err(BudgetError::Inner(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn breaker_opens_after_threshold_and_half_opens_after_cooldown() {
        let config = BudgetManagerConfig {
            default_rate_per_sec: 1000,
            breaker_failure_threshold: 2,
            breaker_cooldown: Duration::from_millis(20),
            global_default_timeout: Duration::from_secs(1),
        };
        let manager = BudgetManager::new(config, HashMap::new());

        for _ in 0..2 {
            let _ = manager.execute("flaky", || async { Err::<(), &str>("boom") }).await;
        }
        assert_eq!(manager.admit("flaky"), BudgetDecision::CircuitOpen);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let result = manager.execute("flaky", || async { Ok::<_, &str>(()) }).await;
        assert!(result.is_ok());
        assert_eq!(manager.admit("flaky"), BudgetDecision::Admitted);
    }

    #[test]
    fn timeout_resolution_prefers_override_then_per_tool_then_global() {
        let mut per_tool = HashMap::new();
        per_tool.insert("slow".to_string(), Duration::from_secs(10));
        let manager = BudgetManager::new(BudgetManagerConfig::default(), per_tool);
        assert_eq!(manager.get_timeout("slow", Some(Duration::from_secs(1))), Duration::from_secs(1));
        assert_eq!(manager.get_timeout("slow", None), Duration::from_secs(10));
        assert_eq!(manager.get_timeout("other", None), Duration::from_secs(30));
    }
}
