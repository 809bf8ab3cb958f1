//! Per-dependency circuit breaker shared by the evidence collectors.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Tracks failures for a single upstream dependency (a WHOIS server, a DNS
/// resolver, an HTTP host) and fails fast once a threshold is crossed,
/// mirroring the start/stop gating used throughout the engine's
/// long-running services but scoped per dependency instead of per process.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    opened_at_millis: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            consecutive_failures: AtomicU32::new(0),
            opened_at_millis: AtomicU64::new(0),
        }
    }

    fn now_millis() -> u64 {
        // Relative wall-clock reference; only used to measure elapsed cooldown.
        static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let start = *START.get_or_init(Instant::now);
        start.elapsed().as_millis() as u64
    }

    pub fn state(&self) -> CircuitState {
        let failures = self.consecutive_failures.load(Ordering::Acquire);
        if failures < self.failure_threshold {
            return CircuitState::Closed;
        }
        let opened_at = self.opened_at_millis.load(Ordering::Acquire);
        if Self::now_millis().saturating_sub(opened_at) >= self.cooldown.as_millis() as u64 {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    pub fn allow_call(&self) -> bool {
        !matches!(self.state(), CircuitState::Open)
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    pub fn record_failure(&self) {
        let prev = self.consecutive_failures.fetch_add(1, Ordering::AcqRel);
        if prev + 1 == self.failure_threshold {
            self.opened_at_millis
                .store(Self::now_millis(), Ordering::Release);
        }
    }
}
