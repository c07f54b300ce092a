//! Provider cooldowns.
//!
//! Free "where am I" endpoints rate-limit by source IP, and retrying a
//! limited endpoint only extends the ban. After `failure_threshold`
//! consecutive failures a provider is benched until its cooldown ends. The
//! next lookup then sends it one trial request; concurrent lookups keep
//! skipping it until that trial reports back.
//!
//! A trial can be abandoned when the caller's own timeout drops the lookup
//! future. A trial older than one cooldown is therefore treated as lost and
//! a new one is admitted.
//!
//! Every transition takes `now` explicitly so the locator decides the clock.

use std::time::{Duration, Instant};

use crate::types::GeoProvider;

/// Externally visible circuit state of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Queried on every lookup.
    Closed,
    /// Benched until its cooldown ends.
    Open,
    /// One trial request is in flight.
    HalfOpen,
}

/// Cooldown tuning, part of [`crate::GeoConfig`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that bench a provider.
    pub failure_threshold: u32,
    /// How long a benched provider is skipped, in seconds.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Circuit {
    Closed { failures: u32 },
    Open { until: Instant },
    Trial { started: Instant },
}

const CLOSED: Circuit = Circuit::Closed { failures: 0 };

/// Cooldown bookkeeping for the three known providers.
#[derive(Debug)]
pub(crate) struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: [Circuit; 3],
}

fn slot(provider: GeoProvider) -> usize {
    match provider {
        GeoProvider::IpApiCo => 0,
        GeoProvider::IpApiCom => 1,
        GeoProvider::IpWhoIs => 2,
    }
}

impl CircuitBreaker {
    pub(crate) fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: [CLOSED; 3],
        }
    }

    /// Whether `provider` may be queried by a lookup starting at `now`.
    pub(crate) fn admit(&mut self, provider: GeoProvider, now: Instant) -> bool {
        let cooldown = self.config.cooldown();
        let circuit = &mut self.circuits[slot(provider)];
        let current = *circuit;
        match current {
            Circuit::Closed { .. } => true,
            Circuit::Open { until } if now >= until => {
                *circuit = Circuit::Trial { started: now };
                true
            }
            Circuit::Open { .. } => false,
            Circuit::Trial { started } if now.saturating_duration_since(started) >= cooldown => {
                tracing::debug!(%provider, "previous trial never reported; admitting another");
                *circuit = Circuit::Trial { started: now };
                true
            }
            Circuit::Trial { .. } => false,
        }
    }

    /// Record the outcome of a request admitted by [`admit`](Self::admit).
    pub(crate) fn record(&mut self, provider: GeoProvider, succeeded: bool, now: Instant) {
        let threshold = self.config.failure_threshold.max(1);
        let bench = Circuit::Open {
            until: now + self.config.cooldown(),
        };
        let circuit = &mut self.circuits[slot(provider)];
        *circuit = match (*circuit, succeeded) {
            (_, true) => CLOSED,
            (Circuit::Closed { failures }, false) if failures + 1 < threshold => {
                Circuit::Closed {
                    failures: failures + 1,
                }
            }
            (_, false) => {
                tracing::debug!(%provider, cooldown_secs = self.config.cooldown_secs, "provider benched");
                bench
            }
        };
    }

    pub(crate) fn state(&self, provider: GeoProvider) -> CircuitState {
        match self.circuits[slot(provider)] {
            Circuit::Closed { .. } => CircuitState::Closed,
            Circuit::Open { .. } => CircuitState::Open,
            Circuit::Trial { .. } => CircuitState::HalfOpen,
        }
    }
}
