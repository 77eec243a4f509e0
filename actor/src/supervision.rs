// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Supervision strategies
//!
//! An actor whose `init` fails is either stopped with reason `InitFailed`, or retried a bounded
//! number of times with a delay chosen by its [`RetryStrategy`]. Failures while processing a
//! message are governed separately by [`ProcessFailureStrategy`].
//!

use backoff::backoff::Backoff as InnerBackoff;
use serde::{Deserialize, Serialize};

use std::{fmt::Debug, time::Duration};

/// Decides how long to wait before the next initialization attempt.
pub trait RetryStrategy: Debug + Send + Sync {
    /// Maximum number of retries after the first failed attempt.
    fn max_retries(&self) -> usize;
    /// Wait duration before retrying.
    fn next_backoff(&mut self) -> Option<Duration>;
}

/// What to do when an actor fails to initialize.
#[derive(Debug)]
pub enum SupervisionStrategy {
    /// Stop the actor with reason `InitFailed`.
    Stop,
    /// Retry initialization.
    Retry(Box<dyn RetryStrategy>),
}

/// What to do when processing a message returns an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessFailureStrategy {
    /// Log the error and keep processing the mailbox.
    Resume,
    /// Stop the actor (and its children).
    Stop,
}

/// Retries immediately.
#[derive(Debug, Default)]
pub struct NoIntervalStrategy {
    max_retries: usize,
}

impl NoIntervalStrategy {
    pub fn new(max_retries: usize) -> Self {
        NoIntervalStrategy { max_retries }
    }
}

impl RetryStrategy for NoIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }
}

/// Retries after a fixed delay.
#[derive(Debug, Default)]
pub struct FixedIntervalStrategy {
    max_retries: usize,
    duration: Duration,
}

impl FixedIntervalStrategy {
    pub fn new(max_retries: usize, duration: Duration) -> Self {
        FixedIntervalStrategy {
            max_retries,
            duration,
        }
    }
}

impl RetryStrategy for FixedIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.duration)
    }
}

/// Retries with an exponentially growing delay, starting at `initial`.
#[derive(Debug)]
pub struct ExponentialBackoffStrategy {
    max_retries: usize,
    inner: backoff::ExponentialBackoff,
}

impl ExponentialBackoffStrategy {
    pub fn new(max_retries: usize, initial: Duration) -> Self {
        let inner = backoff::ExponentialBackoff {
            initial_interval: initial,
            current_interval: initial,
            max_elapsed_time: None,
            ..Default::default()
        };
        ExponentialBackoffStrategy { max_retries, inner }
    }
}

impl RetryStrategy for ExponentialBackoffStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.inner.next_backoff()
    }
}

/// Actor runtime settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSettings {
    /// Retries granted to a failing rule-engine component before it stops.
    pub max_init_attempts: usize,
    pub init_retry_delay: Duration,
    /// Period of the component stats tick.
    pub stats_persist_frequency: Duration,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            max_init_attempts: 10,
            init_retry_delay: Duration::from_millis(5000),
            stats_persist_frequency: Duration::from_millis(3_600_000),
        }
    }
}

impl ActorSettings {
    /// Init strategy of rule-engine components: fixed delay, bounded attempts.
    pub fn init_strategy(&self) -> SupervisionStrategy {
        if self.max_init_attempts == 0 {
            SupervisionStrategy::Stop
        } else {
            SupervisionStrategy::Retry(Box::new(FixedIntervalStrategy::new(
                self.max_init_attempts,
                self.init_retry_delay,
            )))
        }
    }
}
