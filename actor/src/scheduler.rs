// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Scheduler
//!
//! Delayed and periodic messages, such as the stats tick of rule-engine components. Jobs end
//! when the system shuts down, when their token is cancelled, or when the target stops.
//!

use crate::{ActorRef, SystemRef, TbActorMsg};

use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use std::time::Duration;

/// Shortest period of a periodic job.
pub const MIN_SCHEDULE_PERIOD: Duration = Duration::from_millis(1);

impl SystemRef {
    /// Tells `msg` to `target` after `delay`.
    pub fn schedule_once(&self, target: ActorRef, msg: TbActorMsg, delay: Duration) {
        let token = self.token().clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = target.tell(msg);
                }
            }
        });
    }

    /// Tells a message built by `make_msg` to `target` every `period`, the first one after one
    /// period. Periods below [`MIN_SCHEDULE_PERIOD`] are raised to it.
    ///
    /// # Returns
    ///
    /// A token that cancels the job.
    ///
    pub fn schedule_periodically<F>(
        &self,
        target: ActorRef,
        period: Duration,
        make_msg: F,
    ) -> CancellationToken
    where
        F: Fn() -> TbActorMsg + Send + 'static,
    {
        let period = if period < MIN_SCHEDULE_PERIOD {
            warn!(
                "Period {:?} of job for {} is too short, using {:?}.",
                period,
                target.id(),
                MIN_SCHEDULE_PERIOD
            );
            MIN_SCHEDULE_PERIOD
        } else {
            period
        };
        let job_token = self.token().child_token();
        let token = job_token.clone();
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if target.tell(make_msg()).is_err() {
                            debug!("Periodic job for {} ended, actor stopped.", target.id());
                            break;
                        }
                    }
                }
            }
        });
        job_token
    }
}
