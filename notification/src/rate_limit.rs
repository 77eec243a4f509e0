// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rate limits
//!
//! Token buckets keyed by (limited api, tenant, key). A limit spec such as `10:1,300:60` allows
//! 10 requests per second and 300 per minute; a request passes only when every bucket has a
//! token left.
//!

use crate::NotificationError;

use common::TenantId;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use std::{
    collections::HashMap,
    str::FromStr,
    time::{Duration, Instant},
};

/// Operations subject to rate limiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitedApi {
    NotificationRequestsPerRule,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitSpec {
    limits: Vec<(u64, Duration)>,
}

impl RateLimitSpec {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

impl FromStr for RateLimitSpec {
    type Err = NotificationError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut limits = vec![];
        for pair in spec.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
            let invalid = || NotificationError::InvalidRateLimit(spec.to_owned());
            let (capacity, seconds) = pair.split_once(':').ok_or_else(invalid)?;
            let capacity: u64 = capacity.trim().parse().map_err(|_| invalid())?;
            let seconds: u64 = seconds.trim().parse().map_err(|_| invalid())?;
            if capacity == 0 || seconds == 0 {
                return Err(invalid());
            }
            limits.push((capacity, Duration::from_secs(seconds)));
        }
        Ok(Self { limits })
    }
}

/// Rate limit contract.
pub trait RateLimitService: Send + Sync + 'static {
    /// Takes a token for (api, tenant, key). False means the limit is exceeded.
    fn check_rate_limit(&self, api: LimitedApi, tenant_id: TenantId, key: &str) -> bool;

    /// Drops the buckets of `key` for every tenant.
    fn clean_up(&self, api: LimitedApi, key: &str);
}

struct TokenBucket {
    capacity: f64,
    period: Duration,
    tokens: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    fn new(capacity: u64, period: Duration) -> Self {
        Self {
            capacity: capacity as f64,
            period,
            tokens: capacity as f64,
            refilled_at: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.refilled_at).as_secs_f64();
        let rate = self.capacity / self.period.as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(self.capacity);
        self.refilled_at = now;
    }
}

type BucketKey = (LimitedApi, TenantId, String);

/// In-process [`RateLimitService`].
#[derive(Default)]
pub struct DefaultRateLimitService {
    specs: HashMap<LimitedApi, RateLimitSpec>,
    buckets: DashMap<BucketKey, Vec<TokenBucket>>,
}

impl DefaultRateLimitService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits `api` with `spec`. Apis without a spec are not limited.
    pub fn with_limit(mut self, api: LimitedApi, spec: RateLimitSpec) -> Self {
        self.specs.insert(api, spec);
        self
    }
}

impl RateLimitService for DefaultRateLimitService {
    fn check_rate_limit(&self, api: LimitedApi, tenant_id: TenantId, key: &str) -> bool {
        let Some(spec) = self.specs.get(&api).filter(|spec| !spec.is_empty()) else {
            return true;
        };
        let now = Instant::now();
        let mut buckets = self
            .buckets
            .entry((api, tenant_id, key.to_owned()))
            .or_insert_with(|| {
                spec.limits
                    .iter()
                    .map(|(capacity, period)| TokenBucket::new(*capacity, *period))
                    .collect()
            });
        buckets.iter_mut().for_each(|bucket| bucket.refill(now));
        if buckets.iter().all(|bucket| bucket.tokens >= 1.0) {
            buckets.iter_mut().for_each(|bucket| bucket.tokens -= 1.0);
            true
        } else {
            debug!("[{}] Rate limit {:?} exceeded for {}.", tenant_id, api, key);
            false
        }
    }

    fn clean_up(&self, api: LimitedApi, key: &str) {
        self.buckets
            .retain(|(limited, _, bucket_key), _| !(*limited == api && bucket_key == key));
    }
}
