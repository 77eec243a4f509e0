// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Notification rule engine
//!
//! Matches system events (triggers) against the configured notification rules and submits the
//! resulting requests to the [`NotificationCenter`]. Triggers are deduplicated per rule and
//! requests are rate limited per rule; escalation tables turn one trigger into several delayed
//! requests, and clear rules withdraw the requests a rule issued earlier.
//!

mod cache;
mod center;
mod dedup;
mod error;
mod executor;
mod processor;
mod rate_limit;
mod settings;
pub mod trigger;

pub use cache::NotificationRulesCache;
pub use center::{DefaultNotificationCenter, NotificationCenter};
pub use dedup::NotificationDeduplicationService;
pub use error::NotificationError;
pub use executor::NotificationExecutor;
pub use processor::{DefaultNotificationRuleProcessor, NotificationRuleProcessor};
pub use rate_limit::{DefaultRateLimitService, LimitedApi, RateLimitService, RateLimitSpec};
pub use settings::NotificationSettings;
pub use trigger::{default_trigger_processors, TriggerProcessor};
