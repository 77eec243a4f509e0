// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Notification rule engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Triggers evaluated concurrently.
    pub pool_size: usize,
    pub deduplication_window: Duration,
    /// Notification requests allowed per rule, as `capacity:seconds` pairs.
    pub rule_rate_limit: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            pool_size: 4,
            deduplication_window: Duration::from_secs(3600),
            rule_rate_limit: "10:1,300:60".to_owned(),
        }
    }
}
