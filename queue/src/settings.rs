// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Queue consumption settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Maximum wait for a pack before it is committed anyway.
    pub pack_processing_timeout: Duration,
    /// Idle wait of a poll returning nothing.
    pub poll_interval: Duration,
    pub poll_batch_size: usize,
    /// Consumer managers (re)started concurrently on a partition change.
    pub mgmt_pool_size: usize,
    pub queue_prefix: String,
    pub service_id: String,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            pack_processing_timeout: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(25),
            poll_batch_size: 1000,
            mgmt_pool_size: 12,
            queue_prefix: String::new(),
            service_id: "rulecore".to_owned(),
        }
    }
}
