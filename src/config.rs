// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Configuration
//!
//! Node configuration read from `RULECORE_*` environment variables. Every value has a default,
//! so an empty environment yields a working single-node setup. Components never read the
//! environment themselves; they receive the settings built here.
//!

use actor::ActorSettings;
use notification::{NotificationSettings, RateLimitSpec};
use queue::QueueSettings;

use serde::Deserialize;
use thiserror::Error;

use std::time::Duration;

/// Prefix of the environment variables read by [`CoreConfig::from_env`].
pub const ENV_PREFIX: &str = "RULECORE_";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Can not read configuration: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid configuration value of {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "CoreConfig::default_pack_processing_timeout_ms")]
    pub pack_processing_timeout_ms: u64,
    #[serde(default = "CoreConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "CoreConfig::default_poll_batch_size")]
    pub poll_batch_size: usize,
    #[serde(default = "CoreConfig::default_mgmt_thread_pool_size")]
    pub mgmt_thread_pool_size: usize,

    #[serde(default = "CoreConfig::default_notification_pool_size")]
    pub notification_pool_size: usize,
    #[serde(default = "CoreConfig::default_notification_dedup_window_secs")]
    pub notification_dedup_window_secs: u64,
    /// Per-rule limit of notification requests, `capacity:seconds` pairs.
    #[serde(default = "CoreConfig::default_notification_rule_rate_limit")]
    pub notification_rule_rate_limit: String,

    #[serde(default = "CoreConfig::default_actor_max_init_attempts")]
    pub actor_max_init_attempts: usize,
    #[serde(default = "CoreConfig::default_actor_init_retry_delay_ms")]
    pub actor_init_retry_delay_ms: u64,
    #[serde(default = "CoreConfig::default_stats_persist_frequency_ms")]
    pub stats_persist_frequency_ms: u64,

    #[serde(default)]
    pub queue_prefix: String,
    /// Id of this node in the cluster topology.
    #[serde(default = "CoreConfig::default_service_id")]
    pub service_id: String,
}

impl CoreConfig {
    /// Reads the configuration from the `RULECORE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: CoreConfig = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validate()
    }

    /// Reads the configuration from unprefixed `(name, value)` pairs, e.g.
    /// `("POLL_BATCH_SIZE", "500")`.
    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: CoreConfig = envy::from_iter(vars)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.poll_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_batch_size",
                reason: "must be positive".to_owned(),
            });
        }
        if self.notification_pool_size == 0 {
            return Err(ConfigError::Invalid {
                field: "notification_pool_size",
                reason: "must be positive".to_owned(),
            });
        }
        if self.stats_persist_frequency_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "stats_persist_frequency_ms",
                reason: "must be positive".to_owned(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be positive".to_owned(),
            });
        }
        self.notification_rule_rate_limit
            .parse::<RateLimitSpec>()
            .map_err(|e| ConfigError::Invalid {
                field: "notification_rule_rate_limit",
                reason: e.to_string(),
            })?;
        Ok(self)
    }

    pub fn to_queue_settings(&self) -> QueueSettings {
        QueueSettings {
            pack_processing_timeout: Duration::from_millis(self.pack_processing_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_batch_size: self.poll_batch_size,
            mgmt_pool_size: self.mgmt_thread_pool_size,
            queue_prefix: self.queue_prefix.clone(),
            service_id: self.service_id.clone(),
        }
    }

    pub fn to_notification_settings(&self) -> NotificationSettings {
        NotificationSettings {
            pool_size: self.notification_pool_size,
            deduplication_window: Duration::from_secs(self.notification_dedup_window_secs),
            rule_rate_limit: self.notification_rule_rate_limit.clone(),
        }
    }

    pub fn to_actor_settings(&self) -> ActorSettings {
        ActorSettings {
            max_init_attempts: self.actor_max_init_attempts,
            init_retry_delay: Duration::from_millis(self.actor_init_retry_delay_ms),
            stats_persist_frequency: Duration::from_millis(self.stats_persist_frequency_ms),
        }
    }
}

impl CoreConfig {
    fn default_pack_processing_timeout_ms() -> u64 {
        2000
    }

    fn default_poll_interval_ms() -> u64 {
        25
    }

    fn default_poll_batch_size() -> usize {
        1000
    }

    fn default_mgmt_thread_pool_size() -> usize {
        12
    }

    fn default_notification_pool_size() -> usize {
        4
    }

    fn default_notification_dedup_window_secs() -> u64 {
        3600
    }

    fn default_notification_rule_rate_limit() -> String {
        "10:1,300:60".to_owned()
    }

    fn default_actor_max_init_attempts() -> usize {
        10
    }

    fn default_actor_init_retry_delay_ms() -> u64 {
        5000
    }

    fn default_stats_persist_frequency_ms() -> u64 {
        3_600_000
    }

    fn default_service_id() -> String {
        "rulecore".to_owned()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            pack_processing_timeout_ms: Self::default_pack_processing_timeout_ms(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            poll_batch_size: Self::default_poll_batch_size(),
            mgmt_thread_pool_size: Self::default_mgmt_thread_pool_size(),
            notification_pool_size: Self::default_notification_pool_size(),
            notification_dedup_window_secs: Self::default_notification_dedup_window_secs(),
            notification_rule_rate_limit: Self::default_notification_rule_rate_limit(),
            actor_max_init_attempts: Self::default_actor_max_init_attempts(),
            actor_init_retry_delay_ms: Self::default_actor_init_retry_delay_ms(),
            stats_persist_frequency_ms: Self::default_stats_persist_frequency_ms(),
            queue_prefix: String::new(),
            service_id: Self::default_service_id(),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = CoreConfig::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.to_queue_settings(), QueueSettings::default());
        assert_eq!(config.to_actor_settings(), ActorSettings::default());
        let notification = config.to_notification_settings();
        assert_eq!(notification.pool_size, 4);
        assert_eq!(notification.deduplication_window, Duration::from_secs(3600));
        assert_eq!(notification.rule_rate_limit, "10:1,300:60");
    }

    #[test]
    fn test_values_override_defaults() {
        let config = CoreConfig::from_iter(vars(&[
            ("POLL_BATCH_SIZE", "200"),
            ("PACK_PROCESSING_TIMEOUT_MS", "500"),
            ("ACTOR_MAX_INIT_ATTEMPTS", "0"),
            ("QUEUE_PREFIX", "edge"),
            ("SERVICE_ID", "rule-engine-1"),
        ]))
        .unwrap();

        let queue = config.to_queue_settings();
        assert_eq!(queue.poll_batch_size, 200);
        assert_eq!(queue.pack_processing_timeout, Duration::from_millis(500));
        assert_eq!(queue.queue_prefix, "edge");
        assert_eq!(queue.service_id, "rule-engine-1");
        assert_eq!(config.to_actor_settings().max_init_attempts, 0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            CoreConfig::from_iter(vars(&[("POLL_BATCH_SIZE", "many")])),
            Err(ConfigError::Env(_))
        ));
        assert!(matches!(
            CoreConfig::from_iter(vars(&[("POLL_BATCH_SIZE", "0")])),
            Err(ConfigError::Invalid {
                field: "poll_batch_size",
                ..
            })
        ));
        assert!(matches!(
            CoreConfig::from_iter(vars(&[("STATS_PERSIST_FREQUENCY_MS", "0")])),
            Err(ConfigError::Invalid {
                field: "stats_persist_frequency_ms",
                ..
            })
        ));
        assert!(matches!(
            CoreConfig::from_iter(vars(&[("NOTIFICATION_RULE_RATE_LIMIT", "10/1")])),
            Err(ConfigError::Invalid {
                field: "notification_rule_rate_limit",
                ..
            })
        ));
    }
}
