// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use common::notification::{NotificationRule, NotificationRuleTrigger};

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::debug;

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

/// Remembers which (trigger, rule) pairs were processed recently.
///
/// Expired occurrences are swept at most once per configured window, by whichever call to
/// [`NotificationDeduplicationService::already_processed`] finds the sweep due.
pub struct NotificationDeduplicationService {
    window: Duration,
    processed: DashMap<String, (Instant, Duration)>,
    last_clean_up: Mutex<Instant>,
}

impl NotificationDeduplicationService {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            processed: DashMap::new(),
            last_clean_up: Mutex::new(Instant::now()),
        }
    }

    /// True when an equivalent trigger was already processed for `rule` within the window.
    /// Otherwise records this occurrence and returns false.
    pub fn already_processed(
        &self,
        trigger: &NotificationRuleTrigger,
        rule: &NotificationRule,
    ) -> bool {
        let key = format!("{}_{}", trigger.deduplication_key(), rule.id);
        let window = trigger
            .default_deduplication_window()
            .unwrap_or(self.window);
        let now = Instant::now();
        let processed = match self.processed.entry(key) {
            Entry::Occupied(mut entry) => {
                let (at, window) = *entry.get();
                if now.duration_since(at) < window {
                    true
                } else {
                    entry.insert((now, window));
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((now, window));
                false
            }
        };
        self.clean_up_if_due(now);
        processed
    }

    fn clean_up_if_due(&self, now: Instant) {
        let Ok(mut last) = self.last_clean_up.try_lock() else {
            return;
        };
        if now.duration_since(*last) < self.window {
            return;
        }
        *last = now;
        drop(last);
        let before = self.processed.len();
        self.clean_up();
        debug!(
            "Dropped {} expired deduplication entries.",
            before.saturating_sub(self.processed.len())
        );
    }

    /// Forgets occurrences whose window has passed.
    pub fn clean_up(&self) {
        let now = Instant::now();
        self.processed
            .retain(|_, (at, window)| now.duration_since(*at) < *window);
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::{
        notification::{
            RecipientsConfig, TaskProcessingFailureTrigger,
            TaskProcessingFailureTriggerConfig, TriggerConfig,
        },
        EntityId, EntityType, NotificationRuleId, TenantId,
    };
    use uuid::Uuid;

    fn rule() -> NotificationRule {
        NotificationRule {
            id: NotificationRuleId::random(),
            tenant_id: TenantId::SYS_TENANT_ID,
            name: "Housekeeper failures".to_owned(),
            enabled: true,
            template_id: Uuid::new_v4(),
            trigger_config: TriggerConfig::TaskProcessingFailure(
                TaskProcessingFailureTriggerConfig::default(),
            ),
            recipients_config: RecipientsConfig::Targets(vec![Uuid::new_v4()]),
        }
    }

    fn trigger() -> NotificationRuleTrigger {
        NotificationRuleTrigger::TaskProcessingFailure(TaskProcessingFailureTrigger {
            tenant_id: TenantId::random(),
            entity_id: EntityId::random(EntityType::Device),
            task_type: "DELETE_TELEMETRY".to_owned(),
            task_description: "telemetry deletion".to_owned(),
            error: "timeout".to_owned(),
            attempt: 1,
        })
    }

    #[test]
    fn test_within_window() {
        let service = NotificationDeduplicationService::new(Duration::from_secs(60));
        let rule = rule();
        let other_rule = self::rule();
        let trigger = trigger();
        assert!(!service.already_processed(&trigger, &rule));
        assert!(service.already_processed(&trigger, &rule));
        assert!(!service.already_processed(&trigger, &other_rule));
        assert_eq!(service.len(), 2);
    }

    #[test]
    fn test_expired_entries_swept_by_later_calls() {
        let service = NotificationDeduplicationService::new(Duration::from_millis(10));
        let rule = rule();
        for _ in 0..100 {
            assert!(!service.already_processed(&trigger(), &rule));
        }
        assert_eq!(service.len(), 100);

        std::thread::sleep(Duration::from_millis(20));
        let last = trigger();
        assert!(!service.already_processed(&last, &rule));
        assert_eq!(service.len(), 1);
        assert!(service.already_processed(&last, &rule));
    }

    #[test]
    fn test_expired_entry_replaced() {
        let service = NotificationDeduplicationService::new(Duration::ZERO);
        let rule = rule();
        let trigger = trigger();
        assert!(!service.already_processed(&trigger, &rule));
        assert!(!service.already_processed(&trigger, &rule));
        service.clean_up();
        assert!(service.is_empty());
    }
}
