// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{empty_or_contains, TriggerProcessor};
use crate::NotificationError;

use common::notification::{
    AlarmNotifyOn, AlarmTrigger, AlarmTriggerConfig, NotificationInfo,
    NotificationRuleTrigger, NotificationRuleTriggerType, TriggerConfig,
};

use async_trait::async_trait;

pub struct AlarmTriggerProcessor;

impl AlarmTriggerProcessor {
    fn matches(trigger: &AlarmTrigger, config: &AlarmTriggerConfig) -> bool {
        if !empty_or_contains(&config.alarm_types, &trigger.alarm.alarm_type) {
            return false;
        }
        let notify_on = if trigger.created {
            AlarmNotifyOn::Created
        } else if trigger.severity_changed {
            AlarmNotifyOn::SeverityChanged
        } else if trigger.acknowledged {
            AlarmNotifyOn::Acknowledged
        } else if trigger.cleared {
            AlarmNotifyOn::Cleared
        } else {
            return false;
        };
        config.notify_on.contains(&notify_on)
            && empty_or_contains(&config.alarm_severities, &trigger.alarm.severity)
    }

    fn clears(trigger: &AlarmTrigger, config: &AlarmTriggerConfig) -> bool {
        if !empty_or_contains(&config.alarm_types, &trigger.alarm.alarm_type) {
            return false;
        }
        if trigger.deleted {
            return true;
        }
        match &config.clear_rule {
            Some(rule) if rule.alarm_statuses.is_empty() => trigger.alarm.cleared,
            Some(rule) => rule.alarm_statuses.contains(&trigger.alarm.status()),
            None => false,
        }
    }
}

#[async_trait]
impl TriggerProcessor for AlarmTriggerProcessor {
    fn trigger_type(&self) -> NotificationRuleTriggerType {
        NotificationRuleTriggerType::Alarm
    }

    fn matches_filter(&self, trigger: &NotificationRuleTrigger, config: &TriggerConfig) -> bool {
        match (trigger, config) {
            (NotificationRuleTrigger::Alarm(trigger), TriggerConfig::Alarm(config)) => {
                !trigger.deleted && Self::matches(trigger, config)
            }
            _ => false,
        }
    }

    fn matches_clear_rule(
        &self,
        trigger: &NotificationRuleTrigger,
        config: &TriggerConfig,
    ) -> bool {
        match (trigger, config) {
            (NotificationRuleTrigger::Alarm(trigger), TriggerConfig::Alarm(config)) => {
                Self::clears(trigger, config)
            }
            _ => false,
        }
    }

    async fn construct_notification_info(
        &self,
        trigger: &NotificationRuleTrigger,
    ) -> Result<NotificationInfo, NotificationError> {
        let NotificationRuleTrigger::Alarm(trigger) = trigger else {
            return Err(NotificationError::UnexpectedTrigger(self.trigger_type()));
        };
        Ok(NotificationInfo::Alarm {
            alarm_id: trigger.alarm.id,
            alarm_type: trigger.alarm.alarm_type.clone(),
            alarm_originator: trigger.alarm.originator,
            alarm_severity: trigger.alarm.severity,
            alarm_status: trigger.alarm.status(),
            deleted: trigger.deleted,
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::{
        notification::{AlarmClearRule, AlarmInfo, AlarmSeverity, AlarmStatus},
        EntityId, EntityType, TenantId,
    };
    use uuid::Uuid;

    use std::collections::BTreeSet;

    fn alarm_trigger(created: bool, cleared: bool) -> NotificationRuleTrigger {
        NotificationRuleTrigger::Alarm(AlarmTrigger {
            tenant_id: TenantId::random(),
            alarm: AlarmInfo {
                id: Uuid::new_v4(),
                alarm_type: "High Temperature".to_owned(),
                originator: EntityId::random(EntityType::Device),
                severity: AlarmSeverity::Critical,
                acknowledged: false,
                cleared,
            },
            created,
            severity_changed: false,
            acknowledged: false,
            cleared,
            deleted: false,
        })
    }

    fn config(clear_rule: Option<AlarmClearRule>) -> TriggerConfig {
        TriggerConfig::Alarm(AlarmTriggerConfig {
            alarm_types: BTreeSet::from(["High Temperature".to_owned()]),
            alarm_severities: BTreeSet::from([AlarmSeverity::Critical, AlarmSeverity::Major]),
            notify_on: BTreeSet::from([AlarmNotifyOn::Created]),
            clear_rule,
        })
    }

    #[test]
    fn test_created_matches_filter() {
        let processor = AlarmTriggerProcessor;
        let config = config(None);
        assert!(processor.matches_filter(&alarm_trigger(true, false), &config));
        // Not configured to notify on clear.
        assert!(!processor.matches_filter(&alarm_trigger(false, true), &config));
    }

    #[test]
    fn test_clear_rule() {
        let processor = AlarmTriggerProcessor;
        assert!(!processor.matches_clear_rule(&alarm_trigger(false, true), &config(None)));

        let any_cleared = config(Some(AlarmClearRule::default()));
        assert!(processor.matches_clear_rule(&alarm_trigger(false, true), &any_cleared));
        assert!(!processor.matches_clear_rule(&alarm_trigger(true, false), &any_cleared));

        let acked = config(Some(AlarmClearRule {
            alarm_statuses: BTreeSet::from([AlarmStatus::ClearedAck]),
        }));
        assert!(!processor.matches_clear_rule(&alarm_trigger(false, true), &acked));
    }
}
