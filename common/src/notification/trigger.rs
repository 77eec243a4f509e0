// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Notification rule triggers
//!
//! A trigger is a system event offered to the notification rule processor. Each variant knows
//! its scope (tenant or system), its originator and whether equivalent occurrences should be
//! deduplicated.
//!

use crate::{ComponentLifecycleEvent, EntityId, EntityType, RuleChainId, TenantId};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::time::Duration;

/// Kinds of triggers a notification rule can watch.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum NotificationRuleTriggerType {
    EntityAction,
    Alarm,
    RuleEngineComponentLifecycleEvent,
    ApiUsageLimit,
    TaskProcessingFailure,
}

impl NotificationRuleTriggerType {
    /// Tenant-level triggers are matched against the tenant's own rules, the rest against
    /// system rules.
    pub fn is_tenant_level(&self) -> bool {
        match self {
            NotificationRuleTriggerType::EntityAction
            | NotificationRuleTriggerType::Alarm
            | NotificationRuleTriggerType::RuleEngineComponentLifecycleEvent => true,
            NotificationRuleTriggerType::ApiUsageLimit
            | NotificationRuleTriggerType::TaskProcessingFailure => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Added,
    Updated,
    Deleted,
    AlarmAck,
    AlarmClear,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub customer_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityActionTrigger {
    pub tenant_id: TenantId,
    pub entity_id: EntityId,
    pub entity_name: String,
    pub entity_customer_id: Option<Uuid>,
    pub action_type: ActionType,
    pub user: UserInfo,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AlarmSeverity {
    Critical,
    Major,
    Minor,
    Warning,
    Indeterminate,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AlarmStatus {
    ActiveUnack,
    ActiveAck,
    ClearedUnack,
    ClearedAck,
}

impl AlarmStatus {
    pub fn from_flags(cleared: bool, acknowledged: bool) -> Self {
        match (cleared, acknowledged) {
            (false, false) => AlarmStatus::ActiveUnack,
            (false, true) => AlarmStatus::ActiveAck,
            (true, false) => AlarmStatus::ClearedUnack,
            (true, true) => AlarmStatus::ClearedAck,
        }
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self, AlarmStatus::ClearedUnack | AlarmStatus::ClearedAck)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmInfo {
    pub id: Uuid,
    pub alarm_type: String,
    pub originator: EntityId,
    pub severity: AlarmSeverity,
    pub acknowledged: bool,
    pub cleared: bool,
}

impl AlarmInfo {
    pub fn status(&self) -> AlarmStatus {
        AlarmStatus::from_flags(self.cleared, self.acknowledged)
    }
}

/// Alarm change as reported by the alarm service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmTrigger {
    pub tenant_id: TenantId,
    pub alarm: AlarmInfo,
    pub created: bool,
    pub severity_changed: bool,
    pub acknowledged: bool,
    pub cleared: bool,
    pub deleted: bool,
}

/// Lifecycle event (or failure) of a rule chain or rule node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentLifecycleTrigger {
    pub tenant_id: TenantId,
    pub rule_chain_id: RuleChainId,
    pub rule_chain_name: String,
    pub component_id: EntityId,
    pub component_name: String,
    pub event_type: ComponentLifecycleEvent,
    pub error: Option<String>,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ApiFeature {
    Transport,
    Db,
    RuleEngine,
    Js,
    Email,
    Sms,
    Alarm,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ApiUsageStateValue {
    Enabled,
    Warning,
    Disabled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsageLimitTrigger {
    pub tenant_id: TenantId,
    pub api_feature: ApiFeature,
    pub key: String,
    pub threshold: i64,
    pub value: i64,
    pub status: ApiUsageStateValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProcessingFailureTrigger {
    pub tenant_id: TenantId,
    pub entity_id: EntityId,
    pub task_type: String,
    pub task_description: String,
    pub error: String,
    pub attempt: u32,
}

/// System event offered to the notification rule processor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NotificationRuleTrigger {
    EntityAction(EntityActionTrigger),
    Alarm(AlarmTrigger),
    ComponentLifecycle(ComponentLifecycleTrigger),
    ApiUsageLimit(ApiUsageLimitTrigger),
    TaskProcessingFailure(TaskProcessingFailureTrigger),
}

impl NotificationRuleTrigger {
    pub fn trigger_type(&self) -> NotificationRuleTriggerType {
        match self {
            NotificationRuleTrigger::EntityAction(_) => {
                NotificationRuleTriggerType::EntityAction
            }
            NotificationRuleTrigger::Alarm(_) => NotificationRuleTriggerType::Alarm,
            NotificationRuleTrigger::ComponentLifecycle(_) => {
                NotificationRuleTriggerType::RuleEngineComponentLifecycleEvent
            }
            NotificationRuleTrigger::ApiUsageLimit(_) => {
                NotificationRuleTriggerType::ApiUsageLimit
            }
            NotificationRuleTrigger::TaskProcessingFailure(_) => {
                NotificationRuleTriggerType::TaskProcessingFailure
            }
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        match self {
            NotificationRuleTrigger::EntityAction(trigger) => trigger.tenant_id,
            NotificationRuleTrigger::Alarm(trigger) => trigger.tenant_id,
            NotificationRuleTrigger::ComponentLifecycle(trigger) => trigger.tenant_id,
            NotificationRuleTrigger::ApiUsageLimit(trigger) => trigger.tenant_id,
            NotificationRuleTrigger::TaskProcessingFailure(trigger) => {
                trigger.tenant_id
            }
        }
    }

    /// Entity the notifications of this trigger are attributed to. Clear rules look up
    /// previously sent requests by this id.
    pub fn originator_entity_id(&self) -> EntityId {
        match self {
            NotificationRuleTrigger::EntityAction(trigger) => trigger.entity_id,
            NotificationRuleTrigger::Alarm(trigger) => {
                EntityId::new(EntityType::Alarm, trigger.alarm.id)
            }
            NotificationRuleTrigger::ComponentLifecycle(trigger) => {
                trigger.component_id
            }
            NotificationRuleTrigger::ApiUsageLimit(trigger) => trigger.tenant_id.into(),
            NotificationRuleTrigger::TaskProcessingFailure(trigger) => {
                trigger.entity_id
            }
        }
    }

    /// Whether equivalent occurrences within the dedup window are suppressed.
    pub fn deduplicate(&self) -> bool {
        matches!(
            self,
            NotificationRuleTrigger::ComponentLifecycle(_)
                | NotificationRuleTrigger::ApiUsageLimit(_)
                | NotificationRuleTrigger::TaskProcessingFailure(_)
        )
    }

    /// Key identifying equivalent occurrences of this trigger.
    pub fn deduplication_key(&self) -> String {
        match self {
            NotificationRuleTrigger::EntityAction(trigger) => format!(
                "{}:{}:{:?}",
                trigger.tenant_id, trigger.entity_id, trigger.action_type
            ),
            NotificationRuleTrigger::Alarm(trigger) => {
                format!("{}:{}:{:?}", trigger.tenant_id, trigger.alarm.id, trigger.alarm.status())
            }
            NotificationRuleTrigger::ComponentLifecycle(trigger) => format!(
                "{}:{}:{:?}:{}",
                trigger.tenant_id,
                trigger.component_id,
                trigger.event_type,
                trigger.error.as_deref().unwrap_or_default()
            ),
            NotificationRuleTrigger::ApiUsageLimit(trigger) => format!(
                "{}:{:?}:{:?}",
                trigger.tenant_id, trigger.api_feature, trigger.status
            ),
            NotificationRuleTrigger::TaskProcessingFailure(trigger) => format!(
                "{}:{}:{}",
                trigger.tenant_id, trigger.entity_id, trigger.task_type
            ),
        }
    }

    /// Dedup window specific to this trigger, when it overrides the configured one.
    pub fn default_deduplication_window(&self) -> Option<Duration> {
        match self {
            NotificationRuleTrigger::ApiUsageLimit(_) => {
                Some(Duration::from_secs(24 * 60 * 60))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle_trigger(error: Option<&str>) -> NotificationRuleTrigger {
        NotificationRuleTrigger::ComponentLifecycle(ComponentLifecycleTrigger {
            tenant_id: TenantId::new(Uuid::from_u128(1)),
            rule_chain_id: RuleChainId::new(Uuid::from_u128(2)),
            rule_chain_name: "Root".to_owned(),
            component_id: RuleChainId::new(Uuid::from_u128(2)).into(),
            component_name: "Root".to_owned(),
            event_type: ComponentLifecycleEvent::Started,
            error: error.map(str::to_owned),
        })
    }

    #[test]
    fn test_deduplication_key_depends_on_error() {
        let failed = lifecycle_trigger(Some("boom"));
        let ok = lifecycle_trigger(None);
        assert!(failed.deduplicate());
        assert_ne!(failed.deduplication_key(), ok.deduplication_key());
        assert_eq!(
            failed.deduplication_key(),
            lifecycle_trigger(Some("boom")).deduplication_key()
        );
    }

    #[test]
    fn test_alarm_status_flags() {
        assert_eq!(AlarmStatus::from_flags(true, false), AlarmStatus::ClearedUnack);
        assert!(AlarmStatus::ClearedAck.is_cleared());
        assert!(!AlarmStatus::ActiveAck.is_cleared());
    }

    #[test]
    fn test_scope() {
        assert!(NotificationRuleTriggerType::EntityAction.is_tenant_level());
        assert!(!NotificationRuleTriggerType::ApiUsageLimit.is_tenant_level());
    }
}
