// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{
    AlarmSeverity, AlarmStatus, ApiFeature, ApiUsageStateValue,
    NotificationRuleTriggerType,
};
use crate::{ComponentLifecycleEvent, EntityType, NotificationRuleId, RuleChainId, TenantId};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::{BTreeMap, BTreeSet};

/// Configured notification rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationRule {
    pub id: NotificationRuleId,
    pub tenant_id: TenantId,
    pub name: String,
    pub enabled: bool,
    pub template_id: Uuid,
    pub trigger_config: TriggerConfig,
    pub recipients_config: RecipientsConfig,
}

impl NotificationRule {
    pub fn trigger_type(&self) -> NotificationRuleTriggerType {
        self.trigger_config.trigger_type()
    }
}

/// Who receives the notifications of a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientsConfig {
    /// Everybody is notified right away.
    Targets(Vec<Uuid>),
    /// Escalation table: seconds of delay mapped to the targets notified after that delay.
    Escalation(BTreeMap<u32, Vec<Uuid>>),
}

impl RecipientsConfig {
    /// Delay (seconds) to targets table, ordered by delay.
    pub fn targets_table(&self) -> BTreeMap<u32, Vec<Uuid>> {
        match self {
            RecipientsConfig::Targets(targets) => {
                BTreeMap::from([(0, targets.clone())])
            }
            RecipientsConfig::Escalation(table) => table.clone(),
        }
    }
}

/// Trigger type specific matching configuration of a rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TriggerConfig {
    EntityAction(EntityActionTriggerConfig),
    Alarm(AlarmTriggerConfig),
    ComponentLifecycle(ComponentLifecycleTriggerConfig),
    ApiUsageLimit(ApiUsageLimitTriggerConfig),
    TaskProcessingFailure(TaskProcessingFailureTriggerConfig),
}

impl TriggerConfig {
    pub fn trigger_type(&self) -> NotificationRuleTriggerType {
        match self {
            TriggerConfig::EntityAction(_) => {
                NotificationRuleTriggerType::EntityAction
            }
            TriggerConfig::Alarm(_) => NotificationRuleTriggerType::Alarm,
            TriggerConfig::ComponentLifecycle(_) => {
                NotificationRuleTriggerType::RuleEngineComponentLifecycleEvent
            }
            TriggerConfig::ApiUsageLimit(_) => {
                NotificationRuleTriggerType::ApiUsageLimit
            }
            TriggerConfig::TaskProcessingFailure(_) => {
                NotificationRuleTriggerType::TaskProcessingFailure
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityActionTriggerConfig {
    /// Entity types to watch; empty watches every type.
    pub entity_types: BTreeSet<EntityType>,
    pub created: bool,
    pub updated: bool,
    pub deleted: bool,
}

/// Alarm changes a rule notifies on.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AlarmNotifyOn {
    Created,
    SeverityChanged,
    Acknowledged,
    Cleared,
}

/// Statuses in which previously sent alarm notifications are withdrawn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmClearRule {
    /// Empty means "once the alarm is cleared".
    pub alarm_statuses: BTreeSet<AlarmStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmTriggerConfig {
    pub alarm_types: BTreeSet<String>,
    pub alarm_severities: BTreeSet<AlarmSeverity>,
    pub notify_on: BTreeSet<AlarmNotifyOn>,
    pub clear_rule: Option<AlarmClearRule>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentLifecycleTriggerConfig {
    /// Rule chains to watch; empty watches every chain.
    pub rule_chains: BTreeSet<RuleChainId>,
    pub rule_chain_events: BTreeSet<ComponentLifecycleEvent>,
    pub only_rule_chain_lifecycle_failures: bool,
    pub track_rule_node_events: bool,
    pub rule_node_events: BTreeSet<ComponentLifecycleEvent>,
    pub only_rule_node_lifecycle_failures: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsageLimitTriggerConfig {
    pub api_features: BTreeSet<ApiFeature>,
    pub notify_on: BTreeSet<ApiUsageStateValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProcessingFailureTriggerConfig {}
