// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::TriggerProcessor;
use crate::NotificationError;

use common::{
    notification::{
        ComponentLifecycleTrigger, ComponentLifecycleTriggerConfig, NotificationInfo,
        NotificationRuleTrigger, NotificationRuleTriggerType, TriggerConfig,
    },
    ComponentLifecycleEvent, EntityType,
};

use async_trait::async_trait;

use std::collections::BTreeSet;

/// Rule chain and rule node lifecycle events, including start failures.
pub struct ComponentLifecycleTriggerProcessor;

impl ComponentLifecycleTriggerProcessor {
    fn matches(
        trigger: &ComponentLifecycleTrigger,
        config: &ComponentLifecycleTriggerConfig,
    ) -> bool {
        if !config.rule_chains.is_empty() && !config.rule_chains.contains(&trigger.rule_chain_id)
        {
            return false;
        }
        let (events, only_failures) = match trigger.component_id.entity_type() {
            EntityType::RuleChain => (
                &config.rule_chain_events,
                config.only_rule_chain_lifecycle_failures,
            ),
            EntityType::RuleNode if config.track_rule_node_events => (
                &config.rule_node_events,
                config.only_rule_node_lifecycle_failures,
            ),
            _ => return false,
        };
        let tracked = if events.is_empty() {
            BTreeSet::from([
                ComponentLifecycleEvent::Started,
                ComponentLifecycleEvent::Updated,
                ComponentLifecycleEvent::Stopped,
            ])
        } else {
            events.clone()
        };
        tracked.contains(&trigger.event_type) && (!only_failures || trigger.error.is_some())
    }

    fn action(event: ComponentLifecycleEvent) -> String {
        match event {
            ComponentLifecycleEvent::Started => "start".to_owned(),
            ComponentLifecycleEvent::Updated => "update".to_owned(),
            ComponentLifecycleEvent::Stopped => "stop".to_owned(),
            other => format!("{:?}", other).to_lowercase(),
        }
    }
}

#[async_trait]
impl TriggerProcessor for ComponentLifecycleTriggerProcessor {
    fn trigger_type(&self) -> NotificationRuleTriggerType {
        NotificationRuleTriggerType::RuleEngineComponentLifecycleEvent
    }

    fn matches_filter(&self, trigger: &NotificationRuleTrigger, config: &TriggerConfig) -> bool {
        match (trigger, config) {
            (
                NotificationRuleTrigger::ComponentLifecycle(trigger),
                TriggerConfig::ComponentLifecycle(config),
            ) => Self::matches(trigger, config),
            _ => false,
        }
    }

    async fn construct_notification_info(
        &self,
        trigger: &NotificationRuleTrigger,
    ) -> Result<NotificationInfo, NotificationError> {
        let NotificationRuleTrigger::ComponentLifecycle(trigger) = trigger else {
            return Err(NotificationError::UnexpectedTrigger(self.trigger_type()));
        };
        Ok(NotificationInfo::ComponentLifecycle {
            rule_chain_id: trigger.rule_chain_id,
            rule_chain_name: trigger.rule_chain_name.clone(),
            component_id: trigger.component_id,
            component_name: trigger.component_name.clone(),
            action: Self::action(trigger.event_type),
            event_type: trigger.event_type,
            error: trigger.error.clone(),
        })
    }
}
