// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{empty_or_contains, TriggerProcessor};
use crate::NotificationError;

use common::notification::{
    ActionType, NotificationInfo, NotificationRuleTrigger, NotificationRuleTriggerType,
    TriggerConfig,
};

use async_trait::async_trait;

pub struct EntityActionTriggerProcessor;

#[async_trait]
impl TriggerProcessor for EntityActionTriggerProcessor {
    fn trigger_type(&self) -> NotificationRuleTriggerType {
        NotificationRuleTriggerType::EntityAction
    }

    fn matches_filter(&self, trigger: &NotificationRuleTrigger, config: &TriggerConfig) -> bool {
        let (NotificationRuleTrigger::EntityAction(trigger), TriggerConfig::EntityAction(config)) =
            (trigger, config)
        else {
            return false;
        };
        let action_matches = match trigger.action_type {
            ActionType::Added => config.created,
            ActionType::Updated => config.updated,
            ActionType::Deleted => config.deleted,
            _ => false,
        };
        action_matches
            && empty_or_contains(&config.entity_types, &trigger.entity_id.entity_type())
    }

    async fn construct_notification_info(
        &self,
        trigger: &NotificationRuleTrigger,
    ) -> Result<NotificationInfo, NotificationError> {
        let NotificationRuleTrigger::EntityAction(trigger) = trigger else {
            return Err(NotificationError::UnexpectedTrigger(self.trigger_type()));
        };
        Ok(NotificationInfo::EntityAction {
            entity_id: trigger.entity_id,
            entity_name: trigger.entity_name.clone(),
            action_type: trigger.action_type,
            user_id: trigger.user.id,
            user_email: trigger.user.email.clone(),
            user_first_name: trigger.user.first_name.clone(),
            user_last_name: trigger.user.last_name.clone(),
            entity_customer_id: trigger.entity_customer_id.or(trigger.user.customer_id),
        })
    }
}
