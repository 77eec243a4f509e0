// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::TriggerProcessor;
use crate::NotificationError;

use common::notification::{
    NotificationInfo, NotificationRuleTrigger, NotificationRuleTriggerType, TriggerConfig,
};

use async_trait::async_trait;

const MAX_ERROR_LENGTH: usize = 1024;

/// Failed background tasks. Every such trigger matches.
pub struct TaskProcessingFailureTriggerProcessor;

#[async_trait]
impl TriggerProcessor for TaskProcessingFailureTriggerProcessor {
    fn trigger_type(&self) -> NotificationRuleTriggerType {
        NotificationRuleTriggerType::TaskProcessingFailure
    }

    fn matches_filter(&self, trigger: &NotificationRuleTrigger, _config: &TriggerConfig) -> bool {
        matches!(trigger, NotificationRuleTrigger::TaskProcessingFailure(_))
    }

    async fn construct_notification_info(
        &self,
        trigger: &NotificationRuleTrigger,
    ) -> Result<NotificationInfo, NotificationError> {
        let NotificationRuleTrigger::TaskProcessingFailure(trigger) = trigger else {
            return Err(NotificationError::UnexpectedTrigger(self.trigger_type()));
        };
        Ok(NotificationInfo::TaskProcessingFailure {
            tenant_id: trigger.tenant_id,
            entity_id: trigger.entity_id,
            task_type: trigger.task_type.clone(),
            task_description: trigger.task_description.clone(),
            error: trigger.error.chars().take(MAX_ERROR_LENGTH).collect(),
            attempt: trigger.attempt,
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::{notification::TaskProcessingFailureTrigger, EntityId, EntityType, TenantId};

    #[tokio::test]
    async fn test_error_truncated() {
        let trigger = NotificationRuleTrigger::TaskProcessingFailure(TaskProcessingFailureTrigger {
            tenant_id: TenantId::random(),
            entity_id: EntityId::random(EntityType::Device),
            task_type: "DELETE_ATTRIBUTES".to_owned(),
            task_description: "attributes deletion".to_owned(),
            error: "x".repeat(5000),
            attempt: 3,
        });
        let info = TaskProcessingFailureTriggerProcessor
            .construct_notification_info(&trigger)
            .await
            .unwrap();
        let NotificationInfo::TaskProcessingFailure { error, attempt, .. } = info else {
            panic!("unexpected info");
        };
        assert_eq!(error.len(), MAX_ERROR_LENGTH);
        assert_eq!(attempt, 3);
    }
}
