// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::NotificationInfo;
use crate::{EntityId, NotificationRequestId, NotificationRuleId, TenantId};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery state of a notification request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationRequestStatus {
    /// Waiting for its sending delay to elapse.
    Scheduled,
    Processing,
    Sent,
}

/// Per-request delivery options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequestConfig {
    /// Delay before the request is delivered; `None` sends immediately.
    pub sending_delay_in_sec: Option<u32>,
}

/// A notification to deliver to a list of targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: Option<NotificationRequestId>,
    pub tenant_id: TenantId,
    pub targets: Vec<Uuid>,
    pub template_id: Uuid,
    pub info: Option<NotificationInfo>,
    pub additional_config: NotificationRequestConfig,
    pub rule_id: Option<NotificationRuleId>,
    pub originator_entity_id: Option<EntityId>,
    pub status: NotificationRequestStatus,
    pub created_time: i64,
}

impl NotificationRequest {
    pub fn is_sent(&self) -> bool {
        self.status == NotificationRequestStatus::Sent
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == NotificationRequestStatus::Scheduled
    }

    pub fn sending_delay_in_sec(&self) -> u32 {
        self.additional_config.sending_delay_in_sec.unwrap_or(0)
    }
}
