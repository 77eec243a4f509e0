// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Topic naming
//!

use common::{ServiceType, TenantId};

/// Builds topic names and consumer group ids, applying the installation prefix.
#[derive(Clone, Debug, Default)]
pub struct TopicService {
    prefix: String,
}

impl TopicService {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim().to_owned(),
        }
    }

    pub fn build_topic_name(&self, topic: &str) -> String {
        if self.prefix.is_empty() {
            topic.to_owned()
        } else {
            format!("{}.{}", self.prefix, topic)
        }
    }

    /// Topic of a queue: `tb_rule_engine.main`, or `tb_rule_engine.main.<tenant>` when the
    /// queue belongs to an isolated tenant.
    pub fn queue_topic(
        &self,
        service_type: ServiceType,
        queue_name: &str,
        tenant_id: Option<TenantId>,
    ) -> String {
        let topic = format!(
            "{}.{}",
            service_type.topic_prefix(),
            queue_name.to_lowercase()
        );
        match tenant_id {
            Some(tenant_id) => self.build_topic_name(&format!("{}.{}", topic, tenant_id)),
            None => self.build_topic_name(&topic),
        }
    }

    /// Per-service notifications topic, always owned by that service.
    pub fn notifications_topic(&self, service_type: ServiceType, service_id: &str) -> String {
        self.build_topic_name(&format!(
            "{}.notifications.{}",
            service_type.topic_prefix(),
            service_id
        ))
    }

    pub fn build_consumer_group_id(
        &self,
        service_prefix: &str,
        tenant_id: TenantId,
        queue_name: &str,
        partition: Option<u32>,
    ) -> String {
        let isolated = if tenant_id.is_sys_tenant() {
            String::new()
        } else {
            format!("-isolated-{}", tenant_id)
        };
        let suffix = partition.map(|p| format!("-{}", p)).unwrap_or_default();
        self.build_topic_name(&format!(
            "{}{}{}-consumer{}",
            service_prefix, queue_name, isolated, suffix
        ))
    }
}
