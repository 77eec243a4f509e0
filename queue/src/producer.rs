// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule-engine producer
//!

use crate::{PartitionService, QueueError, QueueMsg, QueueProducer, ToRuleEngineMsg};

use common::{MsgCallback, ServiceType, TbMsg, TenantId, TopicPartitionInfo};

use tracing::debug;
use uuid::Uuid;

use std::sync::Arc;

/// Routes rule-engine messages to their partitions.
pub struct RuleEngineProducerService {
    partition_service: Arc<dyn PartitionService>,
}

impl RuleEngineProducerService {
    pub fn new(partition_service: Arc<dyn PartitionService>) -> Self {
        Self { partition_service }
    }

    /// Sends `tb_msg` to every partition it resolves to.
    ///
    /// With more than one partition, every copy shares a fresh correlation id and is stamped
    /// with its partition; the first copy keeps the original message id. Only the last copy
    /// reports to `callback`, so the outcome of earlier copies is not observable by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue cannot be resolved or a copy cannot be encoded. Nothing
    /// is sent in that case.
    ///
    pub fn send_to_rule_engine(
        &self,
        producer: &dyn QueueProducer,
        tenant_id: TenantId,
        tb_msg: TbMsg,
        callback: Option<Arc<dyn MsgCallback>>,
    ) -> Result<(), QueueError> {
        let tpis = self.partition_service.resolve_all(
            ServiceType::RuleEngine,
            tb_msg.queue_name(),
            tenant_id,
            tb_msg.originator(),
        )?;

        let mut outgoing: Vec<(TopicPartitionInfo, QueueMsg)> = Vec::with_capacity(tpis.len());
        if tpis.len() > 1 {
            let correlation_id = Uuid::new_v4();
            debug!(
                "[{}] Message {} goes to {} partitions with correlation {}.",
                tenant_id,
                tb_msg.id(),
                tpis.len(),
                correlation_id
            );
            for (i, tpi) in tpis.into_iter().enumerate() {
                let id = if i == 0 { tb_msg.id() } else { Uuid::new_v4() };
                let copy = tb_msg.for_partition(id, correlation_id, tpi.partition());
                outgoing.push((tpi, ToRuleEngineMsg::new(tenant_id, copy).encode()?));
            }
        } else {
            for tpi in tpis {
                outgoing.push((tpi, ToRuleEngineMsg::new(tenant_id, tb_msg.clone()).encode()?));
            }
        }

        let last = outgoing.len().saturating_sub(1);
        for (i, (tpi, msg)) in outgoing.into_iter().enumerate() {
            let callback = if i == last { callback.clone() } else { None };
            producer.send(&tpi, msg, callback);
        }
        Ok(())
    }
}
