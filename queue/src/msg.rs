// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Queue envelopes
//!
//! [`QueueMsg`] is what the transport stores: a key, an opaque value and headers.
//! Rule-engine traffic carries a [`ToRuleEngineMsg`] encoded with `bincode` in the value.
//!

use crate::QueueError;

use common::{TbMsg, TenantId};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::BTreeMap;

/// Message as stored by the queue transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMsg {
    key: Uuid,
    value: Vec<u8>,
    headers: BTreeMap<String, Vec<u8>>,
}

impl QueueMsg {
    pub fn new(key: Uuid, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &[u8]) -> Self {
        self.headers.insert(name.to_owned(), value.to_vec());
        self
    }

    pub fn key(&self) -> Uuid {
        self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn headers(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.headers
    }
}

/// Rule-engine message addressed to a tenant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToRuleEngineMsg {
    pub tenant_id: TenantId,
    pub tb_msg: TbMsg,
}

impl ToRuleEngineMsg {
    pub fn new(tenant_id: TenantId, tb_msg: TbMsg) -> Self {
        Self { tenant_id, tb_msg }
    }

    /// Wraps the message in a queue envelope keyed by the rule-engine message id.
    pub fn encode(&self) -> Result<QueueMsg, QueueError> {
        let value = bincode::serialize(self)
            .map_err(|e| QueueError::Codec(e.to_string()))?;
        Ok(QueueMsg::new(self.tb_msg.id(), value))
    }

    pub fn decode(msg: &QueueMsg) -> Result<Self, QueueError> {
        bincode::deserialize(msg.value())
            .map_err(|e| QueueError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::{msg_type, EntityId, EntityType, QueueName};

    #[test]
    fn test_envelope_keyed_by_msg_id() {
        let tb_msg = TbMsg::new(
            QueueName::MAIN,
            msg_type::POST_TELEMETRY_REQUEST,
            EntityId::random(EntityType::Device),
            BTreeMap::from([("deviceName".to_owned(), "sensor-1".to_owned())]),
            "{\"temperature\":21}",
        );
        let tenant_id = TenantId::random();
        let envelope = ToRuleEngineMsg::new(tenant_id, tb_msg.clone())
            .encode()
            .unwrap();
        assert_eq!(envelope.key(), tb_msg.id());

        let decoded = ToRuleEngineMsg::decode(&envelope).unwrap();
        assert_eq!(decoded.tenant_id, tenant_id);
        assert_eq!(decoded.tb_msg.metadata(), tb_msg.metadata());
    }

    #[test]
    fn test_decode_garbage() {
        let msg = QueueMsg::new(Uuid::new_v4(), vec![1, 2, 3]);
        assert!(matches!(
            ToRuleEngineMsg::decode(&msg),
            Err(QueueError::Codec(_))
        ));
    }
}
