// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

// Producer to consumer routing over the in-memory transport.

use async_trait::async_trait;
use common::{
    msg_type, EntityId, EntityType, MsgCallback, MsgError, QueueName, ServiceType, TbMsg,
    TenantId,
};
use queue::{
    HashPartitionService, InMemoryConsumer, InMemoryProducer, InMemoryStorage,
    MsgPackHandler, PartitionService, QueueConfig, QueueConsumerManager, QueueError,
    QueueMsg, QueueSettings, RuleEngineProducerService, ToRuleEngineMsg, TopicService,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Default)]
struct Decoding {
    received: Mutex<Vec<ToRuleEngineMsg>>,
}

#[async_trait]
impl MsgPackHandler for Decoding {
    async fn handle(
        &self,
        _id: Uuid,
        msg: QueueMsg,
        callback: Arc<dyn MsgCallback>,
    ) -> Result<(), QueueError> {
        let decoded = ToRuleEngineMsg::decode(&msg)?;
        self.received.lock().unwrap().push(decoded);
        callback.on_success();
        Ok(())
    }
}

struct NoopCallback;

impl MsgCallback for NoopCallback {
    fn on_success(&self) {}

    fn on_failure(&self, _error: MsgError) {}
}

#[tokio::test]
async fn test_fan_out_reaches_every_partition_consumer() {
    let tenant_id = TenantId::random();
    let partition_service = Arc::new(HashPartitionService::new(
        "node-a",
        TopicService::new("test"),
    ));
    partition_service
        .add_queue(
            ServiceType::RuleEngine,
            Some(tenant_id),
            QueueConfig::new(QueueName::MAIN, 3).with_duplicate_msg_to_all_partitions(),
        )
        .unwrap();

    let storage = Arc::new(InMemoryStorage::new());
    let producer = InMemoryProducer::new(storage.clone());
    let router = RuleEngineProducerService::new(partition_service.clone());
    let msg = TbMsg::new(
        QueueName::MAIN,
        msg_type::POST_ATTRIBUTES_REQUEST,
        EntityId::random(EntityType::Device),
        BTreeMap::new(),
        "{\"firmware\":\"1.2\"}",
    );
    router
        .send_to_rule_engine(&producer, tenant_id, msg.clone(), Some(Arc::new(NoopCallback)))
        .unwrap();

    let handler = Arc::new(Decoding::default());
    let settings = QueueSettings {
        poll_interval: Duration::from_millis(5),
        ..Default::default()
    };
    let mut manager = QueueConsumerManager::new(
        "main",
        Box::new(InMemoryConsumer::new(storage.clone(), settings.poll_batch_size)),
        handler.clone(),
        settings,
        &CancellationToken::new(),
    );
    let partitions = partition_service.my_partitions(ServiceType::RuleEngine);
    assert_eq!(partitions.len(), 3);
    assert!(partitions[0]
        .full_topic_name()
        .starts_with(&format!("test.tb_rule_engine.main.{}", tenant_id)));
    manager.subscribe(partitions).await;
    manager.launch();

    for _ in 0..200 {
        if handler.received.lock().unwrap().len() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    manager.stop().await;

    let received = handler.received.lock().unwrap();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|copy| copy.tenant_id == tenant_id
        && copy.tb_msg.data() == msg.data()
        && copy.tb_msg.correlation_id() == received[0].tb_msg.correlation_id()));
}
