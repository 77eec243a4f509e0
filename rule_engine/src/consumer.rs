// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule-engine consumer service
//!
//! Keeps one [`QueueConsumerManager`] per rule-engine topic this node owns partitions of, and
//! feeds every consumed message to the application actor with its pack callback. The set of
//! consumers follows the partition change events of the partition service.
//!

use actor::{ActorRef, PartitionChangeMsg, QueueToRuleEngineMsg, TbActorMsg};
use common::{MsgCallback, QueueStatsId, ServiceType, TopicPartitionInfo};
use queue::{
    MsgPackHandler, PartitionService, QueueConsumer, QueueConsumerManager, QueueError,
    QueueMsg, QueueSettings, QueueStatsCache, ToRuleEngineMsg,
};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::{
    sync::{broadcast::error::RecvError, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

/// Builds the consumer of a topic, given one of its partitions.
pub type ConsumerFactory =
    Arc<dyn Fn(&TopicPartitionInfo) -> Box<dyn QueueConsumer> + Send + Sync>;

/// Pack handler telling every decoded message to the application actor.
pub struct RuleEngineMsgHandler {
    app: ActorRef,
    stats_cache: Arc<QueueStatsCache>,
    submitted: DashMap<QueueStatsId, u64>,
}

impl RuleEngineMsgHandler {
    pub fn new(app: ActorRef, stats_cache: Arc<QueueStatsCache>) -> Self {
        Self {
            app,
            stats_cache,
            submitted: DashMap::new(),
        }
    }

    /// Messages handed to the rule engine for a queue stats record.
    pub fn submitted(&self, stats_id: QueueStatsId) -> u64 {
        self.submitted.get(&stats_id).map(|count| *count).unwrap_or(0)
    }
}

#[async_trait]
impl MsgPackHandler for RuleEngineMsgHandler {
    async fn handle(
        &self,
        id: Uuid,
        msg: QueueMsg,
        callback: Arc<dyn MsgCallback>,
    ) -> Result<(), QueueError> {
        let ToRuleEngineMsg { tenant_id, tb_msg } = ToRuleEngineMsg::decode(&msg)?;
        let stats_id = self
            .stats_cache
            .get_or_create(tenant_id, tb_msg.queue_name())
            .await?;
        *self.submitted.entry(stats_id).or_default() += 1;
        trace!("[{}][{}] Submitting message {}.", tenant_id, id, tb_msg.id());

        if let Err(e) = self.app.tell(TbActorMsg::QueueToRuleEngine(QueueToRuleEngineMsg {
            tenant_id,
            msg: tb_msg.with_callback(callback),
        })) {
            debug!("[{}][{}] Message not delivered: {}", tenant_id, id, e);
        }
        Ok(())
    }
}

pub struct RuleEngineConsumerService {
    app: ActorRef,
    handler: Arc<RuleEngineMsgHandler>,
    partition_service: Arc<dyn PartitionService>,
    consumer_factory: ConsumerFactory,
    settings: QueueSettings,
    token: CancellationToken,
    consumers: Mutex<HashMap<String, QueueConsumerManager>>,
}

impl RuleEngineConsumerService {
    /// Consumers stop when `token` is cancelled.
    pub fn new(
        app: ActorRef,
        partition_service: Arc<dyn PartitionService>,
        stats_cache: Arc<QueueStatsCache>,
        consumer_factory: ConsumerFactory,
        settings: QueueSettings,
        token: &CancellationToken,
    ) -> Self {
        Self {
            handler: Arc::new(RuleEngineMsgHandler::new(app.clone(), stats_cache)),
            app,
            partition_service,
            consumer_factory,
            settings,
            token: token.child_token(),
            consumers: Mutex::new(HashMap::new()),
        }
    }

    pub fn handler(&self) -> Arc<RuleEngineMsgHandler> {
        self.handler.clone()
    }

    /// Subscribes to the partitions owned now and follows later partition changes.
    pub async fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.partition_service.subscribe();
        self.on_partition_change(self.partition_service.my_partitions(ServiceType::RuleEngine))
            .await;

        let service = self.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = service.token.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(event) if event.service_type == ServiceType::RuleEngine => {
                        service.on_partition_change(event.partitions).await
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} partition change events, resynchronizing.", skipped);
                        service
                            .on_partition_change(
                                service.partition_service.my_partitions(ServiceType::RuleEngine),
                            )
                            .await
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Partition change listener stopped.");
        })
    }

    /// Starts, resubscribes and stops consumers so that exactly the given partitions are
    /// consumed, then lets the actors re-evaluate their ownership.
    pub async fn on_partition_change(&self, partitions: Vec<TopicPartitionInfo>) {
        let mut by_topic: BTreeMap<String, Vec<TopicPartitionInfo>> = BTreeMap::new();
        for tpi in &partitions {
            by_topic.entry(tpi.topic().to_owned()).or_default().push(tpi.clone());
        }

        let mut consumers = self.consumers.lock().await;
        let released: Vec<String> = consumers
            .keys()
            .filter(|topic| !by_topic.contains_key(*topic))
            .cloned()
            .collect();
        let stopping: Vec<QueueConsumerManager> = released
            .iter()
            .filter_map(|topic| consumers.remove(topic))
            .collect();
        futures::stream::iter(stopping)
            .for_each_concurrent(self.settings.mgmt_pool_size.max(1), |mut manager| async move {
                manager.stop().await;
            })
            .await;

        for (topic, tpis) in by_topic {
            let manager = consumers.entry(topic.clone()).or_insert_with(|| {
                info!("[{}] Starting consumer.", topic);
                QueueConsumerManager::new(
                    &topic,
                    (self.consumer_factory)(&tpis[0]),
                    self.handler.clone(),
                    self.settings.clone(),
                    &self.token,
                )
            });
            manager.subscribe(tpis).await;
            manager.launch();
        }
        drop(consumers);

        if let Err(e) = self
            .app
            .tell_with_high_priority(TbActorMsg::PartitionChange(PartitionChangeMsg {
                service_type: ServiceType::RuleEngine,
                partitions,
            }))
        {
            debug!("Partition change not delivered to actors: {}", e);
        }
    }

    /// Topics consumed right now.
    pub async fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.consumers.lock().await.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Stops every consumer, waiting for the packs in progress.
    pub async fn stop(&self) {
        self.token.cancel();
        let stopping: Vec<QueueConsumerManager> =
            self.consumers.lock().await.drain().map(|(_, manager)| manager).collect();
        futures::stream::iter(stopping)
            .for_each_concurrent(self.settings.mgmt_pool_size.max(1), |mut manager| async move {
                manager.stop().await;
            })
            .await;
        info!("Rule-engine consumers stopped.");
    }
}
