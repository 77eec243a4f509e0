// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Queue transport
//!
//! Abstract producer/consumer contracts of the queue transport and an in-memory implementation
//! where every topic partition is a FIFO.
//!

use crate::{QueueError, QueueMsg};

use common::{MsgCallback, TopicPartitionInfo};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};

use std::{collections::VecDeque, sync::Arc, time::Duration};

/// Sends messages to topic partitions.
pub trait QueueProducer: Send + Sync + 'static {
    /// Sends `msg` to `tpi`. The callback, when given, learns the outcome.
    fn send(
        &self,
        tpi: &TopicPartitionInfo,
        msg: QueueMsg,
        callback: Option<Arc<dyn MsgCallback>>,
    );
}

/// Polls a set of topic partitions.
#[async_trait]
pub trait QueueConsumer: Send + Sync + 'static {
    fn subscribe(&mut self, partitions: Vec<TopicPartitionInfo>);

    fn unsubscribe(&mut self);

    /// Up to one batch of messages; waits at most `max_wait` when nothing is available.
    async fn poll(&mut self, max_wait: Duration) -> Result<Vec<QueueMsg>, QueueError>;

    /// Commits the offsets of everything polled so far.
    async fn commit(&mut self) -> Result<(), QueueError>;

    fn is_stopped(&self) -> bool;
}

/// Topic partitions kept in memory.
#[derive(Default)]
pub struct InMemoryStorage {
    topics: DashMap<String, VecDeque<QueueMsg>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, topic: &str, msg: QueueMsg) {
        self.topics.entry(topic.to_owned()).or_default().push_back(msg);
    }

    /// Removes and returns up to `max` messages of the topic.
    pub fn get(&self, topic: &str, max: usize) -> Vec<QueueMsg> {
        match self.topics.get_mut(topic) {
            Some(mut queue) => {
                let count = queue.len().min(max);
                queue.drain(..count).collect()
            }
            None => vec![],
        }
    }

    /// Messages waiting in a topic.
    pub fn lag(&self, topic: &str) -> usize {
        self.topics.get(topic).map(|queue| queue.len()).unwrap_or(0)
    }
}

/// Producer writing to an [`InMemoryStorage`].
pub struct InMemoryProducer {
    storage: Arc<InMemoryStorage>,
}

impl InMemoryProducer {
    pub fn new(storage: Arc<InMemoryStorage>) -> Self {
        Self { storage }
    }
}

impl QueueProducer for InMemoryProducer {
    fn send(
        &self,
        tpi: &TopicPartitionInfo,
        msg: QueueMsg,
        callback: Option<Arc<dyn MsgCallback>>,
    ) {
        trace!("Sending message {} to {}.", msg.key(), tpi);
        self.storage.put(&tpi.full_topic_name(), msg);
        if let Some(callback) = callback {
            callback.on_success();
        }
    }
}

/// Consumer reading from an [`InMemoryStorage`]. Polled messages leave the storage, so a commit
/// only resets the uncommitted counter.
pub struct InMemoryConsumer {
    storage: Arc<InMemoryStorage>,
    topics: Vec<String>,
    batch_size: usize,
    uncommitted: usize,
    stopped: bool,
}

impl InMemoryConsumer {
    pub fn new(storage: Arc<InMemoryStorage>, batch_size: usize) -> Self {
        Self {
            storage,
            topics: vec![],
            batch_size: batch_size.max(1),
            uncommitted: 0,
            stopped: true,
        }
    }

    /// Messages waiting in the subscribed partitions.
    pub fn lag(&self) -> usize {
        self.topics.iter().map(|topic| self.storage.lag(topic)).sum()
    }
}

#[async_trait]
impl QueueConsumer for InMemoryConsumer {
    fn subscribe(&mut self, partitions: Vec<TopicPartitionInfo>) {
        self.topics = partitions.iter().map(|tpi| tpi.full_topic_name()).collect();
        self.stopped = false;
        debug!("Subscribed to {:?}.", self.topics);
    }

    fn unsubscribe(&mut self) {
        self.topics.clear();
        self.stopped = true;
    }

    async fn poll(&mut self, max_wait: Duration) -> Result<Vec<QueueMsg>, QueueError> {
        let mut msgs = vec![];
        for topic in &self.topics {
            let remaining = self.batch_size - msgs.len();
            if remaining == 0 {
                break;
            }
            msgs.extend(self.storage.get(topic, remaining));
        }
        if msgs.is_empty() {
            tokio::time::sleep(max_wait).await;
        }
        self.uncommitted += msgs.len();
        Ok(msgs)
    }

    async fn commit(&mut self) -> Result<(), QueueError> {
        trace!("Committing {} messages.", self.uncommitted);
        self.uncommitted = 0;
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }
}
