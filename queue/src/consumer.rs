// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Queue consumer manager
//!

use crate::{process_pack, MsgPackHandler, QueueConsumer, QueueSettings};

use common::TopicPartitionInfo;

use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use std::sync::Arc;

/// Polls one consumer in a background task and feeds every non-empty poll to
/// [`process_pack`].
pub struct QueueConsumerManager {
    name: String,
    consumer: Arc<Mutex<Box<dyn QueueConsumer>>>,
    handler: Arc<dyn MsgPackHandler>,
    settings: QueueSettings,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl QueueConsumerManager {
    /// The manager stops when `parent` is cancelled.
    pub fn new(
        name: &str,
        consumer: Box<dyn QueueConsumer>,
        handler: Arc<dyn MsgPackHandler>,
        settings: QueueSettings,
        parent: &CancellationToken,
    ) -> Self {
        Self {
            name: name.to_owned(),
            consumer: Arc::new(Mutex::new(consumer)),
            handler,
            settings,
            token: parent.child_token(),
            task: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the consumer's partitions. Takes effect after the poll in progress.
    pub async fn subscribe(&self, partitions: Vec<TopicPartitionInfo>) {
        info!("[{}] Subscribing to {} partitions.", self.name, partitions.len());
        self.consumer.lock().await.subscribe(partitions);
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts the polling loop. Does nothing if it is already running.
    pub fn launch(&mut self) {
        if self.is_running() {
            return;
        }
        let name = self.name.clone();
        let consumer = self.consumer.clone();
        let handler = self.handler.clone();
        let settings = self.settings.clone();
        let token = self.token.clone();

        self.task = Some(tokio::spawn(async move {
            debug!("[{}] Consumer loop started.", name);
            loop {
                let mut consumer = consumer.lock().await;
                let polled = tokio::select! {
                    _ = token.cancelled() => break,
                    polled = consumer.poll(settings.poll_interval) => polled,
                };
                match polled {
                    Ok(msgs) if msgs.is_empty() => {}
                    Ok(msgs) => {
                        if let Err(e) = process_pack(
                            msgs,
                            &mut **consumer,
                            handler.as_ref(),
                            settings.pack_processing_timeout,
                        )
                        .await
                        {
                            error!("[{}] Failed to process pack: {}", name, e);
                        }
                    }
                    Err(e) => {
                        error!("[{}] Failed to poll messages: {}", name, e);
                        drop(consumer);
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = tokio::time::sleep(settings.poll_interval) => {}
                        }
                    }
                }
            }
            debug!("[{}] Consumer loop stopped.", name);
        }));
    }

    /// Stops the polling loop, waits for the pack in progress and unsubscribes.
    pub async fn stop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("[{}] Consumer loop failed: {}", self.name, e);
            }
        }
        self.consumer.lock().await.unsubscribe();
        info!("[{}] Consumer stopped.", self.name);
    }
}
