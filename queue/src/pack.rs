// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Pack processing
//!
//! A pack is one polled batch. Every message gets a tracking id and a callback bound to the
//! pack's [`PackProcessingContext`]; the pack completes when every callback resolved or the
//! processing timeout elapsed, whichever comes first. The consumer is committed once per pack in
//! both cases, so messages still pending at the timeout are only logged.
//!

use crate::{QueueConsumer, QueueError, QueueMsg};

use common::{MsgCallback, MsgError};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// Resolution of one pack message.
#[derive(Clone, Debug, PartialEq)]
enum PackMsgState {
    Pending,
    Acked,
    Failed(MsgError),
}

/// In-flight state of one pack.
///
/// Each message moves out of `Pending` at most once, under its map entry lock. Once
/// [`PackProcessingContext::outcome`] has been taken the context is closed and later callbacks
/// are ignored.
pub struct PackProcessingContext {
    msgs: DashMap<Uuid, (QueueMsg, PackMsgState)>,
    pending: AtomicUsize,
    closed: AtomicBool,
    done: CancellationToken,
}

impl PackProcessingContext {
    pub fn new<I>(msgs: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, QueueMsg)>,
    {
        let msgs: DashMap<Uuid, (QueueMsg, PackMsgState)> = msgs
            .into_iter()
            .map(|(id, msg)| (id, (msg, PackMsgState::Pending)))
            .collect();
        let done = CancellationToken::new();
        if msgs.is_empty() {
            done.cancel();
        }
        Self {
            pending: AtomicUsize::new(msgs.len()),
            msgs,
            closed: AtomicBool::new(false),
            done,
        }
    }

    fn on_success(&self, id: Uuid) {
        self.resolve(id, PackMsgState::Acked);
    }

    fn on_failure(&self, id: Uuid, error: MsgError) {
        self.resolve(id, PackMsgState::Failed(error));
    }

    fn resolve(&self, id: Uuid, state: PackMsgState) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let Some(mut entry) = self.msgs.get_mut(&id) else {
            return;
        };
        if entry.1 != PackMsgState::Pending {
            return;
        }
        entry.1 = state;
        drop(entry);
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.done.cancel();
        }
    }

    /// Waits until every message resolved, at most `timeout`.
    ///
    /// # Returns
    ///
    /// True when the pack completed in time.
    ///
    pub async fn wait(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.done.cancelled())
            .await
            .is_ok()
    }

    /// Closes the context and reports how every message resolved.
    pub fn outcome(&self) -> PackOutcome {
        self.closed.store(true, Ordering::Release);
        let mut outcome = PackOutcome::default();
        for entry in self.msgs.iter() {
            match &entry.value().1 {
                PackMsgState::Pending => outcome.timed_out.push(*entry.key()),
                PackMsgState::Acked => outcome.acked.push(*entry.key()),
                PackMsgState::Failed(error) => outcome.failed.push((*entry.key(), error.clone())),
            }
        }
        outcome
    }

    fn msg_key(&self, id: &Uuid) -> Option<Uuid> {
        self.msgs.get(id).map(|entry| entry.value().0.key())
    }
}

/// Callback of one pack message.
pub struct PackCallback {
    id: Uuid,
    ctx: Arc<PackProcessingContext>,
}

impl PackCallback {
    pub fn new(id: Uuid, ctx: Arc<PackProcessingContext>) -> Self {
        Self { id, ctx }
    }
}

impl MsgCallback for PackCallback {
    fn on_success(&self) {
        self.ctx.on_success(self.id);
    }

    fn on_failure(&self, error: MsgError) {
        self.ctx.on_failure(self.id, error);
    }
}

/// How the messages of a pack resolved, by tracking id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackOutcome {
    pub acked: Vec<Uuid>,
    pub failed: Vec<(Uuid, MsgError)>,
    pub timed_out: Vec<Uuid>,
}

impl PackOutcome {
    pub fn total(&self) -> usize {
        self.acked.len() + self.failed.len() + self.timed_out.len()
    }

    pub fn is_complete(&self) -> bool {
        self.timed_out.is_empty()
    }
}

/// Handles the messages of a pack. Each message must eventually resolve its callback.
#[async_trait]
pub trait MsgPackHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        id: Uuid,
        msg: QueueMsg,
        callback: Arc<dyn MsgCallback>,
    ) -> Result<(), QueueError>;
}

/// Processes one pack and commits the consumer.
///
/// Handlers run in poll order. A handler error fails that message only. Messages that are
/// still pending when `timeout` elapses are logged as timed out and committed anyway.
///
pub async fn process_pack(
    msgs: Vec<QueueMsg>,
    consumer: &mut dyn QueueConsumer,
    handler: &dyn MsgPackHandler,
    timeout: Duration,
) -> Result<PackOutcome, QueueError> {
    let ordered: Vec<(Uuid, QueueMsg)> =
        msgs.into_iter().map(|msg| (Uuid::new_v4(), msg)).collect();
    let ctx = Arc::new(PackProcessingContext::new(ordered.iter().cloned()));
    debug!("Processing pack of {} messages.", ordered.len());

    for (id, msg) in ordered {
        let callback: Arc<dyn MsgCallback> = Arc::new(PackCallback::new(id, ctx.clone()));
        if let Err(error) = handler.handle(id, msg, callback.clone()).await {
            warn!("[{}] Failed to handle message: {}", id, error);
            callback.on_failure(MsgError::Processing(error.to_string()));
        }
    }

    if !ctx.wait(timeout).await {
        debug!("Pack processing timed out after {:?}.", timeout);
    }
    let outcome = ctx.outcome();
    for id in &outcome.timed_out {
        if let Some(key) = ctx.msg_key(id) {
            warn!("[{}] Timeout to process message {}", id, key);
        }
    }
    for (id, error) in &outcome.failed {
        warn!("[{}] Failed to process message: {}", id, error);
    }

    consumer.commit().await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {

    use super::*;

    use common::TopicPartitionInfo;
    use tracing_test::traced_test;

    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Instant,
    };

    #[derive(Default)]
    struct CommitCounter {
        commits: AtomicUsize,
    }

    #[async_trait]
    impl QueueConsumer for CommitCounter {
        fn subscribe(&mut self, _partitions: Vec<TopicPartitionInfo>) {}

        fn unsubscribe(&mut self) {}

        async fn poll(&mut self, _max_wait: Duration) -> Result<Vec<QueueMsg>, QueueError> {
            Ok(vec![])
        }

        async fn commit(&mut self) -> Result<(), QueueError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_stopped(&self) -> bool {
            false
        }
    }

    // Acks, fails, rejects or ignores a message depending on its first value byte.
    struct ScriptedHandler;

    #[async_trait]
    impl MsgPackHandler for ScriptedHandler {
        async fn handle(
            &self,
            _id: Uuid,
            msg: QueueMsg,
            callback: Arc<dyn MsgCallback>,
        ) -> Result<(), QueueError> {
            match msg.value().first() {
                Some(0) => {
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        callback.on_success();
                    });
                    Ok(())
                }
                Some(1) => {
                    callback.on_failure(MsgError::Processing("bad payload".to_owned()));
                    Ok(())
                }
                Some(2) => Err(QueueError::Codec("truncated".to_owned())),
                _ => Ok(()),
            }
        }
    }

    fn pack(script: &[u8]) -> Vec<QueueMsg> {
        script
            .iter()
            .map(|b| QueueMsg::new(Uuid::new_v4(), vec![*b]))
            .collect()
    }

    #[tokio::test]
    async fn test_pack_released_early_when_all_resolved() {
        let mut consumer = CommitCounter::default();
        let started = Instant::now();
        let outcome = process_pack(
            pack(&[0, 0, 0, 1, 2]),
            &mut consumer,
            &ScriptedHandler,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.acked.len(), 3);
        assert_eq!(outcome.failed.len(), 2);
        assert!(outcome.is_complete());
        assert_eq!(consumer.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_pack_timeout_still_commits_once() {
        let mut consumer = CommitCounter::default();
        let outcome = process_pack(
            pack(&[0, 3, 1, 3]),
            &mut consumer,
            &ScriptedHandler,
            Duration::from_millis(100),
        )
        .await
        .unwrap();

        assert_eq!(outcome.total(), 4);
        assert_eq!(outcome.acked.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.timed_out.len(), 2);
        assert_eq!(consumer.commits.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Timeout to process message"));
        assert!(logs_contain("Failed to process message"));
    }

    #[tokio::test]
    async fn test_empty_pack_commits() {
        let mut consumer = CommitCounter::default();
        let outcome = process_pack(vec![], &mut consumer, &ScriptedHandler, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome.total(), 0);
        assert_eq!(consumer.commits.load(Ordering::SeqCst), 1);
    }

    // Acks every message from a plain thread, racing the pack timeout.
    struct ThreadAckHandler;

    #[async_trait]
    impl MsgPackHandler for ThreadAckHandler {
        async fn handle(
            &self,
            _id: Uuid,
            _msg: QueueMsg,
            callback: Arc<dyn MsgCallback>,
        ) -> Result<(), QueueError> {
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_micros(200));
                callback.on_success();
            });
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_callbacks_racing_timeout_keep_outcome_whole() {
        for _ in 0..50 {
            let mut consumer = CommitCounter::default();
            let outcome = process_pack(
                pack(&[0; 200]),
                &mut consumer,
                &ThreadAckHandler,
                Duration::from_micros(1),
            )
            .await
            .unwrap();

            assert_eq!(outcome.total(), 200);
            let mut ids: Vec<Uuid> = outcome
                .acked
                .iter()
                .chain(outcome.timed_out.iter())
                .copied()
                .chain(outcome.failed.iter().map(|(id, _)| *id))
                .collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), 200);
            assert_eq!(consumer.commits.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_callbacks_after_outcome_ignored() {
        let id = Uuid::new_v4();
        let ctx = Arc::new(PackProcessingContext::new([(
            id,
            QueueMsg::new(Uuid::new_v4(), vec![]),
        )]));
        let first = ctx.outcome();
        PackCallback::new(id, ctx.clone()).on_success();
        assert_eq!(first.timed_out, vec![id]);
        assert_eq!(ctx.outcome(), first);
    }

    #[test]
    fn test_late_outcomes_ignored() {
        let id = Uuid::new_v4();
        let ctx = Arc::new(PackProcessingContext::new([(
            id,
            QueueMsg::new(Uuid::new_v4(), vec![]),
        )]));
        let callback = PackCallback::new(id, ctx.clone());
        callback.on_success();
        callback.on_failure(MsgError::ActorStopped);
        let outcome = ctx.outcome();
        assert_eq!(outcome.acked, vec![id]);
        assert!(outcome.failed.is_empty());
    }
}
