// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rule-engine message envelope
//!
//! [`TbMsg`] is the unit of work routed through queues and rule chains. The serializable part
//! travels over the queue transport; the [`MsgCallback`] stays local to the node that consumed
//! the message and is completed once the rule chain is done with it.
//!

use crate::{EntityId, MsgError, RuleChainId, RuleNodeId};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

/// Well-known message types.
pub mod msg_type {
    pub const POST_TELEMETRY_REQUEST: &str = "POST_TELEMETRY_REQUEST";
    pub const POST_ATTRIBUTES_REQUEST: &str = "POST_ATTRIBUTES_REQUEST";
    pub const ENTITY_CREATED: &str = "ENTITY_CREATED";
    pub const ENTITY_DELETED: &str = "ENTITY_DELETED";
    pub const ALARM: &str = "ALARM";
}

/// Well-known relation types between rule nodes.
pub mod relation {
    pub const SUCCESS: &str = "Success";
    pub const FAILURE: &str = "Failure";
    pub const OTHER: &str = "Other";
}

/// Completion signal of a message. Exactly one of the methods is expected to be called once per
/// logical message.
pub trait MsgCallback: Send + Sync + 'static {
    fn on_success(&self);

    fn on_failure(&self, error: MsgError);
}

/// Callback that ignores completion, used for copies nobody waits on.
#[derive(Debug, Default)]
pub struct EmptyMsgCallback;

impl MsgCallback for EmptyMsgCallback {
    fn on_success(&self) {}

    fn on_failure(&self, _error: MsgError) {}
}

/// Completes the wrapped callback once all `count` copies succeeded, or fails it on the first
/// failure. Later outcomes are ignored.
pub struct MultipleMsgCallback {
    remaining: AtomicUsize,
    done: AtomicBool,
    inner: Arc<dyn MsgCallback>,
}

impl MultipleMsgCallback {
    pub fn new(count: usize, inner: Arc<dyn MsgCallback>) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            done: AtomicBool::new(false),
            inner,
        }
    }
}

impl MsgCallback for MultipleMsgCallback {
    fn on_success(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) <= 1
            && !self.done.swap(true, Ordering::AcqRel)
        {
            self.inner.on_success();
        }
    }

    fn on_failure(&self, error: MsgError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.inner.on_failure(error);
        }
    }
}

fn empty_callback() -> Arc<dyn MsgCallback> {
    Arc::new(EmptyMsgCallback)
}

/// Rule-engine message.
#[derive(Clone, Serialize, Deserialize)]
pub struct TbMsg {
    id: Uuid,
    correlation_id: Option<Uuid>,
    partition: Option<i32>,
    queue_name: String,
    msg_type: String,
    originator: EntityId,
    metadata: BTreeMap<String, String>,
    data: String,
    rule_chain_id: Option<RuleChainId>,
    rule_node_id: Option<RuleNodeId>,
    ts: i64,
    /// Call stack of nested rule chains: (caller chain, caller node) frames.
    stack: Vec<(RuleChainId, RuleNodeId)>,
    #[serde(skip, default = "empty_callback")]
    callback: Arc<dyn MsgCallback>,
}

impl TbMsg {
    pub fn new(
        queue_name: &str,
        msg_type: &str,
        originator: EntityId,
        metadata: BTreeMap<String, String>,
        data: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id: None,
            partition: None,
            queue_name: queue_name.to_owned(),
            msg_type: msg_type.to_owned(),
            originator,
            metadata,
            data: data.to_owned(),
            rule_chain_id: None,
            rule_node_id: None,
            ts: crate::now_millis(),
            stack: Vec::new(),
            callback: empty_callback(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }

    pub fn partition(&self) -> Option<i32> {
        self.partition
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    pub fn originator(&self) -> EntityId {
        self.originator
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn rule_chain_id(&self) -> Option<RuleChainId> {
        self.rule_chain_id
    }

    pub fn rule_node_id(&self) -> Option<RuleNodeId> {
        self.rule_node_id
    }

    pub fn ts(&self) -> i64 {
        self.ts
    }

    pub fn callback(&self) -> Arc<dyn MsgCallback> {
        self.callback.clone()
    }

    /// Copy of this message stamped for one sibling of a fan-out group.
    pub fn for_partition(
        &self,
        id: Uuid,
        correlation_id: Uuid,
        partition: Option<i32>,
    ) -> Self {
        Self {
            id,
            correlation_id: Some(correlation_id),
            partition,
            ..self.clone()
        }
    }

    pub fn with_callback(self, callback: Arc<dyn MsgCallback>) -> Self {
        Self { callback, ..self }
    }

    pub fn with_queue_name(self, queue_name: &str) -> Self {
        Self {
            queue_name: queue_name.to_owned(),
            ..self
        }
    }

    /// Points the message at a rule chain (and optionally the node to resume from).
    pub fn with_rule_chain(
        self,
        rule_chain_id: RuleChainId,
        rule_node_id: Option<RuleNodeId>,
    ) -> Self {
        Self {
            rule_chain_id: Some(rule_chain_id),
            rule_node_id,
            ..self
        }
    }

    pub fn with_data(self, data: &str) -> Self {
        Self {
            data: data.to_owned(),
            ..self
        }
    }

    /// Records the caller before the message enters a nested rule chain.
    pub fn push_to_stack(&mut self, rule_chain_id: RuleChainId, rule_node_id: RuleNodeId) {
        self.stack.push((rule_chain_id, rule_node_id));
    }

    /// Removes and returns the innermost caller frame.
    pub fn pop_from_stack(&mut self) -> Option<(RuleChainId, RuleNodeId)> {
        self.stack.pop()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Completes the message successfully.
    pub fn ack(&self) {
        debug!("Message {} processed.", self.id);
        self.callback.on_success();
    }

    /// Completes the message with a failure.
    pub fn fail(&self, error: MsgError) {
        debug!("Message {} failed: {}", self.id, error);
        self.callback.on_failure(error);
    }
}

impl fmt::Debug for TbMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TbMsg")
            .field("id", &self.id)
            .field("correlation_id", &self.correlation_id)
            .field("partition", &self.partition)
            .field("queue_name", &self.queue_name)
            .field("msg_type", &self.msg_type)
            .field("originator", &self.originator)
            .field("rule_chain_id", &self.rule_chain_id)
            .field("rule_node_id", &self.rule_node_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityType;

    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        successes: AtomicUsize,
        failures: Mutex<Vec<MsgError>>,
    }

    impl MsgCallback for RecordingCallback {
        fn on_success(&self) {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_failure(&self, error: MsgError) {
            self.failures.lock().unwrap().push(error);
        }
    }

    #[test]
    fn test_multiple_callback_completes_after_all_successes() {
        let inner = Arc::new(RecordingCallback::default());
        let wrapper = MultipleMsgCallback::new(3, inner.clone());
        wrapper.on_success();
        wrapper.on_success();
        assert_eq!(inner.successes.load(Ordering::SeqCst), 0);
        wrapper.on_success();
        assert_eq!(inner.successes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_multiple_callback_fails_once() {
        let inner = Arc::new(RecordingCallback::default());
        let wrapper = MultipleMsgCallback::new(2, inner.clone());
        wrapper.on_failure(MsgError::Processing("boom".to_owned()));
        wrapper.on_success();
        wrapper.on_failure(MsgError::ActorStopped);
        assert_eq!(inner.successes.load(Ordering::SeqCst), 0);
        assert_eq!(inner.failures.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_callback_is_not_serialized() {
        let inner = Arc::new(RecordingCallback::default());
        let msg = TbMsg::new(
            "Main",
            msg_type::POST_TELEMETRY_REQUEST,
            EntityId::random(EntityType::Device),
            BTreeMap::new(),
            "{\"temperature\":42}",
        )
        .with_callback(inner.clone());

        let bytes = bincode::serialize(&msg).unwrap();
        let decoded: TbMsg = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.id(), msg.id());
        assert_eq!(decoded.data(), msg.data());
        decoded.ack();
        assert_eq!(inner.successes.load(Ordering::SeqCst), 0);
    }
}
