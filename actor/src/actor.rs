// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor
//!
//! The `actor` module provides the [`Actor`] trait implemented by every rule-engine component,
//! the [`ActorContext`] handed to it while it runs, and the [`ActorRef`] other components use to
//! reach it.
//!

use crate::{
    handler::HandleHelper,
    runner::{StopCommand, StopSender},
    supervision::{ProcessFailureStrategy, SupervisionStrategy},
    system::SystemRef,
    ActorId, Error, TbActorMsg,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use tracing::debug;

use std::{fmt, time::Duration};

/// Why an actor stopped. Recorded once, when the actor reaches its terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason {
    /// Deletion, partition loss, parent teardown or system shutdown.
    Normal,
    /// `init` failed and the supervision strategy gave up.
    InitFailed,
    /// Stopped after a processing failure.
    Other,
}

/// Lifecycle state of an actor instance. Each state is entered at most once; `Stopped` is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorLifecycle {
    Uninitialized,
    Running,
    Stopped(StopReason),
}

/// A rule-engine component executed by the actor system.
///
/// The runner calls `init` once (retrying as allowed by [`Actor::supervision_strategy`]), then
/// feeds the mailbox to `process` one message at a time, and finally calls `destroy` exactly
/// once, whatever the stop reason.
///
/// # Examples
///
/// ```ignore
/// #[async_trait]
/// impl Actor for CounterActor {
///     async fn process(
///         &mut self,
///         msg: TbActorMsg,
///         _ctx: &mut ActorContext,
///     ) -> Result<bool, Error> {
///         match msg {
///             TbActorMsg::StatsPersistTick => {
///                 self.ticks += 1;
///                 Ok(true)
///             }
///             _ => Ok(false),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Actor: Send + Sync + Sized + 'static {
    /// Strategy applied when `init` fails.
    fn supervision_strategy(&self) -> SupervisionStrategy {
        SupervisionStrategy::Stop
    }

    /// Sets the actor up before its mailbox is processed.
    async fn init(&mut self, _ctx: &mut ActorContext) -> Result<(), Error> {
        Ok(())
    }

    /// Applies one message.
    ///
    /// # Returns
    ///
    /// `Ok(true)` when the message kind is handled by this actor, `Ok(false)` when it is not. The
    /// runner reports unhandled messages instead of dropping them silently.
    ///
    async fn process(
        &mut self,
        msg: TbActorMsg,
        ctx: &mut ActorContext,
    ) -> Result<bool, Error>;

    /// Strategy applied when `process` returns an error.
    fn on_process_failure(&self, _error: &Error) -> ProcessFailureStrategy {
        ProcessFailureStrategy::Resume
    }

    /// Releases the actor's resources. Called after its children have stopped.
    async fn destroy(
        &mut self,
        _reason: StopReason,
        _cause: Option<Error>,
        _ctx: &mut ActorContext,
    ) {
    }
}

/// Reference used to send messages to an actor and to stop it.
#[derive(Clone)]
pub struct ActorRef {
    id: ActorId,
    sender: HandleHelper,
    stop_sender: StopSender,
}

impl ActorRef {
    pub(crate) fn new(
        id: ActorId,
        sender: HandleHelper,
        stop_sender: StopSender,
    ) -> Self {
        Self {
            id,
            sender,
            stop_sender,
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Queues a message; control messages take the high-priority lane.
    ///
    /// # Errors
    ///
    /// Returns `Error::Send` when the actor has stopped. The carried message callback is failed.
    ///
    pub fn tell(&self, msg: TbActorMsg) -> Result<(), Error> {
        self.sender.tell(msg, false)
    }

    /// Queues a message on the high-priority lane.
    pub fn tell_with_high_priority(&self, msg: TbActorMsg) -> Result<(), Error> {
        self.sender.tell(msg, true)
    }

    /// Stops the actor and waits until it reached its terminal state. Stopping an actor that is
    /// already gone is not an error.
    pub async fn stop(&self, reason: StopReason) -> Result<(), Error> {
        debug!("Stopping actor {} ({:?}).", self.id, reason);
        let (ack_sender, ack_receiver) = oneshot::channel();
        let command = StopCommand::new(reason, None).with_ack(ack_sender);
        if self.stop_sender.send(command).await.is_err() {
            return Ok(());
        }
        let _ = ack_receiver.await;
        Ok(())
    }

    /// Requests the actor to stop without waiting.
    pub(crate) fn request_stop(&self, reason: StopReason, cause: Option<Error>) {
        if let Err(error) = self.stop_sender.try_send(StopCommand::new(reason, cause)) {
            debug!("Stop request to {} not delivered: {}", self.id, error);
        }
    }

    /// Whether both references point to the same actor instance.
    pub fn same_instance(&self, other: &ActorRef) -> bool {
        self.stop_sender.same_channel(&other.stop_sender)
    }

    /// True once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef").field("id", &self.id).finish()
    }
}

/// Execution context of an actor.
///
/// Gives the actor its identity, its parent and the system, and lets it create and stop
/// children. Children are tracked by the system registry, so stopping an actor stops its whole
/// subtree first.
pub struct ActorContext {
    myself: ActorRef,
    parent: Option<ActorRef>,
    system: SystemRef,
}

impl ActorContext {
    pub(crate) fn new(
        myself: ActorRef,
        parent: Option<ActorRef>,
        system: SystemRef,
    ) -> Self {
        Self {
            myself,
            parent,
            system,
        }
    }

    pub fn id(&self) -> &ActorId {
        self.myself.id()
    }

    /// Reference to this actor.
    pub fn myself(&self) -> ActorRef {
        self.myself.clone()
    }

    pub fn parent(&self) -> Option<&ActorRef> {
        self.parent.as_ref()
    }

    pub fn system(&self) -> &SystemRef {
        &self.system
    }

    /// Sends a message to the parent actor.
    pub fn tell_parent(&self, msg: TbActorMsg) -> Result<(), Error> {
        match &self.parent {
            Some(parent) => parent.tell(msg),
            None => {
                msg.fail(common::MsgError::ActorStopped);
                Err(Error::NotFound(ActorId::named("parent")))
            }
        }
    }

    /// Returns the child registered under `id`, creating it with `creator` when absent.
    pub async fn get_or_create_child<A, F>(
        &self,
        id: ActorId,
        creator: F,
    ) -> Result<ActorRef, Error>
    where
        A: Actor,
        F: FnOnce() -> A,
    {
        self.system
            .get_or_create_actor(Some(&self.myself), id, creator)
            .await
    }

    /// A running child of this actor.
    pub async fn get_child(&self, id: &ActorId) -> Option<ActorRef> {
        self.system
            .children(self.id())
            .await
            .into_iter()
            .find(|child| child.id() == id)
    }

    pub async fn children(&self) -> Vec<ActorRef> {
        self.system.children(self.id()).await
    }

    /// Sends a copy of `msg` to every child.
    pub async fn broadcast_to_children(&self, msg: TbActorMsg, high_priority: bool) {
        for child in self.children().await {
            let result = if high_priority {
                child.tell_with_high_priority(msg.clone())
            } else {
                child.tell(msg.clone())
            };
            if let Err(error) = result {
                debug!("Broadcast to {} failed: {}", child.id(), error);
            }
        }
    }

    /// Stops a child (and its subtree) and waits for it.
    pub async fn stop_child(&self, id: &ActorId, reason: StopReason) -> Result<(), Error> {
        match self.get_child(id).await {
            Some(child) => child.stop(reason).await,
            None => Err(Error::NotFound(id.clone())),
        }
    }

    /// Stops every child and waits for them.
    pub(crate) async fn stop_children(&self) {
        for child in self.children().await {
            let _ = child.stop(StopReason::Normal).await;
        }
    }

    /// Asks the runner to stop this actor once the current message is done.
    pub fn stop(&self, reason: StopReason, cause: Option<Error>) {
        self.myself.request_stop(reason, cause);
    }

    /// Tells `msg` to this actor after `delay`.
    pub fn schedule_to_self(&self, msg: TbActorMsg, delay: Duration) {
        self.system.schedule_once(self.myself(), msg, delay);
    }
}
