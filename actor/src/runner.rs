// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runner
//!
//! Each actor is executed by its own `ActorRunner` task, the single writer of the actor state.
//! The runner walks the lifecycle `Uninitialized → Running → Stopped`:
//!
//! 1. `init` is attempted, retried as the actor's supervision strategy allows. A stop request
//!    received while waiting between attempts ends the actor right away.
//! 2. The mailbox is processed one message at a time, high-priority lane first. Unhandled
//!    message kinds are logged and published as [`SystemEvent::UnhandledMessage`].
//! 3. On stop, children are stopped first, then `destroy` runs, and the messages still queued
//!    fail their callbacks with `ActorStopped`.
//!

use crate::{
    actor::{Actor, ActorContext, ActorLifecycle, ActorRef, StopReason},
    handler::{mailbox, Mailbox},
    sink::SystemEvent,
    supervision::{ProcessFailureStrategy, SupervisionStrategy},
    ActorId, Error, TbActorMsg,
};

use common::MsgError;

use tokio::{
    select,
    sync::{mpsc, oneshot},
};
use tracing::{debug, error, warn};

/// Request to stop an actor, optionally acknowledged once it reached its terminal state.
pub(crate) struct StopCommand {
    reason: StopReason,
    cause: Option<Error>,
    ack: Option<oneshot::Sender<()>>,
}

impl StopCommand {
    pub(crate) fn new(reason: StopReason, cause: Option<Error>) -> Self {
        Self {
            reason,
            cause,
            ack: None,
        }
    }

    pub(crate) fn with_ack(self, ack: oneshot::Sender<()>) -> Self {
        Self {
            ack: Some(ack),
            ..self
        }
    }
}

/// Channel sender for stop commands.
pub(crate) type StopSender = mpsc::Sender<StopCommand>;

/// Channel receiver for stop commands.
pub(crate) type StopReceiver = mpsc::Receiver<StopCommand>;

/// Execution engine of one actor.
pub(crate) struct ActorRunner<A: Actor> {
    id: ActorId,
    actor: A,
    lifecycle: ActorLifecycle,
    mailbox: Mailbox,
    stop_receiver: StopReceiver,
}

impl<A: Actor> ActorRunner<A> {
    /// Creates the runner and the reference used to reach it.
    pub(crate) fn create(id: ActorId, actor: A) -> (Self, ActorRef) {
        debug!("Creating new actor runner for {}.", id);
        let (helper, mailbox) = mailbox();
        let (stop_sender, stop_receiver) = mpsc::channel(100);
        let actor_ref = ActorRef::new(id.clone(), helper, stop_sender);
        let runner = ActorRunner {
            id,
            actor,
            lifecycle: ActorLifecycle::Uninitialized,
            mailbox,
            stop_receiver,
        };
        (runner, actor_ref)
    }

    /// Runs the whole lifecycle of the actor.
    pub(crate) async fn init(&mut self, mut ctx: ActorContext) {
        debug!("Initializing actor {} runner.", self.id);
        let stop = match self.start(&mut ctx).await {
            Ok(()) => {
                self.lifecycle = ActorLifecycle::Running;
                debug!("Actor {} is running.", self.id);
                ctx.system()
                    .publish(SystemEvent::ActorStarted { id: self.id.clone() });
                self.run(&mut ctx).await
            }
            Err(stop) => stop,
        };
        self.terminate(&mut ctx, stop).await;
    }

    async fn start(&mut self, ctx: &mut ActorContext) -> Result<(), StopCommand> {
        let mut strategy = self.actor.supervision_strategy();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.actor.init(ctx).await {
                Ok(()) => return Ok(()),
                Err(error) => error,
            };
            warn!(
                "Actor {} failed to start (attempt {}): {}",
                self.id, attempt, error
            );
            ctx.system().publish(SystemEvent::ActorInitFailed {
                id: self.id.clone(),
                attempt,
                error: error.to_string(),
            });

            let delay = match &mut strategy {
                SupervisionStrategy::Retry(retry) if attempt <= retry.max_retries() => {
                    retry.next_backoff()
                }
                _ => {
                    return Err(StopCommand::new(StopReason::InitFailed, Some(error)));
                }
            };
            if let Some(delay) = delay {
                select! {
                    biased;
                    stop = self.stop_receiver.recv() => {
                        return Err(stop.unwrap_or_else(|| {
                            StopCommand::new(StopReason::Normal, None)
                        }));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    async fn run(&mut self, ctx: &mut ActorContext) -> StopCommand {
        loop {
            select! {
                biased;
                stop = self.stop_receiver.recv() => {
                    return stop.unwrap_or_else(|| StopCommand::new(StopReason::Normal, None));
                }
                msg = self.mailbox.recv() => {
                    match msg {
                        Some(msg) => {
                            if let Some(stop) =
                                Self::process_msg(&self.id, &mut self.actor, msg, ctx).await
                            {
                                return stop;
                            }
                        }
                        None => return StopCommand::new(StopReason::Normal, None),
                    }
                }
            }
        }
    }

    async fn process_msg(
        id: &ActorId,
        actor: &mut A,
        msg: TbActorMsg,
        ctx: &mut ActorContext,
    ) -> Option<StopCommand> {
        let msg_type = msg.msg_type();
        let callback = msg.tb_msg().map(|msg| msg.callback());
        match actor.process(msg, ctx).await {
            Ok(true) => None,
            Ok(false) => {
                warn!("Actor {} received unhandled message {}.", id, msg_type);
                if let Some(callback) = callback {
                    callback.on_failure(MsgError::Processing(format!(
                        "Unhandled message {} in actor {}",
                        msg_type, id
                    )));
                }
                ctx.system().publish(SystemEvent::UnhandledMessage {
                    id: id.clone(),
                    msg_type,
                });
                None
            }
            Err(error) => match actor.on_process_failure(&error) {
                ProcessFailureStrategy::Resume => {
                    warn!(
                        "Actor {} failed to process {} message: {}",
                        id, msg_type, error
                    );
                    None
                }
                ProcessFailureStrategy::Stop => {
                    error!(
                        "Actor {} stopping after {} message failure: {}",
                        id, msg_type, error
                    );
                    Some(StopCommand::new(StopReason::Other, Some(error)))
                }
            },
        }
    }

    async fn terminate(&mut self, ctx: &mut ActorContext, stop: StopCommand) {
        let StopCommand { reason, cause, ack } = stop;
        match reason {
            StopReason::Normal => debug!("Stopping actor {}.", self.id),
            _ => error!(
                "Stopping actor {} ({:?}): {}",
                self.id,
                reason,
                cause
                    .as_ref()
                    .map(|error| error.to_string())
                    .unwrap_or_default()
            ),
        }

        ctx.stop_children().await;
        self.actor.destroy(reason, cause.clone(), ctx).await;

        let pending = self.mailbox.drain();
        if !pending.is_empty() {
            debug!(
                "Actor {} drops {} pending messages.",
                self.id,
                pending.len()
            );
        }
        for msg in pending {
            msg.fail(MsgError::ActorStopped);
        }

        ctx.system().remove_actor(&ctx.myself()).await;
        self.lifecycle = ActorLifecycle::Stopped(reason);
        debug!("Actor {} is {:?}.", self.id, self.lifecycle);
        ctx.system().publish(SystemEvent::ActorStopped {
            id: self.id.clone(),
            reason,
            error: cause.map(|error| error.to_string()),
        });

        if let Some(ack) = ack {
            let _ = ack.send(());
        }
        self.stop_receiver.close();
        while let Ok(StopCommand { ack, .. }) = self.stop_receiver.try_recv() {
            if let Some(ack) = ack {
                let _ = ack.send(());
            }
        }
    }
}
