// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor mailbox
//!
//! Every actor owns two unbounded lanes. Control messages (lifecycle, partition changes) go to
//! the high-priority lane and are always taken before queued data messages.
//!

use crate::{Error, TbActorMsg};

use common::MsgError;

use tokio::{select, sync::mpsc};
use tracing::debug;

/// Mailbox sender side of one lane.
pub type MailboxSender = mpsc::UnboundedSender<TbActorMsg>;

/// Mailbox receiver side of one lane.
pub type MailboxReceiver = mpsc::UnboundedReceiver<TbActorMsg>;

/// Receiving end of an actor mailbox, owned by the runner.
pub(crate) struct Mailbox {
    high_priority: MailboxReceiver,
    normal: MailboxReceiver,
}

impl Mailbox {
    /// Next message, high-priority lane first. `None` once both lanes are closed and empty.
    pub(crate) async fn recv(&mut self) -> Option<TbActorMsg> {
        select! {
            biased;
            Some(msg) = self.high_priority.recv() => Some(msg),
            Some(msg) = self.normal.recv() => Some(msg),
            else => None,
        }
    }

    /// Closes both lanes and returns whatever was still queued.
    pub(crate) fn drain(&mut self) -> Vec<TbActorMsg> {
        self.high_priority.close();
        self.normal.close();
        let mut pending = vec![];
        while let Ok(msg) = self.high_priority.try_recv() {
            pending.push(msg);
        }
        while let Ok(msg) = self.normal.try_recv() {
            pending.push(msg);
        }
        pending
    }
}

/// Creates a new mailbox and the helper used to feed it.
pub(crate) fn mailbox() -> (HandleHelper, Mailbox) {
    let (high_sender, high_receiver) = mpsc::unbounded_channel();
    let (normal_sender, normal_receiver) = mpsc::unbounded_channel();
    (
        HandleHelper {
            high_priority: high_sender,
            normal: normal_sender,
        },
        Mailbox {
            high_priority: high_receiver,
            normal: normal_receiver,
        },
    )
}

/// Handle helper for sending messages to an actor.
#[derive(Clone)]
pub struct HandleHelper {
    high_priority: MailboxSender,
    normal: MailboxSender,
}

impl HandleHelper {
    /// Queues a message on the lane chosen by its priority, or by `force_high_priority`.
    ///
    /// # Errors
    ///
    /// Returns Error::Send if the actor's mailbox is closed. The callback of the carried
    /// rule-engine message is failed in that case.
    ///
    pub(crate) fn tell(
        &self,
        message: TbActorMsg,
        force_high_priority: bool,
    ) -> Result<(), Error> {
        let sender = if force_high_priority || message.is_high_priority() {
            &self.high_priority
        } else {
            &self.normal
        };
        sender.send(message).map_err(|error| {
            debug!("Failed to tell message! {}", error);
            error.0.fail(MsgError::ActorStopped);
            Error::Send(error.to_string())
        })
    }

    /// Checks if the mailbox is closed.
    pub fn is_closed(&self) -> bool {
        self.normal.is_closed()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::msg::PartitionChangeMsg;

    use common::ServiceType;

    #[tokio::test]
    async fn test_high_priority_lane_first() {
        let (helper, mut mailbox) = mailbox();
        helper.tell(TbActorMsg::StatsPersistTick, false).unwrap();
        helper
            .tell(
                TbActorMsg::PartitionChange(PartitionChangeMsg {
                    service_type: ServiceType::RuleEngine,
                    partitions: vec![],
                }),
                false,
            )
            .unwrap();

        let first = mailbox.recv().await.unwrap();
        assert!(matches!(first, TbActorMsg::PartitionChange(_)));
        let second = mailbox.recv().await.unwrap();
        assert!(matches!(second, TbActorMsg::StatsPersistTick));
    }

    #[tokio::test]
    async fn test_drain_closes_mailbox() {
        let (helper, mut mailbox) = mailbox();
        helper.tell(TbActorMsg::StatsPersistTick, false).unwrap();
        helper.tell(TbActorMsg::StatsPersistTick, true).unwrap();
        let pending = mailbox.drain();
        assert_eq!(pending.len(), 2);
        assert!(helper.is_closed());
        assert!(helper.tell(TbActorMsg::StatsPersistTick, false).is_err());
    }
}
