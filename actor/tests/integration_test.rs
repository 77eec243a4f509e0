// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

// Integrations tests for the actor module

use actor::{
    Actor, ActorContext, ActorId, ActorSystem, Error, NoIntervalStrategy,
    QueueToRuleEngineMsg, StopReason, SupervisionStrategy, SystemEvent, TbActorMsg,
};
use async_trait::async_trait;
use common::{
    msg_type, EntityId, EntityType, MsgCallback, MsgError, QueueName, TbMsg, TenantId,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

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

fn queue_msg(data: &str, callback: Arc<dyn MsgCallback>) -> TbActorMsg {
    let msg = TbMsg::new(
        QueueName::MAIN,
        msg_type::POST_TELEMETRY_REQUEST,
        EntityId::random(EntityType::Device),
        BTreeMap::new(),
        data,
    )
    .with_callback(callback);
    TbActorMsg::QueueToRuleEngine(QueueToRuleEngineMsg {
        tenant_id: TenantId::random(),
        msg,
    })
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

async fn next_stopped(
    events: &mut broadcast::Receiver<SystemEvent>,
    id: &ActorId,
) -> SystemEvent {
    loop {
        let event = events.recv().await.unwrap();
        if let SystemEvent::ActorStopped { id: stopped, .. } = &event {
            if stopped == id {
                return event;
            }
        }
    }
}

// Records the data of every queue message, in processing order.
struct ChainStateActor {
    applied: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Actor for ChainStateActor {
    async fn process(
        &mut self,
        msg: TbActorMsg,
        _ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        match msg {
            TbActorMsg::QueueToRuleEngine(inner) => {
                tokio::task::yield_now().await;
                self.applied.lock().unwrap().push(inner.msg.data().to_owned());
                inner.msg.ack();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[tokio::test]
async fn test_messages_applied_in_delivery_order() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let applied = Arc::new(Mutex::new(vec![]));
    let actor = system
        .create_root_actor(
            ActorId::named("chain"),
            ChainStateActor {
                applied: applied.clone(),
            },
        )
        .await
        .unwrap();

    let callback = Arc::new(RecordingCallback::default());
    for i in 0..100 {
        actor.tell(queue_msg(&i.to_string(), callback.clone())).unwrap();
    }

    wait_for(|| applied.lock().unwrap().len() == 100).await;
    let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
    assert_eq!(*applied.lock().unwrap(), expected);
    assert_eq!(callback.successes.load(Ordering::SeqCst), 100);
}

#[tokio::test]
#[traced_test]
async fn test_unhandled_message_is_reported() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let mut events = system.subscribe();
    let actor = system
        .create_root_actor(
            ActorId::named("chain"),
            ChainStateActor {
                applied: Arc::new(Mutex::new(vec![])),
            },
        )
        .await
        .unwrap();

    actor.tell(TbActorMsg::StatsPersistTick).unwrap();
    loop {
        if let SystemEvent::UnhandledMessage { id, msg_type } = events.recv().await.unwrap() {
            assert_eq!(id, ActorId::named("chain"));
            assert_eq!(msg_type, actor::MsgType::StatsPersistTick);
            break;
        }
    }
    assert!(logs_contain("received unhandled message StatsPersistTick"));
}

// Fails `init` a number of times before succeeding.
struct FlakyActor {
    failures_left: usize,
    attempts: Arc<AtomicUsize>,
    retries: Option<usize>,
    destroyed: Arc<Mutex<Vec<(StopReason, Option<Error>)>>>,
}

#[async_trait]
impl Actor for FlakyActor {
    fn supervision_strategy(&self) -> SupervisionStrategy {
        match self.retries {
            Some(retries) => {
                SupervisionStrategy::Retry(Box::new(NoIntervalStrategy::new(retries)))
            }
            None => SupervisionStrategy::Stop,
        }
    }

    async fn init(&mut self, _ctx: &mut ActorContext) -> Result<(), Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(Error::Init("rule chain not found".to_owned()));
        }
        Ok(())
    }

    async fn process(
        &mut self,
        msg: TbActorMsg,
        _ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        if let Some(msg) = msg.tb_msg() {
            msg.ack();
        }
        Ok(true)
    }

    async fn destroy(
        &mut self,
        reason: StopReason,
        cause: Option<Error>,
        _ctx: &mut ActorContext,
    ) {
        self.destroyed.lock().unwrap().push((reason, cause));
    }
}

#[tokio::test]
async fn test_init_retried_until_success() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let mut events = system.subscribe();
    let attempts = Arc::new(AtomicUsize::new(0));
    let actor = system
        .create_root_actor(
            ActorId::named("flaky"),
            FlakyActor {
                failures_left: 2,
                attempts: attempts.clone(),
                retries: Some(3),
                destroyed: Arc::new(Mutex::new(vec![])),
            },
        )
        .await
        .unwrap();

    loop {
        if let SystemEvent::ActorStarted { id } = events.recv().await.unwrap() {
            assert_eq!(id, ActorId::named("flaky"));
            break;
        }
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let callback = Arc::new(RecordingCallback::default());
    actor.tell(queue_msg("after start", callback.clone())).unwrap();
    wait_for(|| callback.successes.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn test_init_failure_stops_actor_and_fails_pending() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let mut events = system.subscribe();
    let destroyed = Arc::new(Mutex::new(vec![]));
    let id = ActorId::named("broken");
    let callback = Arc::new(RecordingCallback::default());

    // Queued before the runner gets to init.
    let actor = system
        .create_root_actor(
            id.clone(),
            FlakyActor {
                failures_left: 10,
                attempts: Arc::new(AtomicUsize::new(0)),
                retries: None,
                destroyed: destroyed.clone(),
            },
        )
        .await
        .unwrap();
    let _ = actor.tell(queue_msg("pending", callback.clone()));

    let event = next_stopped(&mut events, &id).await;
    assert_eq!(
        event,
        SystemEvent::ActorStopped {
            id: id.clone(),
            reason: StopReason::InitFailed,
            error: Some("Initialization failed: rule chain not found".to_owned()),
        }
    );
    assert_eq!(
        *destroyed.lock().unwrap(),
        vec![(
            StopReason::InitFailed,
            Some(Error::Init("rule chain not found".to_owned()))
        )]
    );
    assert_eq!(
        *callback.failures.lock().unwrap(),
        vec![MsgError::ActorStopped]
    );
    assert!(system.get_actor(&id).await.is_none());

    // Late messages fail right away.
    let late = Arc::new(RecordingCallback::default());
    assert!(actor.tell(queue_msg("late", late.clone())).is_err());
    assert_eq!(*late.failures.lock().unwrap(), vec![MsgError::ActorStopped]);
}

// Creates one child on init and records destroy order.
struct TreeActor {
    name: &'static str,
    child: Option<&'static str>,
    destroyed: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Actor for TreeActor {
    async fn init(&mut self, ctx: &mut ActorContext) -> Result<(), Error> {
        if let Some(child) = self.child {
            let destroyed = self.destroyed.clone();
            ctx.get_or_create_child(ActorId::named(child), || TreeActor {
                name: child,
                child: None,
                destroyed,
            })
            .await?;
        }
        Ok(())
    }

    async fn process(
        &mut self,
        _msg: TbActorMsg,
        _ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        Ok(true)
    }

    async fn destroy(
        &mut self,
        _reason: StopReason,
        _cause: Option<Error>,
        _ctx: &mut ActorContext,
    ) {
        self.destroyed.lock().unwrap().push(self.name);
    }
}

#[tokio::test]
async fn test_stop_tears_down_children_first() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let destroyed = Arc::new(Mutex::new(vec![]));
    let parent = system
        .create_root_actor(
            ActorId::named("tenant"),
            TreeActor {
                name: "tenant",
                child: Some("chain"),
                destroyed: destroyed.clone(),
            },
        )
        .await
        .unwrap();

    let system_clone = system.clone();
    for _ in 0..200 {
        if system_clone.get_actor(&ActorId::named("chain")).await.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(system.children(&ActorId::named("tenant")).await.len(), 1);

    parent.stop(StopReason::Normal).await.unwrap();
    assert_eq!(*destroyed.lock().unwrap(), vec!["chain", "tenant"]);
    assert!(system.get_actor(&ActorId::named("chain")).await.is_none());
    assert!(system.get_actor(&ActorId::named("tenant")).await.is_none());
}

// Counts stats ticks.
struct TickActor {
    ticks: Arc<AtomicUsize>,
}

#[async_trait]
impl Actor for TickActor {
    async fn process(
        &mut self,
        msg: TbActorMsg,
        _ctx: &mut ActorContext,
    ) -> Result<bool, Error> {
        match msg {
            TbActorMsg::StatsPersistTick => {
                self.ticks.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[tokio::test]
async fn test_periodic_schedule() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let ticks = Arc::new(AtomicUsize::new(0));
    let actor = system
        .create_root_actor(
            ActorId::named("ticker"),
            TickActor {
                ticks: ticks.clone(),
            },
        )
        .await
        .unwrap();

    let job = system.schedule_periodically(actor, Duration::from_millis(10), || {
        TbActorMsg::StatsPersistTick
    });
    wait_for(|| ticks.load(Ordering::SeqCst) >= 3).await;
    job.cancel();
}

#[tokio::test]
#[traced_test]
async fn test_zero_period_schedule_still_ticks() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let ticks = Arc::new(AtomicUsize::new(0));
    let actor = system
        .create_root_actor(
            ActorId::named("zero-ticker"),
            TickActor {
                ticks: ticks.clone(),
            },
        )
        .await
        .unwrap();

    let job = system.schedule_periodically(actor, Duration::ZERO, || {
        TbActorMsg::StatsPersistTick
    });
    wait_for(|| ticks.load(Ordering::SeqCst) >= 3).await;
    assert!(logs_contain("is too short"));
    job.cancel();
}
