//! Receiver → executor → responder over the durable `SQLite` queues.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use task_intercom::dialogue::machine::DUPLICATE_REPLY;
use task_intercom::dialogue::store::MemoryDialogueStore;
use task_intercom::interpreter::collaborator::{ActionExecutor, StaticFallback};
use task_intercom::models::command::TaskAction;
use task_intercom::models::queue::{QueueMessageIn, QueueMessageOut, QueueName};
use task_intercom::persistence::db::{self, Database};
use task_intercom::persistence::queue_repo::QueueRepo;
use task_intercom::pipeline::executor::{spawn_executor_workers, ExecutorWorker};
use task_intercom::pipeline::receiver::Receiver;
use task_intercom::pipeline::responder::{spawn_responder_workers, ResponderWorker};
use task_intercom::pipeline::WorkerSettings;
use task_intercom::queue::DurableQueue;
use task_intercom::tasks::memory::MemoryTaskStore;

use super::test_helpers::{
    build_interpreter, fast_queue_settings, let_lease_lapse, AlwaysConflict, RecordingTransport,
    POP_TIMEOUT,
};

const FALLBACK: &str = "Não entendi. Diga \"ajuda\" para ver o que eu sei fazer.";

struct Pipeline {
    db: Arc<Database>,
    receiver: Receiver,
    inbound: DurableQueue<QueueMessageIn>,
    outbound: DurableQueue<QueueMessageOut>,
    executor: ExecutorWorker,
}

async fn pipeline() -> Pipeline {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let inbound = DurableQueue::new(Arc::clone(&db), QueueName::Inbound, fast_queue_settings());
    let outbound = DurableQueue::new(Arc::clone(&db), QueueName::Outbound, fast_queue_settings());
    let interpreter = build_interpreter(
        Arc::new(MemoryDialogueStore::new()),
        Arc::new(MemoryTaskStore::new()),
    );
    let executor = ExecutorWorker::new(
        inbound.clone(),
        outbound.clone(),
        interpreter,
        Arc::new(StaticFallback::new(FALLBACK)),
        POP_TIMEOUT,
    );
    Pipeline {
        db,
        receiver: Receiver::new(inbound.clone(), 2000),
        inbound,
        outbound,
        executor,
    }
}

fn message(user: &str, text: &str) -> QueueMessageIn {
    QueueMessageIn::new(user.to_owned(), text.to_owned(), format!("{user} name"))
}

#[tokio::test]
async fn message_flows_through_every_stage() {
    let p = pipeline().await;
    let transport = Arc::new(RecordingTransport::default());
    let responder = ResponderWorker::new(p.outbound.clone(), transport.clone(), POP_TIMEOUT);

    p.receiver.accept(message("U1", "listar")).await.expect("accept");
    assert!(p.executor.process_one().await.expect("execute"));
    assert!(responder.process_one().await.expect("respond"));

    let delivered = transport.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].recipient_id, "U1");
    assert_eq!(delivered[0].display_name, "U1 name");
    assert_eq!(delivered[0].text, "Você não tem tarefas.");

    assert_eq!(p.inbound.depth().await.expect("depth").ready, 0);
    assert_eq!(p.outbound.depth().await.expect("depth").ready, 0);
}

#[tokio::test]
async fn unrecognized_message_gets_fallback_reply() {
    let p = pipeline().await;
    p.receiver
        .accept(message("U1", "previsão do tempo"))
        .await
        .expect("accept");
    assert!(p.executor.process_one().await.expect("execute"));

    let reply = p
        .outbound
        .pop(POP_TIMEOUT)
        .await
        .expect("pop")
        .expect("reply queued");
    assert_eq!(reply.payload.text, FALLBACK);
}

#[tokio::test]
async fn empty_queues_report_idle() {
    let p = pipeline().await;
    let responder = ResponderWorker::new(
        p.outbound.clone(),
        Arc::new(RecordingTransport::default()),
        POP_TIMEOUT,
    );
    assert!(!p.executor.process_one().await.expect("execute"));
    assert!(!responder.process_one().await.expect("respond"));
}

#[tokio::test]
async fn failed_delivery_is_redelivered() {
    let p = pipeline().await;
    let transport = Arc::new(RecordingTransport::failing_first(1));
    let responder = ResponderWorker::new(p.outbound.clone(), transport.clone(), POP_TIMEOUT);

    p.outbound
        .push(&QueueMessageOut::new("U1".into(), "oi".into(), "U1".into()))
        .await
        .expect("push");

    assert!(responder.process_one().await.is_err());
    assert!(transport.delivered().await.is_empty());
    assert_eq!(p.outbound.depth().await.expect("depth").leased, 1);

    let_lease_lapse().await;
    assert!(responder.process_one().await.expect("redelivery"));
    assert_eq!(transport.delivered().await.len(), 1);
    assert_eq!(p.outbound.depth().await.expect("depth").ready, 0);
}

#[tokio::test]
async fn repeatedly_failing_reply_is_dead_lettered() {
    let p = pipeline().await;
    let transport = Arc::new(RecordingTransport::failing_first(u32::MAX));
    let responder = ResponderWorker::new(p.outbound.clone(), transport, POP_TIMEOUT);

    p.outbound
        .push(&QueueMessageOut::new("U1".into(), "oi".into(), "U1".into()))
        .await
        .expect("push");

    for _ in 0..2 {
        assert!(responder.process_one().await.is_err());
        let_lease_lapse().await;
    }
    assert!(!responder.process_one().await.expect("queue drained"));

    let depth = p.outbound.depth().await.expect("depth");
    assert_eq!((depth.ready, depth.dead), (0, 1));
}

#[tokio::test]
async fn interpreter_error_leaves_message_leased() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let inbound = DurableQueue::new(Arc::clone(&db), QueueName::Inbound, fast_queue_settings());
    let outbound: DurableQueue<QueueMessageOut> =
        DurableQueue::new(Arc::clone(&db), QueueName::Outbound, fast_queue_settings());
    let executor = ExecutorWorker::new(
        inbound.clone(),
        outbound.clone(),
        build_interpreter(Arc::new(AlwaysConflict), Arc::new(MemoryTaskStore::new())),
        Arc::new(StaticFallback::new(FALLBACK)),
        POP_TIMEOUT,
    );

    inbound.push(&message("U1", "listar")).await.expect("push");
    assert!(executor.process_one().await.is_err());

    let depth = inbound.depth().await.expect("depth");
    assert_eq!((depth.ready, depth.leased), (1, 1));
    assert_eq!(outbound.depth().await.expect("depth").ready, 0);
}

#[tokio::test]
async fn undecodable_item_is_dropped() {
    let p = pipeline().await;
    QueueRepo::new(Arc::clone(&p.db))
        .push(QueueName::Inbound, "{\"not\": \"a message\"}")
        .await
        .expect("raw push");
    p.receiver.accept(message("U1", "oi")).await.expect("accept");

    let delivery = p
        .inbound
        .pop(POP_TIMEOUT)
        .await
        .expect("pop")
        .expect("valid item");
    assert_eq!(delivery.payload.text, "oi");
    assert!(p.inbound.commit(&delivery).await.expect("commit"));
    assert_eq!(p.inbound.depth().await.expect("depth").ready, 0);
}

#[tokio::test]
async fn spawned_workers_deliver_until_cancelled() {
    let p = pipeline().await;
    let transport = Arc::new(RecordingTransport::default());
    let responder = ResponderWorker::new(p.outbound.clone(), transport.clone(), POP_TIMEOUT);
    let settings = WorkerSettings {
        pop_timeout: POP_TIMEOUT,
        failure_cooldown_trigger: 3,
        cooldown: Duration::from_millis(50),
    };
    let cancel = CancellationToken::new();

    let mut handles = spawn_executor_workers(2, &p.executor, settings, &cancel);
    handles.extend(spawn_responder_workers(1, &responder, settings, &cancel));

    p.receiver.accept(message("U1", "listar")).await.expect("accept");
    p.receiver.accept(message("U2", "ajuda")).await.expect("accept");

    let mut delivered = Vec::new();
    for _ in 0..200 {
        delivered = transport.delivered().await;
        if delivered.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(delivered.len(), 2);
    let mut recipients: Vec<_> = delivered.iter().map(|m| m.recipient_id.as_str()).collect();
    recipients.sort_unstable();
    assert_eq!(recipients, ["U1", "U2"]);

    cancel.cancel();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker stops")
            .expect("worker joins");
    }
}

#[tokio::test]
async fn redelivery_after_crash_does_not_repeat_side_effects() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let inbound = DurableQueue::new(Arc::clone(&db), QueueName::Inbound, fast_queue_settings());
    let outbound = DurableQueue::new(Arc::clone(&db), QueueName::Outbound, fast_queue_settings());
    let tasks = Arc::new(MemoryTaskStore::new());
    let executor: Arc<dyn ActionExecutor> = tasks.clone();
    let interpreter = build_interpreter(Arc::new(MemoryDialogueStore::new()), executor);

    // Outbound pushes fail on a closed pool, so this worker dispatches and
    // then dies before committing the inbound item.
    let closed = Arc::new(db::connect_memory().await.expect("db connect"));
    closed.close().await;
    let crashing = ExecutorWorker::new(
        inbound.clone(),
        DurableQueue::new(closed, QueueName::Outbound, fast_queue_settings()),
        interpreter.clone(),
        Arc::new(StaticFallback::new(FALLBACK)),
        POP_TIMEOUT,
    );
    let healthy = ExecutorWorker::new(
        inbound.clone(),
        outbound.clone(),
        interpreter,
        Arc::new(StaticFallback::new(FALLBACK)),
        POP_TIMEOUT,
    );

    // Received well before the redelivery, as with a full visibility timeout.
    let mut item = message("U1", "criar comprar pão");
    item.received_at = Utc::now() - chrono::Duration::minutes(5);
    inbound.push(&item).await.expect("push");

    assert!(crashing.process_one().await.is_err());
    assert_eq!(tasks.executed().await.len(), 1);

    let_lease_lapse().await;
    assert!(healthy.process_one().await.expect("redelivery"));

    let executed = tasks.executed().await;
    assert_eq!(executed.len(), 1, "redelivered item ran again: {executed:?}");
    assert!(matches!(executed[0].1, TaskAction::Create { .. }));

    let reply = outbound
        .pop(POP_TIMEOUT)
        .await
        .expect("pop")
        .expect("reply queued");
    assert_eq!(reply.payload.text, DUPLICATE_REPLY);
    assert_eq!(inbound.depth().await.expect("depth").ready, 0);
}
