use std::sync::Arc;

use task_intercom::models::queue::{QueueMessageIn, QueueName};
use task_intercom::persistence::db;
use task_intercom::pipeline::receiver::Receiver;
use task_intercom::queue::DurableQueue;
use task_intercom::AppError;

use super::test_helpers::{fast_queue_settings, POP_TIMEOUT};

async fn receiver(max_chars: usize) -> (Receiver, DurableQueue<QueueMessageIn>) {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let inbound = DurableQueue::new(db, QueueName::Inbound, fast_queue_settings());
    (Receiver::new(inbound.clone(), max_chars), inbound)
}

fn message(sender: &str, text: &str) -> QueueMessageIn {
    QueueMessageIn::new(sender.to_owned(), text.to_owned(), sender.to_owned())
}

#[tokio::test]
async fn accepted_message_is_queued_intact() {
    let (receiver, inbound) = receiver(2000).await;
    let seq = receiver
        .accept(message("U1", "Feito 1, 3 e 5!!!"))
        .await
        .expect("accept");

    let delivery = inbound
        .pop(POP_TIMEOUT)
        .await
        .expect("pop")
        .expect("queued");
    assert_eq!(delivery.seq, seq);
    assert_eq!(delivery.attempts, 1);
    assert_eq!(delivery.payload.text, "Feito 1, 3 e 5!!!");
}

#[tokio::test]
async fn blank_sender_is_rejected() {
    let (receiver, inbound) = receiver(2000).await;
    let err = receiver
        .accept(message("  ", "listar"))
        .await
        .expect_err("blank sender");
    assert!(matches!(err, AppError::Validation(ref m) if m.contains("sender_id")));
    assert_eq!(inbound.depth().await.expect("depth").ready, 0);
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let (receiver, _) = receiver(2000).await;
    let err = receiver
        .accept(message("U1", " \n "))
        .await
        .expect_err("blank text");
    assert!(matches!(err, AppError::Validation(ref m) if m.contains("text")));
}

#[tokio::test]
async fn length_bound_counts_characters() {
    let (receiver, inbound) = receiver(5).await;
    receiver
        .accept(message("U1", "ações"))
        .await
        .expect("five characters fit");

    let err = receiver
        .accept(message("U1", "açõess"))
        .await
        .expect_err("six characters");
    assert!(matches!(err, AppError::Validation(ref m) if m.contains("maximum is 5")));
    assert_eq!(inbound.depth().await.expect("depth").ready, 1);
}
