//! Executor workers: inbound message → interpreter → outbound reply.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, Instrument};

use crate::interpreter::collaborator::Fallback;
use crate::interpreter::{Interpreter, OutcomeKind};
use crate::models::queue::{QueueMessageIn, QueueMessageOut};
use crate::queue::DurableQueue;
use crate::{AppError, Result};

use super::{run_worker, WorkerSettings};

/// One executor stage; clone it per worker.
#[derive(Clone)]
pub struct ExecutorWorker {
    inbound: DurableQueue<QueueMessageIn>,
    outbound: DurableQueue<QueueMessageOut>,
    interpreter: Interpreter,
    fallback: Arc<dyn Fallback>,
    pop_timeout: std::time::Duration,
}

impl ExecutorWorker {
    /// Build the stage.
    #[must_use]
    pub fn new(
        inbound: DurableQueue<QueueMessageIn>,
        outbound: DurableQueue<QueueMessageOut>,
        interpreter: Interpreter,
        fallback: Arc<dyn Fallback>,
        pop_timeout: std::time::Duration,
    ) -> Self {
        Self {
            inbound,
            outbound,
            interpreter,
            fallback,
            pop_timeout,
        }
    }

    /// Process at most one inbound item. Resolves to `false` when the queue
    /// stayed empty for the pop timeout.
    ///
    /// The item is committed only after its reply is on the outbound queue;
    /// any error leaves it leased so it is redelivered after the
    /// visibility timeout.
    ///
    /// # Errors
    ///
    /// Returns the interpreter, fallback or queue error that stopped the item.
    pub async fn process_one(&self) -> Result<bool> {
        let Some(delivery) = self.inbound.pop(self.pop_timeout).await? else {
            return Ok(false);
        };
        let message = &delivery.payload;
        let span = info_span!(
            "message",
            seq = delivery.seq,
            attempts = delivery.attempts,
            user_id = %message.sender_id
        );

        async {
            // Redelivered copies carry the original receive time and land
            // inside the repeated-message window.
            let outcome = self
                .interpreter
                .handle_at(&message.sender_id, &message.text, message.received_at)
                .await?;

            let reply = if outcome.kind == OutcomeKind::LowConfidence {
                self.fallback
                    .understand(&message.sender_id, &message.text)
                    .await?
            } else {
                outcome.reply
            };

            if let Some(text) = reply {
                self.outbound
                    .push(&QueueMessageOut::new(
                        message.sender_id.clone(),
                        text,
                        message.display_name.clone(),
                    ))
                    .await?;
            }

            self.inbound.commit(&delivery).await?;
            Ok::<_, AppError>(true)
        }
        .instrument(span)
        .await
    }
}

/// Spawn `count` executor workers sharing one stage.
#[must_use]
pub fn spawn_executor_workers(
    count: usize,
    stage: &ExecutorWorker,
    settings: WorkerSettings,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker| {
            let stage = stage.clone();
            let cancel = cancel.clone();
            tokio::spawn(
                async move {
                    run_worker(settings, cancel, || stage.process_one()).await;
                }
                .instrument(info_span!("executor", worker)),
            )
        })
        .collect()
}
