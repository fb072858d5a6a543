//! Responder workers: outbound reply → transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::models::queue::QueueMessageOut;
use crate::queue::DurableQueue;
use crate::transport::Transport;
use crate::Result;

use super::{run_worker, WorkerSettings};

/// One responder stage; clone it per worker.
#[derive(Clone)]
pub struct ResponderWorker {
    outbound: DurableQueue<QueueMessageOut>,
    transport: Arc<dyn Transport>,
    pop_timeout: Duration,
}

impl ResponderWorker {
    /// Build the stage.
    #[must_use]
    pub fn new(
        outbound: DurableQueue<QueueMessageOut>,
        transport: Arc<dyn Transport>,
        pop_timeout: Duration,
    ) -> Self {
        Self {
            outbound,
            transport,
            pop_timeout,
        }
    }

    /// Deliver at most one reply. The item is committed only after the
    /// transport accepted it.
    ///
    /// # Errors
    ///
    /// Returns the transport or queue error; the item stays leased.
    pub async fn process_one(&self) -> Result<bool> {
        let Some(delivery) = self.outbound.pop(self.pop_timeout).await? else {
            return Ok(false);
        };
        self.transport.deliver(&delivery.payload).await?;
        self.outbound.commit(&delivery).await?;
        debug!(
            seq = delivery.seq,
            recipient_id = %delivery.payload.recipient_id,
            "reply delivered"
        );
        Ok(true)
    }
}

/// Spawn `count` responder workers sharing one stage.
#[must_use]
pub fn spawn_responder_workers(
    count: usize,
    stage: &ResponderWorker,
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
                .instrument(info_span!("responder", worker)),
            )
        })
        .collect()
}
