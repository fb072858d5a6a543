//! Shared builders and collaborator doubles for integration tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use task_intercom::dialogue::machine::{DialogueMachine, MachineSettings};
use task_intercom::dialogue::store::DialogueStore;
use task_intercom::interpreter::collaborator::{ActionExecutor, ExecutionReport};
use task_intercom::interpreter::Interpreter;
use task_intercom::models::command::TaskAction;
use task_intercom::models::dialogue::{DialogueState, Versioned};
use task_intercom::models::queue::QueueMessageOut;
use task_intercom::nlu::analyzer::{Analyzer, AnalyzerSettings};
use task_intercom::queue::QueueSettings;
use task_intercom::transport::Transport;
use task_intercom::{AppError, Result};

/// Short leases so redelivery tests run quickly.
pub fn fast_queue_settings() -> QueueSettings {
    QueueSettings {
        visibility_timeout: Duration::from_millis(50),
        max_deliveries: 2,
        poll_interval: Duration::from_millis(10),
    }
}

pub const POP_TIMEOUT: Duration = Duration::from_millis(20);

/// Sleep past one visibility timeout.
pub async fn let_lease_lapse() {
    tokio::time::sleep(Duration::from_millis(80)).await;
}

pub fn build_interpreter(
    store: Arc<dyn DialogueStore>,
    executor: Arc<dyn ActionExecutor>,
) -> Interpreter {
    let analyzer = Analyzer::new(&AnalyzerSettings::default()).expect("analyzer builds");
    let machine = DialogueMachine::new(Arc::new(analyzer), MachineSettings::default());
    Interpreter::new(Arc::new(machine), store, executor, 5)
}

/// Task store that always errors.
pub struct FailingExecutor;

impl ActionExecutor for FailingExecutor {
    fn execute(
        &self,
        _action: &TaskAction,
        _user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionReport>> + Send + '_>> {
        Box::pin(async { Err(AppError::Collaborator("task store unreachable".into())) })
    }
}

/// Store whose writes always lose the version race.
#[derive(Default)]
pub struct AlwaysConflict;

impl DialogueStore for AlwaysConflict {
    fn load(
        &self,
        _user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Versioned<DialogueState>>> + Send + '_>> {
        Box::pin(async {
            Ok(Versioned {
                value: DialogueState::default(),
                version: 0,
            })
        })
    }

    fn compare_and_swap(
        &self,
        _user_id: &str,
        _expected_version: i64,
        _state: &DialogueState,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(async { Ok(false) })
    }
}

/// Transport that records deliveries, failing the first `failures` calls.
#[derive(Default)]
pub struct RecordingTransport {
    failures: AtomicU32,
    delivered: Mutex<Vec<QueueMessageOut>>,
}

impl RecordingTransport {
    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub async fn delivered(&self) -> Vec<QueueMessageOut> {
        self.delivered.lock().await.clone()
    }
}

impl Transport for RecordingTransport {
    fn deliver(
        &self,
        message: &QueueMessageOut,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let message = message.clone();
        Box::pin(async move {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(AppError::Transport("chat api unavailable".into()));
            }
            self.delivered.lock().await.push(message);
            Ok(())
        })
    }
}
