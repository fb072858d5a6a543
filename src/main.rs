#![forbid(unsafe_code)]

//! `task-intercom`: chat task assistant server binary.
//!
//! Bootstraps configuration and the database, then runs the retention task,
//! the executor and responder worker pools, and the Slack Socket Mode
//! listener until ctrl-c or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use task_intercom::config::GlobalConfig;
use task_intercom::dialogue::machine::DialogueMachine;
use task_intercom::dialogue::store::DialogueStore;
use task_intercom::interpreter::collaborator::{ActionExecutor, StaticFallback};
use task_intercom::interpreter::Interpreter;
use task_intercom::models::queue::{QueueMessageIn, QueueMessageOut, QueueName};
use task_intercom::nlu::analyzer::Analyzer;
use task_intercom::persistence::dialogue_repo::DialogueRepo;
use task_intercom::persistence::{db, retention};
use task_intercom::pipeline::executor::{spawn_executor_workers, ExecutorWorker};
use task_intercom::pipeline::receiver::Receiver;
use task_intercom::pipeline::responder::{spawn_responder_workers, ResponderWorker};
use task_intercom::queue::DurableQueue;
use task_intercom::slack::client::SlackService;
use task_intercom::slack::events::InboundState;
use task_intercom::tasks::http_executor::HttpTaskStore;
use task_intercom::tasks::memory::MemoryTaskStore;
use task_intercom::transport::{LogTransport, Transport};
use task_intercom::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "task-intercom", about = "Chat task assistant server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("task-intercom server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    info!("configuration loaded");

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.database_path).await?);
    info!(path = %config.database_path.display(), "database connected");

    // ── Start retention service ──────────────────────────
    let ct = CancellationToken::new();
    let retention_handle =
        retention::spawn_retention_task(Arc::clone(&db), config.retention_hours, ct.clone());
    info!("retention service started");

    // ── Build the interpreter ───────────────────────────
    let analyzer = Arc::new(Analyzer::new(&config.analyzer_settings())?);
    let machine = Arc::new(DialogueMachine::new(analyzer, config.machine_settings()));
    let store: Arc<dyn DialogueStore> = Arc::new(DialogueRepo::new(Arc::clone(&db)));
    let executor: Arc<dyn ActionExecutor> = match &config.task_store {
        Some(task_store) => {
            info!(endpoint = %task_store.endpoint, "using http task store");
            Arc::new(HttpTaskStore::new(task_store)?)
        }
        None => {
            info!("task_store not configured; using in-memory task store");
            Arc::new(MemoryTaskStore::new())
        }
    };
    let interpreter = Interpreter::new(
        machine,
        store,
        executor,
        config.interpreter.max_cas_attempts,
    );

    // ── Open queues ─────────────────────────────────────
    let inbound: DurableQueue<QueueMessageIn> =
        DurableQueue::new(Arc::clone(&db), QueueName::Inbound, config.queue_settings());
    let outbound: DurableQueue<QueueMessageOut> =
        DurableQueue::new(Arc::clone(&db), QueueName::Outbound, config.queue_settings());
    let receiver = Receiver::new(inbound.clone(), config.queue.max_message_chars);

    // ── Start Slack ─────────────────────────────────────
    let (transport, socket_handle) = match &config.slack {
        Some(slack) => {
            let state = InboundState {
                receiver,
                allowed_user_ids: slack.allowed_user_ids.clone(),
            };
            let (service, handle) = SlackService::start(slack, state).map_err(|err| {
                error!(%err, "slack service start failed");
                err
            })?;
            let transport: Arc<dyn Transport> = Arc::new(service);
            (transport, Some(handle))
        }
        None => {
            info!("slack not configured; replies go to the log");
            let transport: Arc<dyn Transport> = Arc::new(LogTransport);
            (transport, None)
        }
    };

    // ── Start workers ───────────────────────────────────
    let settings = config.worker_settings();
    let executor_stage = ExecutorWorker::new(
        inbound,
        outbound.clone(),
        interpreter,
        Arc::new(StaticFallback::new(config.fallback_text.clone())),
        settings.pop_timeout,
    );
    let responder_stage = ResponderWorker::new(outbound, transport, settings.pop_timeout);
    let mut workers =
        spawn_executor_workers(config.workers.executors, &executor_stage, settings, &ct);
    workers.extend(spawn_responder_workers(
        config.workers.responders,
        &responder_stage,
        settings,
        &ct,
    ));
    info!(
        executors = config.workers.executors,
        responders = config.workers.responders,
        "workers started"
    );

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    // ── Wait for background tasks ───────────────────────
    for worker in workers {
        if let Err(err) = worker.await {
            error!(%err, "worker task panicked");
        }
    }
    if let Some(handle) = socket_handle {
        handle.abort();
    }
    let _ = retention_handle.await;
    info!("task-intercom shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
