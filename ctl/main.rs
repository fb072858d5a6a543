#![forbid(unsafe_code)]

//! `task-intercom-ctl`: local CLI companion for `task-intercom`.
//!
//! Works directly against the server's `SQLite` database: inject messages
//! into the inbound queue, drain replies from the outbound queue, or
//! inspect queue depths. `parse` runs the classifier alone, without storage.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use task_intercom::config::GlobalConfig;
use task_intercom::models::queue::{QueueMessageIn, QueueMessageOut, QueueName};
use task_intercom::nlu::analyzer::Analyzer;
use task_intercom::persistence::db;
use task_intercom::pipeline::receiver::Receiver;
use task_intercom::queue::DurableQueue;
use task_intercom::{AppError, Result};

#[derive(Debug, Parser)]
#[command(
    name = "task-intercom-ctl",
    about = "Local CLI for task-intercom",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the server's TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify a message and print the parsed command as JSON.
    Parse {
        /// Message text.
        text: String,
    },

    /// Push a message onto the inbound queue.
    Send {
        /// Sender user ID.
        #[arg(long)]
        user: String,
        /// Message text.
        #[arg(long)]
        text: String,
    },

    /// Print and commit every pending reply on the outbound queue.
    Drain {
        /// How long to wait for the first reply, in milliseconds.
        #[arg(long, default_value_t = 500)]
        wait_ms: u64,
    },

    /// Show queue depths.
    Stats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<GlobalConfig> {
    match path {
        Some(path) => GlobalConfig::load_from_path(path),
        None => GlobalConfig::from_toml_str(""),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    if let Command::Parse { text } = &cli.command {
        let analysis = Analyzer::new(&config.analyzer_settings())?.analyze(text);
        let json = serde_json::to_string_pretty(&analysis.parsed)
            .map_err(|err| AppError::Config(format!("cannot render parse result: {err}")))?;
        println!("{json}");
        return Ok(());
    }

    let pool = Arc::new(db::connect(&config.database_path).await?);
    let inbound: DurableQueue<QueueMessageIn> =
        DurableQueue::new(Arc::clone(&pool), QueueName::Inbound, config.queue_settings());
    let outbound: DurableQueue<QueueMessageOut> =
        DurableQueue::new(Arc::clone(&pool), QueueName::Outbound, config.queue_settings());

    match cli.command {
        Command::Parse { .. } => {}
        Command::Send { user, text } => {
            let receiver = Receiver::new(inbound, config.queue.max_message_chars);
            let seq = receiver
                .accept(QueueMessageIn::new(user.clone(), text, user))
                .await?;
            println!("queued inbound #{seq}");
        }
        Command::Drain { wait_ms } => {
            let mut wait = Duration::from_millis(wait_ms);
            let mut drained = 0;
            while let Some(delivery) = outbound.pop(wait).await? {
                println!("→ {}: {}", delivery.payload.recipient_id, delivery.payload.text);
                outbound.commit(&delivery).await?;
                drained += 1;
                wait = Duration::ZERO;
            }
            println!("{drained} reply(ies) drained");
        }
        Command::Stats => {
            let depths = [
                (QueueName::Inbound, inbound.depth().await?),
                (QueueName::Outbound, outbound.depth().await?),
            ];
            for (name, depth) in depths {
                println!(
                    "{:<8} ready={} leased={} dead={}",
                    name.as_str(),
                    depth.ready,
                    depth.leased,
                    depth.dead
                );
            }
        }
    }

    Ok(())
}
