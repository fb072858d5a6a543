//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::dialogue::machine::MachineSettings;
use crate::nlu::analyzer::AnalyzerSettings;
use crate::nlu::normalizer::NormalizerOptions;
use crate::nlu::similarity::SimilarityStrategy;
use crate::pipeline::WorkerSettings;
use crate::queue::QueueSettings;
use crate::{AppError, Result};

const KEYRING_SERVICE: &str = "task-intercom";

/// Slack Socket Mode connectivity.
///
/// Tokens are loaded at runtime via OS keychain or environment variables,
/// not from the TOML config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlackConfig {
    /// Ignore direct messages from users outside this list. Empty admits everyone.
    #[serde(default)]
    pub allowed_user_ids: Vec<String>,
    /// App-level token used for Socket Mode (populated at runtime).
    #[serde(skip)]
    pub app_token: String,
    /// Bot user token used for posting messages (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

/// Interpreter tunables.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct InterpreterConfig {
    /// Score a match must reach to be dispatched.
    pub confidence_threshold: f64,
    /// Lifetime of a pending slot or confirmation.
    pub slot_timeout_seconds: u64,
    /// Repeated-message window.
    pub duplicate_window_seconds: u64,
    /// `jaro_winkler` or `levenshtein`.
    pub fuzzy_strategy: SimilarityStrategy,
    /// Minimum similarity for fuzzy keyword and vocabulary matches.
    pub fuzzy_min_similarity: f64,
    /// Drop emoji during normalization.
    pub strip_emoji: bool,
    /// Read-plan-commit cycles per message before giving up.
    pub max_cas_attempts: u32,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: crate::nlu::scorer::DEFAULT_CONFIDENCE_THRESHOLD,
            slot_timeout_seconds: 120,
            duplicate_window_seconds: 30,
            fuzzy_strategy: SimilarityStrategy::default(),
            fuzzy_min_similarity: 0.82,
            strip_emoji: true,
            max_cas_attempts: crate::interpreter::DEFAULT_MAX_CAS_ATTEMPTS,
        }
    }
}

/// Worker pool sizing and failure handling.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct WorkersConfig {
    /// Executor worker count.
    pub executors: usize,
    /// Responder worker count.
    pub responders: usize,
    /// How long one pop waits, in milliseconds.
    pub pop_timeout_ms: u64,
    /// Consecutive failures before a worker cools down.
    pub failure_cooldown_trigger: u32,
    /// Cooldown length.
    pub cooldown_seconds: u64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            executors: 2,
            responders: 2,
            pop_timeout_ms: 1000,
            failure_cooldown_trigger: 5,
            cooldown_seconds: 30,
        }
    }
}

/// Durable queue behavior.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct QueueConfig {
    /// Lease length before an uncommitted item is redelivered.
    pub visibility_timeout_seconds: u64,
    /// Deliveries before an item is dead-lettered.
    pub max_deliveries: u32,
    /// Sleep between empty polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Longest inbound text accepted by the receiver.
    pub max_message_chars: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_seconds: 60,
            max_deliveries: 5,
            poll_interval_ms: 200,
            max_message_chars: crate::pipeline::receiver::DEFAULT_MAX_MESSAGE_CHARS,
        }
    }
}

/// HTTP task store endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TaskStoreConfig {
    /// URL each action is posted to.
    pub endpoint: String,
    /// Per-request timeout.
    #[serde(default = "default_task_store_timeout")]
    pub timeout_seconds: u64,
    /// Attempts per action, including the first.
    #[serde(default = "default_task_store_attempts")]
    pub max_attempts: u32,
}

fn default_task_store_timeout() -> u64 {
    10
}

fn default_task_store_attempts() -> u32 {
    3
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/task-intercom.db")
}

fn default_retention_hours() -> u32 {
    24
}

fn default_fallback_text() -> String {
    "Desculpe, não entendi. Envie \"ajuda\" para ver o que posso fazer.".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Hours before idle dialogue state and dead-lettered items are purged.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
    /// Known project names for the project entity.
    #[serde(default)]
    pub projects: Vec<String>,
    /// Reply for messages nothing recognized.
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,
    /// Interpreter tunables.
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    /// Worker pools.
    #[serde(default)]
    pub workers: WorkersConfig,
    /// Durable queues.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Slack adapter; absent runs with log delivery only.
    #[serde(default)]
    pub slack: Option<SlackConfig>,
    /// HTTP task store; absent uses the in-memory store.
    #[serde(default)]
    pub task_store: Option<TaskStoreConfig>,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load Slack credentials from OS keychain with env-var fallback.
    ///
    /// Does nothing when the `[slack]` section is absent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// the required tokens.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if let Some(slack) = self.slack.as_mut() {
            slack.app_token = load_credential("slack_app_token", "SLACK_APP_TOKEN").await?;
            slack.bot_token = load_credential("slack_bot_token", "SLACK_BOT_TOKEN").await?;
        }
        Ok(())
    }

    /// Analyzer settings derived from `[interpreter]` and `projects`.
    #[must_use]
    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        AnalyzerSettings {
            confidence_threshold: self.interpreter.confidence_threshold,
            strategy: self.interpreter.fuzzy_strategy,
            min_similarity: self.interpreter.fuzzy_min_similarity,
            normalizer: NormalizerOptions {
                strip_emoji: self.interpreter.strip_emoji,
            },
            projects: self.projects.clone(),
        }
    }

    /// Dialogue machine timing.
    #[must_use]
    pub fn machine_settings(&self) -> MachineSettings {
        MachineSettings {
            pending_ttl: seconds(self.interpreter.slot_timeout_seconds),
            duplicate_window: seconds(self.interpreter.duplicate_window_seconds),
        }
    }

    /// Queue lease and polling settings.
    #[must_use]
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            visibility_timeout: Duration::from_secs(self.queue.visibility_timeout_seconds),
            max_deliveries: self.queue.max_deliveries,
            poll_interval: Duration::from_millis(self.queue.poll_interval_ms),
        }
    }

    /// Worker loop settings.
    #[must_use]
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            pop_timeout: Duration::from_millis(self.workers.pop_timeout_ms),
            failure_cooldown_trigger: self.workers.failure_cooldown_trigger,
            cooldown: Duration::from_secs(self.workers.cooldown_seconds),
        }
    }

    fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(AppError::Config(format!("{name} must be in (0, 1], got {value}")))
            }
        };
        unit("interpreter.confidence_threshold", self.interpreter.confidence_threshold)?;
        unit("interpreter.fuzzy_min_similarity", self.interpreter.fuzzy_min_similarity)?;

        let positive = [
            ("interpreter.slot_timeout_seconds", self.interpreter.slot_timeout_seconds),
            ("interpreter.duplicate_window_seconds", self.interpreter.duplicate_window_seconds),
            ("interpreter.max_cas_attempts", u64::from(self.interpreter.max_cas_attempts)),
            ("workers.executors", self.workers.executors as u64),
            ("workers.responders", self.workers.responders as u64),
            ("workers.pop_timeout_ms", self.workers.pop_timeout_ms),
            ("workers.failure_cooldown_trigger", u64::from(self.workers.failure_cooldown_trigger)),
            ("queue.visibility_timeout_seconds", self.queue.visibility_timeout_seconds),
            ("queue.max_deliveries", u64::from(self.queue.max_deliveries)),
            ("queue.poll_interval_ms", self.queue.poll_interval_ms),
            ("queue.max_message_chars", self.queue.max_message_chars as u64),
            ("retention_hours", u64::from(self.retention_hours)),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::Config(format!("{name} must be greater than zero")));
        }

        if let Some(store) = &self.task_store {
            if store.endpoint.trim().is_empty() {
                return Err(AppError::Config("task_store.endpoint must not be empty".into()));
            }
            if store.timeout_seconds == 0 || store.max_attempts == 0 {
                return Err(AppError::Config(
                    "task_store timeout_seconds and max_attempts must be greater than zero".into(),
                ));
            }
        }

        Ok(())
    }
}

fn seconds(value: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
