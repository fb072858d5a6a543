//! Task store reached over HTTP.
//!
//! Each action is `POST`ed as JSON to the configured endpoint:
//!
//! ```json
//! { "user_id": "U123", "action": { "action": "complete", "index": 2 } }
//! ```
//!
//! and the store answers `{ "success": true, "text": "..." }`. Transport
//! errors and 5xx responses are retried with exponential backoff; other
//! statuses fail at once.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::TaskStoreConfig;
use crate::interpreter::collaborator::{ActionExecutor, ExecutionReport};
use crate::models::command::TaskAction;
use crate::{AppError, Result};

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(200);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct ActionRequest<'a> {
    user_id: &'a str,
    action: &'a TaskAction,
}

#[derive(Deserialize)]
struct ActionResponse {
    success: bool,
    #[serde(default)]
    text: String,
}

/// [`ActionExecutor`] backed by a JSON HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    client: reqwest::Client,
    endpoint: String,
    max_attempts: u32,
}

impl HttpTaskStore {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(config: &TaskStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| AppError::Config(format!("failed to build task store client: {err}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    async fn post(&self, action: &TaskAction, user_id: &str) -> Result<ExecutionReport> {
        let body = ActionRequest { user_id, action };
        let mut backoff = INITIAL_RETRY_DELAY;
        let mut attempt = 1;

        loop {
            let failure = match self.client.post(&self.endpoint).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed: ActionResponse = response.json().await.map_err(|err| {
                        AppError::Collaborator(format!("invalid task store response: {err}"))
                    })?;
                    debug!(user_id, intent = %action.intent(), success = parsed.success, "task store replied");
                    return Ok(ExecutionReport {
                        success: parsed.success,
                        text: parsed.text,
                    });
                }
                Ok(response) if response.status().is_server_error() => {
                    format!("task store returned {}", response.status())
                }
                Ok(response) => {
                    return Err(AppError::Collaborator(format!(
                        "task store rejected action with {}",
                        response.status()
                    )));
                }
                Err(err) => format!("task store unreachable: {err}"),
            };

            if attempt >= self.max_attempts {
                return Err(AppError::Collaborator(format!(
                    "{failure} (gave up after {attempt} attempts)"
                )));
            }
            warn!(user_id, attempt, delay = ?backoff, %failure, "task store call failed; retrying");
            sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_RETRY_DELAY);
            attempt += 1;
        }
    }
}

impl ActionExecutor for HttpTaskStore {
    fn execute(
        &self,
        action: &TaskAction,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionReport>> + Send + '_>> {
        let action = action.clone();
        let user_id = user_id.to_owned();
        Box::pin(async move { self.post(&action, &user_id).await })
    }
}
