//! In-memory provider with scripted outcomes, for tests and local runs.

use super::{EmailProvider, OutgoingEmail, SentEmail};
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Provider that replays a script of outcomes.
///
/// Each `send` pops the next scripted outcome; once the script is exhausted
/// every call succeeds. Attempt start instants are recorded on the Tokio
/// clock, so paused-time tests can assert exact backoff gaps.
#[derive(Default)]
pub struct ScriptedEmailProvider {
    outcomes: Mutex<VecDeque<Result<SentEmail, TransportError>>>,
    delay: Option<Duration>,
    attempts: Mutex<Vec<Instant>>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl ScriptedEmailProvider {
    /// A provider that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that fails every call with `error`.
    pub fn failing(error: TransportError, times: usize) -> Self {
        Self::with_outcomes(std::iter::repeat_n(Err(error), times))
    }

    pub fn with_outcomes(
        outcomes: impl IntoIterator<Item = Result<SentEmail, TransportError>>,
    ) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Sleep this long before settling each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Start instant of every attempt, in order.
    pub async fn attempt_instants(&self) -> Vec<Instant> {
        self.attempts.lock().await.clone()
    }

    pub async fn attempt_count(&self) -> usize {
        self.attempts.lock().await.len()
    }

    /// Emails whose attempt succeeded.
    pub async fn sent_emails(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailProvider for ScriptedEmailProvider {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, TransportError> {
        let attempt = {
            let mut attempts = self.attempts.lock().await;
            attempts.push(Instant::now());
            attempts.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(SentEmail::new(format!("scripted-{}", attempt))));

        if outcome.is_ok() {
            self.sent.lock().await.push(email.clone());
        }
        outcome
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn health(&self) -> serde_json::Value {
        json!({ "configured": true })
    }
}
