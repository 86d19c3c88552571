//! Retry and timeout policy around a single [`EmailProvider`].
//!
//! Per delivery: `Attempting(k) -> Success | Retryable(k + 1) | Fatal`.
//! Only transient errors move to `Retryable`, and only while attempts remain.
//! The whole sequence races a deadline timer; if the timer wins the sequence
//! is dropped, releasing any in-flight connection.

use crate::error::TransportError;
use crate::models::DeliveryResult;
use crate::providers::{EmailProvider, OutgoingEmail, SentEmail};
use core_config::{ConfigError, FromEnv, env_parse_or};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Retry/backoff/deadline settings for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Linear backoff step: attempt `k` waits `(k - 1) * backoff_step`.
    pub backoff_step: Duration,
    /// Ceiling over the entire attempt sequence.
    pub send_timeout: Duration,
}

impl DeliveryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff_step(mut self, backoff_step: Duration) -> Self {
        self.backoff_step = backoff_step;
        self
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Wait before 1-based attempt `attempt`.
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt.saturating_sub(1)
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(1000),
            send_timeout: Duration::from_millis(25_000),
        }
    }
}

impl FromEnv for DeliveryPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self::new()
            .with_max_attempts(env_parse_or("EMAIL_MAX_ATTEMPTS", defaults.max_attempts)?)
            .with_backoff_step(Duration::from_millis(env_parse_or(
                "EMAIL_RETRY_BACKOFF_MS",
                defaults.backoff_step.as_millis() as u64,
            )?))
            .with_send_timeout(Duration::from_millis(env_parse_or(
                "EMAIL_SEND_TIMEOUT_MS",
                defaults.send_timeout.as_millis() as u64,
            )?)))
    }
}

enum AttemptState {
    Attempting(u32),
    Retryable { next: u32, error: TransportError },
    Success { sent: SentEmail, attempts: u32 },
    Fatal(TransportError),
}

/// Applies a [`DeliveryPolicy`] to an [`EmailProvider`].
pub struct DeliveryOrchestrator {
    provider: Arc<dyn EmailProvider>,
    provider_name: &'static str,
    policy: DeliveryPolicy,
}

impl DeliveryOrchestrator {
    pub fn new(provider: Arc<dyn EmailProvider>, policy: DeliveryPolicy) -> Self {
        let provider_name = provider.name();
        Self {
            provider,
            provider_name,
            policy,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmailProvider> {
        &self.provider
    }

    pub fn policy(&self) -> &DeliveryPolicy {
        &self.policy
    }

    /// Deliver one email under the policy.
    ///
    /// Errors keep the kind of the last attempt and carry the attempt count.
    pub async fn deliver(&self, email: &OutgoingEmail) -> Result<DeliveryResult, TransportError> {
        let started = AtomicU32::new(0);

        let outcome = tokio::select! {
            outcome = self.run_attempts(email, &started) => outcome,
            _ = tokio::time::sleep(self.policy.send_timeout) => {
                let attempts = started.load(Ordering::SeqCst);
                warn!(
                    provider = self.provider_name,
                    attempts,
                    timeout_ms = self.policy.send_timeout.as_millis() as u64,
                    "Email delivery timed out"
                );
                Err(TransportError::timeout(format!(
                    "Email sending timed out after {} seconds",
                    self.policy.send_timeout.as_secs()
                ))
                .with_attempts(attempts))
            }
        };

        match outcome {
            Ok(result) => {
                info!(
                    provider = self.provider_name,
                    to = %email.to_email,
                    message_id = ?result.provider_message_id,
                    attempts = result.attempts,
                    "Email delivered"
                );
                Ok(result)
            }
            Err(err) => {
                let result = DeliveryResult::failed(&err);
                error!(
                    provider = self.provider_name,
                    to = %email.to_email,
                    kind = %err.kind,
                    attempts = result.attempts,
                    error = %err,
                    "Email delivery failed"
                );
                Err(err)
            }
        }
    }

    async fn run_attempts(
        &self,
        email: &OutgoingEmail,
        started: &AtomicU32,
    ) -> Result<DeliveryResult, TransportError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut state = AttemptState::Attempting(1);

        loop {
            state = match state {
                AttemptState::Attempting(attempt) => {
                    let backoff = self.policy.backoff_before(attempt);
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }

                    started.store(attempt, Ordering::SeqCst);
                    debug!(provider = self.provider_name, attempt, max_attempts, "Sending email");

                    match self.provider.send(email).await {
                        Ok(sent) => AttemptState::Success {
                            sent,
                            attempts: attempt,
                        },
                        Err(error) if error.is_transient() && attempt < max_attempts => {
                            AttemptState::Retryable {
                                next: attempt + 1,
                                error,
                            }
                        }
                        Err(error) => AttemptState::Fatal(error.with_attempts(attempt)),
                    }
                }
                AttemptState::Retryable { next, error } => {
                    warn!(
                        provider = self.provider_name,
                        attempt = next - 1,
                        kind = %error.kind,
                        error = %error,
                        retry_in_ms = self.policy.backoff_before(next).as_millis() as u64,
                        "Transient send failure, retrying"
                    );
                    AttemptState::Attempting(next)
                }
                AttemptState::Success { sent, attempts } => {
                    return Ok(DeliveryResult::delivered(sent.message_id, attempts));
                }
                AttemptState::Fatal(error) => return Err(error),
            };
        }
    }
}
