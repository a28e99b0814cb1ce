//! Retrying invocation layer
//!
//! Wraps one logical "generate this unit" call with a timeout, a bounded
//! retry loop with exponential backoff, and fallback across local backends.
//! The invoker never writes files; callers persist what it returns.

use crate::backends::{BackendConfig, GenerationBackend, HostedBackend, HttpBackend};
use crate::error::{InvocationError, InvocationFailure};
use crate::types::*;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_jitter: Duration::from_millis(DEFAULT_MAX_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_jitter_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
            max_jitter: Duration::from_millis(max_jitter_ms),
        }
    }

    /// `base_delay * 2^(attempt - 1)`, without jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Backoff delay plus up to `max_jitter` of random jitter
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.delay_for(attempt) + Duration::from_millis(jitter)
    }
}

/// Bookkeeping for one attempt of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based
    pub attempt_number: u32,
    pub max_attempts: u32,
}

impl RetryAttempt {
    pub fn is_last(&self) -> bool {
        self.attempt_number >= self.max_attempts
    }
}

/// Where generation requests go
pub enum InvocationRoute {
    /// Locally-credentialed backends tried in priority order within each attempt
    Local(Vec<Box<dyn GenerationBackend>>),
    /// Single hosted backend, one attempt, no retries
    Hosted(Box<dyn GenerationBackend>),
}

pub struct RetryingInvoker {
    route: InvocationRoute,
    policy: RetryPolicy,
}

impl RetryingInvoker {
    pub fn new(route: InvocationRoute, policy: RetryPolicy) -> Self {
        Self { route, policy }
    }

    /// Local multi-backend path if any local credential is configured,
    /// hosted path otherwise
    pub fn from_config(config: &BackendConfig, policy: RetryPolicy) -> Self {
        if config.has_local_credentials() {
            let backends: Vec<Box<dyn GenerationBackend>> = config
                .local_providers()
                .into_iter()
                .map(|(provider, key)| {
                    Box::new(HttpBackend::new(provider, key)) as Box<dyn GenerationBackend>
                })
                .collect();
            log::info!(
                "Using local backends: {}",
                backends.iter().map(|b| b.name()).collect::<Vec<_>>().join(", ")
            );
            Self::new(InvocationRoute::Local(backends), policy)
        } else {
            log::info!("No local credentials found, using hosted generation");
            Self::new(
                InvocationRoute::Hosted(Box::new(HostedBackend::from_config(config))),
                policy,
            )
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn is_hosted(&self) -> bool {
        matches!(self.route, InvocationRoute::Hosted(_))
    }

    /// Generate one unit. The returned content's metadata records the
    /// number of attempts under `"attempts"`.
    pub async fn invoke(
        &self,
        unit: &GenerationQueueItem,
        context: &GenerationContext,
        timeout: Duration,
    ) -> std::result::Result<GeneratedContent, InvocationFailure> {
        match &self.route {
            InvocationRoute::Hosted(backend) => {
                let result = race(timeout, backend.generate(unit, context)).await;
                finish(result, 1)
            }
            InvocationRoute::Local(backends) => {
                let mut attempt = RetryAttempt {
                    attempt_number: 1,
                    max_attempts: self.policy.max_attempts,
                };
                loop {
                    log::debug!(
                        "Generating '{}' (attempt {}/{})",
                        unit.path,
                        attempt.attempt_number,
                        attempt.max_attempts
                    );
                    let result = race(timeout, try_backends(backends, unit, context)).await;
                    let error = match result {
                        Ok(content) => return finish(Ok(content), attempt.attempt_number),
                        Err(error) => error,
                    };

                    if !error.is_retryable() || attempt.is_last() {
                        log::debug!(
                            "Giving up on '{}' after {} attempt(s): {}",
                            unit.path,
                            attempt.attempt_number,
                            error
                        );
                        return finish(Err(error), attempt.attempt_number);
                    }

                    let delay = self.policy.jittered_delay(attempt.attempt_number);
                    log::warn!(
                        "Attempt {}/{} for '{}' failed ({}), retrying in {}ms",
                        attempt.attempt_number,
                        attempt.max_attempts,
                        unit.path,
                        error,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt.attempt_number += 1;
                }
            }
        }
    }
}

fn finish(
    result: std::result::Result<GeneratedContent, InvocationError>,
    attempts: u32,
) -> std::result::Result<GeneratedContent, InvocationFailure> {
    match result {
        Ok(mut content) => {
            content
                .metadata
                .insert("attempts".to_string(), serde_json::json!(attempts));
            Ok(content)
        }
        Err(error) => Err(InvocationFailure { error, attempts }),
    }
}

async fn race<F>(timeout: Duration, call: F) -> std::result::Result<GeneratedContent, InvocationError>
where
    F: std::future::Future<Output = std::result::Result<GeneratedContent, InvocationError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(InvocationError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// One attempt: each backend in order until one succeeds
async fn try_backends(
    backends: &[Box<dyn GenerationBackend>],
    unit: &GenerationQueueItem,
    context: &GenerationContext,
) -> std::result::Result<GeneratedContent, InvocationError> {
    let mut errors = Vec::with_capacity(backends.len());

    for backend in backends {
        match backend.generate(unit, context).await {
            Ok(mut content) => {
                content
                    .metadata
                    .entry("backend".to_string())
                    .or_insert_with(|| serde_json::json!(backend.name()));
                return Ok(content);
            }
            Err(error) => {
                log::debug!("Backend {} failed for '{}': {}", backend.name(), unit.path, error);
                errors.push((backend.name().to_string(), error));
            }
        }
    }

    if errors.len() == 1 {
        if let Some((_, error)) = errors.pop() {
            return Err(error);
        }
    }
    if errors.is_empty() {
        return Err(InvocationError::terminal("no generation backends configured"));
    }

    let failures: Vec<String> = errors
        .iter()
        .map(|(name, error)| format!("{}: {}", name, error))
        .collect();
    if errors.iter().any(|(_, error)| error.is_retryable()) {
        Err(InvocationError::AllBackendsFailed { failures })
    } else {
        Err(InvocationError::terminal(failures.join("; ")))
    }
}
