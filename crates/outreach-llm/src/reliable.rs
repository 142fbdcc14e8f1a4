use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use tracing::{info, warn};

use outreach_core::errors::CompletionError;
use outreach_core::messages::ChatMessage;
use outreach_core::provider::{CompletionOptions, CompletionProvider};

#[derive(Clone, Debug)]
pub struct ReliableConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown: Duration,
}

impl Default for ReliableConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
            jitter_factor: 0.2,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open { since: Instant },
    HalfOpen,
}

/// Opt-in retry layer around any [`CompletionProvider`].
///
/// - Retryable errors back off exponentially with jitter, honoring
///   `retry_after` hints.
/// - N consecutive failed calls open the circuit; after the cooldown one
///   probe call is let through (half-open) and a success closes it again.
///
/// The pipeline itself never retries; this is what callers layer on top.
pub struct ReliableProvider<P: CompletionProvider> {
    inner: P,
    config: ReliableConfig,
    circuit_state: RwLock<CircuitState>,
    consecutive_failures: AtomicU32,
    total_retries: AtomicU64,
}

impl<P: CompletionProvider> ReliableProvider<P> {
    pub fn new(inner: P, config: ReliableConfig) -> Self {
        Self {
            inner,
            config,
            circuit_state: RwLock::new(CircuitState::Closed),
            consecutive_failures: AtomicU32::new(0),
            total_retries: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(inner: P) -> Self {
        Self::new(inner, ReliableConfig::default())
    }

    fn check_circuit(&self) -> Result<(), CompletionError> {
        let state = self.circuit_state.read();
        match &*state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open { since } => {
                if since.elapsed() >= self.config.circuit_breaker_cooldown {
                    drop(state);
                    *self.circuit_state.write() = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    Err(CompletionError::Unavailable(format!(
                        "circuit open for {}",
                        self.inner.name()
                    )))
                }
            }
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut state = self.circuit_state.write();
        if *state != CircuitState::Closed {
            info!(provider = self.inner.name(), "circuit closed after successful call");
            *state = CircuitState::Closed;
        }
    }

    fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures < self.config.circuit_breaker_threshold {
            return;
        }
        let mut state = self.circuit_state.write();
        if !matches!(*state, CircuitState::Open { .. }) {
            warn!(
                provider = self.inner.name(),
                failures,
                cooldown_secs = self.config.circuit_breaker_cooldown.as_secs(),
                "circuit opened"
            );
            *state = CircuitState::Open {
                since: Instant::now(),
            };
        }
    }

    fn retry_delay(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        if let Some(delay) = suggested {
            return delay;
        }

        let exp_ms = self.config.base_delay.as_millis() as f64 * 2.0_f64.powi(attempt as i32);
        let capped = exp_ms.min(self.config.max_delay.as_millis() as f64);

        let spread = capped * self.config.jitter_factor;
        let jitter = if spread > 0.0 {
            rand::thread_rng().gen_range(-spread..=spread)
        } else {
            0.0
        };
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    pub fn total_retries(&self) -> u64 {
        self.total_retries.load(Ordering::Relaxed)
    }

    pub fn circuit_state_name(&self) -> &'static str {
        match &*self.circuit_state.read() {
            CircuitState::Closed => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for ReliableProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        self.check_circuit()?;

        let mut attempt = 0;
        loop {
            match self.inner.complete(messages, options).await {
                Ok(text) => {
                    self.record_success();
                    return Ok(text);
                }
                Err(e) if !e.is_retryable() || attempt >= self.config.max_retries => {
                    self.record_failure();
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.retry_delay(attempt, e.suggested_delay());
                    self.total_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        kind = e.error_kind(),
                        "retrying completion"
                    );
                    tokio::time::sleep(delay).await;
                    self.check_circuit()?;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, MockReply};

    fn server_error() -> MockReply {
        MockReply::Error(CompletionError::ServerError {
            status: 500,
            body: "internal".into(),
        })
    }

    fn fast(max_retries: u32) -> ReliableConfig {
        ReliableConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    fn msgs() -> Vec<ChatMessage> {
        vec![ChatMessage::user("hi")]
    }

    #[tokio::test]
    async fn success_on_first_try() {
        let reliable = ReliableProvider::with_defaults(MockProvider::new(vec![MockReply::text("ok")]));
        let out = reliable.complete(&msgs(), &CompletionOptions::default()).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(reliable.total_retries(), 0);
    }

    #[tokio::test]
    async fn retries_retryable_errors() {
        let mock = MockProvider::new(vec![server_error(), server_error(), MockReply::text("recovered")]);
        let reliable = ReliableProvider::new(mock, fast(3));
        let out = reliable.complete(&msgs(), &CompletionOptions::default()).await.unwrap();
        assert_eq!(out, "recovered");
        assert_eq!(reliable.total_retries(), 2);
    }

    #[tokio::test]
    async fn fatal_error_not_retried() {
        let mock = MockProvider::new(vec![
            MockReply::Error(CompletionError::AuthenticationFailed("bad key".into())),
            MockReply::text("unreachable"),
        ]);
        let reliable = ReliableProvider::new(mock, fast(3));
        let err = reliable.complete(&msgs(), &CompletionOptions::default()).await.unwrap_err();
        assert!(matches!(err, CompletionError::AuthenticationFailed(_)));
        assert_eq!(reliable.total_retries(), 0);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let mock = MockProvider::new(vec![server_error(), server_error(), server_error()]);
        let reliable = ReliableProvider::new(mock, fast(2));
        assert!(reliable.complete(&msgs(), &CompletionOptions::default()).await.is_err());
        assert_eq!(reliable.total_retries(), 2);
    }

    #[tokio::test]
    async fn circuit_opens_then_rejects_without_calling() {
        let mock = MockProvider::new(vec![server_error(), server_error(), MockReply::text("unreachable")]);
        let config = ReliableConfig {
            circuit_breaker_threshold: 2,
            circuit_breaker_cooldown: Duration::from_secs(60),
            ..fast(0)
        };
        let reliable = ReliableProvider::new(mock, config);
        for _ in 0..2 {
            let _ = reliable.complete(&msgs(), &CompletionOptions::default()).await;
        }
        assert_eq!(reliable.circuit_state_name(), "open");

        let err = reliable.complete(&msgs(), &CompletionOptions::default()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Unavailable(_)));
        assert_eq!(reliable.inner.call_count(), 2);
    }

    #[tokio::test]
    async fn circuit_recovers_after_cooldown() {
        let mock = MockProvider::new(vec![server_error(), server_error(), MockReply::text("recovered")]);
        let config = ReliableConfig {
            circuit_breaker_threshold: 2,
            circuit_breaker_cooldown: Duration::from_millis(30),
            ..fast(0)
        };
        let reliable = ReliableProvider::new(mock, config);
        for _ in 0..2 {
            let _ = reliable.complete(&msgs(), &CompletionOptions::default()).await;
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(reliable.complete(&msgs(), &CompletionOptions::default()).await.is_ok());
        assert_eq!(reliable.circuit_state_name(), "closed");
    }

    #[test]
    fn retry_delay_respects_suggested() {
        let reliable = ReliableProvider::with_defaults(MockProvider::new(vec![]));
        assert_eq!(
            reliable.retry_delay(0, Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn retry_delay_backs_off_and_caps() {
        let config = ReliableConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            jitter_factor: 0.0,
            ..Default::default()
        };
        let reliable = ReliableProvider::new(MockProvider::new(vec![]), config);
        assert_eq!(reliable.retry_delay(0, None).as_millis(), 100);
        assert_eq!(reliable.retry_delay(1, None).as_millis(), 200);
        assert_eq!(reliable.retry_delay(2, None).as_millis(), 350);
    }

    #[test]
    fn delegates_identity() {
        let reliable = ReliableProvider::with_defaults(MockProvider::new(vec![]));
        assert_eq!(reliable.name(), "mock");
        assert_eq!(reliable.model(), "mock-model");
    }
}
