//! Client configuration: endpoint, credentials, and the retry policy.

use inventario_types::{Credentials, DurationMs};
use serde::{Deserialize, Serialize};

/// Default service endpoint.
const DEFAULT_ENDPOINT: &str = "http://localhost:8080/InventarioService";

/// Default target namespace for operation elements.
const DEFAULT_TARGET_NAMESPACE: &str = "http://ws.inventario.ferreteria.com/";

/// Default pre-flight probe timeout.
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Default attempt ceiling.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause unit between attempts.
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default per-attempt time budget for the first attempt.
const DEFAULT_BASE_TIMEOUT_MS: u64 = 10_000;

/// Default budget growth per attempt.
const DEFAULT_TIMEOUT_INCREMENT_MS: u64 = 5_000;

/// Where to call and how to authenticate.
///
/// Every field has a default aimed at a service on localhost, so a config
/// file only needs to name what differs:
///
/// ```
/// use inventario_client::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(
///     r#"{ "endpoint": "http://inventario.example.com/InventarioService" }"#,
/// ).unwrap();
/// assert_eq!(config.retry.max_attempts, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service URL requests are POSTed to.
    pub endpoint: String,
    /// Namespace the operation element is rendered in.
    pub target_namespace: String,
    /// HTTP Basic credentials, when the service requires them.
    pub credentials: Option<Credentials>,
    /// Attempt ceiling and per-attempt time budgets.
    pub retry: RetryPolicy,
    /// Budget for the pre-flight reachability probe.
    pub probe_timeout: DurationMs,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            target_namespace: DEFAULT_TARGET_NAMESPACE.into(),
            credentials: None,
            retry: RetryPolicy::default(),
            probe_timeout: DurationMs::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    /// Defaults pointed at `http://localhost:8080/InventarioService`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the service endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the target namespace.
    #[must_use]
    pub fn target_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.target_namespace = namespace.into();
        self
    }

    /// Attach HTTP Basic credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// How many attempts a call gets and how long each one may run.
///
/// The time budget grows with each attempt, so a slow-but-alive server
/// that misses the first window still gets a fair shot on the later
/// ones. The pause before an attempt grows the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempt ceiling, counting the first try. Zero means one attempt.
    pub max_attempts: u32,
    /// Pause unit: attempt `n` waits `(n - 1)` of these.
    pub base_delay: DurationMs,
    /// Time budget for the first attempt.
    pub base_timeout: DurationMs,
    /// Extra budget each later attempt receives.
    pub timeout_increment: DurationMs,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DurationMs::from_millis(DEFAULT_BASE_DELAY_MS),
            base_timeout: DurationMs::from_millis(DEFAULT_BASE_TIMEOUT_MS),
            timeout_increment: DurationMs::from_millis(DEFAULT_TIMEOUT_INCREMENT_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy with no retries and the default first-attempt budget.
    #[must_use]
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Time budget for the 1-based `attempt`.
    ///
    /// Grows linearly: `base_timeout + (attempt - 1) * timeout_increment`.
    #[must_use]
    pub fn timeout_for(&self, attempt: u32) -> DurationMs {
        let extra = self
            .timeout_increment
            .saturating_mul(u64::from(attempt.saturating_sub(1)));
        self.base_timeout.saturating_add(extra)
    }

    /// Pause before the 1-based `attempt` starts.
    ///
    /// The first attempt starts immediately; attempt `n` waits
    /// `(n - 1) * base_delay`.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> DurationMs {
        self.base_delay
            .saturating_mul(u64::from(attempt.saturating_sub(1)))
    }
}
