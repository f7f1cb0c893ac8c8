//! The retry loop with raw-response recovery.
//!
//! One call runs as a sequence of attempts, each under an escalating time
//! budget. Every attempt that produces a body runs the same salvage
//! pipeline: classify completeness, try the strict decoder, and fall back
//! to tolerant extraction before conceding the attempt. A response only
//! counts as a clean success when it arrived on a success status AND the
//! strict decoder accepted it; anything salvaged from a damaged body or
//! an error-status exchange is reported with `recovered_from_raw = true`
//! so callers can tell trusted data from rescued data.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use inventario_envelope::{Extractor, NO_DATA_MESSAGE, classify, decode_response};
use inventario_types::{
    ArgValue, AuditSink, CallFailure, CallSuccess, Completeness, Credentials, DurationMs,
    InvocationOutcome, InvokeError, NullSink, OperationCall, OutcomeSummary, RawResponse,
    Transport,
};
use tokio_util::sync::CancellationToken;

use crate::config::RetryPolicy;

/// Drives calls through a [`Transport`] until one succeeds or the policy
/// gives up.
///
/// The invoker holds no per-call state; a shared reference can run any
/// number of calls, each strictly sequential within its own future.
///
/// # Example
///
/// ```no_run
/// use inventario_client::{ClientConfig, Invoker, SoapTransport};
/// use inventario_client::ops;
///
/// # async fn demo() {
/// let config = ClientConfig::default();
/// let invoker = Invoker::new(SoapTransport::from_config(&config));
/// let outcome = invoker.invoke(&ops::verificar_estado(), None).await;
/// println!("service up: {}", outcome.is_success());
/// # }
/// ```
pub struct Invoker<T> {
    transport: T,
    extractor: Extractor,
    audit: Arc<dyn AuditSink>,
    policy: RetryPolicy,
}

/// What one attempt salvaged.
struct AttemptWin {
    fields: BTreeMap<String, String>,
    message: Option<String>,
    recovered: bool,
}

impl<T: Transport> Invoker<T> {
    /// An invoker over `transport` with the default policy and no audit.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            extractor: Extractor::new(),
            audit: Arc::new(NullSink),
            policy: RetryPolicy::default(),
        }
    }

    /// Attach an audit sink. Every attempt and disposition is reported.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replace the default retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The policy [`invoke`](Self::invoke) runs under.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `call` under the invoker's own policy, never cancelled.
    pub async fn invoke(
        &self,
        call: &OperationCall,
        credentials: Option<&Credentials>,
    ) -> InvocationOutcome {
        self.invoke_with(call, credentials, &self.policy, &CancellationToken::new())
            .await
    }

    /// Invoke `call` under a one-off policy and a cancellation token.
    ///
    /// Cancellation is honored at both suspension points: while an attempt
    /// waits on the transport and while the loop sleeps between attempts.
    /// A cancelled call ends as a terminal [`InvokeError::Cancelled`]
    /// failure with `attempts_exhausted = false`; it is never retried, and
    /// the terminal record still reaches the audit sink.
    ///
    /// A call that fails validation is never dispatched: zero attempts,
    /// one failure record for diagnosis.
    pub async fn invoke_with(
        &self,
        call: &OperationCall,
        credentials: Option<&Credentials>,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> InvocationOutcome {
        if let Err(error) = call.validate() {
            tracing::warn!(operation = %call.operation, error = %error, "call rejected before dispatch");
            self.audit
                .record_outcome(
                    &call.operation,
                    &OutcomeSummary::Failed {
                        error: error.to_string(),
                        was_truncated: false,
                    },
                    DurationMs::ZERO,
                )
                .await;
            return failure(&call.operation, error, 0, false, false);
        }

        let args = args_json(&call.args);
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt: u32 = 1;

        loop {
            self.audit
                .record_attempt(&call.operation, &args, attempt)
                .await;

            let started = Instant::now();
            let result = self
                .run_attempt(call, credentials, policy.timeout_for(attempt), cancel)
                .await;
            let elapsed = DurationMs::from(started.elapsed());

            let error = match result {
                Ok(win) => {
                    self.audit
                        .record_outcome(
                            &call.operation,
                            &OutcomeSummary::Success {
                                recovered: win.recovered,
                            },
                            elapsed,
                        )
                        .await;
                    tracing::info!(
                        operation = %call.operation,
                        attempt,
                        recovered = win.recovered,
                        "call succeeded"
                    );
                    return InvocationOutcome::Success(CallSuccess {
                        operation: call.operation.clone(),
                        fields: win.fields,
                        message: win.message,
                        recovered_from_raw: win.recovered,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            let was_truncated = matches!(error, InvokeError::Truncated);

            if !error.is_retryable() || attempt >= max_attempts {
                let exhausted = error.is_retryable();
                self.audit
                    .record_outcome(
                        &call.operation,
                        &OutcomeSummary::Failed {
                            error: error.to_string(),
                            was_truncated,
                        },
                        elapsed,
                    )
                    .await;
                tracing::warn!(
                    operation = %call.operation,
                    attempt,
                    error = %error,
                    "call failed"
                );
                return failure(&call.operation, error, attempt, exhausted, was_truncated);
            }

            self.audit
                .record_outcome(
                    &call.operation,
                    &OutcomeSummary::Retrying {
                        error: error.to_string(),
                    },
                    elapsed,
                )
                .await;
            tracing::debug!(
                operation = %call.operation,
                attempt,
                error = %error,
                "attempt failed; backing off"
            );

            let delay = policy.delay_before(attempt + 1);
            let slept = Instant::now();
            let cancelled = tokio::select! {
                () = cancel.cancelled() => true,
                () = tokio::time::sleep(delay.to_std()) => false,
            };
            if cancelled {
                let error = InvokeError::Cancelled;
                self.audit
                    .record_outcome(
                        &call.operation,
                        &OutcomeSummary::Failed {
                            error: error.to_string(),
                            was_truncated: false,
                        },
                        DurationMs::from(slept.elapsed()),
                    )
                    .await;
                return failure(&call.operation, error, attempt, false, false);
            }

            attempt += 1;
        }
    }

    /// One dispatch under its time budget, then the salvage pipeline.
    async fn run_attempt(
        &self,
        call: &OperationCall,
        credentials: Option<&Credentials>,
        limit: DurationMs,
        cancel: &CancellationToken,
    ) -> Result<AttemptWin, InvokeError> {
        let dispatch = tokio::time::timeout(
            limit.to_std(),
            self.transport.dispatch(call, credentials),
        );
        let raw = tokio::select! {
            () = cancel.cancelled() => return Err(InvokeError::Cancelled),
            outcome = dispatch => match outcome {
                Ok(Ok(raw)) => raw,
                Ok(Err(transport_err)) => return Err(transport_err.into()),
                Err(_elapsed) => return Err(InvokeError::Timeout { limit }),
            },
        };
        self.salvage(call, &raw)
    }

    /// Classify, strictly decode, then extract. Error statuses get the
    /// same pipeline as success statuses; only the meaning of a win
    /// changes (anything salvaged from them is `recovered`).
    fn salvage(&self, call: &OperationCall, raw: &RawResponse) -> Result<AttemptWin, InvokeError> {
        match classify(&raw.body) {
            Completeness::Truncated => return Err(InvokeError::Truncated),
            Completeness::NotApplicable => {
                // Kept visible so new body shapes can be taught to classify.
                tracing::warn!(
                    operation = %call.operation,
                    status = raw.status,
                    bytes = raw.body.len(),
                    "response body is not a soap envelope"
                );
            }
            Completeness::Complete => {}
        }

        match decode_response(&raw.body, &call.operation) {
            Ok(doc) => {
                if raw.is_success() {
                    Ok(AttemptWin {
                        message: doc.fields.get("mensaje").cloned(),
                        fields: doc.fields,
                        recovered: false,
                    })
                } else {
                    tracing::info!(
                        operation = %call.operation,
                        status = raw.status,
                        "usable envelope inside an error-status response"
                    );
                    Ok(AttemptWin {
                        message: doc.fields.get("mensaje").cloned(),
                        fields: doc.fields,
                        recovered: true,
                    })
                }
            }
            Err(decode_err) => {
                let extraction =
                    self.extractor
                        .extract(&raw.body, &call.operation, &call.recovery_fields);
                if extraction.success {
                    tracing::info!(
                        operation = %call.operation,
                        status = raw.status,
                        recovered = extraction.fields.len(),
                        "fields recovered from raw response"
                    );
                    return Ok(AttemptWin {
                        fields: extraction.fields,
                        message: extraction.message,
                        recovered: true,
                    });
                }
                let fallback = if raw.is_success() {
                    InvokeError::Decode(decode_err.to_string())
                } else {
                    InvokeError::Http { status: raw.status }
                };
                Err(rejection_or(extraction.message, fallback))
            }
        }
    }
}

/// A found server message means the server answered and said no; anything
/// less falls through to the wire-level error.
fn rejection_or(message: Option<String>, fallback: InvokeError) -> InvokeError {
    match message {
        Some(message) if message != NO_DATA_MESSAGE => InvokeError::Rejected { message },
        _ => fallback,
    }
}

fn failure(
    operation: &str,
    error: InvokeError,
    attempts: u32,
    attempts_exhausted: bool,
    was_truncated: bool,
) -> InvocationOutcome {
    InvocationOutcome::Failure(CallFailure {
        operation: operation.to_owned(),
        error,
        attempts,
        attempts_exhausted,
        was_truncated,
    })
}

/// Arguments as a flat JSON object for audit records. Nested records
/// become nested objects; decimals keep their text form.
fn args_json(args: &[(String, ArgValue)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in args {
        map.insert(name.clone(), arg_json(value));
    }
    serde_json::Value::Object(map)
}

fn arg_json(value: &ArgValue) -> serde_json::Value {
    match value {
        ArgValue::Text(text) => serde_json::Value::String(text.clone()),
        ArgValue::Int(n) => serde_json::Value::from(*n),
        ArgValue::Decimal(d) => serde_json::Value::String(d.to_string()),
        ArgValue::Bool(b) => serde_json::Value::Bool(*b),
        ArgValue::Nested(children) => args_json(children),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inventario_audit::{AuditEvent, MemorySink};
    use inventario_types::{FieldSpec, TransportError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const CLEAN_OK: &str = "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soap:Body><ns2:verificarEstadoResponse>\
         <exitoso>true</exitoso><mensaje>Servicio operativo</mensaje>\
         </ns2:verificarEstadoResponse></soap:Body></soap:Envelope>";

    const TRUNCATED_BODY: &str = "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soap:Body><ns2:verificarEstadoResponse><exitoso>tr";

    // Complete envelope whose wrapper never balances: the strict decoder
    // refuses it, the extractor rescues it.
    const DAMAGED_RECOVERABLE: &str = "<soap:Envelope><soap:Body>\
         <ns2:consultarArticuloResponse><articulo>\
         <codigo>MART001</codigo><nombre>Martillo</nombre></articulo>\
         </wrong></soap:Body></soap:Envelope>";

    const DAMAGED_REJECTION: &str = "<soap:Envelope><soap:Body>\
         <ns2:actualizarStockResponse><exitoso>false</exitoso>\
         <mensaje>Stock insuficiente</mensaje>\
         </wrong></soap:Body></soap:Envelope>";

    enum Scripted {
        Respond(u16, &'static str),
        Fail(TransportError),
        Hang,
    }

    struct FakeTransport {
        script: Mutex<VecDeque<Scripted>>,
    }

    impl FakeTransport {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn dispatch(
            &self,
            _call: &OperationCall,
            _credentials: Option<&Credentials>,
        ) -> Result<RawResponse, TransportError> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Respond(status, body)) => Ok(RawResponse {
                    status,
                    body: body.to_owned(),
                }),
                Some(Scripted::Fail(err)) => Err(err),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                    unreachable!("hang outlived the attempt budget")
                }
                None => panic!("transport dispatched more times than scripted"),
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: DurationMs::ZERO,
            base_timeout: DurationMs::from_millis(100),
            timeout_increment: DurationMs::ZERO,
        }
    }

    fn status_call() -> OperationCall {
        OperationCall::new("verificarEstado")
    }

    fn article_call() -> OperationCall {
        OperationCall::new("consultarArticulo")
            .arg("codigo", "MART001")
            .recover(FieldSpec::text("codigo"))
            .recover(FieldSpec::text("nombre"))
    }

    async fn run(
        script: Vec<Scripted>,
        call: &OperationCall,
        policy: RetryPolicy,
    ) -> (InvocationOutcome, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let invoker = Invoker::new(FakeTransport::new(script)).with_audit(sink.clone());
        let outcome = invoker
            .invoke_with(call, None, &policy, &CancellationToken::new())
            .await;
        (outcome, sink)
    }

    #[tokio::test]
    async fn clean_response_succeeds_on_the_first_attempt() {
        let script = vec![Scripted::Respond(200, CLEAN_OK)];
        let (outcome, sink) = run(script, &status_call(), fast_policy(3)).await;

        let success = outcome.success().expect("expected success");
        assert_eq!(success.attempts, 1);
        assert!(!success.recovered_from_raw);
        assert_eq!(success.fields["exitoso"], "true");
        assert_eq!(success.message.as_deref(), Some("Servicio operativo"));
        assert_eq!(sink.attempts("verificarEstado").await, 1);
    }

    #[tokio::test]
    async fn network_failures_spend_every_allowed_attempt() {
        let script = vec![
            Scripted::Fail(TransportError::Connect("connection refused".into())),
            Scripted::Fail(TransportError::Connect("connection refused".into())),
            Scripted::Fail(TransportError::Connect("connection refused".into())),
        ];
        let (outcome, sink) = run(script, &status_call(), fast_policy(3)).await;

        let failure = outcome.failure().expect("expected failure");
        assert_eq!(failure.attempts, 3);
        assert!(failure.attempts_exhausted);
        assert!(!failure.was_truncated);
        assert!(matches!(failure.error, InvokeError::Network(_)));
        assert_eq!(sink.attempts("verificarEstado").await, 3);
    }

    #[tokio::test]
    async fn success_at_the_second_attempt_stops_the_loop() {
        let script = vec![
            Scripted::Fail(TransportError::Connect("connection refused".into())),
            Scripted::Respond(200, CLEAN_OK),
        ];
        let (outcome, sink) = run(script, &status_call(), fast_policy(3)).await;

        let success = outcome.success().expect("expected success");
        assert_eq!(success.attempts, 2);
        assert_eq!(sink.attempts("verificarEstado").await, 2);
    }

    #[tokio::test]
    async fn three_truncated_bodies_exhaust_and_mark_truncation() {
        let script = vec![
            Scripted::Respond(200, TRUNCATED_BODY),
            Scripted::Respond(200, TRUNCATED_BODY),
            Scripted::Respond(200, TRUNCATED_BODY),
        ];
        let (outcome, _) = run(script, &status_call(), fast_policy(3)).await;

        let failure = outcome.failure().expect("expected failure");
        assert_eq!(failure.error, InvokeError::Truncated);
        assert_eq!(failure.attempts, 3);
        assert!(failure.attempts_exhausted);
        assert!(failure.was_truncated);
    }

    #[tokio::test]
    async fn invalid_calls_are_never_dispatched() {
        let call = OperationCall::new("");
        let (outcome, sink) = run(Vec::new(), &call, fast_policy(3)).await;

        let failure = outcome.failure().expect("expected failure");
        assert!(matches!(failure.error, InvokeError::InvalidCall(_)));
        assert_eq!(failure.attempts, 0);
        assert!(!failure.attempts_exhausted);
        assert_eq!(sink.attempts("").await, 0);

        // Still one terminal record for diagnosis.
        let events = sink.events().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            AuditEvent::Outcome {
                summary: OutcomeSummary::Failed { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn timeout_then_truncation_then_clean_success() {
        let script = vec![
            Scripted::Hang,
            Scripted::Respond(200, TRUNCATED_BODY),
            Scripted::Respond(200, CLEAN_OK),
        ];
        let (outcome, sink) = run(script, &status_call(), fast_policy(3)).await;

        let success = outcome.success().expect("expected success");
        assert_eq!(success.attempts, 3);
        assert!(!success.recovered_from_raw);
        assert_eq!(sink.attempts("verificarEstado").await, 3);

        // Attempt records and dispositions interleave: two retries, one win.
        let events = sink.events().await;
        let retries = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    AuditEvent::Outcome {
                        summary: OutcomeSummary::Retrying { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn damaged_body_is_recovered_by_extraction() {
        let script = vec![Scripted::Respond(200, DAMAGED_RECOVERABLE)];
        let (outcome, _) = run(script, &article_call(), fast_policy(3)).await;

        let success = outcome.success().expect("expected success");
        assert!(success.recovered_from_raw);
        assert_eq!(success.fields["codigo"], "MART001");
        assert_eq!(success.fields["nombre"], "Martillo");
    }

    #[tokio::test]
    async fn server_rejection_in_a_damaged_body_carries_the_message() {
        let call = OperationCall::new("actualizarStock")
            .arg("codigo", "TORN042")
            .arg("nuevoStock", 10i64);
        let script = vec![Scripted::Respond(200, DAMAGED_REJECTION)];
        let (outcome, _) = run(script, &call, fast_policy(1)).await;

        let failure = outcome.failure().expect("expected failure");
        assert_eq!(
            failure.error,
            InvokeError::Rejected {
                message: "Stock insuficiente".into()
            }
        );
        assert!(failure.attempts_exhausted);
    }

    #[tokio::test]
    async fn error_status_with_a_clean_envelope_is_recovered_data() {
        let script = vec![Scripted::Respond(500, CLEAN_OK)];
        let (outcome, _) = run(script, &status_call(), fast_policy(1)).await;

        let success = outcome.success().expect("expected success");
        assert!(success.recovered_from_raw);
        assert_eq!(success.fields["mensaje"], "Servicio operativo");
    }

    #[tokio::test]
    async fn unsalvageable_error_status_reports_the_status() {
        let script = vec![Scripted::Respond(502, "<html>Bad Gateway</html>")];
        let (outcome, _) = run(script, &status_call(), fast_policy(1)).await;

        let failure = outcome.failure().expect("expected failure");
        assert_eq!(failure.error, InvokeError::Http { status: 502 });
    }

    #[tokio::test]
    async fn cancellation_before_dispatch_fails_without_retrying() {
        let sink = Arc::new(MemorySink::new());
        let invoker =
            Invoker::new(FakeTransport::new(vec![Scripted::Hang])).with_audit(sink.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = invoker
            .invoke_with(&status_call(), None, &fast_policy(3), &cancel)
            .await;

        let failure = outcome.failure().expect("expected failure");
        assert_eq!(failure.error, InvokeError::Cancelled);
        assert!(!failure.attempts_exhausted);
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn zero_max_attempts_still_runs_one() {
        let script = vec![Scripted::Respond(200, CLEAN_OK)];
        let (outcome, sink) = run(script, &status_call(), fast_policy(0)).await;

        assert!(outcome.is_success());
        assert_eq!(sink.attempts("verificarEstado").await, 1);
    }

    #[test]
    fn args_render_as_a_flat_json_object() {
        let call = OperationCall::new("insertarArticulo").arg(
            "articulo",
            ArgValue::Nested(vec![
                ("codigo".into(), "MART001".into()),
                ("stockActual".into(), ArgValue::Int(25)),
            ]),
        );
        let json = args_json(&call.args);
        assert_eq!(
            json,
            serde_json::json!({ "articulo": { "codigo": "MART001", "stockActual": 25 } })
        );
    }

    #[test]
    fn rejection_requires_a_real_server_message() {
        let fallback = InvokeError::Http { status: 500 };
        assert_eq!(
            rejection_or(None, fallback.clone()),
            InvokeError::Http { status: 500 }
        );
        assert_eq!(
            rejection_or(Some(NO_DATA_MESSAGE.into()), fallback.clone()),
            InvokeError::Http { status: 500 }
        );
        assert_eq!(
            rejection_or(Some("denegado".into()), fallback),
            InvokeError::Rejected {
                message: "denegado".into()
            }
        );
    }
}
