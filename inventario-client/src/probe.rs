//! Pre-flight reachability check.

use std::time::Duration;

/// Whether the service endpoint answers at all.
///
/// Sends one GET with its own short-lived client and the given timeout.
/// Returns `true` when any response with status below 500 arrives; a SOAP
/// endpoint typically answers a bare GET with 405 or a WSDL page, and
/// either proves the server is up. Connect failures, timeouts, and 5xx
/// all read as unreachable.
///
/// Advisory only. Callers use it to warn early; the invoker never
/// consults it and a `false` here must not block the real call.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// # async fn demo() {
/// let up = inventario_client::is_reachable(
///     "http://localhost:8080/InventarioService",
///     Duration::from_secs(5),
/// )
/// .await;
/// if !up {
///     eprintln!("service not responding; calls will be retried");
/// }
/// # }
/// ```
pub async fn is_reachable(endpoint: &str, timeout: Duration) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(0)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "probe client construction failed");
            return false;
        }
    };

    match client.get(endpoint).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            tracing::debug!(endpoint, status, "probe answered");
            status < 500
        }
        Err(e) => {
            tracing::debug!(endpoint, error = %e, "probe failed");
            false
        }
    }
}
