//! Readiness probe used while a server is starting.

use crate::error::{Error, Result};
use crate::server::HEALTH_PATH;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Delay between two probe attempts.
pub const PROBE_INTERVAL: Duration = Duration::from_millis(50);
/// Upper bound for a single probe attempt.
pub const PROBE_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(200);

/// Poll `GET {base_url}/_health` until it answers 200 or `timeout` elapses.
///
/// `still_alive` runs before every attempt and once more after the first
/// successful answer; its error ends the wait immediately.
pub async fn wait_until_ready<F>(
    client: &reqwest::Client,
    base_url: &str,
    timeout: Duration,
    mut still_alive: F,
) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let url = format!("{}{}", base_url.trim_end_matches('/'), HEALTH_PATH);
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        still_alive()?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let attempt_timeout = remaining.min(PROBE_ATTEMPT_TIMEOUT);

        if !attempt_timeout.is_zero() {
            match client.get(&url).timeout(attempt_timeout).send().await {
                Ok(resp) if resp.status().is_success() => {
                    still_alive()?;
                    debug!("{} ready after {} probe(s)", base_url, attempts);
                    return Ok(());
                }
                Ok(resp) => trace!("Probe {} answered {}", url, resp.status()),
                Err(e) => trace!("Probe {} failed: {}", url, e),
            }
        }

        if Instant::now() + PROBE_INTERVAL >= deadline {
            return Err(Error::Connectivity {
                address: base_url.to_string(),
                timeout,
            });
        }
        tokio::time::sleep(PROBE_INTERVAL).await;
    }
}
