//! Cold-start connectivity probe.
//!
//! Ready endpoints do not guarantee the process behind them accepts
//! connections yet. Before forwarding a cold-start request, open (and drop)
//! a TCP connection to the target, retrying with backoff until the overall
//! deadline.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::config::ColdStartConfig;
use crate::net::resolver::Resolver;
use crate::resilience::backoff::calculate_backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Overall budget across all attempts.
    pub timeout: Duration,
    /// Budget for one resolve + connect.
    pub attempt_timeout: Duration,
    /// First backoff delay.
    pub base_delay: Duration,
}

impl From<&ColdStartConfig> for ProbeSettings {
    fn from(config: &ColdStartConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.probe_timeout_ms),
            attempt_timeout: Duration::from_millis(config.probe_attempt_timeout_ms),
            base_delay: Duration::from_millis(config.probe_base_delay_ms),
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from(&ColdStartConfig::default())
    }
}

/// Connect to `authority` until one attempt succeeds. Returns the number of
/// attempts made, or the last error once the deadline passes.
pub async fn probe(
    resolver: &Resolver,
    authority: &str,
    settings: ProbeSettings,
) -> io::Result<u32> {
    let deadline = Instant::now() + settings.timeout;
    let mut attempt: u32 = 0;
    let mut last_attempt = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let budget = settings.attempt_timeout.min(remaining);
        let error = match tokio::time::timeout(budget, connect(resolver, authority)).await {
            Ok(Ok(())) => {
                tracing::debug!(authority = %authority, attempts = attempt + 1, "Cold-start probe connected");
                return Ok(attempt + 1);
            }
            Ok(Err(e)) => e,
            Err(_) => io::Error::new(io::ErrorKind::TimedOut, "connect attempt timed out"),
        };

        let delay = calculate_backoff(attempt, settings.base_delay);
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if last_attempt || remaining.is_zero() {
            tracing::warn!(
                authority = %authority,
                attempts = attempt,
                error = %error,
                "Cold-start probe gave up"
            );
            return Err(error);
        }

        // A backoff reaching past the deadline is cut short so one final
        // attempt still starts in time.
        let pause = if delay >= remaining {
            last_attempt = true;
            remaining - settings.attempt_timeout.min(remaining / 2)
        } else {
            delay
        };
        tracing::debug!(authority = %authority, attempt = attempt, delay = ?pause, error = %error, "Cold-start probe retrying");
        tokio::time::sleep(pause).await;
    }
}

async fn connect(resolver: &Resolver, authority: &str) -> io::Result<()> {
    let addrs = resolver.resolve_authority(authority).await?;
    let stream = TcpStream::connect(&addrs[..]).await?;
    drop(stream);
    Ok(())
}
