use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl WaitOptions {
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

/// Poll `connect` until it succeeds.
///
/// `abort` is checked before every attempt; returning `Some(reason)` stops
/// the wait with an error carrying that reason. Used when the thing being
/// waited on can die (a child process) or the caller was asked to shut down.
pub fn wait_for_resource<F, T, E, A>(
    mut connect: F,
    options: WaitOptions,
    resource_name: &str,
    mut abort: A,
) -> anyhow::Result<T>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
    A: FnMut() -> Option<String>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        if let Some(reason) = abort() {
            anyhow::bail!("Stopped waiting for {}: {}", resource_name, reason);
        }

        attempts += 1;
        match connect() {
            Ok(resource) => {
                tracing::info!(
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "{} ready",
                    resource_name
                );
                return Ok(resource);
            }
            Err(e) => {
                tracing::debug!("Waiting for {} ({})", resource_name, e);
            }
        }

        if let Some(timeout) = options.timeout {
            if started.elapsed() >= timeout {
                anyhow::bail!(
                    "{} not ready after {:.1}s ({} attempts)",
                    resource_name,
                    timeout.as_secs_f64(),
                    attempts
                );
            }
        }

        std::thread::sleep(options.poll_interval);
    }
}
