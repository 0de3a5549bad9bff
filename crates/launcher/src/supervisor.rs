use crate::config::LauncherConfig;
use crate::process::{ManagedProcess, shutdown_all};
use anyhow::Context;
use common::{WaitOptions, wait_for_resource};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every child exited on its own.
    ChildrenExited,
    /// SIGINT/SIGTERM received; children were stopped.
    Interrupted,
}

/// Starts the API, waits for it to accept connections, starts the frontend,
/// then watches both until they exit or a shutdown is requested.
pub struct Supervisor {
    config: LauncherConfig,
    shutdown: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new(config: LauncherConfig, shutdown: Arc<AtomicBool>) -> Self {
        Self { config, shutdown }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn stop(&self, processes: &mut [ManagedProcess]) {
        shutdown_all(processes, self.config.grace_period, self.config.poll_interval);
    }

    pub fn run(&self) -> anyhow::Result<Outcome> {
        let api_addr = resolve(&self.config.api_address)?;

        let mut processes = vec![ManagedProcess::spawn(&self.config.api)?];

        if let Err(e) = self.wait_for_api(api_addr, &mut processes[0]) {
            self.stop(&mut processes);
            if self.shutdown_requested() {
                tracing::info!("Shutdown requested before the API was ready");
                return Ok(Outcome::Interrupted);
            }
            return Err(e);
        }

        match ManagedProcess::spawn(&self.config.frontend) {
            Ok(frontend) => processes.push(frontend),
            Err(e) => {
                self.stop(&mut processes);
                return Err(e);
            }
        }

        Ok(self.supervise(&mut processes))
    }

    fn wait_for_api(&self, addr: SocketAddr, api: &mut ManagedProcess) -> anyhow::Result<()> {
        let options = WaitOptions::new(self.config.poll_interval, Some(self.config.ready_timeout));

        wait_for_resource(
            || TcpStream::connect_timeout(&addr, self.config.poll_interval),
            options,
            "API",
            || {
                if self.shutdown_requested() {
                    return Some("shutdown requested".to_string());
                }
                match api.try_wait() {
                    Ok(Some(status)) => Some(format!("API exited early ({})", status)),
                    Ok(None) => None,
                    Err(e) => Some(format!("{:#}", e)),
                }
            },
        )?;

        Ok(())
    }

    fn supervise(&self, processes: &mut [ManagedProcess]) -> Outcome {
        let mut reported = vec![false; processes.len()];

        loop {
            if self.shutdown_requested() {
                tracing::info!("Shutdown requested, stopping children");
                self.stop(processes);
                return Outcome::Interrupted;
            }

            for (process, reported) in processes.iter_mut().zip(reported.iter_mut()) {
                if *reported {
                    continue;
                }
                match process.try_wait() {
                    Ok(Some(status)) => {
                        tracing::info!(name = %process.name(), %status, "Process exited");
                        *reported = true;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(name = %process.name(), error = %e, "Lost track of process");
                        *reported = true;
                    }
                }
            }

            if reported.iter().all(|r| *r) {
                tracing::info!("All processes exited");
                return Outcome::ChildrenExited;
            }

            std::thread::sleep(self.config.poll_interval);
        }
    }
}

fn resolve(address: &str) -> anyhow::Result<SocketAddr> {
    address
        .to_socket_addrs()
        .with_context(|| format!("Invalid API address: {}", address))?
        .next()
        .with_context(|| format!("API address resolved to nothing: {}", address))
}
