use crate::config::ProcessSpec;
use anyhow::Context;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};

/// A spawned child plus its exit status once observed.
pub struct ManagedProcess {
    name: String,
    child: Child,
    status: Option<ExitStatus>,
}

impl ManagedProcess {
    pub fn spawn(spec: &ProcessSpec) -> anyhow::Result<Self> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().with_context(|| {
            format!(
                "Failed to start {} ({} {})",
                spec.name,
                spec.program,
                spec.args.join(" ")
            )
        })?;

        tracing::info!(
            name = %spec.name,
            pid = child.id(),
            program = %spec.program,
            args = ?spec.args,
            "Process started"
        );

        Ok(Self {
            name: spec.name.clone(),
            child,
            status: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Exit status if the child has terminated. Never blocks.
    pub fn try_wait(&mut self) -> anyhow::Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self
                .child
                .try_wait()
                .with_context(|| format!("Failed to poll {}", self.name))?;
        }
        Ok(self.status)
    }

    pub fn is_running(&mut self) -> bool {
        // A child we can no longer poll is treated as gone
        matches!(self.try_wait(), Ok(None))
    }

    /// Ask the child to stop with SIGTERM.
    pub fn terminate(&mut self) -> anyhow::Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        match kill(Pid::from_raw(self.pid() as i32), Signal::SIGTERM) {
            // Exited between the poll and the signal
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to send SIGTERM to {}", self.name)),
        }
    }

    /// SIGKILL and reap.
    pub fn kill(&mut self) -> anyhow::Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        self.child
            .kill()
            .with_context(|| format!("Failed to kill {}", self.name))?;
        self.status = Some(
            self.child
                .wait()
                .with_context(|| format!("Failed to reap {}", self.name))?,
        );
        Ok(())
    }
}

/// SIGTERM every running child, wait up to `grace_period` for them to exit,
/// then SIGKILL whatever is left.
pub fn shutdown_all(processes: &mut [ManagedProcess], grace_period: Duration, poll_interval: Duration) {
    for process in processes.iter_mut() {
        if let Err(e) = process.terminate() {
            tracing::warn!(name = %process.name(), error = %e, "SIGTERM failed");
        }
    }

    let deadline = Instant::now() + grace_period;
    loop {
        let mut running = 0;
        for process in processes.iter_mut() {
            if process.is_running() {
                running += 1;
            }
        }

        if running == 0 || Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(poll_interval);
    }

    for process in processes.iter_mut() {
        if process.is_running() {
            tracing::warn!(
                name = %process.name(),
                pid = process.pid(),
                grace_ms = grace_period.as_millis() as u64,
                "Process ignored SIGTERM, killing"
            );
            if let Err(e) = process.kill() {
                tracing::error!(name = %process.name(), error = %e, "SIGKILL failed");
            }
        }

        if let Ok(Some(status)) = process.try_wait() {
            tracing::info!(name = %process.name(), %status, "Process stopped");
        }
    }
}
