use anyhow::Context;
use common::Environment;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_FRONTEND_DIR: &str = "frontend";
pub const DEFAULT_FRONTEND_COMMAND: &str = "npm run dev";
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Name of the inference service binary, expected next to the launcher.
const API_BINARY: &str = "api";

/// A child process to start: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl ProcessSpec {
    /// Build a spec from a whitespace-separated command line.
    pub fn from_command(name: &str, command: &str) -> anyhow::Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .with_context(|| format!("Empty command for {}", name))?;

        Ok(Self {
            name: name.to_string(),
            program,
            args: parts.collect(),
            working_dir: None,
        })
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub environment: Environment,
    pub api: ProcessSpec,
    pub frontend: ProcessSpec,
    /// Address probed with a TCP connect to decide the API is up.
    pub api_address: String,
    pub ready_timeout: Duration,
    pub grace_period: Duration,
    pub poll_interval: Duration,
}

impl LauncherConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let api = match env::var("LAUNCHER_API_COMMAND") {
            Ok(command) => ProcessSpec::from_command("api", &command)?,
            Err(_) => ProcessSpec::from_command("api", &default_api_program())?,
        };

        let frontend_command = env::var("LAUNCHER_FRONTEND_COMMAND")
            .unwrap_or_else(|_| DEFAULT_FRONTEND_COMMAND.to_string());
        let frontend_dir =
            env::var("LAUNCHER_FRONTEND_DIR").unwrap_or_else(|_| DEFAULT_FRONTEND_DIR.to_string());
        let frontend = ProcessSpec::from_command("frontend", &frontend_command)?.in_dir(frontend_dir);

        let api_address =
            env::var("LAUNCHER_API_ADDRESS").unwrap_or_else(|_| DEFAULT_API_ADDRESS.to_string());

        let ready_timeout = env::var("LAUNCHER_READY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_READY_TIMEOUT);

        let grace_period = env::var("LAUNCHER_GRACE_PERIOD_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_GRACE_PERIOD);

        Ok(Self {
            environment,
            api,
            frontend,
            api_address,
            ready_timeout,
            grace_period,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }
}

/// The `api` binary sitting beside the running executable, or `api` on `PATH`.
fn default_api_program() -> String {
    env::current_exe()
        .ok()
        .map(|exe| exe.with_file_name(API_BINARY))
        .filter(|path| path.exists())
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| API_BINARY.to_string())
}
