pub mod config;
pub mod process;
pub mod supervisor;

pub use config::{LauncherConfig, ProcessSpec};
pub use process::{ManagedProcess, shutdown_all};
pub use supervisor::{Outcome, Supervisor};
