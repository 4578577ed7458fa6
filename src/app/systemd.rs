// Handles all interactions with the `systemctl` command.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, info, warn};

use crate::report::StatusReport;

pub const SERVICE_NAME: &str = "hello-pi.service";
/// Worker binary, relative to the install root.
pub const WORKER_REL_PATH: &str = "hello-pi-worker";
pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn verb(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ServiceAction::Start => "Start",
            ServiceAction::Stop => "Stop",
            ServiceAction::Restart => "Restart",
        }
    }
}

/// The managed unit. Built once at startup and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub name: String,
    pub script_path: PathBuf,
    pub unit_path: PathBuf,
}

impl ServiceUnit {
    pub fn new(name: impl Into<String>, install_root: &Path) -> Self {
        let name = name.into();
        Self {
            script_path: install_root.join(WORKER_REL_PATH),
            unit_path: Path::new(SYSTEMD_UNIT_DIR).join(&name),
            name,
        }
    }
}

/// Something that can drive one named unit through its lifecycle.
pub trait ServiceManager {
    fn start(&self, unit: &str) -> StatusReport;
    fn stop(&self, unit: &str) -> StatusReport;
    fn restart(&self, unit: &str) -> StatusReport;
    fn is_active(&self, unit: &str) -> StatusReport;
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("{0} not found")]
    ToolMissing(String),

    #[error("{tool} timed out after {after:?}")]
    TimedOut { tool: String, after: Duration },

    #[error("{0}")]
    Spawn(#[from] io::Error),
}

/// Raw result of one init-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Trimmed stdout, or trimmed stderr when stdout is empty.
    pub fn message(&self) -> &str {
        let stdout = self.stdout.trim();
        if stdout.is_empty() {
            self.stderr.trim()
        } else {
            stdout
        }
    }
}

impl From<CommandOutput> for StatusReport {
    fn from(output: CommandOutput) -> Self {
        StatusReport {
            ok: output.success,
            message: output.message().to_string(),
        }
    }
}

/// Adapter over the `systemctl` command line. One attempt per call, bounded
/// by `timeout`.
#[derive(Debug, Clone)]
pub struct Systemctl {
    program: PathBuf,
    timeout: Duration,
}

impl Default for Systemctl {
    fn default() -> Self {
        Self::new("systemctl")
    }
}

impl Systemctl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Runs `systemctl <args>` and folds every outcome into a report.
    pub fn run(&self, args: &[&str]) -> StatusReport {
        match self.execute(args) {
            Ok(output) => {
                if !output.success {
                    debug!("systemctl {:?} exited non-zero: {}", args, output.message());
                }
                output.into()
            }
            Err(e) => {
                warn!("systemctl {:?} failed: {}", args, e);
                StatusReport::failure(e.to_string())
            }
        }
    }

    /// Spawns the tool and collects both streams. The timeout covers the whole
    /// call, including descendants that keep the pipes open after the tool
    /// itself exits; the child is killed when it fires.
    pub fn execute(&self, args: &[&str]) -> Result<CommandOutput, ControlError> {
        debug!("Executing: {} {:?}", self.program.display(), args);

        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let output = match runtime.block_on(async { time::timeout(self.timeout, cmd.output()).await }) {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ControlError::ToolMissing(self.tool_name()));
            }
            Ok(Err(e)) => return Err(ControlError::Spawn(e)),
            Err(_) => {
                return Err(ControlError::TimedOut {
                    tool: self.tool_name(),
                    after: self.timeout,
                });
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl ServiceManager for Systemctl {
    fn start(&self, unit: &str) -> StatusReport {
        self.run(&["start", unit])
    }

    fn stop(&self, unit: &str) -> StatusReport {
        self.run(&["stop", unit])
    }

    fn restart(&self, unit: &str) -> StatusReport {
        self.run(&["restart", unit])
    }

    fn is_active(&self, unit: &str) -> StatusReport {
        self.run(&["is-active", unit])
    }
}

/// Mediates everything the panel does to the worker unit.
pub struct ServiceController<M = Systemctl> {
    unit: ServiceUnit,
    manager: M,
}

impl<M: ServiceManager> ServiceController<M> {
    pub fn new(unit: ServiceUnit, manager: M) -> Self {
        Self { unit, manager }
    }

    pub fn unit(&self) -> &ServiceUnit {
        &self.unit
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Only checks that the worker binary is present. No unit file is written;
    /// the unit is expected to be installed already.
    pub fn ensure_installed(&self) -> StatusReport {
        if !self.unit.script_path.exists() {
            return StatusReport::failure(format!(
                "Service script not found: {}",
                self.unit.script_path.display()
            ));
        }
        StatusReport::success(format!(
            "Service already installed: {}",
            self.unit.unit_path.display()
        ))
    }

    pub fn start(&self) -> StatusReport {
        self.perform(ServiceAction::Start)
    }

    pub fn restart(&self) -> StatusReport {
        self.perform(ServiceAction::Restart)
    }

    pub fn stop(&self) -> StatusReport {
        self.perform(ServiceAction::Stop)
    }

    /// `ok` is the exit code of `is-active`; read `message` for the state.
    pub fn status(&self) -> StatusReport {
        self.manager.is_active(&self.unit.name)
    }

    pub fn perform(&self, action: ServiceAction) -> StatusReport {
        if action != ServiceAction::Stop {
            let installed = self.ensure_installed();
            if !installed.ok {
                warn!("Refusing to {} {}: {}", action.verb(), self.unit.name, installed.message);
                return installed;
            }
        }

        info!("Requesting {} of {}", action.verb(), self.unit.name);
        match action {
            ServiceAction::Start => self.manager.start(&self.unit.name),
            ServiceAction::Stop => self.manager.stop(&self.unit.name),
            ServiceAction::Restart => self.manager.restart(&self.unit.name),
        }
    }
}
