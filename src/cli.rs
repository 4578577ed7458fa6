//! Command-line argument definitions (clap) for the panel and the worker.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::app::systemd::{SERVICE_NAME, ServiceUnit, Systemctl};
use crate::config::{ConfigStore, Configuration, DEFAULT_CONFIG_PATH, DEFAULT_MODE};

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Shared config file read by the worker
    #[arg(long, env = "HELLO_PI_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,
}

impl CommonArgs {
    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(&self.config)
    }
}

#[derive(Parser, Debug)]
#[command(name = "hello-pi")]
#[command(version, about = "Control panel for the hello-pi background service", long_about = None)]
pub struct PanelArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// systemd unit to manage
    #[arg(long, default_value = SERVICE_NAME)]
    pub unit: String,

    /// Directory holding the worker binary [default: directory of this executable]
    #[arg(long = "install-root")]
    pub install_root: Option<PathBuf>,

    /// systemctl executable
    #[arg(long, env = "HELLO_PI_SYSTEMCTL", default_value = "systemctl")]
    pub systemctl: PathBuf,

    /// Give up on a systemctl call after this many seconds
    #[arg(long = "timeout-secs", default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Write logs here; the UI owns the terminal so nothing is logged otherwise
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<PanelCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    /// Print `systemctl is-active` for the unit
    Status,
    /// Start the unit
    Start,
    /// Stop the unit
    Stop,
    /// Restart the unit
    Restart,
    /// Print the shared config as JSON
    ShowConfig,
    /// Save new settings and restart the unit
    Update {
        #[arg(long, default_value = "")]
        folder: String,
        #[arg(long, default_value = DEFAULT_MODE)]
        mode: String,
        #[arg(long, default_value = "")]
        note: String,
    },
}

impl PanelCommand {
    /// Settings carried by `update`, trimmed like the form does.
    pub fn configuration(&self) -> Option<Configuration> {
        match self {
            PanelCommand::Update { folder, mode, note } => Some(
                Configuration {
                    folder: folder.clone(),
                    mode: mode.clone(),
                    note: note.clone(),
                }
                .trimmed(),
            ),
            _ => None,
        }
    }
}

impl PanelArgs {
    pub fn install_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.install_root {
            return Ok(root.clone());
        }
        let exe = std::env::current_exe().context("Cannot determine executable path")?;
        exe.parent()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Cannot determine executable directory"))
    }

    pub fn service_unit(&self) -> Result<ServiceUnit> {
        Ok(ServiceUnit::new(self.unit.clone(), &self.install_root()?))
    }

    pub fn systemctl(&self) -> Systemctl {
        Systemctl::new(&self.systemctl).with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Parser, Debug)]
#[command(name = "hello-pi-worker")]
#[command(version, about = "Background worker for the hello-pi service", long_about = None)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Seconds to sleep between cycles
    #[arg(long = "interval-secs", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,
}
