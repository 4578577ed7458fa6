// The JSON settings file shared by the control panel and the worker.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::report::StatusReport;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/hello-pi/config.json";
pub const DEFAULT_MODE: &str = "mode_a";

// A writer renaming into place can leave a reader holding a torn file for a
// moment; one retry after this pause covers it.
// The worker may run under a different user than the panel.
const CONFIG_FILE_MODE: u32 = 0o644;

const PARSE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// The three settings the worker acts on. Absent keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub folder: String,
    pub mode: String,
    pub note: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            folder: String::new(),
            mode: DEFAULT_MODE.to_string(),
            note: String::new(),
        }
    }
}

impl Configuration {
    /// Trims every field, the way the form hands values over on "Update".
    pub fn trimmed(&self) -> Self {
        Self {
            folder: self.folder.trim().to_string(),
            mode: self.mode.trim().to_string(),
            note: self.note.trim().to_string(),
        }
    }

    pub fn known_mode(&self) -> Option<Mode> {
        Mode::parse(&self.mode)
    }
}

/// The modes the panel offers. `Configuration::mode` stays a plain string so
/// values written by something else survive a load/save cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ModeA,
    ModeB,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::ModeA, Mode::ModeB];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mode_a" => Some(Mode::ModeA),
            "mode_b" => Some(Mode::ModeB),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::ModeA => "mode_a",
            Mode::ModeB => "mode_b",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::ModeA => "Mode A",
            Mode::ModeB => "Mode B",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::ModeA => Mode::ModeB,
            Mode::ModeB => Mode::ModeA,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Permission denied writing {}. {source}", .path.display())]
    PermissionDenied { path: PathBuf, source: io::Error },

    // Other write failures surface as the bare error text.
    #[error("{0}")]
    Write(#[from] io::Error),

    #[error("{0}")]
    Encode(#[from] serde_json::Error),
}

/// Single point of access to the config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, falling back to defaults on any failure. A missing
    /// file is the normal first-run case and is not logged above debug.
    pub fn load(&self) -> Configuration {
        match self.try_load() {
            Ok(config) => config,
            Err(ConfigError::Parse { .. }) => {
                thread::sleep(PARSE_RETRY_DELAY);
                match self.try_load() {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring unreadable config: {}", e);
                        Configuration::default()
                    }
                }
            }
            Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", self.path);
                Configuration::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable config: {}", e);
                Configuration::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<Configuration, ConfigError> {
        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, config: &Configuration) -> StatusReport {
        match self.try_save(config) {
            Ok(()) => {
                info!("Configuration saved to: {:?}", self.path);
                StatusReport::success(format!("Saved: {}", self.path.display()))
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                StatusReport::failure(e.to_string())
            }
        }
    }

    /// Writes pretty JSON to a uniquely named sibling and renames it over the
    /// target, so a polling reader sees either the old file or the new one.
    pub fn try_save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let mut content = serde_json::to_string_pretty(config)?;
        content.push('\n');

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // The temp file removes itself if anything fails before `persist`.
        let result = fs::create_dir_all(&dir).and_then(|_| {
            let mut temp = NamedTempFile::new_in(&dir)?;
            temp.write_all(content.as_bytes())?;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(CONFIG_FILE_MODE))?;
            temp.as_file().sync_all()?;
            temp.persist(&self.path).map(|_| ()).map_err(|e| e.error)
        });

        result.map_err(|source| {
            if source.kind() == io::ErrorKind::PermissionDenied {
                ConfigError::PermissionDenied {
                    path: self.path.clone(),
                    source,
                }
            } else {
                ConfigError::Write(source)
            }
        })
    }
}
