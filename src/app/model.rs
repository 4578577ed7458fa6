// Defines the core data structures for the panel.

use ratatui::widgets::ListState;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Configuration, Mode};
use crate::report::StatusReport;

/// Which form element receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Folder,
    Mode,
    Note,
    Update,
}

impl Focus {
    const ORDER: [Focus; 4] = [Focus::Folder, Focus::Mode, Focus::Note, Focus::Update];

    pub fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    pub fn previous(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// The editable copy of the config shown in the form.
#[derive(Debug, Clone)]
pub struct Form {
    pub folder: String,
    pub mode: String,
    pub note: String,
    pub focus: Focus,
}

impl Form {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            folder: config.folder.clone(),
            mode: config.mode.clone(),
            note: config.note.clone(),
            focus: Focus::Folder,
        }
    }

    /// What gets saved on "Update".
    pub fn to_config(&self) -> Configuration {
        Configuration {
            folder: self.folder.clone(),
            mode: self.mode.clone(),
            note: self.note.clone(),
        }
        .trimmed()
    }

    pub fn selected_mode(&self) -> Option<Mode> {
        self.to_config().known_mode()
    }

    /// Flips between the two offered modes. An unrecognized value switches to
    /// the first one.
    pub fn toggle_mode(&mut self) {
        let mode = match self.selected_mode() {
            Some(mode) => mode.toggled(),
            None => Mode::ModeA,
        };
        self.mode = mode.as_str().to_string();
    }

    pub fn focused_text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Folder => Some(&mut self.folder),
            Focus::Note => Some(&mut self.note),
            Focus::Mode | Focus::Update => None,
        }
    }
}

/// A modal message; the oldest one is shown until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// Status line text for the latest `is-active` result.
pub fn status_line(report: &StatusReport) -> String {
    if report.ok {
        format!("Status: {}", report.message)
    } else {
        format!("Status: unknown ({})", report.message)
    }
}

/// Directory picker popup standing in for a native folder dialog.
#[derive(Debug)]
pub struct FolderBrowser {
    pub dir: PathBuf,
    pub entries: Vec<String>,
    pub list_state: ListState,
}

impl FolderBrowser {
    pub fn open(start: &Path) -> Self {
        let dir = if start.is_dir() {
            start.to_path_buf()
        } else {
            PathBuf::from("/")
        };
        let mut browser = Self {
            dir,
            entries: Vec::new(),
            list_state: ListState::default(),
        };
        browser.refresh();
        browser
    }

    /// Re-reads the sub-directories of `dir`. Unreadable dirs show empty.
    pub fn refresh(&mut self) {
        let mut entries: Vec<String> = fs::read_dir(&self.dir)
            .map(|iter| {
                iter.filter_map(|e| e.ok())
                    .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();
        self.entries = entries;
        self.list_state
            .select(if self.entries.is_empty() { None } else { Some(0) });
    }

    pub fn next(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= self.entries.len().saturating_sub(1) {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        if !self.entries.is_empty() {
            self.list_state.select(Some(i));
        }
    }

    pub fn previous(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.entries.len().saturating_sub(1)
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        if !self.entries.is_empty() {
            self.list_state.select(Some(i));
        }
    }

    pub fn enter_selected(&mut self) {
        let Some(name) = self.list_state.selected().and_then(|i| self.entries.get(i)) else {
            return;
        };
        self.dir = self.dir.join(name);
        self.refresh();
    }

    pub fn go_up(&mut self) {
        if let Some(parent) = self.dir.parent() {
            self.dir = parent.to_path_buf();
            self.refresh();
        }
    }
}
