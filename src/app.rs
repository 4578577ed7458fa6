// The central application controller and event loop.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::Backend};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

pub mod model;
pub mod systemd;
pub mod ui;

use crate::config::ConfigStore;
use model::{FolderBrowser, Focus, Form, Notice, status_line};
use systemd::{ServiceAction, ServiceController, ServiceManager};

/// How often the status line re-queries the unit.
pub const STATUS_REFRESH: Duration = Duration::from_secs(3);

pub struct App<M> {
    controller: ServiceController<M>,
    store: ConfigStore,
    form: Form,
    status: String,
    notices: Vec<Notice>,
    browser: Option<FolderBrowser>,
    should_quit: bool,
}

impl<M: ServiceManager> App<M> {
    /// Seeds the form from whatever config is on disk right now.
    pub fn new(controller: ServiceController<M>, store: ConfigStore) -> Self {
        let form = Form::from_config(&store.load());
        Self {
            controller,
            store,
            form,
            status: "Status: (checking...)".to_string(),
            notices: Vec::new(),
            browser: None,
            should_quit: false,
        }
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        // Initial fetch
        self.refresh_status();

        let mut last_tick = Instant::now();

        loop {
            let title = self.controller.unit().name.as_str();
            terminal.draw(|f| {
                ui::render(
                    f,
                    title,
                    &self.form,
                    &self.status,
                    self.notices.first(),
                    self.browser.as_mut(),
                )
            })?;

            let timeout = STATUS_REFRESH
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if last_tick.elapsed() >= STATUS_REFRESH {
                self.refresh_status();
                last_tick = Instant::now();
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn browser(&self) -> Option<&FolderBrowser> {
        self.browser.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl {
            match key.code {
                KeyCode::Char('q') | KeyCode::Char('c') => self.should_quit = true,
                // Service actions wait until the open notice is dismissed.
                _ if !self.notices.is_empty() => {}
                KeyCode::Char('s') => self.perform_action(ServiceAction::Start),
                KeyCode::Char('x') => self.perform_action(ServiceAction::Stop),
                KeyCode::Char('r') => self.perform_action(ServiceAction::Restart),
                _ => {}
            }
            return;
        }

        if !self.notices.is_empty() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.notices.remove(0);
            }
            return;
        }

        if self.browser.is_some() {
            self.handle_browser_key(key.code);
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.form.focus = self.form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus = self.form.focus.previous(),
            code => self.handle_field_key(code),
        }
    }

    fn handle_field_key(&mut self, code: KeyCode) {
        match (self.form.focus, code) {
            (Focus::Folder, KeyCode::Enter) => self.open_browser(),
            (Focus::Note, KeyCode::Enter) => self.form.focus = Focus::Update,
            (Focus::Mode, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                self.form.toggle_mode()
            }
            (Focus::Update, KeyCode::Enter | KeyCode::Char(' ')) => self.update(),
            (_, KeyCode::Char(c)) => {
                if let Some(text) = self.form.focused_text_mut() {
                    text.push(c);
                }
            }
            (_, KeyCode::Backspace) => {
                if let Some(text) = self.form.focused_text_mut() {
                    text.pop();
                }
            }
            _ => {}
        }
    }

    fn handle_browser_key(&mut self, code: KeyCode) {
        let Some(browser) = self.browser.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.browser = None,
            KeyCode::Char('j') | KeyCode::Down => browser.next(),
            KeyCode::Char('k') | KeyCode::Up => browser.previous(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => browser.enter_selected(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => browser.go_up(),
            KeyCode::Char('s') | KeyCode::Char(' ') => {
                self.form.folder = browser.dir.to_string_lossy().into_owned();
                self.browser = None;
            }
            _ => {}
        }
    }

    fn open_browser(&mut self) {
        let start = if self.form.folder.trim().is_empty() {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/"))
        } else {
            PathBuf::from(self.form.folder.trim())
        };
        self.browser = Some(FolderBrowser::open(&start));
    }

    /// Saves the form, then restarts the unit so the worker picks it up. The
    /// restart goes ahead even when the save failed.
    pub fn update(&mut self) {
        let config = self.form.to_config();
        info!(
            "Updating config: folder={:?} mode={:?} note={:?}",
            config.folder, config.mode, config.note
        );
        let saved = self.store.save(&config);
        if !saved.ok {
            self.notify("Config Save Failed", saved.message);
        }
        self.perform_action(ServiceAction::Restart);
    }

    pub fn perform_action(&mut self, action: ServiceAction) {
        let report = self.controller.perform(action);
        if !report.ok {
            self.notify(format!("{} failed", action.title()), report.message);
        }
        self.refresh_status();
    }

    pub fn refresh_status(&mut self) {
        self.status = status_line(&self.controller.status());
    }

    fn notify(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notices.push(Notice {
            title: title.into(),
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::report::StatusReport;
    use std::fs;
    use systemd::ServiceUnit;
    use systemd::tests::{FakeManager, installed_root};
    use tempfile::tempdir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App<FakeManager>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn app_with(root: &std::path::Path, store: ConfigStore, reply: StatusReport) -> App<FakeManager> {
        let controller = ServiceController::new(
            ServiceUnit::new(systemd::SERVICE_NAME, root),
            FakeManager::replying(reply),
        );
        App::new(controller, store)
    }

    fn calls(app: &App<FakeManager>) -> Vec<String> {
        app.controller.manager().calls.borrow().clone()
    }

    #[test]
    fn form_is_seeded_from_disk() {
        let root = installed_root();
        let store = ConfigStore::new(root.path().join("config.json"));
        fs::write(store.path(), r#"{"folder": "/mnt/usb", "mode": "mode_b"}"#).unwrap();

        let app = app_with(root.path(), store, StatusReport::success("active"));
        assert_eq!(app.form().folder, "/mnt/usb");
        assert_eq!(app.form().mode, "mode_b");
        assert_eq!(app.form().note, "");
        assert_eq!(app.status(), "Status: (checking...)");
    }

    #[test]
    fn editing_and_update_saves_then_restarts() {
        let root = installed_root();
        let store = ConfigStore::new(root.path().join("etc/config.json"));
        let mut app = app_with(root.path(), store.clone(), StatusReport::success("active"));

        type_text(&mut app, " /data ");
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "hix");
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.form().focus, Focus::Update);
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(
            store.load(),
            Configuration {
                folder: "/data".into(),
                mode: "mode_b".into(),
                note: "hi".into(),
            }
        );
        assert_eq!(
            calls(&app),
            vec!["restart hello-pi.service", "is-active hello-pi.service"]
        );
        assert!(app.notices().is_empty());
        assert_eq!(app.status(), "Status: active");
    }

    #[test]
    fn failed_save_still_restarts_and_queues_notices() {
        let root = tempdir().unwrap();
        let blocker = root.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = ConfigStore::new(blocker.join("config.json"));
        let mut app = app_with(root.path(), store, StatusReport::success("inactive"));

        app.update();

        let titles: Vec<_> = app.notices().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Config Save Failed", "Restart failed"]);
        assert!(app.notices()[1].message.starts_with("Service script not found: "));
        // Worker binary is missing, so only the status query reached systemd.
        assert_eq!(calls(&app), vec!["is-active hello-pi.service"]);

        app.handle_key(key(KeyCode::Char('z')));
        assert_eq!(app.notices().len(), 2);
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Esc));
        assert!(app.notices().is_empty());
        assert!(!app.should_quit());
    }

    #[test]
    fn control_shortcuts_drive_the_unit() {
        let root = installed_root();
        let store = ConfigStore::new(root.path().join("config.json"));
        let mut app = app_with(root.path(), store, StatusReport::success(""));

        app.handle_key(ctrl('s'));
        app.handle_key(ctrl('x'));
        app.handle_key(ctrl('r'));
        assert_eq!(
            calls(&app),
            vec![
                "start hello-pi.service",
                "is-active hello-pi.service",
                "stop hello-pi.service",
                "is-active hello-pi.service",
                "restart hello-pi.service",
                "is-active hello-pi.service",
            ]
        );

        app.handle_key(ctrl('q'));
        assert!(app.should_quit());
    }

    #[test]
    fn service_shortcuts_are_ignored_while_notice_is_open() {
        let root = tempdir().unwrap();
        let store = ConfigStore::new(root.path().join("config.json"));
        let mut app = app_with(root.path(), store, StatusReport::success(""));

        app.handle_key(ctrl('s'));
        assert_eq!(app.notices().len(), 1);
        let before = calls(&app);

        app.handle_key(ctrl('r'));
        app.handle_key(ctrl('x'));
        assert_eq!(calls(&app), before);
        assert_eq!(app.notices().len(), 1);

        app.handle_key(ctrl('c'));
        assert!(app.should_quit());
    }

    #[test]
    fn failed_status_folds_into_status_line() {
        let root = installed_root();
        let store = ConfigStore::new(root.path().join("config.json"));
        let mut app = app_with(root.path(), store, StatusReport::failure("systemctl not found"));

        app.refresh_status();
        assert_eq!(app.status(), "Status: unknown (systemctl not found)");
        assert!(app.notices().is_empty());
    }

    #[test]
    fn folder_browser_picks_a_directory() {
        let root = installed_root();
        fs::create_dir(root.path().join("photos")).unwrap();
        let store = ConfigStore::new(root.path().join("config.json"));
        let mut app = app_with(root.path(), store, StatusReport::success(""));

        type_text(&mut app, &root.path().to_string_lossy());
        app.handle_key(key(KeyCode::Enter));
        assert!(app.browser().is_some());
        assert_eq!(app.browser().unwrap().entries, vec!["photos"]);

        // Typing does not leak into the form while browsing.
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('s')));
        assert!(app.browser().is_none());
        assert_eq!(app.form().folder, root.path().join("photos").to_string_lossy());

        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Esc));
        assert!(app.browser().is_none());
        assert!(!app.should_quit());
    }
}
