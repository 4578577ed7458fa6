use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

use hello_pi::app::systemd::{SERVICE_NAME, ServiceController, ServiceUnit, Systemctl, WORKER_REL_PATH};
use hello_pi::config::{ConfigStore, Configuration};
use hello_pi::report::StatusReport;
use hello_pi::worker::Worker;
use tempfile::tempdir;

// Stub scripts must not be written while another test thread is mid-fork.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

fn install_worker(root: &Path) {
    fs::write(root.join(WORKER_REL_PATH), "").unwrap();
}

fn stub_systemctl(dir: &Path) -> PathBuf {
    let path = dir.join("systemctl");
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> \"{}\"\n",
        dir.join("calls.log").display()
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn saved_config_reaches_worker_after_restart() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let root = tempdir().unwrap();
    install_worker(root.path());
    let tool = stub_systemctl(root.path());

    let store = ConfigStore::new(root.path().join("etc/hello-pi/config.json"));
    let controller =
        ServiceController::new(ServiceUnit::new(SERVICE_NAME, root.path()), Systemctl::new(&tool));

    let config = Configuration {
        folder: "/data".into(),
        mode: "mode_b".into(),
        note: "hi".into(),
    };
    assert!(store.save(&config).ok);
    assert_eq!(controller.restart(), StatusReport::success(""));
    assert_eq!(calls(root.path()), vec!["restart hello-pi.service"]);

    let worker = Worker::new(store, Duration::from_secs(5));
    assert_eq!(worker.cycle(), config);
}

#[test]
fn panel_update_command_saves_and_restarts() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let root = tempdir().unwrap();
    install_worker(root.path());
    let tool = stub_systemctl(root.path());
    let config_path = root.path().join("config.json");

    let output = Command::new(env!("CARGO_BIN_EXE_hello-pi"))
        .arg("--install-root")
        .arg(root.path())
        .arg("--systemctl")
        .arg(&tool)
        .arg("--config")
        .arg(&config_path)
        .args(["update", "--folder", "/data", "--mode", "mode_b", "--note", " hi "])
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    assert_eq!(calls(root.path()), vec!["restart hello-pi.service"]);
    assert_eq!(
        ConfigStore::new(&config_path).load(),
        Configuration {
            folder: "/data".into(),
            mode: "mode_b".into(),
            note: "hi".into(),
        }
    );
}

#[test]
fn panel_start_without_worker_fails_before_systemctl() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let root = tempdir().unwrap();
    let tool = stub_systemctl(root.path());

    let output = Command::new(env!("CARGO_BIN_EXE_hello-pi"))
        .arg("--install-root")
        .arg(root.path())
        .arg("--systemctl")
        .arg(&tool)
        .arg("--config")
        .arg(root.path().join("config.json"))
        .arg("start")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Service script not found: "));
    assert!(calls(root.path()).is_empty());
}
