//! Integration tests for tox-edm

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[cfg(unix)]
const EXECUTABLE_NAME: &str = "tox-edm";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tox-edm.exe";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Isolated home, config and project directory; on Unix a fake edm as well.
struct EdmHarness {
    home: TempDir,
    config_path: PathBuf,
    project_dir: PathBuf,
    state_dir: PathBuf,
    call_log: PathBuf,
}

impl EdmHarness {
    fn new() -> io::Result<Self> {
        let home = TempDir::new()?;
        let project_dir = home.path().join("project");
        fs::create_dir_all(&project_dir)?;
        fs::copy(
            fixture_path("tox-edm.toml"),
            project_dir.join("tox-edm.toml"),
        )?;

        let state_dir = home.path().join("edm-envs");
        fs::create_dir_all(&state_dir)?;
        let call_log = home.path().join("edm-calls.log");

        let edm_path = install_fake_edm(home.path())?;
        let config_path = home.path().join("tox-edm-config.toml");
        fs::write(
            &config_path,
            format!("edm_path = '{}'\n", edm_path.to_string_lossy()),
        )?;

        Ok(EdmHarness {
            home,
            config_path,
            project_dir,
            state_dir,
            call_log,
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("tox-edm").unwrap();
        cmd.current_dir(&self.project_dir)
            .env("HOME", self.home.path())
            .env("TOX_EDM_CONFIG", &self.config_path)
            .env("FAKE_EDM_STATE", &self.state_dir)
            .env("FAKE_EDM_LOG", &self.call_log)
            .env("NO_COLOR", "1");
        cmd
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.call_log)
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[cfg(unix)]
fn install_fake_edm(dir: &Path) -> io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = dir.join("edm-bin");
    fs::create_dir_all(&bin_dir)?;
    let edm = bin_dir.join("edm");
    fs::copy(fixture_path("fake-edm.sh"), &edm)?;
    let mut perms = fs::metadata(&edm)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&edm, perms)?;
    Ok(edm)
}

#[cfg(windows)]
fn install_fake_edm(dir: &Path) -> io::Result<PathBuf> {
    Ok(dir.join("edm-bin").join("edm.exe"))
}

#[test]
fn test_version() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tox-edm"));
}

#[test]
fn test_help() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Enthought Deployment Manager"));
}

#[test]
fn test_invalid_command() {
    let env = EdmHarness::new().expect("harness");
    env.command().arg("invalid").assert().failure();
}

#[test]
fn test_run_help() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "Usage: {} run",
            EXECUTABLE_NAME
        )));
}

#[test]
fn test_config_path() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tox-edm-config.toml"));
}

#[test]
fn test_config_show() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration:"))
        .stdout(predicate::str::contains("edm-path"));
}

#[test]
fn test_missing_project_file() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["--file", "absent.toml", "create", "py38"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project file not found"));
}

#[test]
fn test_unknown_environment() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["create", "py99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'py99' is not defined"));
}

#[test]
#[cfg(unix)]
fn test_python_for_missing_environment() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["python", "py38"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    assert_eq!(env.calls(), vec!["envs exists py38"]);
}

#[test]
#[cfg(unix)]
fn test_create_then_python() {
    let env = EdmHarness::new().expect("harness");
    env.command().args(["create", "py38"]).assert().success();
    assert_eq!(
        env.calls(),
        vec![
            "envs exists py38",
            "envs create py38 --version 3.8",
            "prefix -e py38",
        ]
    );

    env.command()
        .args(["python", "py38"])
        .assert()
        .success()
        .stdout(predicate::str::contains("py38/bin/python"));
}

#[test]
#[cfg(unix)]
fn test_create_recreate() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["create", "py38", "--recreate"])
        .assert()
        .success();
    assert_eq!(env.calls()[0], "envs create py38 --force --version 3.8");
}

#[test]
#[cfg(unix)]
fn test_install_and_report() {
    let env = EdmHarness::new().expect("harness");
    env.command().args(["install", "py38"]).assert().success();
    assert_eq!(env.calls(), vec!["install -e py38 -y numpy pandas==1.0"]);

    env.command()
        .args(["report", "py38", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"numpy==1.0\""))
        .stdout(predicate::str::contains("Resolving").not());
}

#[test]
#[cfg(unix)]
fn test_run_ignores_marked_failure() {
    let env = EdmHarness::new().expect("harness");
    env.command().args(["run", "py38"]).assert().success();
    assert_eq!(
        env.calls(),
        vec!["run -e py38 -- true", "run -e py38 -- false", "run -e py38 -- true"]
    );
}

#[test]
#[cfg(unix)]
fn test_run_stops_after_failure() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["run", "py36-broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("commands failed"));
    assert_eq!(env.calls(), vec!["run -e py36-broken -- false"]);
}

#[test]
#[cfg(unix)]
fn test_full_lifecycle_summary() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .args(["test", "py38", "docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("py38: commands succeeded"))
        .stdout(predicate::str::contains("docs: ignored failed command"))
        .stdout(predicate::str::contains("congratulations"));
}

#[test]
#[cfg(unix)]
fn test_full_lifecycle_reports_failure() {
    let env = EdmHarness::new().expect("harness");
    env.command()
        .arg("test")
        .assert()
        .failure()
        .stdout(predicate::str::contains("py36-broken: commands failed"));
}

#[test]
#[cfg(unix)]
fn test_ctrl_c_reports_keyboard_interrupt() {
    use std::os::unix::process::CommandExt;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let env = EdmHarness::new().expect("harness");
    fs::write(
        env.project_dir.join("slow.toml"),
        "[env.py38]\ncommands = [[\"sleep\", \"5\"], [\"true\"]]\n",
    )
    .expect("project file");

    // Own process group, so the signal reaches tox-edm and the child together
    // the way a terminal Ctrl+C does.
    let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_tox-edm"))
        .args(["--file", "slow.toml", "run", "py38"])
        .current_dir(&env.project_dir)
        .env("HOME", env.home.path())
        .env("TOX_EDM_CONFIG", &env.config_path)
        .env("FAKE_EDM_STATE", &env.state_dir)
        .env("FAKE_EDM_LOG", &env.call_log)
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
        .expect("spawn tox-edm");

    let deadline = Instant::now() + Duration::from_secs(10);
    while !env.calls().iter().any(|call| call.ends_with("sleep 5")) {
        assert!(Instant::now() < deadline, "sleep was never started");
        std::thread::sleep(Duration::from_millis(50));
    }
    std::thread::sleep(Duration::from_millis(200));

    let status = std::process::Command::new("kill")
        .args(["-INT", "--", &format!("-{}", child.id())])
        .status()
        .expect("kill");
    assert!(status.success());

    let output = child.wait_with_output().expect("wait for tox-edm");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(130), "stderr: {}", stderr);
    assert!(stderr.contains("keyboardinterrupt"), "stderr: {}", stderr);
    assert_eq!(env.calls(), vec!["run -e py38 -- sleep 5"]);
}
