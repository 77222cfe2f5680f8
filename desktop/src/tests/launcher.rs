use crate::AppPaths;
use crate::backend::{
    BackendHandle, BackendSettings, BackendSource, DesktopLog, KillStrategy, LaunchConfig,
    ProcessLauncher, SupervisorError, VAR_DATABASE_PATH, VAR_ENV_FILE, VAR_LOG_DIR,
    VAR_SCHEDULE_ENABLED, VAR_UTF8, VAR_WEBUI_ENABLED,
};
use crate::tests::temp_paths;

use std::collections::BTreeMap;
use std::path::PathBuf;

use googletest::assert_that;
use googletest::prelude::{eq, some};
use tempfile::TempDir;

const PORT: u16 = 8123;

fn contract_args() -> Vec<String> {
    ["--serve-only", "--host", "127.0.0.1", "--port", "8123"]
        .map(String::from)
        .to_vec()
}

fn launch_config(paths: &AppPaths) -> LaunchConfig {
    LaunchConfig::for_app_dir(PORT, &paths.app_dir, BTreeMap::new())
}

// =========================================================================
// Resolution Tests
// =========================================================================

#[test]
fn given_existing_override_when_resolve_then_override_with_contract_args() {
    // Given
    let (temp, paths) = temp_paths();
    let exe = temp.path().join("bin").join("backend-exe");
    std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
    std::fs::write(&exe, "").unwrap();
    let settings = BackendSettings {
        executable: Some(exe.clone()),
        ..Default::default()
    };
    let launcher = ProcessLauncher::new(settings, paths.clone(), KillStrategy::Signal);

    // When
    let plan = launcher.resolve(&launch_config(&paths)).unwrap();

    // Then
    assert_that!(plan.source, eq(&BackendSource::Override(exe.clone())));
    assert_that!(plan.args, eq(&contract_args()));
    let canonical = std::fs::canonicalize(&exe).unwrap();
    assert_that!(plan.program, eq(&canonical));
    assert_that!(plan.working_dir, eq(&canonical.parent().unwrap().to_path_buf()));
}

#[test]
fn given_missing_override_when_resolve_then_backend_not_found() {
    let (temp, paths) = temp_paths();
    let missing = temp.path().join("does-not-exist");
    let settings = BackendSettings {
        executable: Some(missing.clone()),
        ..Default::default()
    };
    let launcher = ProcessLauncher::new(settings, paths.clone(), KillStrategy::Signal);

    let result = launcher.resolve(&launch_config(&paths));

    match result {
        Err(SupervisorError::BackendNotFound { path, .. }) => assert_that!(path, eq(&missing)),
        other => panic!("expected BackendNotFound, got {other:?}"),
    }
}

#[test]
fn given_packaged_layout_when_resolve_then_bundled_executable() {
    // Given
    let temp = TempDir::new().unwrap();
    let resources = temp.path().join("resources");
    let exe = resources
        .join("backend")
        .join(format!("stock_analysis{}", std::env::consts::EXE_SUFFIX));
    std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
    std::fs::write(&exe, "").unwrap();
    let paths = AppPaths::packaged(temp.path().to_path_buf(), resources);
    let launcher = ProcessLauncher::new(BackendSettings::default(), paths.clone(), KillStrategy::Signal);

    // When
    let plan = launcher.resolve(&launch_config(&paths)).unwrap();

    // Then
    assert_that!(plan.source, eq(&BackendSource::Bundled(exe)));
    assert_that!(plan.args, eq(&contract_args()));
}

#[test]
fn given_packaged_layout_without_executable_when_resolve_then_backend_not_found() {
    let temp = TempDir::new().unwrap();
    let resources = temp.path().join("resources");
    std::fs::create_dir_all(&resources).unwrap();
    let paths = AppPaths::packaged(temp.path().to_path_buf(), resources);
    let launcher = ProcessLauncher::new(BackendSettings::default(), paths.clone(), KillStrategy::Signal);

    let result = launcher.resolve(&launch_config(&paths));

    assert!(matches!(result, Err(SupervisorError::BackendNotFound { .. })));
}

#[test]
fn given_development_layout_when_resolve_then_interpreter_runs_script() {
    // Given
    let (_temp, paths) = temp_paths();
    let launcher = ProcessLauncher::new(BackendSettings::default(), paths.clone(), KillStrategy::Signal);

    // When
    let plan = launcher.resolve(&launch_config(&paths)).unwrap();

    // Then
    let script = paths.project_root.join("main.py");
    assert_that!(plan.program, eq(&PathBuf::from("python")));
    assert_that!(plan.args.first(), some(eq(&script.to_string_lossy().into_owned())));
    assert_that!(plan.args[1..].to_vec(), eq(&contract_args()));
    assert_that!(plan.working_dir, eq(&paths.project_root));
}

#[test]
fn given_configured_interpreter_when_resolve_then_used() {
    let (_temp, paths) = temp_paths();
    let settings = BackendSettings {
        interpreter: Some("python3.11".into()),
        ..Default::default()
    };
    let launcher = ProcessLauncher::new(settings, paths.clone(), KillStrategy::Signal);

    let plan = launcher.resolve(&launch_config(&paths)).unwrap();

    assert_that!(plan.program, eq(&PathBuf::from("python3.11")));
}

// =========================================================================
// Environment Tests
// =========================================================================

#[test]
fn given_launch_config_when_build_env_then_contract_variables_set() {
    // Given
    let (_temp, paths) = temp_paths();
    let config = launch_config(&paths);

    // When
    let env = ProcessLauncher::build_env(&config);

    // Then
    let app = &paths.app_dir;
    assert_that!(env.get(VAR_ENV_FILE), some(eq(&app.join(".env").to_string_lossy().into_owned())));
    assert_that!(
        env.get(VAR_DATABASE_PATH),
        some(eq(&app.join("data").join("stock_analysis.db").to_string_lossy().into_owned()))
    );
    assert_that!(env.get(VAR_LOG_DIR), some(eq(&app.join("logs").to_string_lossy().into_owned())));
    assert_that!(env.get(VAR_UTF8), some(eq(&"1".to_string())));
    assert_that!(env.get(VAR_SCHEDULE_ENABLED), some(eq(&"false".to_string())));
    assert_that!(env.get(VAR_WEBUI_ENABLED), some(eq(&"false".to_string())));
}

#[test]
fn given_extra_env_when_build_env_then_merged_and_contract_wins() {
    let (_temp, paths) = temp_paths();
    let extra = BTreeMap::from([
        ("HTTP_PROXY".to_string(), "http://proxy:3128".to_string()),
        (VAR_WEBUI_ENABLED.to_string(), "true".to_string()),
    ]);
    let config = LaunchConfig::for_app_dir(PORT, &paths.app_dir, extra);

    let env = ProcessLauncher::build_env(&config);

    assert_that!(env.get("HTTP_PROXY"), some(eq(&"http://proxy:3128".to_string())));
    assert_that!(env.get(VAR_WEBUI_ENABLED), some(eq(&"false".to_string())));
}

// =========================================================================
// Spawn Tests
// =========================================================================

#[tokio::test]
async fn given_missing_interpreter_when_launch_then_spawn_failed() {
    // Given
    let (temp, paths) = temp_paths();
    let settings = BackendSettings {
        interpreter: Some(temp.path().join("no-such-python").to_string_lossy().into_owned()),
        ..Default::default()
    };
    let launcher = ProcessLauncher::new(settings, paths.clone(), KillStrategy::Signal);
    let log = DesktopLog::open(&paths.app_dir);

    // When
    let result = launcher.launch(&launch_config(&paths), &log);

    // Then
    assert!(matches!(result, Err(SupervisorError::SpawnFailed { .. })));
    let lines = log.recent_lines(5);
    assert!(lines.iter().any(|l| l.contains("Launching backend (interpreter)")));
}

#[cfg(unix)]
#[tokio::test]
async fn given_chatty_process_when_launch_then_output_forwarded_to_log() {
    // Given: a shell script standing in for the backend
    let (temp, paths) = temp_paths();
    let script = temp.path().join("backend.sh");
    std::fs::write(&script, "#!/bin/sh\necho \"hello from stdout\"\necho \"oops\" >&2\nexit 3\n").unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    let settings = BackendSettings {
        executable: Some(script),
        ..Default::default()
    };
    let launcher = ProcessLauncher::new(settings, paths.clone(), KillStrategy::Signal);
    let log = DesktopLog::open(&paths.app_dir);

    // When
    let handle = launcher.launch(&launch_config(&paths), &log).unwrap();
    let exit = handle.wait_exit().await;

    // Then
    assert_that!(exit.and_then(|e| e.code), some(eq(3)));
    assert!(!handle.is_alive());
    // Output readers may finish just after the exit notification.
    for _ in 0..50 {
        let lines = log.recent_lines(20);
        if lines.iter().any(|l| l.contains("[backend] oops")) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let lines = log.recent_lines(20);
    assert!(lines.iter().any(|l| l.contains("[backend] hello from stdout")));
    assert!(lines.iter().any(|l| l.contains("[backend] oops")));
    assert!(lines.iter().any(|l| l.contains("[backend] exited with code 3")));
}

#[cfg(unix)]
#[tokio::test]
async fn given_already_reaped_child_when_watch_then_spawn_failed() {
    // Given
    let (_temp, paths) = temp_paths();
    let log = DesktopLog::open(&paths.app_dir);
    let mut child = tokio::process::Command::new("true").spawn().unwrap();
    child.wait().await.unwrap();

    // When
    let result = BackendHandle::watch(child, PathBuf::from("true"), &log);

    // Then
    match result {
        Err(e @ SupervisorError::SpawnFailed { .. }) => {
            assert!(e.to_string().contains("exited before its pid could be read"));
        }
        other => panic!("expected SpawnFailed, got {other:?}"),
    }
}
