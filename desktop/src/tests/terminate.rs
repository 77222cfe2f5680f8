use crate::backend::{KillStrategy, ProcessTerminator, SignalTerminator, TreeKillTerminator};

use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::{anything, eq, ok, some};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

const SIGTERM: i32 = 15;
const SIGKILL: i32 = 9;

#[test]
fn given_unix_when_platform_default_then_signal() {
    assert_that!(KillStrategy::platform_default(), eq(KillStrategy::Signal));
    assert!(!KillStrategy::Signal.needs_process_group());
    assert!(KillStrategy::TreeKill.needs_process_group());
}

#[test]
fn given_strategy_when_terminator_then_matching_name() {
    assert_that!(KillStrategy::Signal.terminator().name(), eq("signal"));
    assert_that!(KillStrategy::TreeKill.terminator().name(), eq("tree_kill"));
}

#[tokio::test]
async fn given_sleeping_process_when_request_exit_then_terminated_by_sigterm() {
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    let pid = child.id().unwrap();

    SignalTerminator.request_exit(pid).await.unwrap();
    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .unwrap()
        .unwrap();

    assert_that!(status.signal(), some(eq(SIGTERM)));
}

#[tokio::test]
async fn given_sleeping_process_when_force_kill_then_terminated_by_sigkill() {
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    let pid = child.id().unwrap();

    SignalTerminator.force_kill(pid).await.unwrap();
    let status = child.wait().await.unwrap();

    assert_that!(status.signal(), some(eq(SIGKILL)));
}

#[tokio::test]
async fn given_reaped_process_when_signalled_then_ok() {
    let mut child = Command::new("true").spawn().unwrap();
    let pid = child.id().unwrap();
    child.wait().await.unwrap();

    assert_that!(SignalTerminator.request_exit(pid).await, ok(anything()));
    assert_that!(SignalTerminator.force_kill(pid).await, ok(anything()));
}

/// True once `pid` no longer exists or is an unreaped zombie.
fn process_gone(pid: i32) -> bool {
    if let Err(Errno::ESRCH) = kill(Pid::from_raw(pid), None) {
        return true;
    }
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .map(|stat| {
            stat.rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z'))
        })
        .unwrap_or(false)
}

async fn wait_gone(pid: i32) -> bool {
    for _ in 0..100 {
        if process_gone(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn given_process_group_when_tree_kill_then_leader_and_descendant_terminated() {
    // Given: a shell leading its own group, reporting its child's pid
    let mut child = Command::new("sh")
        .args(["-c", "sleep 30 & echo $!; wait"])
        .process_group(0)
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    let stdout = child.stdout.take().unwrap();
    let mut first_line = String::new();
    BufReader::new(stdout).read_line(&mut first_line).await.unwrap();
    let descendant: i32 = first_line.trim().parse().unwrap();
    assert!(!process_gone(descendant));

    // When
    TreeKillTerminator.request_exit(pid).await.unwrap();
    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .unwrap()
        .unwrap();

    // Then
    assert!(!status.success());
    assert!(wait_gone(descendant).await, "descendant {descendant} survived tree kill");
}

#[tokio::test]
async fn given_process_group_when_signal_strategy_then_descendant_survives() {
    // Given
    let mut child = Command::new("sh")
        .args(["-c", "sleep 30 & echo $!; wait"])
        .process_group(0)
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    let stdout = child.stdout.take().unwrap();
    let mut first_line = String::new();
    BufReader::new(stdout).read_line(&mut first_line).await.unwrap();
    let descendant: i32 = first_line.trim().parse().unwrap();

    // When: only the leader is signalled
    SignalTerminator.request_exit(pid).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .unwrap()
        .unwrap();

    // Then
    assert!(!process_gone(descendant));

    // Cleanup
    TreeKillTerminator.force_kill(pid).await.unwrap();
    assert!(wait_gone(descendant).await);
}
