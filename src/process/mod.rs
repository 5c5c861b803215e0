//! Child process runner: spawn, capture, bounded wait.

use std::{path::Path, process::Stdio, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    time::timeout,
};

use crate::execution::ExecutionOutcome;

pub mod install;

/// Reported when the child outlives its time budget. No real exit status is negative.
pub const TIMEOUT_EXIT_CODE: i32 = -2;
pub const TIMEOUT_MESSAGE: &str = "Error: Execution timed out";
/// Reported when the child could not be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;
/// Reported when no exit status could be obtained for the child.
pub const NO_STATUS_EXIT_CODE: i32 = -1;
/// A child killed by signal `n` reports `128 + n`, as shells do.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Runs `cmd` to completion or until `limit` elapses.
///
/// Never fails: spawn errors and timeouts are folded into the outcome. The child gets
/// no stdin. On unix it leads its own process group, and that whole group is killed
/// when the run ends, so nothing it started outlives the call.
pub async fn run(cmd: &[String], cwd: Option<&Path>, limit: Duration) -> ExecutionOutcome {
    let Some((program, args)) = cmd.split_first() else {
        return ExecutionOutcome::failure(SPAWN_FAILURE_EXIT_CODE, "Error: empty command");
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    log::debug!("spawning {} with {} arg(s), cwd {:?}", program, args.len(), cwd);
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            log::debug!("failed to spawn {}: {}", program, e);
            return ExecutionOutcome::failure(
                SPAWN_FAILURE_EXIT_CODE,
                format!("Error: failed to start '{}': {}", program, e),
            );
        }
    };
    let group = child.id();

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let finished = timeout(limit, async {
        let (out, err, status) = tokio::join!(
            read_stream(stdout.as_mut()),
            read_stream(stderr.as_mut()),
            child.wait()
        );
        status.map(|status| (status, out, err))
    })
    .await;

    match finished {
        Ok(Ok((status, out, err))) => {
            // Background jobs the snippet left behind.
            sweep_group(group).await;
            ExecutionOutcome::new(
                exit_code(status),
                &String::from_utf8_lossy(&out),
                &String::from_utf8_lossy(&err),
            )
        }
        Ok(Err(e)) => {
            sweep_group(group).await;
            ExecutionOutcome::failure(
                NO_STATUS_EXIT_CODE,
                format!("Error: failed to collect output of '{}': {}", program, e),
            )
        }
        Err(_) => {
            log::warn!("{} timed out after {:?}", program, limit);
            terminate(&mut child, group).await;
            ExecutionOutcome::timed_out()
        }
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<&mut R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            log::debug!("stopped reading child output: {}", e);
        }
    }
    buf
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return SIGNAL_EXIT_BASE + sig;
        }
    }
    NO_STATUS_EXIT_CODE
}

/// Kills the child's process group (or just the child off unix) and reaps the child.
async fn terminate(child: &mut Child, group: Option<u32>) {
    // The child is not reaped yet, so its pid still names this call's group.
    let signalled = signal_group(group);
    if let Err(e) = child.kill().await {
        log::debug!("kill after timeout: {}", e);
    }
    if signalled {
        wait_group_exit(group).await;
    }
}

async fn sweep_group(group: Option<u32>) {
    if signal_group(group) {
        wait_group_exit(group).await;
    }
}

/// Upper bound on waiting for killed group members to disappear.
const GROUP_EXIT_GRACE: Duration = Duration::from_millis(500);

/// SIGKILLs every process in the group. False when the group is already empty.
#[cfg(unix)]
fn signal_group(group: Option<u32>) -> bool {
    let Some(pgid) = group else { return false };
    // SAFETY: killpg only sends a signal; the group was created for this child by
    // `process_group(0)` and a missing group just yields ESRCH.
    unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) == 0 }
}

#[cfg(unix)]
async fn wait_group_exit(group: Option<u32>) {
    let Some(pgid) = group else { return };
    let deadline = tokio::time::Instant::now() + GROUP_EXIT_GRACE;
    // SAFETY: signal 0 only probes whether any member still exists.
    while unsafe { libc::killpg(pgid as libc::pid_t, 0) } == 0 {
        if tokio::time::Instant::now() >= deadline {
            log::warn!("process group {} still alive after SIGKILL", pgid);
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[cfg(not(unix))]
fn signal_group(_group: Option<u32>) -> bool {
    false
}

#[cfg(not(unix))]
async fn wait_group_exit(_group: Option<u32>) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn captures_streams_separately_and_trims() {
        let out = run(
            &sh("echo '  out  '; echo ' err ' >&2; exit 3"),
            None,
            Duration::from_secs(10),
        )
        .await;
        assert_eq!(out.returncode, 3);
        assert_eq!(out.stdout, "out");
        assert_eq!(out.stderr, "err");
    }

    #[tokio::test]
    async fn uses_working_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("marker.txt"), "here")?;
        let out = run(&sh("cat marker.txt"), Some(dir.path()), Duration::from_secs(10)).await;
        assert_eq!(out, ExecutionOutcome::new(0, "here", ""));
        Ok(())
    }

    #[tokio::test]
    async fn stdin_is_closed() {
        let out = run(&sh("cat; echo done"), None, Duration::from_secs(10)).await;
        assert_eq!(out.stdout, "done");
    }

    #[tokio::test]
    async fn timeout_yields_sentinel() {
        let started = std::time::Instant::now();
        let out = run(&sh("sleep 30"), None, Duration::from_millis(200)).await;
        assert_eq!(out, ExecutionOutcome::timed_out());
        assert_eq!(out.returncode, -2);
        assert_eq!(out.stderr, "Error: Execution timed out");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn timeout_kills_background_jobs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let marker = dir.path().join("alive");
        let script = format!("(sleep 1; touch {}) & sleep 30", marker.display());
        let out = run(&sh(&script), None, Duration::from_millis(300)).await;
        assert!(out.is_timeout());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
        Ok(())
    }

    #[tokio::test]
    async fn finished_run_leaves_no_background_jobs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let marker = dir.path().join("alive");
        let script = format!("(sleep 1; touch {}) >/dev/null 2>&1 & echo started", marker.display());
        let out = run(&sh(&script), None, Duration::from_secs(10)).await;
        assert_eq!(out, ExecutionOutcome::new(0, "started", ""));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
        Ok(())
    }

    #[tokio::test]
    async fn signal_death_keeps_signal_number() {
        let out = run(&sh("kill -9 $$"), None, Duration::from_secs(10)).await;
        assert_eq!(out.returncode, SIGNAL_EXIT_BASE + 9);
        assert_ne!(out.returncode, TIMEOUT_EXIT_CODE);
    }

    #[tokio::test]
    async fn missing_executable_is_an_outcome() {
        let cmd = vec!["codexec-definitely-missing-binary".to_string()];
        let out = run(&cmd, None, Duration::from_secs(5)).await;
        assert_eq!(out.returncode, SPAWN_FAILURE_EXIT_CODE);
        assert!(out.stdout.is_empty());
        assert!(out
            .stderr
            .starts_with("Error: failed to start 'codexec-definitely-missing-binary'"));
    }

    #[tokio::test]
    async fn empty_command_is_an_outcome() {
        let out = run(&[], None, Duration::from_secs(5)).await;
        assert_eq!(out.returncode, SPAWN_FAILURE_EXIT_CODE);
        assert_eq!(out.stderr, "Error: empty command");
    }
}
