//! Child-process helpers shared by the orchestrator and the tools.

use crate::domain::error::{FzfuiError, Result};
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Spawns `command`, reporting a missing binary as [`FzfuiError::ToolNotFound`].
///
/// # Errors
///
/// `ToolNotFound(tool)` if the program does not exist, other I/O errors as-is.
pub fn spawn_tool(command: &mut Command, tool: &str) -> Result<Child> {
    command.spawn().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            FzfuiError::ToolNotFound(tool.to_string())
        } else {
            FzfuiError::Io(e)
        }
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<std::thread::JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<std::thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .map(|handle| handle.join().unwrap_or_default())
        .unwrap_or_default()
}

/// Waits for `child` for at most `timeout`, collecting whichever of stdout
/// and stderr are piped.
///
/// Pipes are drained on separate threads so a chatty child cannot block on a
/// full pipe. On timeout the child is killed and reaped.
///
/// # Errors
///
/// `Usage` on timeout, I/O errors from waiting.
pub fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Output> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!(timeout_ms = timeout.as_millis(), "child timed out");
            return Err(FzfuiError::Usage(format!(
                "timed out after {}s",
                timeout.as_secs_f32()
            )));
        }
        Err(e) => {
            let _ = child.kill();
            return Err(e.into());
        }
    };

    Ok(Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

/// Name passed as `$0` to user scripts.
const SCRIPT_NAME: &str = "fzfui";

fn script_command(shell: &str, script: &str, arg: &str) -> Command {
    let mut command = Command::new(shell);
    command.arg("-c").arg(script).arg(SCRIPT_NAME).arg(arg);
    command
}

/// Runs `script` under `shell` with `arg` as `$1`, inheriting stdio, and
/// returns its exit code.
///
/// # Errors
///
/// `ToolNotFound` if the shell is missing.
pub fn run_script(shell: &str, script: &str, arg: &str) -> Result<i32> {
    let mut command = script_command(shell, script, arg);
    let status = spawn_tool(&mut command, shell)?.wait()?;
    Ok(exit_code(status))
}

/// Runs `script` under `shell` with `arg` as `$1` and returns its stdout.
///
/// Stderr is inherited so error text still reaches the finder's preview pane.
///
/// # Errors
///
/// `ToolNotFound` if the shell is missing, `Usage` on timeout.
pub fn capture_script(shell: &str, script: &str, arg: &str, timeout: Duration) -> Result<String> {
    let mut command = script_command(shell, script, arg);
    command.stdin(Stdio::null()).stdout(Stdio::piped());
    let child = spawn_tool(&mut command, shell)?;
    let output = wait_with_timeout(child, timeout)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Exit code of a finished process; signals map to 128 + signal on unix.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_tool_not_found() {
        let mut command = Command::new("fzfui-missing-binary-xyz");
        let err = spawn_tool(&mut command, "fzfui-missing-binary-xyz").unwrap_err();
        assert!(matches!(err, FzfuiError::ToolNotFound(_)));
    }

    #[test]
    fn script_receives_argument_as_dollar_one() {
        let out = capture_script("sh", "printf '%s|%s' \"$0\" \"$1\"", "a b", Duration::from_secs(5))
            .unwrap();
        assert_eq!(out, "fzfui|a b");
        assert_eq!(run_script("sh", "test \"$1\" = x", "x").unwrap(), 0);
        assert_eq!(run_script("sh", "test \"$1\" = x", "y").unwrap(), 1);
    }

    #[test]
    fn slow_child_times_out() {
        let err = capture_script("sh", "sleep 5", "", Duration::from_millis(100)).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn both_pipes_are_collected() {
        let mut command = Command::new("sh");
        command
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let child = spawn_tool(&mut command, "sh").unwrap();
        let output = wait_with_timeout(child, Duration::from_secs(5)).unwrap();
        assert_eq!(exit_code(output.status), 3);
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr, b"err\n");
    }
}
