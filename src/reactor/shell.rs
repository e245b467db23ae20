//! Shell command execution.
//!
//! Two modes: synchronous task execution with a hard timeout and combined
//! output capture, and detached service launch in its own process group
//! with a graceful-then-forceful kill protocol.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Shell execution errors.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("command timed out after {timeout:?}")]
    Timeout { timeout: Duration, output: String },

    #[error("command exited with {status}")]
    Exit {
        status: std::process::ExitStatus,
        output: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShellError {
    /// Combined output captured before the failure, if any.
    pub fn output(&self) -> &str {
        match self {
            Self::Timeout { output, .. } | Self::Exit { output, .. } => output,
            Self::Io(_) => "",
        }
    }
}

/// OS shell executor owning at most one detached service process.
pub struct Shell {
    task_timeout: Duration,
    service_timeout: Duration,
    child: Mutex<Option<Child>>,
}

impl Shell {
    /// `task_timeout` caps a single `exec`; `service_timeout` is the grace
    /// period between the graceful signal and the forceful kill.
    pub fn new(task_timeout: Duration, service_timeout: Duration) -> Self {
        Self {
            task_timeout,
            service_timeout,
            child: Mutex::new(None),
        }
    }

    /// Run `command` through the system shell and wait for its combined
    /// stdout/stderr, trimmed of trailing whitespace.
    ///
    /// On timeout the child is killed and the error carries whatever output
    /// was captured up to that point.
    pub async fn exec(&self, command: &str) -> Result<String, ShellError> {
        let mut child = shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut out = Vec::new();
        let mut err = Vec::new();

        let waited = tokio::time::timeout(self.task_timeout, async {
            let (out_read, err_read) = tokio::join!(
                drain(stdout.as_mut(), &mut out),
                drain(stderr.as_mut(), &mut err),
            );
            out_read?;
            err_read?;
            child.wait().await
        })
        .await;

        match waited {
            Ok(status) => {
                let status = status?;
                let output = combine(&out, &err);
                if status.success() {
                    Ok(output)
                } else {
                    Err(ShellError::Exit { status, output })
                }
            }
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(ShellError::Timeout {
                    timeout: self.task_timeout,
                    output: combine(&out, &err),
                })
            }
        }
    }

    /// Launch `command` detached in its own process group, inheriting the
    /// parent's stdout/stderr so its logs stream live. Does not wait.
    pub async fn run(&self, command: &str) -> Result<(), ShellError> {
        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        cmd.process_group(0);
        #[cfg(windows)]
        cmd.creation_flags(windows_sys::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP);

        let child = cmd.spawn()?;
        *self.child.lock().await = Some(child);
        Ok(())
    }

    /// Terminate the running service, gracefully first.
    ///
    /// Signals the whole process group, then races the child's exit against
    /// the service timeout; on overrun the child is killed unconditionally.
    /// An exit caused by the graceful signal counts as success. Safe to call
    /// with no live child.
    pub async fn kill(&self) -> Result<(), ShellError> {
        let mut guard = self.child.lock().await;
        let Some(mut child) = guard.take() else {
            return Ok(());
        };

        signal_graceful(&child);

        match tokio::time::timeout(self.service_timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                if status.success() || exited_by_graceful_signal(&status) {
                    Ok(())
                } else {
                    Err(ShellError::Exit {
                        status,
                        output: String::new(),
                    })
                }
            }
            Err(_) => {
                let _ = child.start_kill();
                let status = child.wait().await?;
                if status.success() {
                    Ok(())
                } else {
                    Err(ShellError::Exit {
                        status,
                        output: String::new(),
                    })
                }
            }
        }
    }
}

/// Build the platform shell invocation for `command`.
#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Send the graceful signal to the service's whole process group.
#[cfg(unix)]
fn signal_graceful(child: &Child) {
    let Some(pid) = child.id() else { return };
    let pid = pid as i32;

    // run() put the child at the head of its own group
    let killed = unsafe { libc::kill(-pid, libc::SIGTERM) };
    if killed != 0 {
        unsafe { libc::kill(pid, libc::SIGTERM) };
    }
}

#[cfg(windows)]
fn signal_graceful(child: &Child) {
    use windows_sys::Win32::System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent};

    if let Some(pid) = child.id() {
        unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) };
    }
}

#[cfg(unix)]
fn exited_by_graceful_signal(status: &std::process::ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(libc::SIGTERM)
}

#[cfg(windows)]
fn exited_by_graceful_signal(status: &std::process::ExitStatus) -> bool {
    // Exit code of a console process group that honored CTRL_BREAK
    const STATUS_CONTROL_C_EXIT: i32 = 0xC000_013Au32 as i32;
    status.code() == Some(STATUS_CONTROL_C_EXIT)
}

fn combine(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&String::from_utf8_lossy(stderr));
    }
    text.trim_end().to_string()
}

async fn drain<R>(pipe: Option<&mut R>, buf: &mut Vec<u8>) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
{
    if let Some(pipe) = pipe {
        pipe.read_to_end(buf).await?;
    }
    Ok(())
}
