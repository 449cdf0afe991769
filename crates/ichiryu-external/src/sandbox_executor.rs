use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::{CodeExecutor, ExecutionLimits, ExecutionOutput, ExternalError};

/// Stderr prefix the stock sandbox script emits when `ulimit -t` kills the interpreter.
pub const DEFAULT_CPU_LIMIT_MARKER: &str = "./sandbox.sh: line 3:";

/// Runs `sh <script>` with the code on stdin. The script owns CPU and memory
/// limits. The script runs in its own process group, and the whole group is
/// killed when the future completes or is dropped. Each output pipe is closed
/// once `max_output_bytes` have been read from it.
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    script: PathBuf,
}

impl SandboxExecutor {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait]
impl CodeExecutor for SandboxExecutor {
    async fn execute(
        &self,
        code: &str,
        limits: ExecutionLimits,
    ) -> Result<ExecutionOutput, ExternalError> {
        let mut command = Command::new("sh");
        // The script runs from its own directory so it can reach its helpers.
        match (self.script.parent(), self.script.file_name()) {
            (Some(dir), Some(file_name)) if !dir.as_os_str().is_empty() => {
                command.current_dir(dir).arg(file_name);
            }
            _ => {
                command.arg(&self.script);
            }
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn().map_err(ExternalError::Sandbox)?;
        let group = ProcessGroupGuard::new(&child);

        if let Some(mut stdin) = child.stdin.take() {
            // Scripts may exit without reading stdin.
            if let Err(error) = stdin.write_all(code.as_bytes()).await {
                tracing::debug!(error = %error, "sandbox closed stdin early");
            }
        }

        let max_bytes = limits.max_output_bytes.max(1) as u64;
        let (stdout, stderr) = tokio::join!(
            read_limited(child.stdout.take(), max_bytes),
            read_limited(child.stderr.take(), max_bytes),
        );
        let exit_code = match child.try_wait().map_err(ExternalError::Sandbox)? {
            Some(status) => status.code(),
            None => {
                group.kill();
                child.kill().await.map_err(ExternalError::Sandbox)?;
                None
            }
        };

        Ok(ExecutionOutput {
            stdout: stdout.map_err(ExternalError::Sandbox)?,
            stderr: stderr.map_err(ExternalError::Sandbox)?,
            exit_code,
        })
    }
}

/// SIGKILLs the sandbox process group on drop. The interpreter the script
/// starts shares the group, so it dies with the script.
struct ProcessGroupGuard {
    #[cfg(unix)]
    leader: Option<nix::unistd::Pid>,
}

impl ProcessGroupGuard {
    fn new(child: &Child) -> Self {
        #[cfg(unix)]
        {
            Self {
                leader: child
                    .id()
                    .and_then(|id| i32::try_from(id).ok())
                    .map(nix::unistd::Pid::from_raw),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child;
            Self {}
        }
    }

    fn kill(&self) {
        #[cfg(unix)]
        if let Some(leader) = self.leader {
            match nix::sys::signal::killpg(leader, nix::sys::signal::Signal::SIGKILL) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                Err(error) => {
                    tracing::warn!(pgid = leader.as_raw(), error = %error, "failed to kill sandbox process group");
                }
            }
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

async fn read_limited<R>(source: Option<R>, max_bytes: u64) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(source) = source else {
        return Ok(String::new());
    };
    let mut buffer = Vec::new();
    source.take(max_bytes).read_to_end(&mut buffer).await?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use ichiryu_rules::ExternalJob;

    use super::SandboxExecutor;
    use crate::{CodeExecutor, ExecutionLimits, ExternalRunner, ExternalRunnerSettings, Unconfigured};

    fn write_script(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("sandbox.sh");
        std::fs::write(&path, body).expect("write script");
        path
    }

    #[tokio::test]
    async fn functional_sandbox_executor_feeds_code_on_stdin() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = write_script(temp.path(), "cat\n");
        let output = SandboxExecutor::new(script)
            .execute("print('hi')", ExecutionLimits::default())
            .await
            .expect("execute");
        assert_eq!(output.stdout, "print('hi')");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn functional_sandbox_executor_captures_stderr() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = write_script(temp.path(), "cat >/dev/null\necho boom >&2\nexit 3\n");
        let output = SandboxExecutor::new(script)
            .execute("x", ExecutionLimits::default())
            .await
            .expect("execute");
        assert_eq!(output.stderr, "boom\n");
    }

    #[tokio::test]
    async fn regression_sandbox_executor_caps_output_bytes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = write_script(temp.path(), "cat >/dev/null\nwhile :; do echo spam; done\n");
        let output = SandboxExecutor::new(script)
            .execute("", ExecutionLimits { max_output_bytes: 64 })
            .await
            .expect("execute");
        assert_eq!(output.stdout.len(), 64);
        assert_eq!(output.exit_code, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn regression_timed_out_sandbox_kills_interpreter_started_by_script() {
        let temp = tempfile::tempdir().expect("tempdir");
        let marker = temp.path().join("marker");
        let script = write_script(
            temp.path(),
            "cat >/dev/null\nsh -c 'sleep 1; echo alive > marker'\n",
        );
        let runner = ExternalRunner::new(
            Arc::new(Unconfigured),
            Arc::new(SandboxExecutor::new(script)),
            ExternalRunnerSettings {
                execution_timeout: Duration::from_millis(200),
                ..ExternalRunnerSettings::default()
            },
        );

        let reply = runner
            .run(ExternalJob::Execute {
                speaker: "bob".to_string(),
                code: "while true do end".to_string(),
            })
            .await;
        assert_eq!(reply, "bob: Your code timed out");

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(!marker.exists(), "interpreter kept running after timeout");
    }
}
