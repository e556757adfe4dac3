//! Shell-script executor.
//!
//! Each phase runs its configured command through `sh -c` in the configured
//! working directory.  Extra arguments (the session secret for the action
//! phase) are forwarded as positional parameters via `"$@"`, never spliced
//! into the command text.  stdout and stderr are captured into capped
//! buffers.
//!
//! On unix the shell leads its own process group.  The whole group is
//! killed when `timeout_sec` elapses and when the run is dropped mid-flight,
//! so nothing the script started outlives the call.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use lp_domain::config::ExecutorConfig;
use lp_domain::trace::TraceEvent;
use lp_domain::{ActionOutcome, Provisioned};

use crate::output::{parse_action, parse_provisioned};
use crate::{Executor, ExecutorError, Phase};

/// How long to wait for the output readers after killing a timed-out child.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Max stderr chars quoted in a failure detail.
const STDERR_DETAIL_CHARS: usize = 2_000;

pub struct ScriptExecutor {
    config: ExecutorConfig,
}

impl ScriptExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `command` for `phase` and return its stdout on a zero exit.
    async fn run(&self, phase: Phase, command: &str, args: &[&str]) -> Result<String, ExecutorError> {
        let started = Instant::now();
        let script = if args.is_empty() {
            command.to_owned()
        } else {
            format!("{command} \"$@\"")
        };

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&script).arg("launchpad").args(args);
        cmd.current_dir(&self.config.workdir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| ExecutorError::failed(phase, format!("failed to spawn: {e}")))?;
        let mut group = ProcessGroup::new(child.id());

        let max = self.config.max_output_chars;
        let stdout_task = tokio::spawn(collect(child.stdout.take(), max));
        let stderr_task = tokio::spawn(collect(child.stderr.take(), max));

        let timeout = Duration::from_secs(self.config.timeout_sec);
        let waited: Option<std::io::Result<ExitStatus>> = tokio::select! {
            result = child.wait() => Some(result),
            _ = tokio::time::sleep(timeout) => {
                group.kill();
                let _ = child.kill().await;
                None
            }
        };
        // Reap anything the script left behind before the output drains.
        group.kill();

        let stdout = tokio::time::timeout(DRAIN_GRACE, stdout_task)
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();
        let stderr = tokio::time::timeout(DRAIN_GRACE, stderr_task)
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();

        let duration_ms = started.elapsed().as_millis() as u64;
        TraceEvent::ExecutorRun {
            phase: phase.to_string(),
            exit_code: waited
                .as_ref()
                .and_then(|r| r.as_ref().ok())
                .and_then(ExitStatus::code),
            timed_out: waited.is_none(),
            duration_ms,
        }
        .emit();

        match waited {
            None => Err(ExecutorError::failed(
                phase,
                format!("timed out after {}s", self.config.timeout_sec),
            )),
            Some(Err(e)) => Err(ExecutorError::failed(phase, format!("wait failed: {e}"))),
            Some(Ok(status)) if !status.success() => {
                let code = status
                    .code()
                    .map_or_else(|| "signal".to_owned(), |c| c.to_string());
                Err(ExecutorError::failed(
                    phase,
                    format!("exit {code}: {}", tail(stderr.trim(), STDERR_DETAIL_CHARS)),
                ))
            }
            Some(Ok(_)) => {
                if !stderr.trim().is_empty() {
                    tracing::debug!(%phase, stderr = %tail(stderr.trim(), STDERR_DETAIL_CHARS), "executor stderr");
                }
                Ok(stdout)
            }
        }
    }
}

#[async_trait]
impl Executor for ScriptExecutor {
    async fn provision(&self) -> Result<Provisioned, ExecutorError> {
        let stdout = self
            .run(Phase::Provision, &self.config.provision_command, &[])
            .await?;
        // stdout carries the secret, so only its size is logged.
        parse_provisioned(&stdout).map_err(|e| {
            tracing::warn!(stdout_chars = stdout.len(), error = %e, "provision output unparsable");
            ExecutorError::output_parse(Phase::Provision, e)
        })
    }

    async fn act(&self, secret: &str) -> Result<ActionOutcome, ExecutorError> {
        let stdout = self
            .run(Phase::Action, &self.config.action_command, &[secret])
            .await?;
        parse_action(&stdout).map_err(|e| {
            tracing::warn!(stdout = %tail(stdout.trim(), STDERR_DETAIL_CHARS), error = %e, "action output unparsable");
            ExecutorError::output_parse(Phase::Action, e)
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Process group
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The process group led by a spawned shell.  Killed on drop.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self { pgid: leader }
    }

    /// SIGKILL every member of the group.  Idempotent.
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let Ok(raw) = i32::try_from(pgid) else {
                return;
            };
            match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => tracing::warn!(pgid, error = %e, "failed to kill process group"),
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Output capture
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drain `reader` to EOF, keeping at most the last `max_bytes` bytes.
/// Invalid UTF-8 is replaced rather than ending the read, so the child
/// never blocks on a full pipe.
async fn collect<R>(reader: Option<R>, max_bytes: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > max_bytes {
                    buf.drain(..buf.len() - max_bytes);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "executor output read failed");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Last `max` bytes of `s`, cut on a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    &s[ceil_char_boundary(s, s.len() - max)..]
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(provision: &str, action: &str, timeout_sec: u64) -> ScriptExecutor {
        ScriptExecutor::new(ExecutorConfig {
            provision_command: provision.into(),
            action_command: action.into(),
            timeout_sec,
            ..ExecutorConfig::default()
        })
    }

    #[tokio::test]
    async fn provision_parses_script_output() {
        let ex = executor(
            r#"printf '%s\n' '{"walletAddress":"0xFEED","privateKey":"0xSECRET","faucet":"https://faucet.example"}'"#,
            "true",
            10,
        );
        let p = ex.provision().await.unwrap();
        assert_eq!(p.credential_address, "0xFEED");
        assert_eq!(p.secret, "0xSECRET");
        assert_eq!(p.funding_hint, "https://faucet.example");
    }

    #[tokio::test]
    async fn secret_arrives_as_positional_argument() {
        let ex = executor(
            "true",
            r#"printf '{"contractAddress":"0xC0DE","contractLink":"https://x/%s"}\n'"#,
            10,
        );
        let a = ex.act("0xSE CRET;rm").await.unwrap();
        assert_eq!(a.action_address, "0xC0DE");
        assert_eq!(a.reference_link, "https://x/0xSE CRET;rm");
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure_not_parse_error() {
        let ex = executor("echo 'insufficient funds' >&2; exit 3", "exit 1", 10);
        let err = ex.provision().await.unwrap_err();
        match err {
            ExecutorError::Failed { phase, detail } => {
                assert_eq!(phase, Phase::Provision);
                assert!(detail.contains("exit 3"));
                assert!(detail.contains("insufficient funds"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_output_is_parse_error() {
        let ex = executor("true", "echo deployed", 10);
        let err = ex.act("0xK").await.unwrap_err();
        assert!(matches!(err, ExecutorError::OutputParse { phase: Phase::Action, .. }));
    }

    #[tokio::test]
    async fn slow_command_times_out_as_failure() {
        let ex = executor("sleep 5", "true", 1);
        let started = Instant::now();
        let err = ex.provision().await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        match err {
            ExecutorError::Failed { detail, .. } => assert!(detail.contains("timed out")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail("hello", 10), "hello");
        assert_eq!(tail("hello", 3), "llo");
        let t = tail("héllo", 4);
        assert!(t.len() <= 4);
        assert!(t.ends_with("llo"));
    }

    fn executor_in(dir: &std::path::Path, action: &str, timeout_sec: u64) -> ScriptExecutor {
        ScriptExecutor::new(ExecutorConfig {
            workdir: dir.to_path_buf(),
            provision_command: "true".into(),
            action_command: action.into(),
            timeout_sec,
            ..ExecutorConfig::default()
        })
    }

    /// A nested shell that would write `marker` after the run has ended.
    const NESTED_ACTION: &str = "sh -c 'sleep 2; echo ran >> marker'; true";

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_nested_processes() {
        let dir = tempfile::tempdir().unwrap();
        let ex = executor_in(dir.path(), NESTED_ACTION, 1);

        let err = ex.act("0xK").await.unwrap_err();
        assert!(matches!(err, ExecutorError::Failed { .. }));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!dir.path().join("marker").exists(), "grandchild outlived the timeout");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dropped_run_kills_nested_processes() {
        let dir = tempfile::tempdir().unwrap();
        let ex = executor_in(dir.path(), NESTED_ACTION, 30);

        let abandoned = tokio::time::timeout(Duration::from_millis(300), ex.act("0xK")).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!dir.path().join("marker").exists(), "grandchild outlived the caller");
    }

    #[tokio::test]
    async fn invalid_utf8_output_is_still_read() {
        let ex = executor(
            r#"printf '\377\376 noise\n'; printf '%s\n' '{"walletAddress":"0xFEED","privateKey":"0xSECRET","faucet":"f"}'"#,
            "printf '\\377\\n'",
            10,
        );
        let p = ex.provision().await.unwrap();
        assert_eq!(p.credential_address, "0xFEED");

        let err = ex.act("0xK").await.unwrap_err();
        assert!(matches!(err, ExecutorError::OutputParse { phase: Phase::Action, .. }));
    }

    #[tokio::test]
    async fn collect_keeps_the_tail() {
        let data: &[u8] = b"0123456789";
        assert_eq!(collect(Some(data), 4).await, "6789");
        assert_eq!(collect(None::<&[u8]>, 4).await, "");
    }
}
