//! Terminal capability: tabbed command execution with soft and hard timeouts.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{CommandRecord, TabIndex, TerminalTab};
use crate::io::config::TerminalConfig;

/// How long to keep draining pipes after the process is gone. Bounded because a
/// backgrounded grandchild can hold the pipe open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

#[async_trait]
pub trait Terminal: Send + Sync {
    /// Open tabs in creation order, each with its command history.
    async fn get_terminal_state(&self) -> Result<Vec<TerminalTab>>;

    /// Run `command` in `tab_index` (or a fresh tab for [`TabIndex::New`]).
    ///
    /// `timeout` bounds the wait. On expiry a hard timeout kills the process; a
    /// soft timeout stops waiting and returns the output captured so far while
    /// the process keeps running.
    async fn run_command(
        &self,
        command: &str,
        tab_index: TabIndex,
        timeout: Option<Duration>,
        is_hard_timeout: bool,
    ) -> Result<String>;
}

/// Terminal with no tabs whose commands never run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyTerminal;

#[async_trait]
impl Terminal for DummyTerminal {
    async fn get_terminal_state(&self) -> Result<Vec<TerminalTab>> {
        Ok(Vec::new())
    }

    async fn run_command(
        &self,
        _command: &str,
        _tab_index: TabIndex,
        _timeout: Option<Duration>,
        _is_hard_timeout: bool,
    ) -> Result<String> {
        Ok(String::new())
    }
}

#[derive(Default)]
struct ShellTab {
    history: Vec<CommandRecord>,
    /// Processes left running by a soft timeout. Killed when the terminal drops.
    background: Vec<Child>,
}

impl Drop for ShellTab {
    fn drop(&mut self) {
        // kill_on_drop only reaches the shell itself.
        for child in &self.background {
            signal_group(child);
        }
    }
}

/// Terminal backed by `<shell> -c <command>` in the workspace directory.
///
/// Every command gets a fresh shell process; a tab only groups history.
pub struct ShellTerminal {
    workdir: PathBuf,
    config: TerminalConfig,
    tabs: Mutex<Vec<ShellTab>>,
}

type SharedBuf = Arc<Mutex<Vec<u8>>>;

impl ShellTerminal {
    pub fn new(workdir: impl Into<PathBuf>, config: TerminalConfig) -> Self {
        Self {
            workdir: workdir.into(),
            config,
            tabs: Mutex::new(Vec::new()),
        }
    }

    /// Number of soft-timed-out processes still running, across all tabs.
    pub fn background_count(&self) -> Result<usize> {
        let mut tabs = self.lock_tabs()?;
        reap_background(&mut tabs);
        Ok(tabs.iter().map(|tab| tab.background.len()).sum())
    }

    fn lock_tabs(&self) -> Result<std::sync::MutexGuard<'_, Vec<ShellTab>>> {
        self.tabs
            .lock()
            .map_err(|_| anyhow!("terminal state lock poisoned"))
    }

    /// Check that an existing target tab is open. `None` means a new tab.
    fn check_tab(&self, tab_index: TabIndex) -> Result<Option<usize>> {
        let mut tabs = self.lock_tabs()?;
        reap_background(&mut tabs);
        match tab_index {
            TabIndex::New => Ok(None),
            TabIndex::Existing(index) if index < tabs.len() => Ok(Some(index)),
            TabIndex::Existing(index) => {
                bail!("no terminal tab {index} (open tabs: {})", tabs.len())
            }
        }
    }

    fn open_tab(&self) -> Result<usize> {
        let mut tabs = self.lock_tabs()?;
        tabs.push(ShellTab::default());
        Ok(tabs.len() - 1)
    }
}

#[async_trait]
impl Terminal for ShellTerminal {
    async fn get_terminal_state(&self) -> Result<Vec<TerminalTab>> {
        let tabs = self.lock_tabs()?;
        Ok(tabs
            .iter()
            .map(|tab| TerminalTab {
                history: tab.history.clone(),
            })
            .collect())
    }

    #[instrument(skip_all, fields(tab = %tab_index, hard = is_hard_timeout))]
    async fn run_command(
        &self,
        command: &str,
        tab_index: TabIndex,
        timeout: Option<Duration>,
        is_hard_timeout: bool,
    ) -> Result<String> {
        let existing = self.check_tab(tab_index)?;
        let timeout =
            timeout.unwrap_or_else(|| Duration::from_millis(self.config.default_timeout_ms));

        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a hard timeout can take down everything the
        // command forked.
        #[cfg(unix)]
        cmd.process_group(0);
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn {} -c {command}", self.config.shell))?;

        // A new tab only exists once its first command is running.
        let tab = match existing {
            Some(index) => index,
            None => self.open_tab()?,
        };
        debug!(tab, timeout_ms = timeout.as_millis() as u64, "running command");

        let stdout_buf = SharedBuf::default();
        let stderr_buf = SharedBuf::default();
        let limit = self.config.output_limit_bytes;
        let stdout_task = spawn_reader(child.stdout.take(), stdout_buf.clone(), limit);
        let stderr_task = spawn_reader(child.stderr.take(), stderr_buf.clone(), limit);

        let mut keep_running = None;
        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let (exit_code, timed_out) = match waited {
            Ok(status) => {
                let status = status.context("wait for command")?;
                drain(stdout_task, stderr_task).await;
                debug!(exit_code = ?status.code(), "command finished");
                (status.code(), false)
            }
            Err(_) if is_hard_timeout => {
                warn!(timeout_ms = timeout.as_millis() as u64, "command timed out, killing");
                kill_group(&mut child).await?;
                drain(stdout_task, stderr_task).await;
                (None, true)
            }
            Err(_) => {
                info!(
                    timeout_ms = timeout.as_millis() as u64,
                    "command still running after soft timeout, leaving it in the background"
                );
                keep_running = Some(child);
                (None, true)
            }
        };

        let output = combine_output(&stdout_buf, &stderr_buf)?;
        let record = CommandRecord {
            command: command.to_string(),
            output: output.clone(),
            exit_code,
            timed_out,
        };

        let mut tabs = self.lock_tabs()?;
        let entry = tabs
            .get_mut(tab)
            .ok_or_else(|| anyhow!("terminal tab {tab} disappeared"))?;
        entry.history.push(record);
        if let Some(child) = keep_running {
            entry.background.push(child);
        }
        Ok(output)
    }
}

/// Send SIGKILL to the child's process group. The shell leads its own group
/// (`process_group(0)`), so the group id is its pid.
#[cfg(unix)]
fn signal_group(child: &Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(err = %err, pid, "could not signal process group");
    }
}

#[cfg(not(unix))]
fn signal_group(_child: &Child) {}

/// Kill the command with everything it forked, then reap the shell.
async fn kill_group(child: &mut Child) -> Result<()> {
    signal_group(child);
    child.kill().await.context("kill command")
}

fn reap_background(tabs: &mut [ShellTab]) {
    for tab in tabs {
        tab.background
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

fn spawn_reader<R>(stream: Option<R>, buf: SharedBuf, limit: usize) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut reader) = stream else {
            return;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    let Ok(mut collected) = buf.lock() else {
                        break;
                    };
                    let keep = n.min(limit.saturating_sub(collected.len()));
                    collected.extend_from_slice(&chunk[..keep]);
                }
                Err(err) => {
                    debug!(err = %err, "stop reading command output");
                    break;
                }
            }
        }
    })
}

async fn drain(stdout_task: JoinHandle<()>, stderr_task: JoinHandle<()>) {
    let joined = tokio::time::timeout(DRAIN_GRACE, async {
        let _ = stdout_task.await;
        let _ = stderr_task.await;
    })
    .await;
    if joined.is_err() {
        debug!("output pipes still open after exit, returning what was captured");
    }
}

/// Stdout, followed by stderr when the command wrote any.
fn combine_output(stdout: &SharedBuf, stderr: &SharedBuf) -> Result<String> {
    let stdout = stdout
        .lock()
        .map_err(|_| anyhow!("stdout buffer lock poisoned"))?;
    let stderr = stderr
        .lock()
        .map_err(|_| anyhow!("stderr buffer lock poisoned"))?;
    let mut output = String::from_utf8_lossy(&stdout).into_owned();
    output.push_str(&String::from_utf8_lossy(&stderr));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal(temp: &tempfile::TempDir) -> ShellTerminal {
        ShellTerminal::new(temp.path(), TerminalConfig::default())
    }

    #[tokio::test]
    async fn dummy_terminal_is_always_empty() {
        let terminal = DummyTerminal;
        for (tab, timeout, hard) in [
            (TabIndex::New, None, false),
            (TabIndex::Existing(7), Some(Duration::from_millis(1)), true),
        ] {
            let output = terminal
                .run_command("make build", tab, timeout, hard)
                .await
                .expect("run");
            assert_eq!(output, "");
        }
        assert!(terminal.get_terminal_state().await.expect("state").is_empty());
    }

    #[tokio::test]
    async fn completed_command_returns_stdout_and_records_history() {
        let temp = tempfile::tempdir().expect("tempdir");
        let terminal = terminal(&temp);

        let output = terminal
            .run_command("echo hello", TabIndex::New, Some(Duration::from_secs(5)), false)
            .await
            .expect("run");
        assert_eq!(output, "hello\n");

        let state = terminal.get_terminal_state().await.expect("state");
        assert_eq!(state.len(), 1);
        assert_eq!(
            state[0].history,
            vec![CommandRecord {
                command: "echo hello".to_string(),
                output: "hello\n".to_string(),
                exit_code: Some(0),
                timed_out: false,
            }]
        );
    }

    #[tokio::test]
    async fn existing_tab_appends_history_in_call_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let terminal = terminal(&temp);

        terminal
            .run_command("echo one", TabIndex::New, None, false)
            .await
            .expect("first");
        terminal
            .run_command("echo two; exit 4", TabIndex::Existing(0), None, false)
            .await
            .expect("second");
        terminal
            .run_command("echo three", TabIndex::New, None, false)
            .await
            .expect("third");

        let state = terminal.get_terminal_state().await.expect("state");
        assert_eq!(state.len(), 2);
        let commands: Vec<&str> = state[0]
            .history
            .iter()
            .map(|record| record.command.as_str())
            .collect();
        assert_eq!(commands, vec!["echo one", "echo two; exit 4"]);
        assert_eq!(state[0].history[1].exit_code, Some(4));
        assert_eq!(state[1].history[0].output, "three\n");
    }

    #[tokio::test]
    async fn unknown_tab_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let terminal = terminal(&temp);
        let err = terminal
            .run_command("echo hi", TabIndex::Existing(0), None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no terminal tab 0"));
    }

    #[tokio::test]
    async fn stderr_follows_stdout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let terminal = terminal(&temp);
        let output = terminal
            .run_command("echo out; echo err >&2", TabIndex::New, None, false)
            .await
            .expect("run");
        assert_eq!(output, "out\nerr\n");
    }

    #[tokio::test]
    async fn hard_timeout_kills_the_process() {
        let temp = tempfile::tempdir().expect("tempdir");
        let terminal = terminal(&temp);
        let marker = temp.path().join("finished.txt");

        let output = terminal
            .run_command(
                "echo partial; sleep 1; touch finished.txt",
                TabIndex::New,
                Some(Duration::from_millis(300)),
                true,
            )
            .await
            .expect("run");
        assert_eq!(output, "partial\n");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
        assert_eq!(terminal.background_count().expect("count"), 0);

        let state = terminal.get_terminal_state().await.expect("state");
        assert!(state[0].history[0].timed_out);
        assert_eq!(state[0].history[0].exit_code, None);
    }

    #[tokio::test]
    async fn hard_timeout_also_kills_forked_subshells() {
        let temp = tempfile::tempdir().expect("tempdir");
        let terminal = terminal(&temp);
        let marker = temp.path().join("escaped.txt");

        let output = terminal
            .run_command(
                "(sleep 1; touch escaped.txt); echo never",
                TabIndex::New,
                Some(Duration::from_millis(300)),
                true,
            )
            .await
            .expect("run");
        assert_eq!(output, "");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn failed_spawn_opens_no_tab() {
        let temp = tempfile::tempdir().expect("tempdir");
        let terminal = ShellTerminal::new(
            temp.path(),
            TerminalConfig {
                shell: "agentenv-no-such-shell".to_string(),
                ..TerminalConfig::default()
            },
        );

        assert!(
            terminal
                .run_command("echo hi", TabIndex::New, None, false)
                .await
                .is_err()
        );
        assert!(terminal.get_terminal_state().await.expect("state").is_empty());
    }

    #[tokio::test]
    async fn soft_timeout_returns_partial_output_and_keeps_running() {
        let temp = tempfile::tempdir().expect("tempdir");
        let terminal = terminal(&temp);
        let marker = temp.path().join("finished.txt");

        let output = terminal
            .run_command(
                "echo partial; sleep 1; touch finished.txt",
                TabIndex::New,
                Some(Duration::from_millis(300)),
                false,
            )
            .await
            .expect("run");
        assert_eq!(output, "partial\n");
        assert_eq!(terminal.background_count().expect("count"), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(marker.exists());
        assert_eq!(terminal.background_count().expect("count"), 0);
    }
}
