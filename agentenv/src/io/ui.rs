//! User-facing message channel.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::debug;

#[async_trait]
pub trait UserInterface: Send + Sync {
    /// Show `text` to the user. Does not wait for acknowledgement.
    async fn show_message(&self, text: &str) -> Result<()>;

    /// Ask the user something and suspend until they answer.
    async fn ask_prompt(&self, text: &str) -> Result<String>;

    /// Messages the user sent unprompted since the last call, oldest first.
    async fn get_new_messages(&self) -> Result<Vec<String>>;
}

type Reader = Box<dyn AsyncBufRead + Unpin + Send>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

/// Line-oriented user interface on stdin/stdout.
///
/// It has no out-of-band channel, so [`UserInterface::get_new_messages`] is
/// always empty.
pub struct CliUserInterface {
    input: AsyncMutex<Reader>,
    output: AsyncMutex<Writer>,
}

impl CliUserInterface {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    pub fn with_io(
        input: impl AsyncBufRead + Unpin + Send + 'static,
        output: impl AsyncWrite + Unpin + Send + 'static,
    ) -> Self {
        Self {
            input: AsyncMutex::new(Box::new(input)),
            output: AsyncMutex::new(Box::new(output)),
        }
    }

    async fn write_line(&self, text: &str) -> Result<()> {
        let mut output = self.output.lock().await;
        output
            .write_all(text.as_bytes())
            .await
            .context("write to stdout")?;
        output.write_all(b"\n").await.context("write to stdout")?;
        output.flush().await.context("flush stdout")
    }
}

impl Default for CliUserInterface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserInterface for CliUserInterface {
    async fn show_message(&self, text: &str) -> Result<()> {
        self.write_line(text).await
    }

    async fn ask_prompt(&self, text: &str) -> Result<String> {
        self.write_line(text).await?;
        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .context("read reply from stdin")?;
        if read == 0 {
            bail!("stdin closed before a reply was entered");
        }
        let reply = line.trim_end_matches(['\r', '\n']).to_string();
        debug!(reply_len = reply.len(), "received prompt reply");
        Ok(reply)
    }

    async fn get_new_messages(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct Transcript {
    shown: Vec<String>,
    prompts: Vec<String>,
    inbox: VecDeque<String>,
}

/// In-memory user interface for headless sessions.
///
/// Replies are supplied with [`QueuedUserInterface::push_reply`]; a prompt with
/// no queued reply waits until one arrives. Unprompted messages are queued
/// with [`QueuedUserInterface::push_message`] and drained in FIFO order.
pub struct QueuedUserInterface {
    transcript: Mutex<Transcript>,
    reply_tx: mpsc::UnboundedSender<String>,
    reply_rx: AsyncMutex<mpsc::UnboundedReceiver<String>>,
}

impl QueuedUserInterface {
    pub fn new() -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        Self {
            transcript: Mutex::new(Transcript::default()),
            reply_tx,
            reply_rx: AsyncMutex::new(reply_rx),
        }
    }

    /// Queue the answer to the next prompt.
    pub fn push_reply(&self, reply: impl Into<String>) -> Result<()> {
        self.reply_tx
            .send(reply.into())
            .map_err(|_| anyhow!("reply channel closed"))
    }

    /// Queue an unprompted message from the user.
    pub fn push_message(&self, message: impl Into<String>) -> Result<()> {
        self.lock()?.inbox.push_back(message.into());
        Ok(())
    }

    /// Everything passed to `show_message`, in order.
    pub fn shown(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.shown.clone())
    }

    /// Everything passed to `ask_prompt`, in order.
    pub fn prompts(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.prompts.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Transcript>> {
        self.transcript
            .lock()
            .map_err(|_| anyhow!("user interface lock poisoned"))
    }
}

impl Default for QueuedUserInterface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserInterface for QueuedUserInterface {
    async fn show_message(&self, text: &str) -> Result<()> {
        self.lock()?.shown.push(text.to_string());
        Ok(())
    }

    async fn ask_prompt(&self, text: &str) -> Result<String> {
        self.lock()?.prompts.push(text.to_string());
        self.reply_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| anyhow!("reply channel closed"))
    }

    async fn get_new_messages(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.inbox.drain(..).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn cli_prompt_prints_question_and_returns_typed_line() {
        let (ui_side, mut user_side) = tokio::io::duplex(1024);
        let ui = CliUserInterface::with_io(&b"yes, go ahead\r\nignored\n"[..], ui_side);

        ui.show_message("starting").await.expect("show");
        let reply = ui.ask_prompt("Proceed?").await.expect("ask");
        assert_eq!(reply, "yes, go ahead");
        drop(ui);

        let mut printed = String::new();
        user_side
            .read_to_string(&mut printed)
            .await
            .expect("read output");
        assert_eq!(printed, "starting\nProceed?\n");
    }

    #[tokio::test]
    async fn cli_prompt_fails_on_closed_stdin() {
        let ui = CliUserInterface::with_io(&b""[..], tokio::io::sink());
        let err = ui.ask_prompt("anyone?").await.unwrap_err();
        assert!(err.to_string().contains("stdin closed"));
    }

    #[tokio::test]
    async fn cli_has_no_out_of_band_messages() {
        let ui = CliUserInterface::with_io(&b"hello\n"[..], tokio::io::sink());
        assert!(ui.get_new_messages().await.expect("messages").is_empty());
    }

    #[tokio::test]
    async fn queued_messages_drain_in_fifo_order() {
        let ui = QueuedUserInterface::new();
        ui.push_message("first").expect("push");
        ui.push_message("second").expect("push");

        assert_eq!(
            ui.get_new_messages().await.expect("messages"),
            vec!["first".to_string(), "second".to_string()]
        );
        assert!(ui.get_new_messages().await.expect("messages").is_empty());
    }

    #[tokio::test]
    async fn queued_prompt_waits_for_reply() {
        let ui = std::sync::Arc::new(QueuedUserInterface::new());
        let asking = {
            let ui = ui.clone();
            tokio::spawn(async move { ui.ask_prompt("Name?").await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!asking.is_finished());

        ui.push_reply("Ada").expect("reply");
        let reply = asking.await.expect("join").expect("ask");
        assert_eq!(reply, "Ada");
        assert_eq!(ui.prompts().expect("prompts"), vec!["Name?".to_string()]);
    }
}
