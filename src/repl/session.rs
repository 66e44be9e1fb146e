//! Interactive Session Loop
//!
//! This module drives the read-eval-print loop and the one-shot mode.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Session created (store already open)
//!        │
//!        ▼
//! 2. Print welcome banner
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Running                 │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Print prompt            │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read one line           │ │──── EOF ────┐
//!    │  └───────────┬─────────────┘ │             │
//!    │              ▼               │             │
//!    │  ┌─────────────────────────┐ │             │
//!    │  │ Tokenize + dispatch     │ │             │
//!    │  └───────────┬─────────────┘ │             │
//!    │              ▼               │             │
//!    │  ┌─────────────────────────┐ │             │
//!    │  │ Print reply             │ │──── exit ───┤
//!    │  └───────────┬─────────────┘ │             │
//!    │              ▼               │             │
//!    │         [Loop back]          │             │
//!    └──────────────────────────────┘             │
//!                                                 ▼
//! 4. Terminated: log session statistics, return
//! ```
//!
//! Commands run strictly one after another; the next line is not read until
//! the previous command has finished with the store.

use crate::commands::{Channel, CommandHandler, Reply};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn};

/// Prompt shown before each line is read.
pub const DEFAULT_PROMPT: &str = "> ";

/// Banner printed when an interactive session starts.
pub const WELCOME: &str = "Welcome to kvadmin REPL! Type 'exit' to quit.";

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated,
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Non-blank lines dispatched
    pub commands_processed: u64,
    /// Dispatched commands whose reply contained an error
    pub commands_failed: u64,
    /// Total lines read, blank ones included
    pub lines_read: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn command_processed(&mut self, reply: &Reply) {
        self.commands_processed += 1;
        if reply.has_error() {
            self.commands_failed += 1;
        }
    }
}

/// Errors that end a session early.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// An interactive session over an input stream and two output streams.
pub struct ReplSession<R, W, E> {
    /// Line source; `restore` without a file reads the rest of it
    input: R,

    /// Normal output
    stdout: W,

    /// Error output
    stderr: E,

    /// The command handler (owns the store handle)
    handler: CommandHandler,

    prompt: String,

    state: SessionState,

    stats: SessionStats,
}

impl<R, W, E> ReplSession<R, W, E>
where
    R: AsyncBufRead + AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    /// Creates a new session in the `Running` state.
    pub fn new(input: R, stdout: W, stderr: E, handler: CommandHandler) -> Self {
        Self {
            input,
            stdout,
            stderr,
            handler,
            prompt: DEFAULT_PROMPT.to_string(),
            state: SessionState::Running,
            stats: SessionStats::new(),
        }
    }

    /// Replaces the prompt string.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Runs the loop until `exit` or end of input.
    pub async fn run(&mut self) -> Result<SessionStats, SessionError> {
        info!("Session started");

        let result = self.main_loop().await;
        self.state = SessionState::Terminated;

        match &result {
            Ok(()) => info!(
                commands = self.stats.commands_processed,
                failed = self.stats.commands_failed,
                "Session ended"
            ),
            Err(e) => warn!(error = %e, "Session ended with error"),
        }

        result.map(|()| self.stats)
    }

    /// The main prompt-read-execute-print loop.
    async fn main_loop(&mut self) -> Result<(), SessionError> {
        self.stdout.write_all(WELCOME.as_bytes()).await?;
        self.stdout.write_all(b"\n").await?;

        while self.state == SessionState::Running {
            self.stdout.write_all(self.prompt.as_bytes()).await?;
            self.stdout.flush().await?;

            let line = match self.read_line().await? {
                Some(line) => line,
                None => {
                    debug!("End of input");
                    // Terminate the dangling prompt line
                    self.stdout.write_all(b"\n").await?;
                    self.stdout.flush().await?;
                    self.state = SessionState::Terminated;
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let reply = self.handler.execute_line(&line, &mut self.input).await;
            self.stats.command_processed(&reply);

            write_reply(&reply, &mut self.stdout, &mut self.stderr).await?;

            if reply.is_exit() {
                self.state = SessionState::Terminated;
            }
        }

        Ok(())
    }

    /// Reads one line without its terminator. `None` at end of input.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD rather than failing the read.
    async fn read_line(&mut self) -> Result<Option<String>, SessionError> {
        let mut buf = Vec::new();
        let n = self.input.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }

        self.stats.lines_read += 1;
        trace!(bytes = n, "Read line");

        while matches!(buf.last().copied(), Some(b'\n' | b'\r')) {
            buf.pop();
        }

        let line = match String::from_utf8(buf) {
            Ok(line) => line,
            Err(e) => {
                debug!("Input line is not valid UTF-8");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(Some(line))
    }
}

/// Executes a single command line and prints its reply (one-shot mode).
pub async fn run_once<W, E>(
    handler: &CommandHandler,
    line: &str,
    stdin: &mut (dyn AsyncRead + Unpin + Send),
    stdout: &mut W,
    stderr: &mut E,
) -> Result<Reply, SessionError>
where
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    debug!(line = %line, "One-shot command");
    let reply = handler.execute_line(line, stdin).await;
    write_reply(&reply, stdout, stderr).await?;
    Ok(reply)
}

/// Writes every line of a reply to its channel, then flushes both.
pub async fn write_reply<W, E>(reply: &Reply, stdout: &mut W, stderr: &mut E) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    for (channel, line) in reply.lines() {
        match channel {
            Channel::Stdout => {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            Channel::Stderr => {
                // Pending stdout first, so lines stay in order on a shared terminal
                stdout.flush().await?;
                stderr.write_all(line.as_bytes()).await?;
                stderr.write_all(b"\n").await?;
                stderr.flush().await?;
            }
        }
    }

    stdout.flush().await?;
    stderr.flush().await?;
    Ok(())
}
