//! Subprocess transport
//!
//! Spawns a tool server and keeps its standard streams for the protocol
//! client. Standard error is drained into the log so a chatty server cannot
//! block on a full pipe.

use crate::mcp::connector::ConnectError;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

/// A running tool-server process
#[derive(Debug)]
pub struct StdioLink {
    command: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
}

impl StdioLink {
    pub(crate) fn spawn(command: &str, arguments: &[String]) -> Result<Self, ConnectError> {
        tracing::debug!(command = %command, args = ?arguments, "Starting MCP stdio server");

        let mut child = Command::new(command)
            .args(arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConnectError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_drain(command.to_string(), stderr);
        }

        Ok(Self {
            command: command.to_string(),
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            child,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// OS process id, `None` once the process has been reaped
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn stdin(&mut self) -> Option<&mut ChildStdin> {
        self.stdin.as_mut()
    }

    pub fn stdout(&mut self) -> Option<&mut ChildStdout> {
        self.stdout.as_mut()
    }

    /// Hands the process input stream to the protocol client
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Hands the process output stream to the protocol client
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Non-blocking check for process exit
    pub(crate) fn exit_status(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Closes the process input, kills the process if still running, and
    /// reaps it
    pub(crate) async fn shutdown(&mut self) {
        drop(self.stdin.take());
        drop(self.stdout.take());

        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(
                    command = %self.command,
                    %status,
                    "MCP stdio server already exited"
                );
                return;
            }
            Ok(None) => {
                if let Err(e) = self.child.start_kill() {
                    tracing::warn!(
                        command = %self.command,
                        error = %e,
                        "Failed to kill MCP stdio server"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    command = %self.command,
                    error = %e,
                    "Failed to query MCP stdio server"
                );
            }
        }

        match self.child.wait().await {
            Ok(status) => {
                tracing::debug!(command = %self.command, %status, "MCP stdio server stopped")
            }
            Err(e) => {
                tracing::warn!(
                    command = %self.command,
                    error = %e,
                    "Failed to reap MCP stdio server"
                )
            }
        }
    }
}

fn spawn_stderr_drain(command: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(command = %command, line = %line, "MCP server stderr");
        }
    });
}
