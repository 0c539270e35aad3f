//! Transport connector
//!
//! Turns an [`EndpointDescriptor`] into a live [`ConnectionHandle`]. Each
//! call produces a fresh handle; handles are never pooled or shared between
//! callers, and a failed connect is reported once without retrying.

use crate::mcp::stdio::StdioLink;
use crate::mcp::stream::StreamLink;
use crate::models::descriptor::{command_line, EndpointDescriptor, Transport, TransportKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while establishing a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The executable could not be launched (not found, permission denied)
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid stream URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Connection to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Connection to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Handshake with {url} failed with HTTP {status}")]
    Handshake { url: String, status: u16 },

    #[error("Handshake with {url} returned '{content_type}' instead of an event stream")]
    UnexpectedContentType { url: String, content_type: String },
}

/// Lifecycle of a [`ConnectionHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Ready,
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Link {
    Stdio(StdioLink),
    Stream(StreamLink),
}

/// Exclusive owner of one live connection
///
/// Call [`ConnectionHandle::close`] on every exit path. Dropping an unclosed
/// handle still kills a subprocess (`kill_on_drop`) and drops a stream, but
/// without reaping or logging.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: Uuid,
    identity: String,
    connected_at: DateTime<Utc>,
    state: ConnectionState,
    link: Link,
}

impl ConnectionHandle {
    fn ready(identity: &str, link: Link) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            connected_at: Utc::now(),
            state: ConnectionState::Ready,
            link,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Identity of the descriptor this handle was opened from
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn kind(&self) -> TransportKind {
        match self.link {
            Link::Stdio(_) => TransportKind::Stdio,
            Link::Stream(_) => TransportKind::Stream,
        }
    }

    /// Subprocess streams, `None` for stream transports or once closed
    pub fn stdio(&mut self) -> Option<&mut StdioLink> {
        match (&mut self.link, self.state) {
            (Link::Stdio(link), ConnectionState::Ready) => Some(link),
            _ => None,
        }
    }

    /// Remote event stream, `None` for stdio transports or once closed
    pub fn stream(&mut self) -> Option<&mut StreamLink> {
        match (&mut self.link, self.state) {
            (Link::Stream(link), ConnectionState::Ready) => Some(link),
            _ => None,
        }
    }

    /// Re-reads the underlying transport state
    ///
    /// A subprocess that exited by itself moves the handle to `closed` on a
    /// success exit code and to `failed` otherwise. A remote stream that the
    /// server ended is `closed`; one that broke mid-read is `failed`.
    pub fn refresh_state(&mut self) -> ConnectionState {
        if self.state != ConnectionState::Ready {
            return self.state;
        }

        let next = match &mut self.link {
            Link::Stdio(link) => match link.exit_status() {
                Ok(None) => ConnectionState::Ready,
                Ok(Some(status)) if status.success() => ConnectionState::Closed,
                Ok(Some(_)) | Err(_) => ConnectionState::Failed,
            },
            Link::Stream(link) if link.is_open() => ConnectionState::Ready,
            Link::Stream(link) if link.has_failed() => ConnectionState::Failed,
            Link::Stream(_) => ConnectionState::Closed,
        };

        if next != self.state {
            tracing::info!(
                identity = %self.identity,
                from = %self.state,
                to = %next,
                "MCP connection state changed"
            );
            self.state = next;
        }
        self.state
    }

    /// Terminates the subprocess or network stream
    ///
    /// Safe to call any number of times. A handle in `failed` keeps that
    /// state; every other state ends in `closed`.
    pub async fn close(&mut self) {
        match &mut self.link {
            Link::Stdio(link) => link.shutdown().await,
            Link::Stream(link) => link.shutdown(),
        }

        if !self.state.is_terminal() {
            tracing::info!(identity = %self.identity, id = %self.id, "MCP connection closed");
            self.state = ConnectionState::Closed;
        }
    }
}

/// Connection seam used by the assistant runtime
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, descriptor: &EndpointDescriptor)
        -> Result<ConnectionHandle, ConnectError>;
}

/// Spawns processes for stdio descriptors and opens event streams for
/// stream descriptors
#[derive(Debug, Clone)]
pub struct TransportConnector {
    client: reqwest::Client,
    connect_timeout: Duration,
}

impl TransportConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), connect_timeout)
    }

    pub fn with_client(client: reqwest::Client, connect_timeout: Duration) -> Self {
        Self {
            client,
            connect_timeout,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for TransportConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for TransportConnector {
    async fn connect(
        &self,
        descriptor: &EndpointDescriptor,
    ) -> Result<ConnectionHandle, ConnectError> {
        let identity = descriptor.identity();
        tracing::debug!(
            identity = %identity,
            state = %ConnectionState::Connecting,
            "Connecting to MCP server"
        );

        let link = match descriptor.transport() {
            Transport::Stdio { command, arguments } => {
                StdioLink::spawn(command, arguments).map(Link::Stdio)
            }
            Transport::Stream { url } => {
                StreamLink::open(&self.client, url, self.connect_timeout)
                    .await
                    .map(Link::Stream)
            }
        };

        match link {
            Ok(link) => {
                let handle = ConnectionHandle::ready(identity, link);
                tracing::info!(
                    identity = %identity,
                    id = %handle.id(),
                    state = %handle.state(),
                    "Connected to MCP server"
                );
                Ok(handle)
            }
            Err(e) => {
                let target = match descriptor.transport() {
                    Transport::Stdio { command, arguments } => command_line(command, arguments),
                    Transport::Stream { url } => url.clone(),
                };
                tracing::warn!(
                    identity = %identity,
                    target = %target,
                    state = %ConnectionState::Failed,
                    error = %e,
                    "Failed to connect to MCP server"
                );
                Err(e)
            }
        }
    }
}
