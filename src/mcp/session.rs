//! Per-session connection ownership for the assistant runtime
//!
//! A [`ToolSession`] holds at most one live [`ConnectionHandle`] per server
//! identity and guarantees every handle it owns is closed: on replacement,
//! on explicit disconnect, and on [`ToolSession::shutdown`].

use crate::mcp::connector::{ConnectError, ConnectionHandle, Connector};
use crate::mcp::registry::SharedRegistry;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("MCP server not registered: {0}")]
    UnknownServer(String),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

pub struct ToolSession {
    registry: SharedRegistry,
    connector: Arc<dyn Connector>,
    handles: HashMap<String, ConnectionHandle>,
}

impl ToolSession {
    pub fn new(registry: SharedRegistry, connector: Arc<dyn Connector>) -> Self {
        Self {
            registry,
            connector,
            handles: HashMap::new(),
        }
    }

    /// Connects to a registered server
    ///
    /// The descriptor is read from the registry under a short read lock; the
    /// lock is released before connecting. On success any previous handle
    /// for the same identity is closed and replaced. On failure the previous
    /// handle, if any, stays in place.
    pub async fn open(&mut self, identity: &str) -> Result<&mut ConnectionHandle, SessionError> {
        let descriptor = self
            .registry
            .read()
            .await
            .find(identity)
            .cloned()
            .ok_or_else(|| SessionError::UnknownServer(identity.to_string()))?;

        let handle = self.connector.connect(&descriptor).await?;

        match self.handles.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                let mut previous = entry.insert(handle);
                tracing::debug!(
                    identity = %identity,
                    id = %previous.id(),
                    "Replacing MCP connection"
                );
                previous.close().await;
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(handle)),
        }
    }

    pub fn handle(&mut self, identity: &str) -> Option<&mut ConnectionHandle> {
        self.handles.get_mut(identity)
    }

    /// Closes and forgets one connection. Returns whether one was open.
    pub async fn disconnect(&mut self, identity: &str) -> bool {
        match self.handles.remove(identity) {
            Some(mut handle) => {
                handle.close().await;
                true
            }
            None => false,
        }
    }

    /// Closes every connection owned by this session
    pub async fn shutdown(&mut self) {
        for (identity, mut handle) in self.handles.drain() {
            tracing::debug!(identity = %identity, "Closing MCP connection at session end");
            handle.close().await;
        }
    }

    pub fn open_identities(&self) -> Vec<&str> {
        self.handles.keys().map(String::as_str).collect()
    }
}
