//! In-memory registry of tool-server descriptors
//!
//! Holds the servers a user has configured for the current session, in
//! insertion order. The registry stores descriptors, not live connections,
//! so registration never waits on a process or a network handshake.

use crate::models::descriptor::{
    DescriptorDraft, EndpointDescriptor, TransportKind, ValidationError,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered collection of [`EndpointDescriptor`]s keyed by identity
///
/// # Invariants
///
/// * No two entries share an identity
/// * Re-adding an identity replaces the entry in place
///
/// # Thread Safety
///
/// Wrap in [`SharedRegistry`] to share across handlers and sessions.
///
/// # Examples
///
/// ```rust
/// use mcpdesk::mcp::registry::ServerRegistry;
/// use mcpdesk::models::descriptor::DescriptorDraft;
///
/// let mut registry = ServerRegistry::new();
/// registry.add(DescriptorDraft::stdio("npx", "-y @modelcontextprotocol/server-memory"))?;
/// assert!(registry.find("npx -y @modelcontextprotocol/server-memory").is_some());
/// # Ok::<(), mcpdesk::models::descriptor::ValidationError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct ServerRegistry {
    servers: Vec<EndpointDescriptor>,
}

pub type SharedRegistry = Arc<RwLock<ServerRegistry>>;

/// Counters shown alongside the server list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub stdio: usize,
    pub stream: usize,
}

impl ServerRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Validates and registers a descriptor
    ///
    /// # Returns
    ///
    /// * `Ok(&[EndpointDescriptor])` - Registry contents after the add
    /// * `Err(ValidationError)` - Draft was malformed; registry unchanged
    ///
    /// # Behavior
    ///
    /// An entry with the same identity is replaced at its original position.
    /// Otherwise the descriptor is appended.
    pub fn add(
        &mut self,
        draft: DescriptorDraft,
    ) -> Result<&[EndpointDescriptor], ValidationError> {
        let descriptor = draft.validate()?;
        self.insert(descriptor);
        Ok(&self.servers)
    }

    /// Registers an already validated descriptor with replace-on-duplicate
    pub(crate) fn insert(&mut self, descriptor: EndpointDescriptor) -> &[EndpointDescriptor] {
        match self.position(descriptor.identity()) {
            Some(index) => {
                tracing::info!(
                    identity = %descriptor.identity(),
                    position = index,
                    "Replaced MCP server descriptor"
                );
                self.servers[index] = descriptor;
            }
            None => {
                tracing::info!(
                    identity = %descriptor.identity(),
                    transport = %descriptor.kind(),
                    "Registered MCP server descriptor"
                );
                self.servers.push(descriptor);
            }
        }
        &self.servers
    }

    /// Removes the entry with the given identity
    ///
    /// Removing an identity that is not registered is a no-op.
    pub fn remove(&mut self, identity: &str) -> &[EndpointDescriptor] {
        if let Some(index) = self.position(identity) {
            let removed = self.servers.remove(index);
            tracing::info!(identity = %removed.identity(), "Removed MCP server descriptor");
        } else {
            tracing::debug!(identity = %identity, "Remove ignored: identity not registered");
        }
        &self.servers
    }

    /// Read-only view in insertion order
    pub fn list(&self) -> &[EndpointDescriptor] {
        &self.servers
    }

    pub fn find(&self, identity: &str) -> Option<&EndpointDescriptor> {
        self.servers.iter().find(|d| d.identity() == identity)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let stdio = self
            .servers
            .iter()
            .filter(|d| d.kind() == TransportKind::Stdio)
            .count();
        RegistryStats {
            total: self.servers.len(),
            stdio,
            stream: self.servers.len() - stdio,
        }
    }

    fn position(&self, identity: &str) -> Option<usize> {
        self.servers.iter().position(|d| d.identity() == identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_is_empty() {
        let registry = ServerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.find("anything").is_none());
        assert_eq!(
            registry.stats(),
            RegistryStats {
                total: 0,
                stdio: 0,
                stream: 0
            }
        );
    }

    #[test]
    fn test_invalid_draft_leaves_registry_untouched() {
        let mut registry = ServerRegistry::new();
        registry
            .add(DescriptorDraft::stream("http://localhost:9000/sse"))
            .unwrap();

        let result = registry.add(DescriptorDraft::stdio("  ", "-y foo"));
        assert_eq!(result.err(), Some(ValidationError::MissingCommand));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stats_count_by_transport() {
        let mut registry = ServerRegistry::new();
        registry.add(DescriptorDraft::stdio("uvx", "mcp-server-time")).unwrap();
        registry.add(DescriptorDraft::stdio("npx", "-y foo")).unwrap();
        registry.add(DescriptorDraft::stream("http://a/sse")).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.stdio, 2);
        assert_eq!(stats.stream, 1);
    }
}
