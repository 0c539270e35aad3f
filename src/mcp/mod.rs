//! Tool-server registration and connections
//!
//! - [`ServerRegistry`] - Configured servers, deduplicated by identity
//! - [`TransportConnector`] - Opens a [`ConnectionHandle`] for a descriptor
//! - [`ToolSession`] - Owns the handles of one assistant session

pub mod connector;
pub mod registry;
pub mod session;
pub mod stdio;
pub mod stream;

pub use connector::{
    ConnectError, ConnectionHandle, ConnectionState, Connector, TransportConnector,
};
pub use registry::{RegistryStats, ServerRegistry, SharedRegistry};
pub use session::{SessionError, ToolSession};
pub use stdio::StdioLink;
pub use stream::StreamLink;
