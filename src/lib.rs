pub mod config;
pub mod error;
pub mod handlers;
pub mod mcp;
pub mod models;
pub mod services;
pub mod watch;

// Shared fixtures for the unit and integration tests
pub mod test_utils;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use config::AppConfig;
use mcp::connector::{Connector, TransportConnector};
use mcp::registry::{ServerRegistry, SharedRegistry};
use mcp::session::ToolSession;
use services::filesystem_service::FilesystemService;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use watch::{WatchHub, WatchService};

#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub connector: Arc<dyn Connector>,
    pub watch_hub: Arc<WatchHub>,
    pub filesystem: Arc<FilesystemService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Fresh state with an empty registry and no active watches
    pub fn new(config: AppConfig) -> Self {
        Self {
            registry: ServerRegistry::shared(),
            connector: Arc::new(TransportConnector::new(config.connect_timeout)),
            watch_hub: WatchHub::new(WatchService::new(config.watch_poll_interval)),
            filesystem: Arc::new(FilesystemService::new(config.filesystem_root.clone())),
            config: Arc::new(config),
        }
    }

    /// Connection session for the assistant runtime over this state's
    /// registry, connecting with the configured timeout
    pub fn tool_session(&self) -> ToolSession {
        ToolSession::new(self.registry.clone(), Arc::clone(&self.connector))
    }
}

/// HTTP surface: server registry routes and the filesystem routes
pub fn build_router(state: AppState) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::CACHE_CONTROL])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route(
            "/api/servers",
            get(handlers::server_handlers::list_servers)
                .post(handlers::server_handlers::add_server)
                .delete(handlers::server_handlers::remove_server),
        )
        .route(
            "/api/servers/lookup",
            get(handlers::server_handlers::lookup_server),
        )
        .route(
            "/api/servers/presets",
            get(handlers::server_handlers::list_presets),
        )
        .route(
            "/api/servers/presets/{name}",
            post(handlers::server_handlers::add_preset),
        )
        .route(
            "/api/filesystem",
            get(handlers::filesystem_handlers::filesystem_op),
        )
        .route(
            "/api/filesystem/subscribe",
            get(handlers::filesystem_handlers::subscribe),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}
