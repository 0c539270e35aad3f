use mcpdesk::{build_router, config::AppConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcpdesk=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // The watch needs an existing root; create it on first run
    tokio::fs::create_dir_all(&config.filesystem_root).await?;
    tracing::info!(
        root = %config.filesystem_root.display(),
        keep_alive_secs = config.keep_alive.as_secs(),
        poll_ms = config.watch_poll_interval.as_millis() as u64,
        "Filesystem root ready"
    );

    let addr = config.socket_addr();
    let app = build_router(AppState::new(config));

    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
