use mcpdesk::mcp::connector::{ConnectError, ConnectionState, TransportConnector};
use mcpdesk::mcp::registry::ServerRegistry;
use mcpdesk::mcp::session::{SessionError, ToolSession};
use mcpdesk::models::descriptor::DescriptorDraft;
use mcpdesk::test_utils::test_helpers;
use mcpdesk::AppState;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_with(drafts: Vec<DescriptorDraft>) -> (ToolSession, mcpdesk::mcp::SharedRegistry) {
    let mut registry = ServerRegistry::new();
    for draft in drafts {
        registry.add(draft).unwrap();
    }
    let shared = Arc::new(tokio::sync::RwLock::new(registry));
    let connector = Arc::new(TransportConnector::new(Duration::from_secs(2)));
    (ToolSession::new(shared.clone(), connector), shared)
}

#[tokio::test]
async fn test_open_unknown_server() {
    let (mut session, _) = session_with(vec![]);

    let result = session.open("npx -y missing").await;
    assert!(matches!(result, Err(SessionError::UnknownServer(id)) if id == "npx -y missing"));
}

#[tokio::test]
async fn test_reopen_replaces_handle() {
    let (mut session, _) = session_with(vec![test_helpers::sleeper_draft()]);

    let first = session.open("sleep 30").await.unwrap().id();
    let second = session.open("sleep 30").await.unwrap().id();

    assert_ne!(first, second);
    assert_eq!(session.open_identities(), vec!["sleep 30"]);
    assert_eq!(
        session.handle("sleep 30").map(|handle| handle.state()),
        Some(ConnectionState::Ready)
    );

    session.shutdown().await;
    assert!(session.open_identities().is_empty());
}

#[tokio::test]
async fn test_disconnect() {
    let (mut session, _) = session_with(vec![test_helpers::sleeper_draft()]);
    session.open("sleep 30").await.unwrap();

    assert!(session.disconnect("sleep 30").await);
    assert!(!session.disconnect("sleep 30").await);
    assert!(session.handle("sleep 30").is_none());
}

#[tokio::test]
async fn test_failed_connect_keeps_descriptor_registered() {
    let (mut session, registry) = session_with(vec![DescriptorDraft::stdio(
        "mcpdesk-definitely-not-installed",
        "",
    )]);

    let result = session.open("mcpdesk-definitely-not-installed").await;
    assert!(matches!(
        result,
        Err(SessionError::Connect(ConnectError::Spawn { .. }))
    ));

    // The user can still see and fix the bad entry
    assert!(registry
        .read()
        .await
        .find("mcpdesk-definitely-not-installed")
        .is_some());
    assert!(session.open_identities().is_empty());
}

#[tokio::test]
async fn test_app_state_session_uses_registry() {
    let (state, _dir) = test_helpers::create_test_state();
    state
        .registry
        .write()
        .await
        .add(test_helpers::sleeper_draft())
        .unwrap();

    let mut session = state.tool_session();
    let handle = session.open("sleep 30").await.unwrap();
    assert_eq!(handle.state(), ConnectionState::Ready);

    session.shutdown().await;
}

#[tokio::test]
async fn test_app_state_session_honours_connect_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("", "text/event-stream")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let (mut config, _dir) = test_helpers::test_config(Duration::from_secs(15));
    config.connect_timeout = Duration::from_millis(200);
    let state = AppState::new(config);

    let url = format!("{}/sse", mock_server.uri());
    state
        .registry
        .write()
        .await
        .add(DescriptorDraft::stream(&url))
        .unwrap();

    let mut session = state.tool_session();
    let result = session.open(&url).await;
    assert!(matches!(
        result,
        Err(SessionError::Connect(ConnectError::Timeout { timeout_ms: 200, .. }))
    ));
}
