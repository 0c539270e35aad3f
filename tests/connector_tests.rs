use mcpdesk::mcp::connector::{
    ConnectError, ConnectionHandle, ConnectionState, Connector, TransportConnector,
};
use mcpdesk::models::descriptor::{DescriptorDraft, EndpointDescriptor, TransportKind};
use mcpdesk::test_utils::test_helpers;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector() -> TransportConnector {
    TransportConnector::new(Duration::from_secs(2))
}

fn descriptor(draft: DescriptorDraft) -> EndpointDescriptor {
    draft.validate().expect("draft should be valid")
}

/// Polls until the subprocess is observed as exited
async fn wait_for_exit(handle: &mut ConnectionHandle) -> ConnectionState {
    for _ in 0..100 {
        let state = handle.refresh_state();
        if state != ConnectionState::Ready {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.state()
}

#[tokio::test]
async fn test_stdio_connect_exchange_and_close() {
    let descriptor = descriptor(test_helpers::cat_draft());
    let mut handle = connector().connect(&descriptor).await.unwrap();

    assert_eq!(handle.state(), ConnectionState::Ready);
    assert_eq!(handle.kind(), TransportKind::Stdio);
    assert_eq!(handle.identity(), "cat");

    let link = handle.stdio().expect("stdio link while ready");
    assert!(link.pid().is_some());
    let mut stdin = link.take_stdin().unwrap();
    let stdout = link.take_stdout().unwrap();

    stdin.write_all(b"ping\n").await.unwrap();
    stdin.flush().await.unwrap();
    let mut lines = BufReader::new(stdout).lines();
    assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("ping"));
    drop(stdin);

    handle.close().await;
    assert_eq!(handle.state(), ConnectionState::Closed);
    assert!(handle.stdio().is_none());

    // Second close is a no-op
    handle.close().await;
    assert_eq!(handle.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_close_kills_running_process() {
    let descriptor = descriptor(test_helpers::sleeper_draft());
    let mut handle = connector().connect(&descriptor).await.unwrap();
    assert_eq!(handle.refresh_state(), ConnectionState::Ready);

    tokio::time::timeout(Duration::from_secs(5), handle.close())
        .await
        .expect("close should not wait for the process to finish");
    assert_eq!(handle.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_missing_executable_is_spawn_error() {
    let descriptor = descriptor(DescriptorDraft::stdio(
        "mcpdesk-definitely-not-installed",
        "--flag",
    ));

    match connector().connect(&descriptor).await {
        Err(ConnectError::Spawn { command, source }) => {
            assert_eq!(command, "mcpdesk-definitely-not-installed");
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected spawn error, got {:?}", other.map(|h| h.state())),
    }
}

#[tokio::test]
async fn test_process_exit_is_observed() {
    let mut ok = connector()
        .connect(&descriptor(DescriptorDraft::stdio("true", "")))
        .await
        .unwrap();
    assert_eq!(wait_for_exit(&mut ok).await, ConnectionState::Closed);

    let mut failed = connector()
        .connect(&descriptor(DescriptorDraft::stdio("false", "")))
        .await
        .unwrap();
    assert_eq!(wait_for_exit(&mut failed).await, ConnectionState::Failed);

    // Closing a failed handle keeps the failure visible
    failed.close().await;
    assert_eq!(failed.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_stream_connect_reads_chunks() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "event: endpoint\ndata: /message\n\n",
            "text/event-stream",
        ))
        .mount(&mock_server)
        .await;

    let url = format!("{}/sse", mock_server.uri());
    let descriptor = descriptor(DescriptorDraft::stream(&url).named("remote"));
    let mut handle = connector().connect(&descriptor).await.unwrap();

    assert_eq!(handle.state(), ConnectionState::Ready);
    assert_eq!(handle.kind(), TransportKind::Stream);
    assert_eq!(handle.identity(), url);

    let link = handle.stream().expect("stream link while ready");
    assert_eq!(link.url(), url);
    let mut body = Vec::new();
    while let Some(chunk) = link.next_chunk().await.unwrap() {
        body.extend_from_slice(&chunk);
    }
    assert_eq!(body, b"event: endpoint\ndata: /message\n\n");

    // The server ended the body, so the handle is no longer ready
    assert_eq!(handle.refresh_state(), ConnectionState::Closed);
    assert!(handle.stream().is_none());

    handle.close().await;
    handle.close().await;
    assert_eq!(handle.state(), ConnectionState::Closed);
    assert!(handle.stream().is_none());
}

#[tokio::test]
async fn test_stream_non_success_status_is_handshake_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let descriptor = descriptor(DescriptorDraft::stream(format!(
        "{}/sse",
        mock_server.uri()
    )));
    let result = connector().connect(&descriptor).await;
    assert!(matches!(
        result,
        Err(ConnectError::Handshake { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_stream_wrong_content_type_is_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&mock_server)
        .await;

    let descriptor = descriptor(DescriptorDraft::stream(format!(
        "{}/sse",
        mock_server.uri()
    )));
    match connector().connect(&descriptor).await {
        Err(ConnectError::UnexpectedContentType { content_type, .. }) => {
            assert!(content_type.starts_with("application/json"));
        }
        other => panic!("expected content type error, got {:?}", other.map(|h| h.state())),
    }
}

#[tokio::test]
async fn test_stream_handshake_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("", "text/event-stream")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let descriptor = descriptor(DescriptorDraft::stream(format!(
        "{}/sse",
        mock_server.uri()
    )));
    let connector = TransportConnector::new(Duration::from_millis(200));
    let result = connector.connect(&descriptor).await;
    assert!(matches!(
        result,
        Err(ConnectError::Timeout {
            timeout_ms: 200,
            ..
        })
    ));
}

#[tokio::test]
async fn test_stream_truncated_body_marks_failed() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 1024];
        let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut request).await;
        // Promise more body than is sent, then hang up
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  Content-Type: text/event-stream\r\n\
                  Content-Length: 100\r\n\r\n\
                  event: endpoint\n",
            )
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let descriptor = descriptor(DescriptorDraft::stream(format!("http://{}/sse", addr)));
    let mut handle = connector().connect(&descriptor).await.unwrap();
    assert_eq!(handle.state(), ConnectionState::Ready);

    let link = handle.stream().expect("stream link while ready");
    let mut result = link.next_chunk().await;
    while let Ok(Some(_)) = result {
        result = link.next_chunk().await;
    }
    assert!(result.is_err());

    assert_eq!(handle.refresh_state(), ConnectionState::Failed);
    handle.close().await;
    assert_eq!(handle.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_stream_refused_is_network_error() {
    // Bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let descriptor = descriptor(DescriptorDraft::stream(format!("http://{}/sse", addr)));
    let result = connector().connect(&descriptor).await;
    assert!(matches!(result, Err(ConnectError::Network { .. })));
}

#[tokio::test]
async fn test_stream_invalid_url() {
    let descriptor = descriptor(DescriptorDraft::stream("not a url"));
    let result = connector().connect(&descriptor).await;
    assert!(matches!(result, Err(ConnectError::InvalidUrl { .. })));
}
