//! Remote event-stream transport
//!
//! Opens `GET <url>` with `Accept: text/event-stream` and keeps the response
//! body open. Framing of the events is left to the protocol client.

use crate::mcp::connector::ConnectError;
use axum::body::Bytes;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use std::time::Duration;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// An open event stream to a remote tool server
#[derive(Debug)]
pub struct StreamLink {
    url: String,
    response: Option<reqwest::Response>,
    failed: bool,
}

impl StreamLink {
    /// Performs the handshake
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - 2xx response with an event-stream content type
    /// * `Err(ConnectError::InvalidUrl)` - URL could not be parsed
    /// * `Err(ConnectError::Timeout)` - No response headers within `timeout`
    /// * `Err(ConnectError::Network)` - Transport-level failure
    /// * `Err(ConnectError::Handshake)` - Non-success HTTP status
    /// * `Err(ConnectError::UnexpectedContentType)` - Not an event stream
    pub(crate) async fn open(
        client: &reqwest::Client,
        url: &str,
        timeout: Duration,
    ) -> Result<Self, ConnectError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| ConnectError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(url = %url, "Opening MCP event stream");

        let request = client
            .get(parsed)
            .header(ACCEPT, EVENT_STREAM_CONTENT_TYPE)
            .header(CACHE_CONTROL, "no-cache");

        let response = match tokio::time::timeout(timeout, request.send()).await {
            Err(_) => {
                return Err(ConnectError::Timeout {
                    url: url.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(Err(e)) if e.is_timeout() => {
                return Err(ConnectError::Timeout {
                    url: url.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(Err(source)) => {
                return Err(ConnectError::Network {
                    url: url.to_string(),
                    source,
                })
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectError::Handshake {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_event_stream_content_type(&content_type) {
            return Err(ConnectError::UnexpectedContentType {
                url: url.to_string(),
                content_type,
            });
        }

        Ok(Self {
            url: url.to_string(),
            response: Some(response),
            failed: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Next raw body chunk; `Ok(None)` once the server ends the stream or
    /// the link has been closed
    ///
    /// The end of the body or a read error drops the response, so the link
    /// stops reporting itself open.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, reqwest::Error> {
        let Some(response) = self.response.as_mut() else {
            return Ok(None);
        };

        match response.chunk().await {
            Ok(Some(chunk)) => Ok(Some(chunk)),
            Ok(None) => {
                self.response = None;
                tracing::info!(url = %self.url, "MCP event stream ended by server");
                Ok(None)
            }
            Err(e) => {
                self.response = None;
                self.failed = true;
                tracing::warn!(url = %self.url, error = %e, "MCP event stream read failed");
                Err(e)
            }
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.response.is_some()
    }

    pub(crate) fn has_failed(&self) -> bool {
        self.failed
    }

    pub(crate) fn shutdown(&mut self) {
        if self.response.take().is_some() {
            tracing::debug!(url = %self.url, "Closed MCP event stream");
        }
    }
}

/// Matches `text/event-stream`, ignoring case and media-type parameters
pub fn is_event_stream_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case(EVENT_STREAM_CONTENT_TYPE))
        .unwrap_or(false)
}
