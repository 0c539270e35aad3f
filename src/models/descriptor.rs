//! Endpoint descriptors for tool servers
//!
//! A descriptor says how to reach one MCP server: either spawn a local
//! process and talk over its stdin/stdout, or open a persistent event stream
//! to a remote URL. Raw input arrives as a [`DescriptorDraft`] (the shape the
//! configuration form submits) and becomes an [`EndpointDescriptor`] only
//! through [`validate`].
//!
//! # Argument tokenization
//!
//! Arguments travel as one space-joined string and are split on whitespace
//! before process invocation. There is no shell quoting: `"a b"` becomes the
//! two tokens `"a` and `b"`. Servers whose arguments contain spaces cannot be
//! described with this format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Command is required for stdio transport")]
    MissingCommand,

    #[error("URL is required for stream transport")]
    MissingUrl,
}

/// Transport selector as submitted by the configuration form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stdio,
    #[serde(alias = "sse")]
    Stream,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Stream => "stream",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Unvalidated descriptor input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub transport: TransportKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Space-joined argument string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DescriptorDraft {
    pub fn stdio(command: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: None,
            transport: TransportKind::Stdio,
            command: Some(command.into()),
            arguments: Some(arguments.into()),
            url: None,
        }
    }

    pub fn stream(url: impl Into<String>) -> Self {
        Self {
            name: None,
            transport: TransportKind::Stream,
            command: None,
            arguments: None,
            url: Some(url.into()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn validate(self) -> Result<EndpointDescriptor, ValidationError> {
        validate(self)
    }
}

/// How a validated descriptor reaches its server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transport {
    Stdio {
        command: String,
        arguments: Vec<String>,
    },
    Stream {
        url: String,
    },
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Stdio { .. } => TransportKind::Stdio,
            Transport::Stream { .. } => TransportKind::Stream,
        }
    }
}

/// A validated tool-server connection target
///
/// Only [`validate`] constructs one. Descriptors serialize for the HTTP
/// responses but never deserialize, so input always goes through a draft:
///
/// ```compile_fail
/// use mcpdesk::models::descriptor::EndpointDescriptor;
///
/// let raw = r#"{"identity":"","transport":{"type":"stream","url":""}}"#;
/// let _ = serde_json::from_str::<EndpointDescriptor>(raw);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    transport: Transport,
}

impl EndpointDescriptor {
    /// Deduplication key: the URL for stream servers, the normalized command
    /// line for stdio servers
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Display name when present, identity otherwise
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identity)
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }
}

/// Validates a draft and computes its identity
///
/// # Returns
///
/// * `Err(ValidationError::MissingCommand)` - stdio draft with an empty command
/// * `Err(ValidationError::MissingUrl)` - stream draft with an empty URL
pub fn validate(draft: DescriptorDraft) -> Result<EndpointDescriptor, ValidationError> {
    let display_name = non_blank(draft.name);

    let transport = match draft.transport {
        TransportKind::Stdio => {
            let command = non_blank(draft.command).ok_or(ValidationError::MissingCommand)?;
            let arguments = draft
                .arguments
                .as_deref()
                .map(tokenize_arguments)
                .unwrap_or_default();
            Transport::Stdio { command, arguments }
        }
        TransportKind::Stream => {
            let url = non_blank(draft.url).ok_or(ValidationError::MissingUrl)?;
            Transport::Stream { url }
        }
    };

    Ok(EndpointDescriptor {
        identity: compute_identity(&transport),
        display_name,
        transport,
    })
}

/// Computes the deduplication key for a transport
///
/// Stdio identities join the command and each argument token with single
/// spaces, so redundant whitespace in the input never produces a new key.
pub fn compute_identity(transport: &Transport) -> String {
    match transport {
        Transport::Stdio { command, arguments } => command_line(command, arguments),
        Transport::Stream { url } => url.trim().to_string(),
    }
}

/// Splits an argument string on whitespace. No quoting or escaping.
pub fn tokenize_arguments(arguments: &str) -> Vec<String> {
    arguments.split_whitespace().map(str::to_string).collect()
}

pub fn command_line(command: &str, arguments: &[String]) -> String {
    std::iter::once(command.trim())
        .chain(arguments.iter().map(|arg| arg.trim()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdio_requires_command() {
        let draft = DescriptorDraft::stdio("", "");
        assert_eq!(draft.validate(), Err(ValidationError::MissingCommand));

        let draft = DescriptorDraft {
            name: None,
            transport: TransportKind::Stdio,
            command: None,
            arguments: None,
            url: Some("http://ignored".to_string()),
        };
        assert_eq!(draft.validate(), Err(ValidationError::MissingCommand));
    }

    #[test]
    fn test_json_input_only_enters_as_draft() {
        let raw = serde_json::json!({"type": "stdio", "command": "  ", "arguments": "-y foo"});
        let draft: DescriptorDraft = serde_json::from_value(raw).unwrap();
        assert_eq!(draft.validate(), Err(ValidationError::MissingCommand));
    }

    #[test]
    fn test_stream_requires_url() {
        assert_eq!(
            DescriptorDraft::stream("").validate(),
            Err(ValidationError::MissingUrl)
        );
        assert_eq!(
            DescriptorDraft::stream("   ").validate(),
            Err(ValidationError::MissingUrl)
        );
    }

    #[test]
    fn test_identity_ignores_redundant_whitespace() {
        let a = DescriptorDraft::stdio("npx", "-y foo").validate().unwrap();
        let b = DescriptorDraft::stdio("npx", "  -y   foo ").validate().unwrap();
        assert_eq!(a.identity(), "npx -y foo");
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_stdio_without_arguments() {
        let descriptor = DescriptorDraft {
            name: Some("  ".to_string()),
            transport: TransportKind::Stdio,
            command: Some(" python ".to_string()),
            arguments: None,
            url: None,
        }
        .validate()
        .unwrap();

        assert_eq!(descriptor.identity(), "python");
        assert_eq!(descriptor.display_name(), None);
        assert_eq!(
            descriptor.transport(),
            &Transport::Stdio {
                command: "python".to_string(),
                arguments: vec![]
            }
        );
    }

    #[test]
    fn test_stream_identity_is_url() {
        let descriptor = DescriptorDraft::stream("http://localhost:8000/events")
            .named("events")
            .validate()
            .unwrap();
        assert_eq!(descriptor.identity(), "http://localhost:8000/events");
        assert_eq!(descriptor.label(), "events");
        assert_eq!(descriptor.kind(), TransportKind::Stream);
    }

    #[test]
    fn test_tokenizer_does_not_honour_quotes() {
        assert_eq!(
            tokenize_arguments(r#"--name "a b""#),
            vec!["--name", "\"a", "b\""]
        );
    }

    #[test]
    fn test_draft_accepts_sse_alias() {
        let draft: DescriptorDraft =
            serde_json::from_str(r#"{"type":"sse","url":"http://x/sse"}"#).unwrap();
        assert_eq!(draft.transport, TransportKind::Stream);
    }
}
