//! Quick-add server presets
//!
//! Named, pre-filled drafts offered by the configuration UI. They are plain
//! [`DescriptorDraft`]s and go through validation like any other submission.

use crate::models::descriptor::{DescriptorDraft, TransportKind};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::path::Path;

/// Placeholder substituted with the configured filesystem root
const ROOT_PLACEHOLDER: &str = "{root}";

#[derive(Debug, Clone, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub command: &'static str,
    pub arguments: &'static str,
}

static PRESETS: Lazy<Vec<Preset>> = Lazy::new(|| {
    vec![
        Preset {
            name: "time",
            description: "Current time and timezone conversion",
            command: "uvx",
            arguments: "mcp-server-time --local-timezone=Asia/Shanghai",
        },
        Preset {
            name: "filesystem",
            description: "Read and write files under the shared filesystem root",
            command: "npx",
            arguments: "-y @modelcontextprotocol/server-filesystem {root}",
        },
        Preset {
            name: "sequential-thinking",
            description: "Structured step-by-step reasoning",
            command: "npx",
            arguments: "-y @modelcontextprotocol/server-sequential-thinking",
        },
    ]
});

pub fn presets() -> &'static [Preset] {
    &PRESETS
}

pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.name == name)
}

/// Builds the draft for a named preset, or `None` if no preset has that name
pub fn preset_draft(name: &str, filesystem_root: &Path) -> Option<DescriptorDraft> {
    find_preset(name).map(|preset| preset.to_draft(filesystem_root))
}

impl Preset {
    pub fn to_draft(&self, filesystem_root: &Path) -> DescriptorDraft {
        let arguments = self
            .arguments
            .replace(ROOT_PLACEHOLDER, &filesystem_root.to_string_lossy());

        DescriptorDraft {
            name: Some(self.name.to_string()),
            transport: TransportKind::Stdio,
            command: Some(self.command.to_string()),
            arguments: Some(arguments),
            url: None,
        }
    }
}
