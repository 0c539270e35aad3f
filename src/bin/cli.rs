use clap::{Parser, Subcommand};
use mcpdesk::{
    config::AppConfig,
    mcp::connector::{Connector, TransportConnector},
    models::{descriptor::DescriptorDraft, presets::presets},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcpdesk-cli")]
#[command(about = "CLI tool for checking MCP server descriptors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a descriptor and print its identity
    Identity {
        #[command(subcommand)]
        target: Target,
    },

    /// List the quick-add presets
    Presets {
        /// Filesystem root substituted into the filesystem preset
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Connect to a server, report the connection state, then close it
    Check {
        #[command(subcommand)]
        target: Target,
    },
}

#[derive(Subcommand, Clone)]
enum Target {
    /// Server launched as a subprocess
    Stdio {
        /// Executable to run
        command: String,

        /// Arguments passed to the executable
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        arguments: Vec<String>,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remote server reached over an event stream
    Stream {
        /// Event stream URL
        url: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
}

impl Target {
    fn into_draft(self) -> DescriptorDraft {
        let (draft, name) = match self {
            Target::Stdio {
                command,
                arguments,
                name,
            } => (DescriptorDraft::stdio(command, arguments.join(" ")), name),
            Target::Stream { url, name } => (DescriptorDraft::stream(url), name),
        };
        match name {
            Some(name) => draft.named(name),
            None => draft,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();

    // Parse CLI arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Identity { target } => match target.into_draft().validate() {
            Ok(descriptor) => {
                println!("✅ Valid {} descriptor", descriptor.kind());
                println!("  Name: {}", descriptor.label());
                println!("  Identity: {}", descriptor.identity());
            }
            Err(err) => {
                eprintln!("❌ Invalid descriptor: {}", err);
                std::process::exit(1);
            }
        },
        Commands::Presets { root } => {
            let root = root.unwrap_or(config.filesystem_root);
            println!("{:<22} {:<8} {}", "Name", "Type", "Command");
            println!("{}", "-".repeat(75));
            for preset in presets() {
                let draft = preset.to_draft(&root);
                println!(
                    "{:<22} {:<8} {} {}",
                    preset.name,
                    draft.transport,
                    draft.command.unwrap_or_default(),
                    draft.arguments.unwrap_or_default()
                );
            }
        }
        Commands::Check { target } => {
            let descriptor = match target.into_draft().validate() {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    eprintln!("❌ Invalid descriptor: {}", err);
                    std::process::exit(1);
                }
            };

            let connector = TransportConnector::new(config.connect_timeout);
            match connector.connect(&descriptor).await {
                Ok(mut handle) => {
                    println!("✅ Connected to '{}'", descriptor.label());
                    println!("  Identity: {}", handle.identity());
                    println!("  Transport: {}", handle.kind());
                    println!("  State: {}", handle.refresh_state());
                    handle.close().await;
                    println!("  Closed: {}", handle.state());
                }
                Err(err) => {
                    eprintln!("❌ Failed to connect: {}", err);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
