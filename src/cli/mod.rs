//! CLI module for Laer.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Laer - Study Assistant with Capabilities and Artifacts
///
/// A local-first CLI tool for studying with an LLM assistant that can call
/// capabilities and generate side artifacts. The name "Laer" comes from the
/// Norwegian word "lære," meaning "learn."
#[derive(Parser, Debug)]
#[command(name = "laer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Laer and write a default configuration
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Chat with the study assistant
    Chat {
        /// Override the chat model
        #[arg(short, long)]
        model: Option<String>,

        /// Disable a capability for this session (repeatable)
        #[arg(long = "no-capability", value_name = "NAME")]
        no_capability: Vec<String>,

        /// Owner recorded on artifacts created in this session
        #[arg(long)]
        owner: Option<String>,
    },

    /// Run the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8484)]
        port: u16,
    },

    /// Inspect stored artifacts
    Artifacts {
        #[command(subcommand)]
        action: ArtifactsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArtifactsAction {
    /// List the latest version of every artifact
    List,

    /// Show the latest version of one artifact
    Show {
        /// Artifact id
        id: String,
    },

    /// List every stored version of one artifact
    Versions {
        /// Artifact id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the active configuration
    Show,

    /// Print the configuration file path
    Path,
}
