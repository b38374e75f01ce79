//! CLI definitions for the `chatgate` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use chatgate_infra::config::DEFAULT_CONFIG_FILE;

/// Safety-gated chat gateway in front of an Ollama-compatible model server.
#[derive(Parser)]
#[command(name = "chatgate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "CHATGATE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter for the chosen verbosity; `RUST_LOG` overrides it.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,chatgate=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway.
    Serve {
        /// Listen address (overrides `server.host`).
        #[arg(long, env = "CHATGATE_HOST")]
        host: Option<String>,

        /// Listen port (overrides `server.port`).
        #[arg(long, env = "CHATGATE_PORT")]
        port: Option<u16>,

        /// Export spans to stdout through OpenTelemetry.
        #[arg(long)]
        otel: bool,

        /// Bearer token sent to the inference and classifier backends.
        #[arg(long, env = "CHATGATE_BACKEND_API_KEY", hide_env_values = true)]
        backend_api_key: Option<String>,
    },

    /// Print the effective configuration as JSON.
    Config,
}
