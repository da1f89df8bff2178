use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipforge")]
#[command(author, version, about = "Web service and CLI for ffmpeg-based media tools")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web service
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config; CLIPFORGE_PORT also works)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single tool synchronously and wait for it to finish
    Run {
        /// Tool id (see `clipforge tools`)
        tool: String,

        /// Tool parameters as key=value pairs, e.g. input=clip.mp4 start=00:00:10
        params: Vec<String>,
    },

    /// List the available tools
    Tools,

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the external tools are available
    CheckTools,

    /// Validate a configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },
}
