//! Framereel CLI - render an episode headlessly and encode it to video.
//!
//! Usage:
//!   framereel record <EPISODE> [OUTPUT]   Capture and encode one episode
//!   framereel list                        List known episodes
//!   framereel check                       Check for ffmpeg and a browser

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use framereel_common::config::PipelineConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "framereel",
    about = "Record self-terminating browser animations to video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/framereel/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture an episode and encode it
    Record {
        /// Episode identifier
        episode: String,

        /// Output name (defaults to the episode identifier)
        output: Option<String>,

        /// Capture rate and declared playback rate
        #[arg(long)]
        fps: Option<u32>,

        /// Safety bound on captured frames
        #[arg(long)]
        max_frames: Option<u32>,

        /// Square viewport edge in pixels
        #[arg(long)]
        size: Option<u32>,
    },

    /// List known episodes
    List,

    /// Check system capabilities
    Check,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Record { .. } => "record",
            Commands::List => "list",
            Commands::Check => "check",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_from(path)?,
        None => PipelineConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    framereel_common::logging::init_logging(&config.logging);
    tracing::debug!(
        command = cli.command.name(),
        config = ?cli.config,
        "Dispatching command"
    );

    match cli.command {
        Commands::Record {
            episode,
            output,
            fps,
            max_frames,
            size,
        } => {
            if let Some(fps) = fps {
                config.fps = fps;
            }
            if let Some(max_frames) = max_frames {
                config.max_frames = max_frames;
            }
            if let Some(size) = size {
                config.size = size;
            }
            commands::record::run(config, episode, output).await
        }
        Commands::List => commands::list::run(&config),
        Commands::Check => commands::check::run(&config),
    }
}
