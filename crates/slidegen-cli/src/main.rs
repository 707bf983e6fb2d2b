//! slidegen CLI entry point.
//!
//! # Commands
//!
//! - `slidegen init`: write a starter config file
//! - `slidegen status`: show settings and provider configuration state
//! - `slidegen resolve [--json]`: print the template `(provider, model)` pair
//! - `slidegen generate <IMAGES>...`: run the template pipeline over slide images

mod generate;
mod helpers;
mod init;
mod resolve;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Pick the LLM for slide-template generation and run it
#[derive(Parser)]
#[command(name = "slidegen", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.slidegen/config.json, or $SLIDEGEN_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init,

    /// Show settings and provider status
    Status,

    /// Print the provider and model template generation will use
    Resolve {
        /// Machine-readable output
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Generate a template from slide images
    Generate {
        /// Slide images, in slide order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Slides processed at the same time
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,

        /// Attempts per LLM call for transient failures
        #[arg(short, long, default_value_t = 3)]
        retries: u32,

        /// Write the template JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = helpers::config_path(cli.config);

    match cli.command {
        Commands::Init => init::run(&config_path),
        Commands::Status => status::run(&config_path),
        Commands::Resolve { json } => resolve::run(&config_path, json),
        Commands::Generate {
            images,
            concurrency,
            retries,
            out,
            logs,
        } => {
            init_logging(logs);
            generate::run(
                &config_path,
                generate::GenerateArgs {
                    images,
                    concurrency,
                    retries,
                    out,
                },
            )
            .await
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("slidegen=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
