//! Grid Shell - command-line front end for client configuration and app
//! resolution.
//!
//! Inspects client descriptors, renders their command lines, lists
//! launchable apps and resolves or updates the Grid UI bundle.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "grid-shell")]
#[command(about = "Ethereum Grid client and app resolution")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Grid data directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known clients and rejected descriptors
    Clients,

    /// Render a client's command-line flags
    Flags {
        client: String,
        /// Setting value as KEY=VALUE (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        values: Vec<String>,
        /// Fill unset settings with their defaults
        #[arg(long)]
        defaults: bool,
        /// Render for another platform (windows, linux, macos)
        #[arg(long)]
        platform: Option<String>,
    },

    /// Print a client's control endpoint path
    Endpoint {
        client: String,
        #[arg(long = "set", value_name = "KEY=VALUE")]
        values: Vec<String>,
        #[arg(long)]
        platform: Option<String>,
    },

    /// List launchable apps from every source
    Apps,

    /// Resolve where the Grid UI bundle would load from
    Resolve {
        /// Prefer a running dev server on localhost:3080
        #[arg(long)]
        dev: bool,
    },

    /// Check for a newer Grid UI bundle
    Update {
        /// Keep checking on the default schedule until interrupted
        #[arg(long)]
        watch: bool,
        /// Consider pre-releases
        #[arg(long)]
        prereleases: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    debug!("Running {:?}", args.command);
    let data_dir = args.data_dir;

    match args.command {
        Command::Clients => commands::clients(data_dir),
        Command::Flags {
            client,
            values,
            defaults,
            platform,
        } => commands::flags(data_dir, &client, &values, defaults, platform.as_deref()),
        Command::Endpoint {
            client,
            values,
            platform,
        } => commands::endpoint(data_dir, &client, &values, platform.as_deref()),
        Command::Apps => commands::apps(data_dir).await,
        Command::Resolve { dev } => commands::resolve(data_dir, dev).await,
        Command::Update { watch, prereleases } => {
            commands::update(data_dir, watch, prereleases).await
        }
    }
}
