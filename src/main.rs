// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! stagelink - filesystem links and pipeline stages

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagelink::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagelink=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    stagelink::utils::configure_colors();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init {
            name,
            stage_type,
            interactive,
            force,
            values,
        } => stagelink::cli::init::run(name, stage_type, interactive, force, values, cli.verbose),
        Commands::Link {
            source,
            target,
            link_types,
        } => stagelink::cli::link::run(source, target, link_types, cli.verbose),
        Commands::Inspect { paths, format } => {
            stagelink::cli::inspect::run(paths, format, cli.verbose)
        }
    }
}
