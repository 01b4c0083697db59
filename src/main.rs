//! Remixer CLI
//!
//! Command-line interface for the remix engine.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use remixer::cli::commands;
use remixer::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Remixer v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd).await,
        None => {
            println!("Remixer v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

async fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Remix {
            original,
            take,
            output,
            config,
            mode,
            original_volume,
            remix_volume,
            trim_start,
            trim_end,
            effect,
        } => {
            let config = commands::build_config(
                config.as_deref(),
                mode,
                original_volume,
                remix_volume,
                trim_start,
                trim_end,
                &effect,
            )?;
            commands::remix(&original, &take, &output, &config).await
        }
        Commands::Mix {
            inputs,
            output,
            gains,
            offsets,
            sample_rate,
            channels,
        } => commands::mix_files(&inputs, &output, &gains, &offsets, sample_rate, channels),
        Commands::Trim {
            input,
            output,
            start,
            end,
        } => commands::trim_file(&input, &output, start, end),
        Commands::Effect {
            input,
            output,
            effect,
        } => commands::effect_file(&input, &output, &effect),
        Commands::Meter { input, tick_ms } => commands::meter_file(&input, tick_ms).map(|_| ()),
        Commands::Info { input } => commands::show_info(&input),
        Commands::Config => commands::print_default_config(),
    }
}
