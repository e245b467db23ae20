//! Eavesdrop - a generic live-reload supervisor.
//!
//! Watches a project root, reacts to file changes by running task
//! pipelines and restarting services, and optionally fronts the service
//! with a reverse proxy that tells connected browsers to reload.

mod cli;
mod config;
mod embed;
mod logger;
mod proxy;
mod reactor;
mod supervisor;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;
use supervisor::Supervisor;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match &cli.command {
        Some(Commands::Init { out, ext }) => cli::init::generate(out, *ext),
        None => run(&cli),
    }
}

/// Load the config and supervise until SIGINT/SIGTERM.
fn run(cli: &Cli) -> Result<()> {
    let config_path = Config::find(cli.config.as_deref())?;
    let config = Config::load(&config_path)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

        let mut signalled = false;
        ctrlc::set_handler(move || {
            if signalled {
                // second signal: the user means it
                std::process::exit(130);
            }
            signalled = true;
            let _ = shutdown_tx.try_send(());
        })?;

        let supervisor = Supervisor::start(config).await?;
        log!("watch"; "ready (Ctrl+C to stop)");

        shutdown_rx.recv().await;
        log!("watch"; "shutting down...");
        supervisor.stop().await;

        Ok(())
    })
}
