//! snap-preseed CLI entry point.

use clap::Parser;
use snap_preseed::config::PreseedConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

/// snap-preseed - prepare a classic image so first boot skips snap seeding
#[derive(Parser, Debug)]
#[command(name = "snap-preseed")]
#[command(about = "Preseed a classic image chroot with snapd")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    command: cli::preseed::PreseedCmd,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on RUST_LOG or default to info
    init_logging();

    tracing::debug!(version = snap_preseed::VERSION, "starting snap-preseed");

    let result = PreseedConfig::load(cli.config.as_deref()).and_then(|config| cli.command.run(config));

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("snap_preseed=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
