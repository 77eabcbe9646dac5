//! Binary crate for the `weathernow` terminal app.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Rendering the lookup session in a full-screen terminal UI

use clap::Parser;

mod card;
mod cli;
mod logging;
mod tui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
