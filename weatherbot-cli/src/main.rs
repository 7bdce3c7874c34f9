//! Binary crate for the `weatherbot` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging set-up
//! - Interactive prompts for chat and configuration

use clap::Parser;

mod cli;
mod prompt;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cli::init_logging(cmd.verbose);
    cmd.run().await
}
