//! javea-cli: triggers cache revalidation on a running server after uploads.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod print;


use clap::Parser;

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;

    match cli.command {
        Commands::Revalidate(args) => handlers::handle_revalidate(&ctx, args).await?,
        Commands::Health => handlers::handle_health(&ctx).await?,
    }

    Ok(())
}
