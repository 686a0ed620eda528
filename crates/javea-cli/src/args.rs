//! Command-line surface for `javea-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "javea-cli", version, about = "Jávea Estates maintenance CLI", long_about = None)]
pub struct Cli {
    /// Server base URL, e.g. <https://javea.example>
    #[arg(long, env = "JAVEA_SITE_URL")]
    pub site: Option<String>,

    /// Path to a file containing the revalidation secret (takes precedence over env)
    #[arg(long, env = "JAVEA_REVALIDATE_SECRET_FILE")]
    pub secret_file: Option<PathBuf>,

    /// Revalidation secret from env (no CLI flag, to keep it out of shell history)
    #[arg(hide = true, env = "REVALIDATE_SECRET", hide_env_values = true)]
    pub secret_env: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Invalidate cached pages after a content upload
    Revalidate(RevalidateArgs),
    /// Probe the server's liveness endpoint
    Health,
}

#[derive(Parser, Debug, Default)]
pub struct RevalidateArgs {
    /// Cache tag to invalidate, e.g. `property:42` (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Page path to invalidate, e.g. `/rent` (repeatable)
    #[arg(long = "path", value_name = "PATH")]
    pub paths: Vec<String>,

    /// Also invalidate every property page
    #[arg(long = "all")]
    pub all: bool,
}
