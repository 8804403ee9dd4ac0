//! CLI argument parsing for `pcfg`.
//!
//! The CLI only routes to the library; all block handling lives in the
//! gateway so a UI can call the same code directly.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable naming the host config file.
pub const CONFIG_ENV: &str = "PCFG_CONFIG";

#[derive(Parser, Debug)]
#[command(
    name = "pcfg",
    version,
    about = "Inspect and upgrade the @ParserConfig block of a launcher config",
    after_help = "Examples:\n  pcfg --config bin/config.json show\n  pcfg --config bin/config.json touch\n  pcfg --config bin/config.json normalize\n  PCFG_CONFIG=bin/config.json pcfg fetch --timeout-secs 10",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Host config file (falls back to $PCFG_CONFIG, then the platform config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Show(ShowArgs),
    Touch(TouchArgs),
    Normalize(NormalizeArgs),
    Fetch(FetchArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Extract and migrate the block in memory, then summarize it")]
pub struct ShowArgs {
    /// Print the migrated fragment as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Normalize the block and stamp parser.last_updated")]
pub struct TouchArgs {
    /// Instant to record (RFC3339); defaults to now
    #[arg(long, value_name = "RFC3339")]
    pub at: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Migrate and normalize the block without changing last_updated")]
pub struct NormalizeArgs {}

#[derive(Parser, Debug)]
#[command(about = "Fetch and decode every remote proxy source")]
pub struct FetchArgs {
    /// Whole-request timeout per source
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}
