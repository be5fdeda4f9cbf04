//! CLI argument parsing for the coverage submission workflow.
//!
//! The CLI is intentionally thin: every flag maps onto an explicit value
//! handed to the pipeline, so the core stays testable without touching the
//! process environment.

use crate::submit;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "coveralls-multi-ci",
    version,
    about = "Submit code coverage results to Coveralls from any CI provider",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Print nothing to the console
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print debug information to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Submit(SubmitArgs),
}

/// Submit command inputs.
#[derive(Parser, Debug)]
#[command(about = "Collect coverage and git metadata, then upload to Coveralls")]
pub struct SubmitArgs {
    /// LCOV tracefile produced by the coverage run
    #[arg(long, value_name = "PATH", default_value = "lcov.info")]
    pub coverage: PathBuf,

    /// Git repository root
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub git: PathBuf,

    /// Directory measured source paths must live under
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub source: PathBuf,

    /// Where to write the assembled payload before upload
    #[arg(long, value_name = "PATH", default_value = "coveralls_payload.json")]
    pub output: PathBuf,

    /// Keep the payload file after a successful upload
    #[arg(long)]
    pub no_delete: bool,

    /// Coveralls API endpoint
    #[arg(
        long,
        value_name = "URL",
        env = "COVERALLS_ENDPOINT",
        default_value = submit::API_URL,
        hide = true
    )]
    pub endpoint: String,
}
