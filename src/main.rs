//! Submit code coverage results to Coveralls from any CI provider.
//!
//! One run is one submission: snapshot the environment, detect the CI
//! profile, gather git metadata, translate the coverage database, assemble
//! and validate the payload, stream it to disk, and POST it. Any fatal
//! error is logged and the process exits 1.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod ci;
mod cli;
mod error;
mod git;
mod lcov;
mod payload;
mod report;
mod serialize;
mod submit;
mod token;

fn main() -> ExitCode {
    let args = cli::RootArgs::parse();
    init_tracing(args.quiet, args.verbose);

    let result = match &args.command {
        cli::Command::Submit(submit_args) => cmd_submit(submit_args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_submit(args: &cli::SubmitArgs) -> Result<()> {
    let env: ci::EnvMap = std::env::vars().collect();
    let config = ci::detect(&env);
    tracing::info!("reporting as service {}", config.service_name);

    let git = git::git_stats(&args.git);
    if git.is_none() {
        tracing::warn!(
            "{} has no usable git metadata; submitting without it",
            args.git.display()
        );
    }

    let source_files = report::coverage_report(&args.coverage, &args.source)
        .with_context(|| format!("translate coverage from {}", args.coverage.display()))?;
    tracing::info!("collected line coverage for {} source files", source_files.len());

    let payload = payload::Payload::assemble(config, git, source_files);
    payload.ensure_submittable()?;

    let byte_size = serialize::dump_json_to_disk(&payload, &args.output)
        .with_context(|| format!("write payload to {}", args.output.display()))?;
    tracing::info!("wrote {byte_size} byte payload to {}", args.output.display());

    submit::post_to_api(&args.output, &args.endpoint).context("upload payload")?;

    if args.no_delete {
        tracing::debug!("keeping payload file at {}", args.output.display());
    } else {
        fs::remove_file(&args.output)
            .with_context(|| format!("remove payload file {}", args.output.display()))?;
    }
    Ok(())
}

/// Route log output for the run.
///
/// `--quiet` silences everything (the only writes this tool makes to the
/// console are log lines); `--verbose` enables debug. `RUST_LOG` still wins
/// when set and quiet was not requested.
fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else {
        let fallback = if verbose { "debug" } else { "info" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok();
}
