//! CLI entry point for the topic labeling tool.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app_config;
mod cli;
mod commands;

use app_config::{FileConfig, VerbositySetting};
use cli::{Args, Command};

/// Process outcome mapped to the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    match run(&args).await {
        Ok(exit) => exit.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<ProcessExit> {
    let config = app_config::load_config(args.config.as_deref())?;
    init_tracing(args, &config);
    debug!(
        ?args,
        config_verbosity = ?config.verbosity.map(VerbositySetting::as_str),
        "CLI arguments parsed"
    );

    match &args.command {
        Command::Summarize(summarize) => {
            commands::run_summarize_command(summarize, &config)?;
            Ok(ProcessExit::Success)
        }
        Command::Classify(classify) => {
            commands::run_classify_command(classify, &config)?;
            Ok(ProcessExit::Success)
        }
        Command::Run(run_args) => {
            let show_progress = !args.quiet && io::stderr().is_terminal();
            commands::run_pipeline_command(run_args, &config, show_progress).await
        }
    }
}

/// Installs the subscriber.
///
/// Priority: RUST_LOG env var > quiet flag > verbose flag > config > default (info)
fn init_tracing(args: &Args, config: &FileConfig) {
    let default_level = log_level(args.quiet, args.verbose, config.verbosity);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn log_level(quiet: bool, verbose: u8, configured: Option<VerbositySetting>) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => configured.map_or("info", VerbositySetting::log_level),
        1 => "debug",
        _ => "trace",
    }
}
