//! childwatch CLI entry point
//!
//! Usage:
//!   childwatch [OPTIONS] -- <PROGRAM> [ARGS]...

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use childwatch::cli::{exit_code_for, Cli};
use childwatch::{load_config, run_with_config, ErrorInfo, RunError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("childwatch=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?.with_options(cli.run_options());

    match run_with_config(config, cli.program(), cli.args()).await {
        Ok(output) => {
            // Mirrored output has already been written live
            if !config.mirror_output {
                std::io::stdout()
                    .write_all(&output.stdout)
                    .context("Failed to write captured stdout")?;
                std::io::stderr()
                    .write_all(&output.stderr)
                    .context("Failed to write captured stderr")?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report(&err, cli.json)?;
            Ok(ExitCode::from(exit_code_for(&err)))
        }
    }
}

fn report(err: &RunError, json: bool) -> Result<()> {
    if json {
        let info = ErrorInfo::from(err);
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    match std::error::Error::source(err) {
        Some(cause) => eprintln!("{}: {}: {}", "error".red().bold(), err, cause),
        None => eprintln!("{}: {}", "error".red().bold(), err),
    }
    if let Some(suggestion) = ErrorInfo::from(err).suggestion {
        eprintln!("{}: {}", "hint".cyan(), suggestion);
    }
    Ok(())
}
