//! CLI argument processing module
//!
//! This module handles parsing, validating, and processing command-line arguments,
//! including config file handling.

use anyhow::Result;
use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::cli::Cli;
use crate::config_file::ConfigFile;
use crate::platform::{ExitCode, SafeStderr};
use rulesplit::tty;

/// Validate CLI arguments for early error detection
pub fn validate_cli_args(cli: &Cli) -> Result<()> {
    if cli.workers > 1000 {
        return Err(anyhow::anyhow!("Worker count too high (max 1000)"));
    }

    if cli.batch_size == 0 {
        return Err(anyhow::anyhow!("Batch size must be greater than 0"));
    }

    if cli.queue_capacity == 0 {
        return Err(anyhow::anyhow!("Queue capacity must be greater than 0"));
    }

    if let Some(timeout) = cli.timeout {
        if timeout.is_zero() {
            return Err(anyhow::anyhow!("Timeout must be greater than 0"));
        }
    }

    if let Some(input) = &cli.input {
        if input != "-" && !std::path::Path::new(input).exists() {
            return Err(anyhow::anyhow!("Input file not found: {}", input));
        }
    }

    for rules_file in &cli.rule_files {
        if !std::path::Path::new(rules_file).exists() {
            return Err(anyhow::anyhow!("Rules file not found: {}", rules_file));
        }
    }

    Ok(())
}

/// Extract --config-file argument from raw args
pub fn extract_config_file_arg(args: &[String]) -> Option<String> {
    args.iter().enumerate().find_map(|(i, arg)| {
        if arg == "--config-file" {
            args.get(i + 1).cloned()
        } else {
            arg.strip_prefix("--config-file=").map(str::to_string)
        }
    })
}

/// Process command line arguments with config file support
pub fn process_args_with_config(stderr: &mut SafeStderr) -> (ArgMatches, Cli, ConfigFile) {
    let raw_args: Vec<String> = std::env::args().collect();
    let (matches, cli, config_file) = process_raw_args(raw_args, stderr);

    if let Err(e) = validate_cli_args(&cli) {
        stderr
            .writeln(&tty::format_error_message(&e.to_string()))
            .unwrap_or(());
        ExitCode::InvalidUsage.exit();
    }

    (matches, cli, config_file)
}

fn process_raw_args(raw_args: Vec<String>, stderr: &mut SafeStderr) -> (ArgMatches, Cli, ConfigFile) {
    // Extract --config-file argument early for use by config commands
    let config_file_path = extract_config_file_arg(&raw_args);

    let has_show_config = raw_args.iter().any(|arg| arg == "--show-config");
    let ignore_config = raw_args.iter().any(|arg| arg == "--ignore-config");

    if has_show_config && ignore_config {
        stderr
            .writeln(&tty::format_error_message(
                "--show-config and --ignore-config are mutually exclusive",
            ))
            .unwrap_or(());
        ExitCode::InvalidUsage.exit();
    }

    // Check for --show-config first, before any other processing
    if has_show_config {
        ConfigFile::show_config(config_file_path.as_deref());
        ExitCode::Success.exit();
    }

    let config_file = if ignore_config {
        ConfigFile::default()
    } else {
        match ConfigFile::load_with_custom_path(config_file_path.as_deref()) {
            Ok(config_file) => config_file,
            Err(e) => {
                stderr
                    .writeln(&tty::format_error_message(&format!(
                        "Config file error: {:#}",
                        e
                    )))
                    .unwrap_or(());
                ExitCode::GeneralError.exit();
            }
        }
    };

    let processed_args = match config_file.process_args(raw_args) {
        Ok(processed) => processed,
        Err(e) => {
            stderr
                .writeln(&tty::format_error_message(&format!("Config error: {:#}", e)))
                .unwrap_or(());
            ExitCode::GeneralError.exit();
        }
    };

    // Parse with potentially modified arguments
    let matches = Cli::command().get_matches_from(processed_args);
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| {
        stderr
            .writeln(&tty::format_error_message(&e.to_string()))
            .unwrap_or(());
        ExitCode::InvalidUsage.exit();
    });

    (matches, cli, config_file)
}
