use anyhow::Result;
use clap::CommandFactory;
use std::sync::Arc;

use rulesplit::debug::{DebugConfig, DebugLog};
use rulesplit::output::CsvGroupWriter;
use rulesplit::parallel::ValidationPipeline;
use rulesplit::rules::RuleEngine;
use rulesplit::source::CsvRecordSource;
use rulesplit::stats::CompletionReport;
use rulesplit::tty;

mod args;
mod cli;
mod config;
mod config_file;
mod platform;

use args::process_args_with_config;
use cli::{Cli, ReportFormat};
use config::RulesplitConfig;
use platform::{ExitCode, SafeStderr, SignalHandler};

fn main() -> Result<()> {
    let mut stderr = SafeStderr::new();

    // Process command line arguments with config file support
    let (matches, cli, config_file) = process_args_with_config(&mut stderr);

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "rulesplit", &mut std::io::stdout());
        return Ok(());
    }

    let config = match RulesplitConfig::from_cli(&cli, &matches, &config_file) {
        Ok(config) => config,
        Err(e) => {
            stderr
                .writeln(&tty::format_error_message(&format!("{:#}", e)))
                .unwrap_or(());
            ExitCode::InvalidUsage.exit();
        }
    };

    // Bad patterns are usage errors and are reported before any input is read
    let engine = match RuleEngine::from_specs(&config.rules) {
        Ok(engine) => engine,
        Err(e) => {
            stderr
                .writeln(&tty::format_error_message(&e.to_string()))
                .unwrap_or(());
            ExitCode::InvalidUsage.exit();
        }
    };

    let debug = DebugLog::new(DebugConfig::new(config.display.verbose));
    debug.log_basic(
        "main",
        &format!(
            "{} rules, {} workers, batch size {}",
            engine.len(),
            config.effective_workers(),
            config.performance.batch_size
        ),
    );
    for rule in engine.rules() {
        debug.log_trace("main", &format!("rule {} {}", rule.semantics(), rule.pattern()));
    }

    if config.input.path == "-" && tty::is_stdin_tty() {
        stderr
            .writeln(&tty::format_info_message(
                "reading records from the terminal, press Ctrl-D to finish",
            ))
            .unwrap_or(());
    }

    let pipeline = ValidationPipeline::new(Arc::new(engine), config.pipeline_config())
        .with_debug(debug);

    // Signals must reach the cancel token before any input is read, since
    // the first read can block on an idle stdin
    let _signal_handler = match SignalHandler::new(pipeline.cancel_token()) {
        Ok(handler) => handler,
        Err(e) => {
            stderr
                .writeln(&tty::format_error_message(&format!(
                    "Failed to initialize signal handling: {}",
                    e
                )))
                .unwrap_or(());
            ExitCode::GeneralError.exit();
        }
    };

    // Opening does not read; the header is read by the ingest stage
    let source = match CsvRecordSource::open(&config.input.path, config.input.has_header) {
        Ok(source) => source,
        Err(e) => {
            stderr
                .writeln(&tty::format_error_message(&format!("{:#}", e)))
                .unwrap_or(());
            ExitCode::GeneralError.exit();
        }
    };

    let mut writer = CsvGroupWriter::new(config.output_paths(), source.input_header());

    match pipeline.run(source, &mut writer) {
        Ok(report) => {
            for path in writer.written() {
                debug.log_basic("output", &format!("wrote {}", path.display()));
            }
            print_report(&config, &report, &mut stderr)?;
            Ok(())
        }
        Err(e) => {
            stderr
                .writeln(&tty::format_error_message(&e.to_string()))
                .unwrap_or(());

            if e.is_cancellation() {
                if let Some(code) = SignalHandler::terminated_by() {
                    code.exit();
                }
            }
            ExitCode::GeneralError.exit();
        }
    }
}

fn print_report(
    config: &RulesplitConfig,
    report: &CompletionReport,
    stderr: &mut SafeStderr,
) -> Result<()> {
    if !config.display.report {
        if config.display.verbose > 0 {
            stderr.writeln(&tty::format_info_message(&report.format_summary()))?;
        }
        return Ok(());
    }

    match config.display.report_format {
        ReportFormat::Text => stderr.writeln(&report.format_report()),
        ReportFormat::Json => {
            println!("{}", report.to_json()?);
            Ok(())
        }
    }
}
