// CLI-specific types and structures
// This module contains the command-line interface definitions

use clap::Parser;
use clap_complete::Shell;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnMalformed {
    /// Stop the run and write nothing
    #[default]
    Abort,
    /// Write bad rows to the malformed file and keep going
    Divert,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

// CLI structure - contains all command-line arguments and options
#[derive(Parser, Debug)]
#[command(name = "rulesplit")]
#[command(about = "Split a CSV of (id, value) records into accepted and rejected files using ordered regex rules")]
#[command(
    long_about = "Split a CSV of (id, value) records into accepted and rejected files using ordered regex rules\n\nRULES:\n  --accept REGEX   a value must match REGEX to be valid\n  --reject REGEX   a value matching REGEX is invalid\n  Rules are checked in the order given and combined with AND.\n  Without any rules the uk-postcode preset is used.\n\nOUTPUT:\n  succeeded_validation.csv and failed_validation.csv in --output-dir, each sorted by id.\n\nEXAMPLES:\n  rulesplit import_data.csv --report\n  rulesplit data.csv.gz --accept '^[A-Z]{2}' --reject 'X$' --workers 8\n  rulesplit data.csv --on-malformed divert --output-dir out/"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Input CSV file ("-" for stdin). Gzip and zstd input is detected automatically.
    #[arg(required_unless_present_any = ["completions", "show_config"])]
    pub input: Option<String>,

    /// Treat the first row as data rather than a header
    #[arg(long = "no-header", help_heading = "Input Options")]
    pub no_header: bool,

    /// What to do with rows that are not exactly (unsigned id, value)
    #[arg(
        long = "on-malformed",
        value_enum,
        default_value = "abort",
        help_heading = "Input Options"
    )]
    pub on_malformed: OnMalformed,

    /// Add a rule: values must match REGEX (repeatable, order preserved)
    #[arg(long = "accept", value_name = "REGEX", help_heading = "Rule Options")]
    pub accept: Vec<String>,

    /// Add a rule: values matching REGEX are rejected (repeatable, order preserved)
    #[arg(long = "reject", value_name = "REGEX", help_heading = "Rule Options")]
    pub reject: Vec<String>,

    /// Load rules from a file of `accept = REGEX` / `reject = REGEX` lines
    #[arg(long = "rules", value_name = "FILE", help_heading = "Rule Options")]
    pub rule_files: Vec<String>,

    /// Start from a built-in rule set (available: uk-postcode)
    #[arg(long = "preset", value_name = "NAME", help_heading = "Rule Options")]
    pub preset: Option<String>,

    /// Directory for the output files
    #[arg(
        short = 'o',
        long = "output-dir",
        default_value = ".",
        help_heading = "Output Options"
    )]
    pub output_dir: String,

    /// Path for accepted records (default: <output-dir>/succeeded_validation.csv)
    #[arg(long = "accepted-out", value_name = "FILE", help_heading = "Output Options")]
    pub accepted_out: Option<String>,

    /// Path for rejected records (default: <output-dir>/failed_validation.csv)
    #[arg(long = "rejected-out", value_name = "FILE", help_heading = "Output Options")]
    pub rejected_out: Option<String>,

    /// Path for malformed rows with --on-malformed divert (default: <output-dir>/malformed_records.csv)
    #[arg(long = "malformed-out", value_name = "FILE", help_heading = "Output Options")]
    pub malformed_out: Option<String>,

    /// Number of validation workers (0 = one per CPU)
    #[arg(
        short = 'w',
        long = "workers",
        default_value_t = rulesplit::parallel::DEFAULT_WORKERS,
        help_heading = "Performance Options"
    )]
    pub workers: usize,

    /// Capacity of each queue between stages, in batches
    #[arg(
        long = "queue-capacity",
        default_value_t = rulesplit::parallel::DEFAULT_QUEUE_CAPACITY,
        help_heading = "Performance Options"
    )]
    pub queue_capacity: usize,

    /// Rows per batch handed between stages
    #[arg(
        long = "batch-size",
        default_value_t = rulesplit::parallel::DEFAULT_BATCH_SIZE,
        help_heading = "Performance Options"
    )]
    pub batch_size: usize,

    /// Give up after this long, e.g. 30s or 5m (no output is written)
    #[arg(long = "timeout", value_name = "DURATION", value_parser = humantime::parse_duration, help_heading = "Performance Options")]
    pub timeout: Option<std::time::Duration>,

    /// Print a completion report to stderr
    #[arg(short = 'r', long = "report", help_heading = "Display Options")]
    pub report: bool,

    /// Format of the completion report
    #[arg(
        long = "report-format",
        value_enum,
        default_value = "text",
        help_heading = "Display Options"
    )]
    pub report_format: ReportFormat,

    /// Show stage diagnostics on stderr (-vv traces every batch)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Display Options")]
    pub verbose: u8,

    /// Use this config file instead of the default search
    #[arg(long = "config-file", value_name = "FILE", help_heading = "Configuration Options")]
    pub config_file: Option<String>,

    /// Do not read any config file
    #[arg(long = "ignore-config", help_heading = "Configuration Options")]
    pub ignore_config: bool,

    /// Show the active configuration and where it was loaded from
    #[arg(long = "show-config", help_heading = "Configuration Options")]
    pub show_config: bool,

    /// Print a shell completion script and exit
    #[arg(long = "completions", value_name = "SHELL", help_heading = "Configuration Options")]
    pub completions: Option<Shell>,
}
