use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rulesplit::output::OutputPaths;
use rulesplit::parallel::{MalformedPolicy, PipelineConfig};
use rulesplit::presets;
use rulesplit::rules::RuleSpec;

use crate::cli::{Cli, OnMalformed, ReportFormat};
use crate::config_file::{self, ConfigFile};

/// Main configuration struct for rulesplit
#[derive(Debug, Clone)]
pub struct RulesplitConfig {
    pub input: InputConfig,
    pub rules: Vec<RuleSpec>,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
    pub display: DisplayConfig,
}

/// Input configuration
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub path: String,
    pub has_header: bool,
    pub on_malformed: OnMalformed,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub accepted: Option<PathBuf>,
    pub rejected: Option<PathBuf>,
    pub malformed: Option<PathBuf>,
}

/// Performance configuration
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub timeout: Option<Duration>,
}

/// Display configuration
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub report: bool,
    pub report_format: ReportFormat,
    pub verbose: u8,
}

impl RulesplitConfig {
    /// Create configuration from parsed CLI arguments and the loaded config file
    pub fn from_cli(cli: &Cli, matches: &ArgMatches, config_file: &ConfigFile) -> Result<Self> {
        Ok(Self {
            input: InputConfig {
                path: cli.input.clone().unwrap_or_else(|| "-".to_string()),
                has_header: !cli.no_header,
                on_malformed: cli.on_malformed,
            },
            rules: resolve_rules(cli, matches, config_file)?,
            output: OutputConfig {
                dir: PathBuf::from(&cli.output_dir),
                accepted: cli.accepted_out.as_ref().map(PathBuf::from),
                rejected: cli.rejected_out.as_ref().map(PathBuf::from),
                malformed: cli.malformed_out.as_ref().map(PathBuf::from),
            },
            performance: PerformanceConfig {
                workers: cli.workers,
                queue_capacity: cli.queue_capacity,
                batch_size: cli.batch_size,
                timeout: cli.timeout,
            },
            display: DisplayConfig {
                report: cli.report,
                report_format: cli.report_format,
                verbose: cli.verbose,
            },
        })
    }

    /// Get effective worker count with defaults
    pub fn effective_workers(&self) -> usize {
        if self.performance.workers == 0 {
            num_cpus::get()
        } else {
            self.performance.workers
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let policy = match self.input.on_malformed {
            OnMalformed::Abort => MalformedPolicy::Abort,
            OnMalformed::Divert => MalformedPolicy::Divert,
        };

        PipelineConfig::default()
            .with_workers(self.effective_workers())
            .with_queue_capacity(self.performance.queue_capacity)
            .with_batch_size(self.performance.batch_size)
            .with_malformed_policy(policy)
            .with_deadline(self.performance.timeout)
    }

    pub fn output_paths(&self) -> OutputPaths {
        let mut paths = OutputPaths::in_dir(&self.output.dir);
        if let Some(accepted) = &self.output.accepted {
            paths.accepted = accepted.clone();
        }
        if let Some(rejected) = &self.output.rejected {
            paths.rejected = rejected.clone();
        }
        if let Some(malformed) = &self.output.malformed {
            paths.malformed = malformed.clone();
        }
        paths
    }
}

/// Work out the ordered rule list.
///
/// The command line wins when it names any rules: the preset first, then
/// rules files, then `--accept`/`--reject` in the order they were typed.
/// Otherwise the config file's `[rules]` apply, and failing that the
/// default preset.
fn resolve_rules(cli: &Cli, matches: &ArgMatches, config_file: &ConfigFile) -> Result<Vec<RuleSpec>> {
    let mut rules = Vec::new();

    if let Some(name) = &cli.preset {
        rules.extend(presets::preset_rules(name).with_context(|| {
            format!("available presets: {}", presets::preset_names().join(", "))
        })?);
    }

    for file in &cli.rule_files {
        rules.extend(config_file::load_rules_file(Path::new(file))?);
    }

    rules.extend(flag_rules(cli, matches));

    if !rules.is_empty() {
        return Ok(rules);
    }

    if !config_file.rules.is_empty() {
        return Ok(config_file.rules.clone());
    }

    Ok(presets::preset_rules(presets::DEFAULT_PRESET)?)
}

/// Interleave `--accept` and `--reject` by their position on the command line.
fn flag_rules(cli: &Cli, matches: &ArgMatches) -> Vec<RuleSpec> {
    let accept_indices = matches.indices_of("accept").into_iter().flatten();
    let reject_indices = matches.indices_of("reject").into_iter().flatten();

    let mut positioned: Vec<(usize, RuleSpec)> = accept_indices
        .zip(cli.accept.iter())
        .map(|(index, pattern)| (index, RuleSpec::accept(pattern.as_str())))
        .chain(
            reject_indices
                .zip(cli.reject.iter())
                .map(|(index, pattern)| (index, RuleSpec::reject(pattern.as_str()))),
        )
        .collect();

    positioned.sort_by_key(|(index, _)| *index);
    positioned.into_iter().map(|(_, rule)| rule).collect()
}
