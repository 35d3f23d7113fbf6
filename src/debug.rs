use crate::tty;

/// Verbosity selected with repeated `-v` flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugConfig {
    pub verbosity: u8, // 0-2
}

impl DebugConfig {
    pub fn new(verbose_count: u8) -> Self {
        DebugConfig {
            verbosity: verbose_count,
        }
    }

    pub fn should_trace(&self) -> bool {
        self.verbosity >= 2
    }

    pub fn is_enabled(&self) -> bool {
        self.verbosity > 0
    }
}

/// Stage diagnostics written to stderr. Cheap to clone into every thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugLog {
    pub config: DebugConfig,
}

impl DebugLog {
    pub fn new(config: DebugConfig) -> Self {
        DebugLog { config }
    }

    /// A log that never prints.
    pub fn disabled() -> Self {
        Self::new(DebugConfig::default())
    }

    /// Stage lifecycle messages (`-v`).
    pub fn log_basic(&self, stage: &str, message: &str) {
        if self.config.is_enabled() {
            emit(stage, message);
        }
    }

    /// Per-batch tracing (`-vv`).
    pub fn log_trace(&self, stage: &str, message: &str) {
        if self.config.should_trace() {
            emit(stage, message);
        }
    }
}

fn emit(stage: &str, message: &str) {
    eprintln!("{} [{}] {}", tty::info_prefix(), stage, message);
}
