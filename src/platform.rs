use anyhow::Result;
use std::io::{self, Write};
use std::process;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;

use rulesplit::parallel::CancelToken;

#[cfg(unix)]
use signal_hook::{consts::SIGINT, consts::SIGTERM, iterator::Signals};

#[cfg(windows)]
use signal_hook::{consts::SIGINT, flag};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalInt = 130,  // 128 + SIGINT (2)
    SignalTerm = 143, // 128 + SIGTERM (15)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

/// Exit code of the first termination signal received, 0 if none.
static TERMINATING_SIGNAL: AtomicI32 = AtomicI32::new(0);

fn record_signal(code: ExitCode) {
    let _ = TERMINATING_SIGNAL.compare_exchange(
        0,
        code as i32,
        Ordering::SeqCst,
        Ordering::SeqCst,
    );
}

/// Signal handler for graceful shutdown.
///
/// The first SIGINT/SIGTERM cancels the pipeline, which then stops without
/// writing output. A second one exits immediately.
pub struct SignalHandler {
    _handle: thread::JoinHandle<()>,
}

impl SignalHandler {
    /// Initialize signal handling - cross-platform
    pub fn new(cancel: CancelToken) -> Result<Self> {
        #[cfg(unix)]
        {
            let mut signals = Signals::new([SIGINT, SIGTERM])?;

            let handle = thread::Builder::new()
                .name("rulesplit-signals".to_string())
                .spawn(move || {
                    let mut shutdown_count = 0;
                    for sig in signals.forever() {
                        let code = match sig {
                            SIGINT => ExitCode::SignalInt,
                            SIGTERM => ExitCode::SignalTerm,
                            _ => continue,
                        };

                        record_signal(code);
                        shutdown_count += 1;
                        if shutdown_count > 1 {
                            code.exit();
                        }

                        eprintln!(
                            "{}",
                            rulesplit::tty::format_error_message(
                                "Received signal, stopping (press Ctrl-C again to exit immediately)..."
                            )
                        );
                        cancel.cancel();
                    }
                })?;

            Ok(SignalHandler { _handle: handle })
        }

        #[cfg(windows)]
        {
            let term_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
            flag::register(SIGINT, std::sync::Arc::clone(&term_flag))?;

            let handle = thread::Builder::new()
                .name("rulesplit-signals".to_string())
                .spawn(move || {
                    let mut shutdown_count = 0;
                    loop {
                        thread::sleep(std::time::Duration::from_millis(100));
                        if term_flag.swap(false, Ordering::Relaxed) {
                            record_signal(ExitCode::SignalInt);
                            shutdown_count += 1;
                            if shutdown_count > 1 {
                                ExitCode::SignalInt.exit();
                            }
                            cancel.cancel();
                        }
                    }
                })?;

            Ok(SignalHandler { _handle: handle })
        }
    }

    /// Exit code for the signal that stopped the run, if one arrived
    pub fn terminated_by() -> Option<ExitCode> {
        match TERMINATING_SIGNAL.load(Ordering::SeqCst) {
            130 => Some(ExitCode::SignalInt),
            143 => Some(ExitCode::SignalTerm),
            _ => None,
        }
    }
}

/// Safe wrapper for writing to stderr
pub struct SafeStderr {
    stderr: io::Stderr,
}

impl SafeStderr {
    pub fn new() -> Self {
        Self {
            stderr: io::stderr(),
        }
    }

    /// Write a line to stderr, handling errors gracefully
    pub fn writeln(&mut self, data: &str) -> Result<()> {
        match writeln!(self.stderr, "{}", data) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                // Nobody is listening; the run itself may still have succeeded
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("Failed to write to stderr: {}", e)),
        }
    }
}

impl Default for SafeStderr {
    fn default() -> Self {
        Self::new()
    }
}
