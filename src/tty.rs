use is_terminal::IsTerminal;
use once_cell::sync::Lazy;

static STDERR_EMOJI: Lazy<bool> = Lazy::new(detect_emoji_for_stderr);

/// Check if stdin is connected to a TTY
pub fn is_stdin_tty() -> bool {
    std::io::stdin().is_terminal()
}

/// Check if stderr is connected to a TTY
pub fn is_stderr_tty() -> bool {
    std::io::stderr().is_terminal()
}

/// Whether diagnostics on stderr should carry emoji prefixes.
/// Decided once per process.
pub fn should_use_emoji_for_stderr() -> bool {
    *STDERR_EMOJI
}

fn detect_emoji_for_stderr() -> bool {
    // Respect NO_EMOJI and NO_COLOR (https://no-color.org/)
    if std::env::var_os("NO_EMOJI").is_some() || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    // Pipes and CI logs get plain prefixes
    if !is_stderr_tty() {
        return false;
    }

    !matches!(std::env::var("TERM").as_deref(), Ok("dumb"))
}

/// Prefix for error lines on stderr.
pub fn error_prefix() -> &'static str {
    if should_use_emoji_for_stderr() {
        "⚠️ "
    } else {
        "rulesplit:"
    }
}

/// Prefix for informational lines on stderr.
pub fn info_prefix() -> &'static str {
    if should_use_emoji_for_stderr() {
        "🔹"
    } else {
        "rulesplit:"
    }
}

/// Format an error message with the appropriate prefix
pub fn format_error_message(message: &str) -> String {
    format!("{} {}", error_prefix(), message)
}

/// Format an informational message with the appropriate prefix
pub fn format_info_message(message: &str) -> String {
    format!("{} {}", info_prefix(), message)
}
