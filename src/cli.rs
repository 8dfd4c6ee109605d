use console::{style, Term};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether debug messages should be printed
pub static VERBOSE: AtomicBool = AtomicBool::new(false);

const PREFIX_LEN: usize = 10;

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Right-align a (possibly styled) prefix so that messages line up
pub fn gen_prefix(prefix: &str) -> String {
    let len = console::measure_text_width(prefix);
    if len >= PREFIX_LEN {
        return format!("{prefix} ");
    }
    format!("{}{} ", " ".repeat(PREFIX_LEN - len), prefix)
}

/// Messages go to stderr, stdout is reserved for command output
pub fn writeln(prefix: &str, msg: &str) {
    let term = Term::stderr();
    let _ = term.write_line(&format!("{}{}", gen_prefix(prefix), msg));
}

pub fn styled_prefix(kind: &str) -> String {
    match kind {
        "DEBUG" => style(kind).dim().to_string(),
        "SUCCESS" => style(kind).green().bold().to_string(),
        "INFO" => style(kind).blue().bold().to_string(),
        "WARNING" => style(kind).yellow().bold().to_string(),
        "ERROR" => style(kind).red().bold().to_string(),
        "DUE TO" => style(kind).yellow().bold().to_string(),
        _ => kind.to_string(),
    }
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        if $crate::cli::is_verbose() {
            $crate::cli::writeln(&$crate::cli::styled_prefix("DEBUG"), &format!($($arg)+));
        }
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        $crate::cli::writeln(&$crate::cli::styled_prefix("SUCCESS"), &format!($($arg)+));
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::cli::writeln(&$crate::cli::styled_prefix("INFO"), &format!($($arg)+));
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {
        $crate::cli::writeln(&$crate::cli::styled_prefix("WARNING"), &format!($($arg)+));
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {
        $crate::cli::writeln(&$crate::cli::styled_prefix("ERROR"), &format!($($arg)+));
    };
}

#[macro_export]
macro_rules! due_to {
    ($($arg:tt)+) => {
        $crate::cli::writeln(&$crate::cli::styled_prefix("DUE TO"), &format!($($arg)+));
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefix_alignment() {
        assert_eq!(gen_prefix("INFO"), "      INFO ");
        assert_eq!(gen_prefix(""), "           ");
        assert_eq!(gen_prefix("A VERY LONG ONE"), "A VERY LONG ONE ");
    }
}
