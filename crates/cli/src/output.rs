//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format megabytes with the unit used in reports, `-` when undeclared
pub fn format_megabytes(megabytes: Option<u64>) -> String {
    match megabytes {
        Some(mb) => format!("{}Mi", mb),
        None => "-".to_string(),
    }
}

/// Format millicores with the unit used in reports, `-` when undeclared
pub fn format_millicores(millicores: Option<u64>) -> String {
    match millicores {
        Some(m) => format!("{}m", m),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units() {
        assert_eq!(format_millicores(Some(3920)), "3920m");
        assert_eq!(format_megabytes(Some(15948)), "15948Mi");
        assert_eq!(format_megabytes(None), "-");
    }
}
