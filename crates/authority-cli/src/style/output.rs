//! Output helpers for consistent styled messages.
//!
//! Results go to stdout; diagnostics go to stderr so scripts can capture
//! a decision without the noise.

use super::colors::SemanticStyle;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".allowed(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".denied(), msg);
}

pub fn print_warn(msg: &str) {
    eprintln!("{} {}", "⚠".warning(), msg);
}

pub fn print_hint(msg: &str) {
    eprintln!("{} {}", "→".muted(), msg.muted());
}

/// Prints a labeled key-value pair with indentation.
pub fn print_labeled(key: &str, value: &str) {
    println!("  {}: {}", key.muted(), value);
}
