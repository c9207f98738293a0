//! Version command implementation.

use crate::style;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() {
    println!("authority {VERSION}");
    println!("Statement-based access decisions.");
    println!();
    style::print_info_table(&[
        ("Target", std::env::consts::ARCH.to_string()),
        ("OS", std::env::consts::OS.to_string()),
    ]);
}
