//! CLI command implementations.

pub mod config;
pub mod eval;
pub mod lint;
pub mod token;
pub mod version;
