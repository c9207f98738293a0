//! Configuration commands.

use anyhow::{Result, bail};
use authority_config::AuthorityConfig;

/// Prints the effective configuration after all layers are merged.
///
/// The signing secret is never printed.
pub fn show(config: &AuthorityConfig, format: &str) -> Result<()> {
    let mut config = config.clone();
    if config.auth.secret.is_some() {
        config.auth.secret = Some("<redacted>".to_string());
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&config)?),
        "toml" => print!("{}", config.to_toml_string()?),
        other => bail!("unknown format '{other}' (expected toml or json)"),
    }

    Ok(())
}
