//! Token commands: issue and inspect signed tokens.

use std::time::Duration;

use anyhow::{Context, Result};
use authority_auth::{JwtConfig, TokenService};
use authority_config::AuthorityConfig;
use serde_json::{Map, Value};

use crate::style::{self, SemanticStyle};

/// Builds the token service from `[auth]`, failing when no secret is configured.
pub(crate) fn token_service(config: &AuthorityConfig) -> Result<TokenService> {
    let secret = config
        .auth
        .secret
        .as_deref()
        .context("no signing secret configured; set auth.secret or AUTHORITY_AUTH__SECRET")?;

    Ok(TokenService::new(
        JwtConfig::new(secret)
            .with_issuer(&config.auth.issuer)
            .with_expiration(Duration::from_secs(config.auth.expiration_secs)),
    ))
}

/// Issues a token and prints it on stdout.
pub fn issue(
    config: &AuthorityConfig,
    uid: &str,
    user_type: &str,
    token_type: Option<&str>,
    claims: Vec<(String, String)>,
) -> Result<()> {
    let service = token_service(config)?;
    let extra: Map<String, Value> = claims
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    let token = service
        .issue(uid, user_type, token_type, extra)
        .context("failed to sign token")?;
    println!("{token}");
    Ok(())
}

/// Verifies a token and prints its claims as JSON.
pub fn inspect(config: &AuthorityConfig, token: &str) -> Result<()> {
    let service = token_service(config)?;
    let claims = service
        .verify(token)
        .context("token rejected")?;

    println!("{}", serde_json::to_string_pretty(&claims)?);
    style::print_hint(&format!(
        "expires at {} (issuer {})",
        claims.exp,
        claims.iss.code()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_service_requires_secret() {
        let config = AuthorityConfig::default();
        assert!(token_service(&config).is_err());
    }

    #[test]
    fn token_service_uses_configured_issuer() {
        let mut config = AuthorityConfig::default();
        config.auth.secret = Some("s3cret".to_string());
        config.auth.issuer = "hr-portal".to_string();
        config.auth.expiration_secs = 60;

        let service = token_service(&config).unwrap();
        assert_eq!(service.config().issuer, "hr-portal");
        assert_eq!(service.config().expiration, Duration::from_secs(60));

        let token = service.issue("e-100", "employee", None, Map::new()).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.iss, "hr-portal");
        assert_eq!(claims.exp - claims.iat, 60);
    }
}
