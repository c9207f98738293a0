//! Signed token issuance and verification (HS256).

use std::fmt;
use std::time::Duration;

use authority_policy::JsonSubject;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Default issuer claim.
pub const DEFAULT_ISSUER: &str = "authority";

/// JWT configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing/verifying tokens.
    secret: String,
    /// Token expiration duration.
    pub expiration: Duration,
    /// Issuer claim.
    pub issuer: String,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration", &self.expiration)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    /// Creates a new JWT configuration.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration: Duration::from_secs(3600), // 1 hour
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Sets the token expiration duration.
    #[must_use]
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Sets the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

/// Claims carried by an Authority token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub uid: String,
    /// Kind of user (e.g. `employee`, `service`).
    #[serde(rename = "user-type")]
    pub user_type: String,
    /// Purpose of the token (e.g. `access`, `refresh`).
    #[serde(rename = "token-type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Issuer.
    pub iss: String,
    /// Issued at timestamp (seconds since epoch).
    pub iat: u64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: u64,
    /// Any further custom claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Returns a claim rendered as a string, the way subject attributes are.
    pub fn claim_string(&self, name: &str) -> Option<String> {
        let value = self.to_value();
        match value.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Builds a subject attribute resolver over the claim set.
    ///
    /// With the default prefix, `user:::uid` resolves the user ID and
    /// `user:::profile:department` walks a nested custom claim.
    pub fn to_subject(&self, key_prefix: &str, separator: &str) -> JsonSubject {
        JsonSubject::from_value(self.to_value())
            .with_key_prefix(key_prefix)
            .with_separator(separator)
    }

    fn to_value(&self) -> Value {
        // Serializing strings, integers and JSON values is infallible.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Issues and verifies HS256 tokens for one configuration.
#[derive(Debug, Clone)]
pub struct TokenService {
    config: JwtConfig,
}

impl TokenService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Issues a token for `uid`, stamping issuer, issue time and expiry.
    pub fn issue(
        &self,
        uid: &str,
        user_type: &str,
        token_type: Option<&str>,
        extra: Map<String, Value>,
    ) -> AuthResult<String> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let secs = self.config.expiration.as_secs();
        let exp = now
            .checked_add(secs)
            .filter(|exp| i64::try_from(*exp).is_ok())
            .ok_or(AuthError::ExpirationOverflow { secs })?;

        let claims = Claims {
            uid: uid.to_string(),
            user_type: user_type.to_string(),
            token_type: token_type.map(str::to_string),
            iss: self.config.issuer.clone(),
            iat: now,
            exp,
            extra,
        };
        self.sign(&claims)
    }

    /// Signs an already-built claim set verbatim.
    pub fn sign(&self, claims: &Claims) -> AuthResult<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(AuthError::Signing)
    }

    /// Verifies signature, algorithm, issuer and expiry, and returns the claims.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!(error = %e, "Token verification failed");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Verifies `token` and returns one of its claims as a string.
    pub fn claim_string(&self, token: &str, name: &str) -> AuthResult<Option<String>> {
        Ok(self.verify(token)?.claim_string(name))
    }
}
