//! Authentication error types.

use thiserror::Error;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while extracting or validating credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("authorization header is missing")]
    MissingHeader,

    /// The header does not use the `Bearer` scheme.
    #[error("authorization header is not of type Bearer")]
    NotBearer,

    /// `Bearer ` with nothing after it.
    #[error("authorization token is missing")]
    MissingToken,

    /// The token's `exp` claim is in the past.
    #[error("authorization token has expired")]
    Expired,

    /// Bad signature, wrong issuer, wrong algorithm or malformed token.
    #[error("invalid authorization token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Issue time plus the configured lifetime does not fit a timestamp.
    #[error("token expiration of {secs}s overflows the expiry timestamp")]
    ExpirationOverflow { secs: u64 },

    /// Token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// HTTP status a host should answer with.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingHeader | Self::NotBearer => 400,
            Self::MissingToken | Self::Expired | Self::InvalidToken(_) => 401,
            Self::ExpirationOverflow { .. } | Self::Signing(_) => 500,
        }
    }
}
