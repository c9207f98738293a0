//! `Authorization: Bearer <token>` extraction.

use crate::error::{AuthError, AuthResult};

const BEARER_PREFIX: &str = "Bearer ";

/// Extracts the token from an `Authorization` header value.
///
/// The scheme is case-sensitive. Anything after a second space is ignored.
pub fn bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let header = match header {
        Some(h) if !h.is_empty() => h,
        _ => return Err(AuthError::MissingHeader),
    };
    let rest = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::NotBearer)?;

    match rest.split(' ').next() {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MissingToken),
    }
}
