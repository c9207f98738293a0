//! # authority-auth: Credentials in front of the decision point
//!
//! Turns an inbound `Authorization` header into a subject the policy engine
//! can resolve attributes against:
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │ bearer_token()
//!        ▼
//!    <jwt> ──TokenService::verify()──▶ Claims ──to_subject()──▶ JsonSubject
//! ```
//!
//! Tokens are HS256-signed. Every failure carries the HTTP status a host
//! should respond with ([`AuthError::status_code`]).

pub mod bearer;
pub mod error;
pub mod token;

pub use bearer::bearer_token;
pub use error::{AuthError, AuthResult};
pub use token::{Claims, DEFAULT_ISSUER, JwtConfig, TokenService};
