use thiserror::Error;

use crate::claims::TokenValidationError;

/// Failures raised by the credential and session layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token could not be decoded or its signature did not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token decoded but its time window is not currently valid.
    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    /// The claim set is internally inconsistent (e.g. super_admin with a tenant).
    #[error("inconsistent session claims: {0}")]
    InconsistentClaims(String),

    /// Hashing or signing failed.
    #[error("credential backend failure: {0}")]
    Crypto(String),
}
