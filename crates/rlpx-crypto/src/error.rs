//! Session error type.

use rlpx_core::WireError;
use thiserror::Error;

use crate::curve::CurveError;
use crate::ecies::EciesError;

/// Errors surfaced by the handshake engine and session connections.
///
/// Authentication failures are kept distinct from malformed input so callers
/// can tell a forged or tampered peer from a buggy one.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol misuse: {0}")]
    ProtocolMisuse(&'static str),

    #[error("connection closed")]
    Closed,
}

impl SessionError {
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    pub(crate) fn auth(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed(reason.into())
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

impl From<WireError> for SessionError {
    fn from(e: WireError) -> Self {
        Self::Malformed(e.to_string())
    }
}

impl From<EciesError> for SessionError {
    fn from(e: EciesError) -> Self {
        match e {
            EciesError::BadTag => Self::AuthenticationFailed(e.to_string()),
            other => Self::Malformed(other.to_string()),
        }
    }
}

impl From<CurveError> for SessionError {
    fn from(e: CurveError) -> Self {
        match e {
            CurveError::InvalidSignature | CurveError::Recovery => {
                Self::AuthenticationFailed(e.to_string())
            }
            CurveError::InvalidPublicKey | CurveError::InvalidSecretKey => {
                Self::Malformed(e.to_string())
            }
        }
    }
}
