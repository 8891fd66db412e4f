// src/error.rs
use crate::types::{Response, Status};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("otp is too short")]
    OtpTooShort,

    #[error("otp is too long")]
    OtpTooLong,

    #[error("invalid secret key: {0}")]
    InvalidSecretKey(#[from] base64::DecodeError),

    #[error("URL must start with https://")]
    InvalidUrl,

    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("response code {0}")]
    HttpStatus(u16),

    #[error("failed to parse response line {line:?}: {reason}")]
    Parse { line: String, reason: String },

    #[error("failed to validate response: missing signature 'h'")]
    MissingSignature,

    #[error("failed to validate response: invalid signature")]
    InvalidSignature,

    #[error("response has no status")]
    MissingStatus,

    #[error("{0}")]
    Status(Status),

    #[error("unexpected OTP: expected {expected:?}, got {actual:?}")]
    UnexpectedOtp { expected: String, actual: String },

    #[error("unexpected nonce: expected {expected:?}, got {actual:?}")]
    UnexpectedNonce { expected: String, actual: String },

    #[error("response has no timestamp")]
    MissingTimestamp,

    #[error("response is too old")]
    TooOld,

    #[error("response is from the future")]
    FromFuture,
}

impl Error {
    pub(crate) fn parse(line: &str, reason: impl ToString) -> Self {
        Error::Parse {
            line: line.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A failed validation, with whatever response was parsed before it failed.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct ValidateError {
    pub response: Option<Response>,
    pub kind: Error,
}

impl ValidateError {
    pub fn new(response: Option<Response>, kind: Error) -> Self {
        Self { response, kind }
    }

    /// The server status, when that is what failed the call.
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            Error::Status(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Error> for ValidateError {
    fn from(kind: Error) -> Self {
        Self { response: None, kind }
    }
}
