// src/types.rs
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Validation status as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    BadOtp,
    ReplayedOtp,
    BadSignature,
    MissingParameter,
    NoSuchClient,
    OperationNotAllowed,
    BackendError,
    NotEnoughAnswers,
    ReplayedRequest,
    /// Any string the server sent that is not one of the above.
    Unrecognized(String),
}

impl Status {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "OK" => Status::Ok,
            "BAD_OTP" => Status::BadOtp,
            "REPLAYED_OTP" => Status::ReplayedOtp,
            "BAD_SIGNATURE" => Status::BadSignature,
            "MISSING_PARAMETER" => Status::MissingParameter,
            "NO_SUCH_CLIENT" => Status::NoSuchClient,
            "OPERATION_NOT_ALLOWED" => Status::OperationNotAllowed,
            "BACKEND_ERROR" => Status::BackendError,
            "NOT_ENOUGH_ANSWERS" => Status::NotEnoughAnswers,
            "REPLAYED_REQUEST" => Status::ReplayedRequest,
            other => Status::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Ok => "OK",
            Status::BadOtp => "BAD_OTP",
            Status::ReplayedOtp => "REPLAYED_OTP",
            Status::BadSignature => "BAD_SIGNATURE",
            Status::MissingParameter => "MISSING_PARAMETER",
            Status::NoSuchClient => "NO_SUCH_CLIENT",
            Status::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            Status::BackendError => "BACKEND_ERROR",
            Status::NotEnoughAnswers => "NOT_ENOUGH_ANSWERS",
            Status::ReplayedRequest => "REPLAYED_REQUEST",
            Status::Unrecognized(s) => s,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Status::Ok
    }
}

impl Default for Status {
    // A response without a status line never counts as OK.
    fn default() -> Self {
        Status::Unrecognized(String::new())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Parsed validation server response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    pub otp: String,
    pub nonce: String,
    #[serde(serialize_with = "ser_b64")]
    pub h: Option<Vec<u8>>,
    pub t: Option<DateTime<Utc>>,
    pub status: Status,
    /// Unsigned 24 bit on the wire.
    pub timestamp: i32,
    pub session_counter: i64,
    pub session_use: i64,
    pub sl: String,
}

fn ser_b64<S: Serializer>(h: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match h {
        Some(b) => serializer.serialize_some(&B64.encode(b)),
        None => serializer.serialize_none(),
    }
}
