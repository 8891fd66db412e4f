// src/response.rs
use crate::canon::{self, Params};
use crate::error::{Error, ValidateError};
use crate::types::{Response, Status};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::{DateTime, Duration, Utc};
use subtle::ConstantTimeEq;
use tracing::warn;

/// A response plus every raw `key=value` it was built from.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub response: Response,
    pub params: Params,
}

pub fn parse(body: &[u8]) -> Result<Parsed, Error> {
    let mut res = Response::default();
    let mut params = Params::new();

    for raw in body.split(|&b| b == b'\n') {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = std::str::from_utf8(raw)
            .map_err(|e| Error::parse(&String::from_utf8_lossy(raw), e))?;
        if line.is_empty() {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            return Err(Error::parse(line, "expected key=value"));
        };

        match k {
            "otp" => res.otp = v.to_string(),
            "nonce" => res.nonce = v.to_string(),
            "h" => res.h = Some(B64.decode(v).map_err(|e| Error::parse(line, e))?),
            "t" => res.t = Some(parse_t(v).map_err(|e| Error::parse(line, e))?),
            "status" => res.status = Status::from_wire(v),
            // Counter is 24 bit unsigned; servers are not trusted to stay in range.
            "timestamp" => res.timestamp = parse_int(line, v)? as i32,
            "sessioncounter" => res.session_counter = parse_int(line, v)?,
            "sessionuse" => res.session_use = parse_int(line, v)?,
            "sl" => res.sl = v.to_string(),
            _ => return Err(Error::parse(line, "unknown key")),
        }

        params.insert(k.to_string(), v.to_string());
    }

    Ok(Parsed { response: res, params })
}

fn parse_int(line: &str, v: &str) -> Result<i64, Error> {
    v.parse().map_err(|e| Error::parse(line, e))
}

/// `2020-01-06T02:52:13Z0998`: milliseconds trail the `Z` with no separator.
pub fn parse_t(v: &str) -> Result<DateTime<Utc>, String> {
    let (ts, ms) = v.split_once('Z').ok_or("no 'Z' in timestamp")?;
    let ts = DateTime::parse_from_rfc3339(&format!("{ts}Z")).map_err(|e| e.to_string())?;
    let ms: i64 = ms.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
    let ms = Duration::try_milliseconds(ms).ok_or("milliseconds out of range")?;
    ts.with_timezone(&Utc)
        .checked_add_signed(ms)
        .ok_or_else(|| "timestamp out of range".to_string())
}

/// Checks `h` when a key is configured, then the status.
pub fn validate(parsed: Parsed, secret_key: Option<&[u8]>) -> Result<Response, ValidateError> {
    let Parsed { response, mut params } = parsed;

    if let Some(key) = secret_key {
        let Some(received) = response.h.as_deref() else {
            return Err(ValidateError::new(Some(response), Error::MissingSignature));
        };

        params.remove("h");
        let expected = canon::sign(&params, key);
        if !bool::from(expected.as_slice().ct_eq(received)) {
            warn!(otp = %response.otp, "response signature mismatch");
            return Err(ValidateError::new(Some(response), Error::InvalidSignature));
        }
    }

    if response.status == Status::default() {
        return Err(ValidateError::new(Some(response), Error::MissingStatus));
    }
    if !response.status.is_ok() {
        let status = response.status.clone();
        return Err(ValidateError::new(Some(response), Error::Status(status)));
    }

    Ok(response)
}

pub fn parse_and_validate(body: &[u8], secret_key: Option<&[u8]>) -> Result<Response, ValidateError> {
    let parsed = parse(body)?;
    validate(parsed, secret_key)
}
