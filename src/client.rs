// src/client.rs
use crate::canon::{self, Params};
use crate::config::{ClientConfig, DEFAULT_TOLERANCE};
use crate::error::{Error, ValidateError};
use crate::response;
use crate::transport::{HttpTransport, Transport};
use crate::types::Response;
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::{TimeDelta, Utc};
use rand::RngCore;
use reqwest::Url;
use std::{
    fmt,
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_URL: &str = "https://api.yubico.com/wsapi/2.0/verify";

pub const MIN_OTP_LEN: usize = 32;
pub const MAX_OTP_LEN: usize = 48;

/// Upper bound for the `timeout` request parameter, in seconds.
pub const MAX_TIMEOUT_SECS: i64 = 10;

/// Validation server client, for YubiCloud or a self-hosted server.
///
/// Holds no per-call state; share one instance across tasks.
pub struct Client {
    client_id: String,
    secret_key: Option<Vec<u8>>,
    url: Url,
    tolerance: Duration,
    /// Defaults to an [`HttpTransport`], built on first use.
    transport: OnceLock<Arc<dyn Transport>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url.as_str())
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// `secret_key` is base64; an empty string disables signing.
    pub fn new(client_id: &str, secret_key: &str) -> Result<Self, Error> {
        let secret_key = match secret_key {
            "" => None,
            k => Some(B64.decode(k)?),
        };
        Ok(Self {
            client_id: client_id.to_string(),
            secret_key,
            url: default_url()?,
            tolerance: DEFAULT_TOLERANCE,
            transport: OnceLock::new(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let mut c = Self::new(&config.client_id, config.secret_key.as_deref().unwrap_or_default())?
            .with_tolerance(config.tolerance);
        if let Some(url) = &config.url {
            c.set_url(url)?;
        }
        Ok(c)
    }

    /// Points the client at a self-hosted server, or back at YubiCloud if empty.
    pub fn set_url(&mut self, raw: &str) -> Result<(), Error> {
        if raw.is_empty() {
            self.url = default_url()?;
            return Ok(());
        }

        // Also rules out opaque forms like "https:host".
        let has_authority = raw
            .get(..8)
            .is_some_and(|p| p.eq_ignore_ascii_case("https://"));
        if !has_authority {
            return Err(Error::InvalidUrl);
        }
        let url = Url::parse(raw).map_err(|_| Error::InvalidUrl)?;
        if url.scheme() != "https" || url.cannot_be_a_base() {
            return Err(Error::InvalidUrl);
        }

        self.url = url;
        Ok(())
    }

    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = OnceLock::from(transport);
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.set_transport(Arc::new(transport));
        self
    }

    fn transport(&self) -> Result<&Arc<dyn Transport>, Error> {
        if let Some(t) = self.transport.get() {
            return Ok(t);
        }
        let t: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        Ok(self.transport.get_or_init(|| t))
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Asks the server whether `otp` is valid.
    ///
    /// On failure the parsed response, if any, is in [`ValidateError::response`].
    pub async fn validate(&self, otp: &str) -> Result<Response, ValidateError> {
        self.validate_inner(otp, None).await
    }

    /// Like [`Client::validate`], giving up at `deadline`. The remaining time
    /// is also sent to the server as its `timeout`.
    pub async fn validate_until(&self, otp: &str, deadline: Instant) -> Result<Response, ValidateError> {
        self.validate_inner(otp, Some(deadline)).await
    }

    async fn validate_inner(&self, otp: &str, deadline: Option<Instant>) -> Result<Response, ValidateError> {
        if otp.len() < MIN_OTP_LEN {
            return Err(Error::OtpTooShort.into());
        }
        if otp.len() > MAX_OTP_LEN {
            return Err(Error::OtpTooLong.into());
        }

        let nonce = gen_nonce();
        let timeout = request_timeout(deadline, Instant::now());
        let url = self.request_url(otp, &nonce, timeout);
        debug!(%nonce, timeout, "validating otp");

        let get = self.transport()?.get(&url);
        let reply = match deadline {
            Some(d) => tokio::time::timeout_at(d, get)
                .await
                .map_err(|_| Error::DeadlineExceeded)?,
            None => get.await,
        }?;

        if reply.status != 200 {
            return Err(Error::HttpStatus(reply.status).into());
        }

        let res = response::parse_and_validate(&reply.body, self.secret_key.as_deref())?;

        if res.otp != otp {
            let err = Error::UnexpectedOtp {
                expected: otp.to_string(),
                actual: res.otp.clone(),
            };
            return Err(reject(res, err));
        }
        if res.nonce != nonce {
            let err = Error::UnexpectedNonce {
                expected: nonce,
                actual: res.nonce.clone(),
            };
            return Err(reject(res, err));
        }

        let Some(t) = res.t else {
            return Err(reject(res, Error::MissingTimestamp));
        };
        let tolerance = TimeDelta::from_std(self.tolerance).unwrap_or(TimeDelta::MAX);
        let age = Utc::now().signed_duration_since(t);
        if age > tolerance {
            return Err(reject(res, Error::TooOld));
        }
        if age < -tolerance {
            return Err(reject(res, Error::FromFuture));
        }

        Ok(res)
    }

    fn request_url(&self, otp: &str, nonce: &str, timeout: i64) -> Url {
        let mut params = Params::new();
        params.insert("otp".into(), otp.to_string());
        params.insert("timestamp".into(), "1".into());
        params.insert("nonce".into(), nonce.to_string());
        params.insert("timeout".into(), timeout.to_string());
        if !self.client_id.is_empty() {
            params.insert("id".into(), self.client_id.clone());
        }
        if let Some(key) = &self.secret_key {
            let h = canon::sign(&params, key);
            params.insert("h".into(), B64.encode(h));
        }

        let mut url = self.url.clone();
        url.set_query(None);
        {
            let mut q = url.query_pairs_mut();
            for k in canon::sorted_keys(&params) {
                q.append_pair(k, &params[k]);
            }
        }
        url
    }
}

fn reject(res: Response, kind: Error) -> ValidateError {
    warn!(otp = %res.otp, "rejecting response: {kind}");
    ValidateError::new(Some(res), kind)
}

fn default_url() -> Result<Url, Error> {
    Url::parse(DEFAULT_URL).map_err(|_| Error::InvalidUrl)
}

fn gen_nonce() -> String {
    let mut b = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut b);
    hex::encode(b)
}

/// Whole seconds left until `deadline`, capped at [`MAX_TIMEOUT_SECS`].
/// A deadline already passed gives zero or less; it is sent as is.
fn request_timeout(deadline: Option<Instant>, now: Instant) -> i64 {
    let Some(deadline) = deadline else {
        return MAX_TIMEOUT_SECS;
    };
    let remaining = if deadline >= now {
        deadline.duration_since(now).as_secs() as i64
    } else {
        -(now.duration_since(deadline).as_secs() as i64)
    };
    remaining.min(MAX_TIMEOUT_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_40_hex_chars() {
        let a = gen_nonce();
        let b = gen_nonce();
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn timeout_is_capped() {
        let now = Instant::now();
        assert_eq!(request_timeout(None, now), 10);
        assert_eq!(request_timeout(Some(now + Duration::from_secs(60)), now), 10);
        assert_eq!(request_timeout(Some(now + Duration::from_millis(3500)), now), 3);
        assert_eq!(request_timeout(Some(now), now), 0);
    }

    #[test]
    fn past_deadline_passes_through() {
        let now = Instant::now() + Duration::from_secs(100);
        assert_eq!(request_timeout(Some(now - Duration::from_secs(5)), now), -5);
    }

    #[test]
    fn set_url() {
        let mut c = Client::new("1", "").unwrap();
        for bad in ["mailto:test@test.test", "https:opaque", "http://test.test", "ftp://test.test", "https"] {
            assert!(matches!(c.set_url(bad), Err(Error::InvalidUrl)), "{bad}");
        }

        c.set_url("HTTPS://test.test/verify").unwrap();
        assert_eq!(c.url().as_str(), "https://test.test/verify");

        c.set_url("https://test.test/wsapi/2.0/verify").unwrap();
        assert_eq!(c.url().as_str(), "https://test.test/wsapi/2.0/verify");

        c.set_url("").unwrap();
        assert_eq!(c.url().as_str(), DEFAULT_URL);
    }

    #[test]
    fn transport_is_built_on_demand() {
        let c = Client::new("1", "").unwrap();
        assert!(c.transport.get().is_none());
        c.transport().unwrap();
        assert!(c.transport.get().is_some());
    }

    #[test]
    fn bad_secret_key() {
        assert!(matches!(Client::new("1", "not base64!"), Err(Error::InvalidSecretKey(_))));
    }

    #[test]
    fn debug_hides_secret() {
        let c = Client::new("1", "mG5be6ZJU1qBGz24yPh/ESM3UdU=").unwrap();
        let s = format!("{c:?}");
        assert!(s.contains("<redacted>"));
        assert!(!s.contains("mG5be6ZJU1qBGz24yPh"));
    }

    #[test]
    fn request_url_is_signed() {
        let c = Client::new("1", "mG5be6ZJU1qBGz24yPh/ESM3UdU=").unwrap();
        let url = c.request_url("vvungrrdhvtklknvrtvuvbbkeidikkvgglrvdgrfcdft", "abc", 7);

        let mut params: Params = url.query_pairs().into_owned().collect();
        assert_eq!(params["id"], "1");
        assert_eq!(params["timestamp"], "1");
        assert_eq!(params["timeout"], "7");
        assert_eq!(params["nonce"], "abc");

        let h = params.remove("h").expect("signed");
        let key = B64.decode("mG5be6ZJU1qBGz24yPh/ESM3UdU=").unwrap();
        assert_eq!(B64.decode(h).unwrap(), canon::sign(&params, &key));
    }

    #[test]
    fn request_url_without_id_or_key() {
        let c = Client::new("", "").unwrap();
        let url = c.request_url("vvungrrdhvtklknvrtvuvbbkeidikkvgglrvdgrfcdft", "abc", 10);
        let params: Params = url.query_pairs().into_owned().collect();
        assert!(!params.contains_key("id"));
        assert!(!params.contains_key("h"));
        assert_eq!(url.host_str(), Some("api.yubico.com"));
    }
}
