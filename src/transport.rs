// src/transport.rs
use crate::error::Error;
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

pub const USER_AGENT: &str = concat!("yubiotp-client/", env!("CARGO_PKG_VERSION"));

/// Status and body of an HTTP reply.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs the GET for a validation request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpReply, Error>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Transport(e.into()))?;
        Ok(Self { client })
    }

    /// Wraps a preconfigured client. It should already send [`USER_AGENT`].
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<HttpReply, Error> {
        let res = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Transport(e.into()))?;
        let status = res.status().as_u16();
        let body = res.bytes().await.map_err(|e| Error::Transport(e.into()))?;
        Ok(HttpReply {
            status,
            body: body.to_vec(),
        })
    }
}

/// Logs every exchange at debug level. For diagnostics only: the query
/// string carries the OTP and signature.
#[derive(Debug, Clone)]
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn get(&self, url: &Url) -> Result<HttpReply, Error> {
        debug!("request: GET {url}");
        let res = self.inner.get(url).await;
        match &res {
            Ok(reply) => debug!(
                "response: {}\n{}",
                reply.status,
                String::from_utf8_lossy(&reply.body)
            ),
            Err(e) => debug!("response error: {e}"),
        }
        res
    }
}
