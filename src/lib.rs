// src/lib.rs
//! Client for the YubiKey OTP validation protocol (version 2.0), usable
//! against YubiCloud or a self-hosted validation server.
//!
//! ```no_run
//! # async fn run() -> Result<(), yubiotp::ValidateError> {
//! let client = yubiotp::Client::new("1", "")?;
//! let res = client.validate("vvungrrdhvtklknvrtvuvbbkeidikkvgglrvdgrfcdft").await?;
//! println!("{}", res.status);
//! # Ok(())
//! # }
//! ```

pub mod canon;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod response;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, ValidateError};
pub use transport::{HttpReply, HttpTransport, LoggingTransport, Transport};
pub use types::{Response, Status};
