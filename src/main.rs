// src/main.rs
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use yubiotp::{Client, ClientConfig, HttpTransport, LoggingTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();

    println!("Please touch the YubiKey button.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let otp = lines
        .next_line()
        .await?
        .context("no OTP on stdin")?;

    let otp = otp.trim();
    if let Ok(token) = yubiotp::decode::decode(otp, "") {
        info!("token public ID {}", token.public_id_modhex());
    }

    let client = Client::from_config(&config)?
        .with_transport(LoggingTransport::new(HttpTransport::new()?));

    match client.validate(otp).await {
        Ok(res) => {
            println!("{}", serde_json::to_string_pretty(&res)?);
            Ok(())
        }
        Err(e) => {
            if let Some(res) = &e.response {
                println!("{}", serde_json::to_string_pretty(res)?);
            }
            error!("validation failed: {e}");
            Err(e.into())
        }
    }
}
