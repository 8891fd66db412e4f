// src/config.rs
use std::time::Duration;
use tracing::info;

pub const DEFAULT_CLIENT_ID: &str = "1";
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Required by YubiCloud; any existing ID such as "1" works without a key.
    pub client_id: String,
    /// Base64 API secret. `None` disables request signing and `h` checks.
    pub secret_key: Option<String>,
    /// Self-hosted validation server. `None` uses YubiCloud.
    pub url: Option<String>,
    pub tolerance: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            secret_key: None,
            url: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ClientConfig {
    /// Reads `YUBIKEY_*` variables, after loading `.env` if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| get(k).filter(|v| !v.is_empty());

        let client_id = match get("YUBIKEY_CLIENT_ID") {
            Some(id) => {
                info!("YUBIKEY_CLIENT_ID is set, using it");
                id
            }
            None => {
                info!("YUBIKEY_CLIENT_ID is not set, assuming '{DEFAULT_CLIENT_ID}'");
                DEFAULT_CLIENT_ID.to_string()
            }
        };

        let secret_key = get("YUBIKEY_SECRET_KEY");
        if secret_key.is_some() {
            info!("YUBIKEY_SECRET_KEY is set, enabling signing");
        } else {
            info!("YUBIKEY_SECRET_KEY is not set, skipping signing");
        }

        let tolerance = get("YUBIKEY_TOLERANCE_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOLERANCE);

        Self {
            client_id,
            secret_key,
            url: get("YUBIKEY_URL"),
            tolerance,
        }
    }
}
