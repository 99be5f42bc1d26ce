use std::{env, net::SocketAddr, time::Duration};

use crate::BoxError;

const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:3300";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Runtime settings for both session roles. Everything is env-driven with
/// CLI overrides applied by the binary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LiveSettings {
    pub gateway_url: String,
    /// Capability flag for the whole subsystem. When off, no HTTP call and
    /// no channel connection is ever attempted.
    pub enabled: bool,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub metrics_addr: SocketAddr,
}

impl LiveSettings {
    pub fn from_env() -> Result<Self, BoxError> {
        let gateway_url =
            env::var("LIVE_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());

        let enabled = match env::var("LIVE_STREAMING_ENABLED") {
            Ok(value) => matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            Err(_) => true,
        };

        let request_timeout = Duration::from_millis(parse_ms("LIVE_REQUEST_TIMEOUT_MS")?);
        let connect_timeout = Duration::from_millis(parse_ms("LIVE_CONNECT_TIMEOUT_MS")?);

        let metrics_addr = env::var("LIVE_METRICS_ADDR")
            .unwrap_or_else(|_| DEFAULT_METRICS_ADDR.to_string())
            .parse()
            .map_err(|err| Box::new(err) as BoxError)?;

        Ok(Self {
            gateway_url,
            enabled,
            request_timeout,
            connect_timeout,
            metrics_addr,
        })
    }
}

fn parse_ms(var: &str) -> Result<u64, BoxError> {
    match env::var(var) {
        Ok(value) => value.parse().map_err(|err| Box::new(err) as BoxError),
        Err(_) => Ok(DEFAULT_TIMEOUT_MS),
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            enabled: true,
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            metrics_addr: DEFAULT_METRICS_ADDR
                .parse()
                .expect("default live metrics addr"),
        }
    }
}
