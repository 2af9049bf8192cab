use std::env;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub payment: PaymentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_poll_expiry_secs")]
    pub poll_expiry_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_poll_expiry_secs() -> u64 {
    600
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PaymentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_expiry(&self) -> Duration {
        Duration::from_secs(self.poll_expiry_secs)
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .set_default("api.base_url", "http://localhost:5000")?
            .set_default("api.timeout_secs", default_timeout_secs())?
            .set_default("payment.poll_interval_secs", default_poll_interval_secs())?
            .set_default("payment.poll_expiry_secs", default_poll_expiry_secs())?
            // Optional layered files, then environment overrides
            // (e.g. `LUMORA__API__BASE_URL=https://api.example.com`)
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("LUMORA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_config_files() {
        let cfg = ClientConfig::load().unwrap();
        assert_eq!(cfg.api.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.payment.poll_interval(), Duration::from_secs(3));
        assert_eq!(cfg.payment.poll_expiry(), Duration::from_secs(600));
    }
}
