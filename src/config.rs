use crate::errors::{PricerError, PricerResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_port: u16,
    pub data_dir: PathBuf,
    /// Seconds a session may sit idle before it is closed. 0 disables the
    /// timeout and restores the legacy block-forever behavior.
    pub idle_timeout_secs: u64,
    /// How many recent calculations to log at startup. 0 disables the report.
    pub recent_on_boot: usize,
}

impl AppConfig {
    pub fn from_env() -> PricerResult<Self> {
        dotenvy::dotenv().ok();

        let listen_port = env_var_or("LISTEN_PORT", "9000")
            .parse::<u16>()
            .map_err(|e| PricerError::Config(format!("LISTEN_PORT: {e}")))?;

        let idle_timeout_secs = env_var_or("IDLE_TIMEOUT_SECS", "300")
            .parse::<u64>()
            .map_err(|e| PricerError::Config(format!("IDLE_TIMEOUT_SECS: {e}")))?;

        let recent_on_boot = env_var_or("RECENT_ON_BOOT", "10")
            .parse::<usize>()
            .map_err(|e| PricerError::Config(format!("RECENT_ON_BOOT: {e}")))?;

        Ok(Self {
            listen_port,
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
            idle_timeout_secs,
            recent_on_boot,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
